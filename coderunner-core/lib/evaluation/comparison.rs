use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// How a program's output is compared against the expected output.
///
/// Unrecognised modes deserialize into [`ComparisonMode::Unknown`] so that a single bad test case
/// fails on its own instead of rejecting the whole submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ComparisonMode {
    /// Byte-for-byte equality.
    #[default]
    Exact,

    /// Equality after trimming every line and dropping blank ones.
    IgnoreWhitespace,

    /// The expected output is a pattern searched for in the actual output.
    Regex,

    /// A mode this service does not know.
    Unknown(String),
}

/// The outcome of comparing one output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    /// Whether the output was accepted.
    pub passed: bool,

    /// A human readable explanation.
    pub message: String,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl ComparisonMode {
    /// The wire name of the mode.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Exact => "Exact",
            Self::IgnoreWhitespace => "IgnoreWhitespace",
            Self::Regex => "Regex",
            Self::Unknown(mode) => mode,
        }
    }
}

impl Verdict {
    fn new(passed: bool, message: impl Into<String>) -> Self {
        Self {
            passed,
            message: message.into(),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl From<String> for ComparisonMode {
    fn from(mode: String) -> Self {
        match mode.as_str() {
            "Exact" => Self::Exact,
            "IgnoreWhitespace" => Self::IgnoreWhitespace,
            "Regex" => Self::Regex,
            _ => Self::Unknown(mode),
        }
    }
}

impl From<ComparisonMode> for String {
    fn from(mode: ComparisonMode) -> Self {
        mode.as_str().to_string()
    }
}

impl fmt::Display for ComparisonMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Compares `actual` against `expected` under `mode`.
pub fn evaluate_output(actual: &str, expected: &str, mode: &ComparisonMode) -> Verdict {
    match mode {
        ComparisonMode::Exact => {
            if actual == expected {
                Verdict::new(true, "Output matches exactly")
            } else {
                Verdict::new(false, format!("Expected: \"{expected}\"\nGot: \"{actual}\""))
            }
        }
        ComparisonMode::IgnoreWhitespace => {
            let actual = normalize_whitespace(actual);
            let expected = normalize_whitespace(expected);
            if actual == expected {
                Verdict::new(true, "Output matches (whitespace ignored)")
            } else {
                Verdict::new(
                    false,
                    format!(
                        "Expected (normalized): \"{expected}\"\nGot (normalized): \"{actual}\""
                    ),
                )
            }
        }
        ComparisonMode::Regex => match Regex::new(expected) {
            Ok(pattern) if pattern.is_match(actual) => {
                Verdict::new(true, "Output matches regex pattern")
            }
            Ok(_) => Verdict::new(false, format!("Output doesn't match pattern: {expected}")),
            Err(e) => Verdict::new(false, format!("Invalid regex pattern: {e}")),
        },
        ComparisonMode::Unknown(mode) => {
            Verdict::new(false, format!("Unknown comparison mode: {mode}"))
        }
    }
}

/// Trims every line and drops the blank ones.
pub fn normalize_whitespace(text: &str) -> String {
    text.split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact() {
        let verdict = evaluate_output("42", "42", &ComparisonMode::Exact);
        assert_eq!(verdict, Verdict::new(true, "Output matches exactly"));

        let verdict = evaluate_output("42 ", "42", &ComparisonMode::Exact);
        assert!(!verdict.passed);
        assert_eq!(verdict.message, "Expected: \"42\"\nGot: \"42 \"");
    }

    #[test]
    fn test_ignore_whitespace() {
        let verdict = evaluate_output(
            "  1 2\n\n3  \n",
            "1 2\n3",
            &ComparisonMode::IgnoreWhitespace,
        );
        assert!(verdict.passed);
        assert_eq!(verdict.message, "Output matches (whitespace ignored)");

        let verdict = evaluate_output("1  2", "1 2", &ComparisonMode::IgnoreWhitespace);
        assert!(!verdict.passed);
        assert_eq!(
            verdict.message,
            "Expected (normalized): \"1 2\"\nGot (normalized): \"1  2\""
        );
    }

    #[test]
    fn test_regex_is_unanchored() {
        let verdict = evaluate_output("result: 120", r"\d+", &ComparisonMode::Regex);
        assert!(verdict.passed);

        let verdict = evaluate_output("no digits", r"^\d+$", &ComparisonMode::Regex);
        assert_eq!(verdict.message, "Output doesn't match pattern: ^\\d+$");

        let verdict = evaluate_output("x", "(", &ComparisonMode::Regex);
        assert!(!verdict.passed);
        assert!(verdict.message.starts_with("Invalid regex pattern: "));
    }

    #[test]
    fn test_unknown_mode_round_trips_and_fails() {
        let mode: ComparisonMode = serde_json::from_str("\"Fuzzy\"").unwrap();
        assert_eq!(mode, ComparisonMode::Unknown("Fuzzy".to_string()));
        assert_eq!(serde_json::to_string(&mode).unwrap(), "\"Fuzzy\"");

        let verdict = evaluate_output("a", "a", &mode);
        assert!(!verdict.passed);
        assert_eq!(verdict.message, "Unknown comparison mode: Fuzzy");

        let mode: ComparisonMode = serde_json::from_str("\"IgnoreWhitespace\"").unwrap();
        assert_eq!(mode, ComparisonMode::IgnoreWhitespace);
    }
}
