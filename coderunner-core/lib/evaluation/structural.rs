//! Pattern-based structural analysis of submissions.
//!
//! Constructs are counted with per-language regular expressions, not a parser. Counts are
//! approximate by nature: a `*` in an expression counts as a C++ pointer, a string containing
//! `for x in ` counts as a Python loop.

use std::{collections::BTreeMap, fmt, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::registry::Language;

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Words that look like a name followed by a parenthesised list but never declare a function.
const CONTROL_KEYWORDS: &[&str] = &[
    "if",
    "for",
    "while",
    "switch",
    "catch",
    "return",
    "new",
    "else",
    "do",
    "synchronized",
];

const PYTHON_ALIASES: &[(&str, &str)] = &[
    ("Custom Function/Method", "function"),
    ("Function", "function"),
    ("LOOP", "loop"),
    ("Loop", "loop"),
    ("For Loop", "for loop"),
    ("While Loop", "while loop"),
    ("If Statement", "if statement"),
    ("if-else statement", "if statement"),
    ("If-Else Statement", "if statement"),
    ("Array/List", "list"),
    ("List", "list"),
    ("Dictionary", "dictionary"),
    ("Class", "class"),
    ("Recursion", "recursion"),
    ("Try-Except", "try-except"),
    ("With Statement", "with statement"),
];

const JAVA_ALIASES: &[(&str, &str)] = &[
    ("Custom Function/Method", "method"),
    ("Method", "method"),
    ("function", "method"),
    ("Function", "method"),
    ("LOOP", "loop"),
    ("Loop", "loop"),
    ("For Loop", "for loop"),
    ("While Loop", "while loop"),
    ("Do-While Loop", "do-while loop"),
    ("If Statement", "if statement"),
    ("if-else statement", "if statement"),
    ("If-Else Statement", "if statement"),
    ("Array/List", "array"),
    ("Array", "array"),
    ("Class", "class"),
    ("Recursion", "recursion"),
    ("Try-Catch", "try-catch"),
];

const CPP_ALIASES: &[(&str, &str)] = &[
    ("Custom Function/Method", "function"),
    ("Function", "function"),
    ("LOOP", "loop"),
    ("Loop", "loop"),
    ("For Loop", "for loop"),
    ("While Loop", "while loop"),
    ("Do-While Loop", "do-while loop"),
    ("If Statement", "if statement"),
    ("if-else statement", "if statement"),
    ("If-Else Statement", "if statement"),
    ("Array/List", "array"),
    ("Array", "array"),
    ("Vector", "vector"),
    ("Map", "map"),
    ("Class", "class"),
    ("Struct", "struct"),
    ("Pointer", "pointer"),
    ("Recursion", "recursion"),
    ("Try-Catch", "try-catch"),
];

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Construct name to number of occurrences.
pub type StructureCounts = BTreeMap<&'static str, usize>;

/// Whether a construct must or must not appear.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConstraintType {
    /// The construct must appear, at least `minDepth` times.
    Required,

    /// The construct must not appear.
    Forbidden,

    /// A type this service does not know. Never passes.
    Unknown(String),
}

/// Count bounds attached to a constraint. Zero means unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConstraintSpecifics {
    /// The least number of occurrences a required construct needs.
    pub min_depth: u32,

    /// The most occurrences allowed.
    pub max_depth: u32,
}

/// A rule about the shape of a submission, e.g. "must define a function".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralConstraint {
    /// Required or forbidden.
    #[serde(rename = "type")]
    pub constraint_type: ConstraintType,

    /// The construct, by internal or user-facing name.
    pub construct: String,

    /// Optional count bounds.
    #[serde(default)]
    pub specifics: Option<ConstraintSpecifics>,
}

/// The outcome of one structural constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintResult {
    /// The construct as it was named in the constraint.
    pub constraint: String,

    /// Required or forbidden.
    #[serde(rename = "type")]
    pub constraint_type: ConstraintType,

    /// How often the construct was found.
    pub count: usize,

    /// Whether the constraint holds.
    pub passed: bool,

    /// A human readable explanation.
    pub message: String,
}

/// One counted construct: its patterns' matches are summed.
struct Rule {
    key: &'static str,
    patterns: Vec<Regex>,
}

/// A function header found in the source, with the text of its body.
struct FunctionDef<'a> {
    name: &'a str,
    body: &'a str,
}

//--------------------------------------------------------------------------------------------------
// Statics
//--------------------------------------------------------------------------------------------------

static PYTHON_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    rules(&[
        ("for loop", &[r"\bfor\s+\w+\s+in\s+"]),
        ("while loop", &[r"\bwhile\s+.+:"]),
        ("if statement", &[r"\bif\s+.+:"]),
        ("function", &[r"\bdef\s+\w+\s*\("]),
        ("class", &[r"\bclass\s+\w+"]),
        ("list", &[r"\[.*?\]", r"\.append\(|\.extend\(|list\("]),
        ("dictionary", &[r"\{.*?:.*?\}"]),
        ("try-except", &[r"\btry\s*:"]),
        ("with statement", &[r"\bwith\s+.+:"]),
    ])
});

static JAVA_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    rules(&[
        ("for loop", &[r"\bfor\s*\("]),
        ("while loop", &[r"\bwhile\s*\("]),
        ("do-while loop", &[r"\bdo\s*\{"]),
        ("if statement", &[r"\bif\s*\("]),
        ("class", &[r"\bclass\s+\w+"]),
        ("ArrayList", &[r"ArrayList<"]),
        ("HashMap", &[r"HashMap<"]),
        ("try-catch", &[r"\btry\s*\{"]),
        ("primitive array", &[r"\w+\[\s*\]", r"new\s+\w+\["]),
    ])
});

static CPP_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    rules(&[
        ("for loop", &[r"\bfor\s*\("]),
        ("while loop", &[r"\bwhile\s*\("]),
        ("do-while loop", &[r"\bdo\s*\{"]),
        ("if statement", &[r"\bif\s*\("]),
        ("class", &[r"\bclass\s+\w+"]),
        ("struct", &[r"\bstruct\s+\w+"]),
        ("vector", &[r"vector<"]),
        ("map", &[r"\bmap<"]),
        ("pointer", &[r"\*\s*\w+"]),
        ("try-catch", &[r"\btry\s*\{"]),
        ("c array", &[r"\w+\s+\w+\[\s*\d*\s*\]"]),
    ])
});

static PYTHON_DEF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bdef\s+(\w+)\s*\([^)]*\)[^:\n]*:").expect("valid def pattern"));

static JAVA_METHOD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:public|private|protected|static|\s)+([\w<>\[\]]+)\s+(\w+)\s*\([^)]*\)\s*\{")
        .expect("valid method pattern")
});

static CPP_FUNCTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\w+)\s+(\w+)\s*\([^)]*\)\s*\{").expect("valid function pattern")
});

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl ConstraintType {
    /// The wire name of the type.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Required => "Required",
            Self::Forbidden => "Forbidden",
            Self::Unknown(kind) => kind,
        }
    }
}

impl StructuralConstraint {
    /// A constraint requiring `construct` at least once.
    pub fn required(construct: impl Into<String>) -> Self {
        Self {
            constraint_type: ConstraintType::Required,
            construct: construct.into(),
            specifics: None,
        }
    }

    /// A constraint forbidding `construct`.
    pub fn forbidden(construct: impl Into<String>) -> Self {
        Self {
            constraint_type: ConstraintType::Forbidden,
            construct: construct.into(),
            specifics: None,
        }
    }

    /// Adds count bounds.
    pub fn with_depth(mut self, min_depth: u32, max_depth: u32) -> Self {
        self.specifics = Some(ConstraintSpecifics {
            min_depth,
            max_depth,
        });
        self
    }

    /// Checks the constraint against counted constructs.
    pub fn evaluate(&self, counts: &StructureCounts, language: Language) -> ConstraintResult {
        let construct = &self.construct;
        let count = counts
            .get(normalize_construct(construct, language))
            .copied()
            .unwrap_or(0);

        let specifics = self.specifics.unwrap_or_default();
        let max_depth = (specifics.max_depth > 0).then_some(specifics.max_depth as usize);

        let (mut passed, mut message) = match &self.constraint_type {
            ConstraintType::Required => {
                let min = if specifics.min_depth > 0 {
                    specifics.min_depth as usize
                } else {
                    1
                };
                if count >= min {
                    (true, format!("Found {count} {construct}(s) (required: {min})"))
                } else {
                    (
                        false,
                        format!("Missing {construct}. Found {count}, required at least {min}"),
                    )
                }
            }
            ConstraintType::Forbidden => {
                if count == 0 {
                    (true, format!("No {construct} found (as required)"))
                } else {
                    (
                        false,
                        format!("Found {count} {construct}(s), but they are forbidden"),
                    )
                }
            }
            ConstraintType::Unknown(kind) => (false, format!("Unknown constraint type: {kind}")),
        };

        if let Some(max) = max_depth {
            if passed && count > max {
                passed = false;
                message =
                    format!("Too many {construct}(s). Found {count}, maximum allowed: {max}");
            }
        }

        ConstraintResult {
            constraint: construct.clone(),
            constraint_type: self.constraint_type.clone(),
            count,
            passed,
            message,
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl From<String> for ConstraintType {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "Required" => Self::Required,
            "Forbidden" => Self::Forbidden,
            _ => Self::Unknown(kind),
        }
    }
}

impl From<ConstraintType> for String {
    fn from(kind: ConstraintType) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for ConstraintType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Checks every constraint against `code`.
pub fn evaluate_constraints(
    code: &str,
    language: Language,
    constraints: &[StructuralConstraint],
) -> Vec<ConstraintResult> {
    if constraints.is_empty() {
        return Vec::new();
    }

    let counts = analyze_structure(code, language);
    tracing::debug!("{} structure: {:?}", language, counts);

    constraints
        .iter()
        .map(|constraint| constraint.evaluate(&counts, language))
        .collect()
}

/// Counts the constructs of `code`.
pub fn analyze_structure(code: &str, language: Language) -> StructureCounts {
    match language {
        Language::Python => analyze_python(code),
        Language::Java => analyze_java(code),
        Language::Cpp => analyze_cpp(code),
    }
}

/// Maps a user-facing construct name to the key [`analyze_structure`] counts it under.
///
/// Names that are already keys, or that are unknown, are returned unchanged.
pub fn normalize_construct<'a>(construct: &'a str, language: Language) -> &'a str {
    let aliases = match language {
        Language::Python => PYTHON_ALIASES,
        Language::Java => JAVA_ALIASES,
        Language::Cpp => CPP_ALIASES,
    };

    aliases
        .iter()
        .find(|(alias, _)| *alias == construct)
        .map(|(_, key)| *key)
        .unwrap_or(construct)
}

fn analyze_python(code: &str) -> StructureCounts {
    let mut counts = count_rules(&PYTHON_RULES, code);
    counts.insert("loop", counts["for loop"] + counts["while loop"]);

    let recursion = python_functions(code)
        .iter()
        .filter(|f| calls_itself(f))
        .count();
    counts.insert("recursion", recursion);

    counts
}

fn analyze_java(code: &str) -> StructureCounts {
    let mut counts = count_rules(&JAVA_RULES, code);
    counts.insert(
        "loop",
        counts["for loop"] + counts["while loop"] + counts["do-while loop"],
    );

    let primitive = counts.remove("primitive array").unwrap_or(0);
    counts.insert("array", primitive + counts["ArrayList"]);

    let methods = braced_functions(&JAVA_METHOD, code);
    counts.insert("method", methods.len());
    counts.insert("recursion", methods.iter().filter(|f| calls_itself(f)).count());

    counts
}

fn analyze_cpp(code: &str) -> StructureCounts {
    let mut counts = count_rules(&CPP_RULES, code);
    counts.insert(
        "loop",
        counts["for loop"] + counts["while loop"] + counts["do-while loop"],
    );

    let c_arrays = counts.remove("c array").unwrap_or(0);
    counts.insert("array", c_arrays + counts["vector"]);

    let functions = braced_functions(&CPP_FUNCTION, code);
    counts.insert("function", functions.len());
    counts.insert(
        "recursion",
        functions.iter().filter(|f| calls_itself(f)).count(),
    );

    counts
}

fn rules(table: &[(&'static str, &[&str])]) -> Vec<Rule> {
    table
        .iter()
        .map(|&(key, patterns)| Rule {
            key,
            patterns: patterns
                .iter()
                .map(|p| Regex::new(p).expect("valid structure pattern"))
                .collect(),
        })
        .collect()
}

fn count_rules(rules: &[Rule], code: &str) -> StructureCounts {
    rules
        .iter()
        .map(|rule| {
            let count: usize = rule
                .patterns
                .iter()
                .map(|pattern| pattern.find_iter(code).count())
                .sum();
            (rule.key, count)
        })
        .collect()
}

/// Python functions. A body runs from the end of the header to the first non-blank line indented
/// no deeper than the `def`, so nested functions belong to their enclosing one as well.
fn python_functions(code: &str) -> Vec<FunctionDef<'_>> {
    PYTHON_DEF
        .captures_iter(code)
        .filter_map(|caps| {
            let header = caps.get(0)?;
            let name = caps.get(1)?.as_str();
            let line_start = code[..header.start()].rfind('\n').map_or(0, |i| i + 1);
            let indent = header.start() - line_start;

            let rest = &code[header.end()..];
            let mut end = 0;
            for (i, line) in rest.split_inclusive('\n').enumerate() {
                let content = line.trim_start();
                if i > 0 && !content.is_empty() && line.len() - content.len() <= indent {
                    break;
                }
                end += line.len();
            }

            Some(FunctionDef {
                name,
                body: &rest[..end],
            })
        })
        .collect()
}

/// Functions whose header ends in `{`, with the body up to the matching `}`.
///
/// The last capture group of `header` must be the function name and the one before it the word
/// preceding the name; headers where either is a control keyword are skipped.
fn braced_functions<'a>(header: &Regex, code: &'a str) -> Vec<FunctionDef<'a>> {
    header
        .captures_iter(code)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = caps.get(caps.len() - 1)?.as_str();
            let preceding = caps.get(caps.len() - 2)?.as_str();
            if CONTROL_KEYWORDS.contains(&name) || CONTROL_KEYWORDS.contains(&preceding) {
                return None;
            }
            Some(FunctionDef {
                name,
                body: braced_block(code, whole.end()),
            })
        })
        .collect()
}

/// The text from `start` up to, not including, the `}` closing an already opened block.
fn braced_block(code: &str, start: usize) -> &str {
    let mut depth = 1usize;
    for (offset, byte) in code.as_bytes()[start..].iter().enumerate() {
        match byte {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return &code[start..start + offset];
                }
            }
            _ => {}
        }
    }
    &code[start..]
}

fn calls_itself(function: &FunctionDef<'_>) -> bool {
    function.body.contains(&format!("{}(", function.name))
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const PYTHON_FACTORIAL: &str = "\
def factorial(n):
    if n <= 1:
        return 1
    return n * factorial(n - 1)

def main():
    nums = [1, 2, 3]
    for x in nums:
        print(factorial(x))

main()
";

    const JAVA_FIB: &str = "\
import java.util.*;

public class Main {
    static int fib(int n) {
        if (n < 2) {
            return n;
        } else if (n == 2) {
            return 1;
        }
        return fib(n - 1) + fib(n - 2);
    }

    public static void main(String[] args) {
        int[] values = new int[5];
        ArrayList<Integer> list = new ArrayList<>();
        for (int i = 0; i < 5; i++) {
            values[i] = fib(i);
        }
        System.out.println(values[4]);
    }
}
";

    const CPP_SUM: &str = "\
#include <iostream>
#include <vector>
using namespace std;

int sum(const vector<int>& v) {
    int total = 0;
    for (int x : v) {
        if (x > 0) {
            total += x;
        }
    }
    return total;
}

int main() {
    vector<int> v = {1, 2, 3};
    int i = 0;
    while (i < 3) {
        i++;
    }
    cout << sum(v) << endl;
    return 0;
}
";

    #[test]
    fn test_python_counts() {
        let counts = analyze_structure(PYTHON_FACTORIAL, Language::Python);

        assert_eq!(counts["function"], 2);
        assert_eq!(counts["for loop"], 1);
        assert_eq!(counts["loop"], 1);
        assert_eq!(counts["if statement"], 1);
        assert_eq!(counts["list"], 1);
        assert_eq!(counts["class"], 0);
    }

    #[test]
    fn test_python_recursion_ignores_the_header() {
        let counts = analyze_structure(PYTHON_FACTORIAL, Language::Python);
        assert_eq!(counts["recursion"], 1);

        let counts = analyze_structure("def greet(name):\n    print(name)\n", Language::Python);
        assert_eq!(counts["recursion"], 0);

        let methods = "class Walker:\n    def walk(self, node):\n        return self.walk(node.next)\n\n    def stop(self):\n        pass\n";
        let counts = analyze_structure(methods, Language::Python);
        assert_eq!(counts["recursion"], 1);
        assert_eq!(counts["class"], 1);
    }

    #[test]
    fn test_java_counts() {
        let counts = analyze_structure(JAVA_FIB, Language::Java);

        assert_eq!(counts["method"], 2);
        assert_eq!(counts["recursion"], 1);
        assert_eq!(counts["for loop"], 1);
        assert_eq!(counts["if statement"], 2);
        assert_eq!(counts["class"], 1);
        assert_eq!(counts["ArrayList"], 2);
        assert!(counts["array"] >= 3);
    }

    #[test]
    fn test_cpp_counts() {
        let counts = analyze_structure(CPP_SUM, Language::Cpp);

        assert_eq!(counts["function"], 2);
        assert_eq!(counts["recursion"], 0);
        assert_eq!(counts["loop"], 2);
        assert_eq!(counts["vector"], 2);
        assert_eq!(counts["array"], 2);
        assert_eq!(counts["struct"], 0);
    }

    #[test]
    fn test_normalize_construct() {
        assert_eq!(
            normalize_construct("Custom Function/Method", Language::Java),
            "method"
        );
        assert_eq!(normalize_construct("Array/List", Language::Python), "list");
        assert_eq!(normalize_construct("Array/List", Language::Cpp), "array");
        assert_eq!(normalize_construct("for loop", Language::Cpp), "for loop");
        assert_eq!(normalize_construct("lambda", Language::Python), "lambda");
    }

    #[test]
    fn test_constraint_messages() {
        let results = evaluate_constraints(
            PYTHON_FACTORIAL,
            Language::Python,
            &[
                StructuralConstraint::required("Recursion"),
                StructuralConstraint::required("While Loop"),
                StructuralConstraint::forbidden("class"),
                StructuralConstraint::forbidden("Loop"),
                StructuralConstraint::required("Function").with_depth(0, 1),
                StructuralConstraint::required("Function").with_depth(3, 0),
            ],
        );

        assert!(results[0].passed);
        assert_eq!(results[0].message, "Found 1 Recursion(s) (required: 1)");

        assert!(!results[1].passed);
        assert_eq!(
            results[1].message,
            "Missing While Loop. Found 0, required at least 1"
        );

        assert!(results[2].passed);
        assert_eq!(results[2].message, "No class found (as required)");

        assert!(!results[3].passed);
        assert_eq!(
            results[3].message,
            "Found 1 Loop(s), but they are forbidden"
        );

        assert!(!results[4].passed);
        assert_eq!(
            results[4].message,
            "Too many Function(s). Found 2, maximum allowed: 1"
        );

        assert!(!results[5].passed);
        assert_eq!(results[5].count, 2);
    }

    #[test]
    fn test_constraint_wire_format() {
        let constraint: StructuralConstraint = serde_json::from_str(
            r#"{"type": "Required", "construct": "Loop", "specifics": {"minDepth": 2}}"#,
        )
        .unwrap();
        assert_eq!(constraint.constraint_type, ConstraintType::Required);
        assert_eq!(constraint.specifics.unwrap().min_depth, 2);
        assert_eq!(constraint.specifics.unwrap().max_depth, 0);

        let odd: StructuralConstraint =
            serde_json::from_str(r#"{"type": "Preferred", "construct": "Loop"}"#).unwrap();
        let result = odd.evaluate(&StructureCounts::new(), Language::Cpp);
        assert!(!result.passed);
        assert_eq!(result.message, "Unknown constraint type: Preferred");

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["type"], "Preferred");
        assert_eq!(json["constraint"], "Loop");
    }
}
