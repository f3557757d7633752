use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::registry::Language;

use super::{ConstraintResult, ConstraintType, Tally, TestCaseResult, STRUCTURAL_WEIGHT, TEST_CASE_WEIGHT};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

const HEAVY_RULE: &str = "═══════════════════════════════════════════════════════";
const LIGHT_RULE: &str = "───────────────────────────────────────────────────────";

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Everything learned from evaluating one submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationReport {
    /// False when the single run (without test cases) failed.
    pub success: bool,

    /// The submission's language.
    pub language: Language,

    /// When the evaluation finished.
    pub executed_at: DateTime<Utc>,

    /// Per test case outcomes.
    pub test_cases: Vec<TestCaseResult>,

    /// Tally of `test_cases`.
    pub test_case_tally: Tally,

    /// Per constraint outcomes.
    pub structural: Vec<ConstraintResult>,

    /// Tally of `structural`.
    pub structural_tally: Tally,

    /// The combined score.
    pub final_score: f64,

    /// What `final_score` is out of.
    pub max_score: f64,

    /// The program's output: the first test case's, or the single run's.
    pub output: String,

    /// Why the single run failed.
    pub error: Option<String>,
}

/// The JSON shape of an evaluation returned to API clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResponse {
    /// False when the single run failed.
    pub success: bool,

    /// The combined score.
    pub score: f64,

    /// What `score` is out of.
    pub max_score: f64,

    /// The program's output.
    pub output: String,

    /// Why the run failed.
    pub error: Option<String>,

    /// Test case summary.
    pub test_cases: Section<TestCaseDetail>,

    /// Structural constraint summary.
    pub structural: Section<ConstraintDetail>,

    /// The plain-text report.
    pub terminal: String,
}

/// A tally with its per-check details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section<T> {
    /// Number passed.
    pub passed: usize,

    /// Number failed.
    pub failed: usize,

    /// Number of checks.
    pub total: usize,

    /// One entry per check.
    pub details: Vec<T>,
}

/// One test case as shown to API clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseDetail {
    /// Zero-based position.
    pub index: usize,
    /// Whether it passed.
    pub passed: bool,
    /// Why it passed or failed.
    pub message: String,
    /// The input, or the hidden placeholder.
    pub input: String,
    /// The expected output, or the hidden placeholder.
    pub expected: String,
    /// What the program printed.
    pub actual: String,
    /// Whether the test case is hidden.
    pub hidden: bool,
    /// Run time in milliseconds.
    pub execution_time: u64,
}

/// One structural constraint as shown to API clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintDetail {
    /// The construct as named in the constraint.
    pub constraint: String,
    /// Required or forbidden.
    #[serde(rename = "type")]
    pub constraint_type: ConstraintType,
    /// Occurrences found.
    pub count: usize,
    /// Whether it held.
    pub passed: bool,
    /// Why it held or not.
    pub message: String,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl EvaluationReport {
    /// Builds the API response, including the terminal rendering.
    pub fn to_response(&self) -> EvaluationResponse {
        EvaluationResponse {
            success: self.success,
            score: self.final_score,
            max_score: self.max_score,
            output: self.output.clone(),
            error: self.error.clone(),
            test_cases: Section::new(
                &self.test_case_tally,
                self.test_cases.iter().map(TestCaseDetail::from).collect(),
            ),
            structural: Section::new(
                &self.structural_tally,
                self.structural.iter().map(ConstraintDetail::from).collect(),
            ),
            terminal: self.terminal(),
        }
    }

    /// Renders the report as plain text for a terminal.
    pub fn terminal(&self) -> String {
        let mut lines: Vec<String> = vec![
            HEAVY_RULE.into(),
            "              CODE EXECUTION RESULTS".into(),
            HEAVY_RULE.into(),
            String::new(),
        ];

        if !self.output.is_empty() {
            push_block(&mut lines, "📤 OUTPUT:", &self.output);
        }

        if let Some(error) = self.error.as_deref().filter(|e| !e.is_empty()) {
            push_block(&mut lines, "❌ ERROR:", error);
        }

        if !self.test_case_tally.is_empty() {
            lines.push("🧪 TEST CASES:".into());
            lines.push(LIGHT_RULE.into());
            for (i, tc) in self.test_cases.iter().enumerate() {
                lines.push(format!("{} Test Case {}: {}", icon(tc.passed), i + 1, status(tc.passed)));
                if tc.is_hidden {
                    lines.push("   [Hidden Test Case]".into());
                } else {
                    let input = if tc.input.is_empty() { "(empty)" } else { tc.input.as_str() };
                    lines.push(format!("   Input: {}", input));
                    lines.push(format!("   Expected: {}", tc.expected_output));
                    lines.push(format!("   Got: {}", tc.actual_output));
                }
                lines.push(format!("   {}", tc.message));
                lines.push(String::new());
            }
            push_summary(&mut lines, &self.test_case_tally);
        }

        if !self.structural_tally.is_empty() {
            lines.push("🏗️  STRUCTURAL CONSTRAINTS:".into());
            lines.push(LIGHT_RULE.into());
            for sc in &self.structural {
                lines.push(format!(
                    "{} {} ({}): {}",
                    icon(sc.passed),
                    sc.constraint,
                    sc.constraint_type,
                    status(sc.passed)
                ));
                lines.push(format!("   {}", sc.message));
                lines.push(String::new());
            }
            push_summary(&mut lines, &self.structural_tally);
        }

        lines.push("🎯 FINAL SCORE:".into());
        lines.push(LIGHT_RULE.into());
        lines.push(format!("   {} / {}", self.final_score, self.max_score));

        if !self.test_case_tally.is_empty() && !self.structural_tally.is_empty() {
            let tests_max = TEST_CASE_WEIGHT * self.max_score;
            let structure_max = STRUCTURAL_WEIGHT * self.max_score;
            lines.push(String::new());
            lines.push("   Breakdown:".into());
            lines.push(format!(
                "   • Test Cases (70%): {:.1}/{:.1}",
                self.test_case_tally.score * tests_max,
                tests_max
            ));
            lines.push(format!(
                "   • Structural (30%): {:.1}/{:.1}",
                self.structural_tally.score * structure_max,
                structure_max
            ));
        }
        lines.push(HEAVY_RULE.into());

        lines.join("\n")
    }
}

impl<T> Section<T> {
    fn new(tally: &Tally, details: Vec<T>) -> Self {
        Self {
            passed: tally.passed,
            failed: tally.failed,
            total: tally.total,
            details,
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl From<&TestCaseResult> for TestCaseDetail {
    fn from(tc: &TestCaseResult) -> Self {
        Self {
            index: tc.test_case_index,
            passed: tc.passed,
            message: tc.message.clone(),
            input: tc.input.clone(),
            expected: tc.expected_output.clone(),
            actual: tc.actual_output.clone(),
            hidden: tc.is_hidden,
            execution_time: tc.execution_time_ms,
        }
    }
}

impl From<&ConstraintResult> for ConstraintDetail {
    fn from(sc: &ConstraintResult) -> Self {
        Self {
            constraint: sc.constraint.clone(),
            constraint_type: sc.constraint_type.clone(),
            count: sc.count,
            passed: sc.passed,
            message: sc.message.clone(),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

fn push_block(lines: &mut Vec<String>, title: &str, body: &str) {
    lines.push(title.into());
    lines.push(LIGHT_RULE.into());
    lines.push(body.into());
    lines.push(LIGHT_RULE.into());
    lines.push(String::new());
}

fn push_summary(lines: &mut Vec<String>, tally: &Tally) {
    lines.push(format!("Summary: {}/{} passed", tally.passed, tally.total));
    lines.push(LIGHT_RULE.into());
    lines.push(String::new());
}

fn icon(passed: bool) -> &'static str {
    if passed {
        "✅"
    } else {
        "❌"
    }
}

fn status(passed: bool) -> &'static str {
    if passed {
        "✓ PASSED"
    } else {
        "✗ FAILED"
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::HIDDEN_PLACEHOLDER;

    fn report() -> EvaluationReport {
        let test_cases = vec![
            TestCaseResult {
                test_case_index: 0,
                passed: true,
                input: String::new(),
                expected_output: "5".into(),
                actual_output: "5".into(),
                message: "Output matches exactly".into(),
                execution_time_ms: 12,
                is_hidden: false,
            },
            TestCaseResult {
                test_case_index: 1,
                passed: false,
                input: HIDDEN_PLACEHOLDER.into(),
                expected_output: HIDDEN_PLACEHOLDER.into(),
                actual_output: "4".into(),
                message: "Expected: \"6\"\nGot: \"4\"".into(),
                execution_time_ms: 10,
                is_hidden: true,
            },
        ];
        let structural = vec![ConstraintResult {
            constraint: "Loop".into(),
            constraint_type: ConstraintType::Required,
            count: 1,
            passed: true,
            message: "Found 1 Loop(s) (required: 1)".into(),
        }];

        EvaluationReport {
            success: true,
            language: Language::Cpp,
            executed_at: Utc::now(),
            test_case_tally: Tally::from_outcomes(test_cases.iter().map(|t| t.passed)),
            test_cases,
            structural_tally: Tally::from_outcomes(structural.iter().map(|s| s.passed)),
            structural,
            final_score: 6.5,
            max_score: 10.0,
            output: "5".into(),
            error: None,
        }
    }

    #[test]
    fn test_terminal_report() {
        let text = report().terminal();

        assert!(text.starts_with(HEAVY_RULE));
        assert!(text.contains("📤 OUTPUT:"));
        assert!(!text.contains("❌ ERROR:"));
        assert!(text.contains("✅ Test Case 1: ✓ PASSED\n   Input: (empty)\n   Expected: 5\n   Got: 5"));
        assert!(text.contains("❌ Test Case 2: ✗ FAILED\n   [Hidden Test Case]"));
        assert!(text.contains("Summary: 1/2 passed"));
        assert!(text.contains("✅ Loop (Required): ✓ PASSED"));
        assert!(text.contains("   6.5 / 10"));
        assert!(text.contains("   • Test Cases (70%): 3.5/7.0"));
        assert!(text.contains("   • Structural (30%): 3.0/3.0"));
        assert!(text.ends_with(HEAVY_RULE));
    }

    #[test]
    fn test_response_shape() {
        let json = serde_json::to_value(report().to_response()).unwrap();

        assert_eq!(json["success"], true);
        assert_eq!(json["score"], 6.5);
        assert_eq!(json["maxScore"], 10.0);
        assert_eq!(json["error"], serde_json::Value::Null);
        assert_eq!(json["testCases"]["total"], 2);
        assert_eq!(json["testCases"]["failed"], 1);
        assert_eq!(json["testCases"]["details"][1]["hidden"], true);
        assert_eq!(json["testCases"]["details"][1]["expected"], "[Hidden]");
        assert_eq!(json["testCases"]["details"][0]["executionTime"], 12);
        assert_eq!(json["structural"]["details"][0]["type"], "Required");
        assert!(json["terminal"].as_str().unwrap().contains("FINAL SCORE"));
    }
}
