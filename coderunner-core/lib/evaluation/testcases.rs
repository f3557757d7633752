use std::future::Future;

use serde::{Deserialize, Deserializer, Serialize};

use crate::{execution::ExecutionResult, CoderunnerResult};

use super::{evaluate_output, ComparisonMode};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// What hidden test cases show instead of their input and expected output.
pub const HIDDEN_PLACEHOLDER: &str = "[Hidden]";

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// One input/expected-output pair a submission is checked against.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TestCase {
    /// Fed to the program's stdin.
    #[serde(deserialize_with = "null_as_default")]
    pub input: String,

    /// The output, or pattern, the program must produce.
    #[serde(deserialize_with = "null_as_default")]
    pub expected_output: String,

    /// How the output is compared.
    #[serde(deserialize_with = "null_as_default")]
    pub comparison_mode: ComparisonMode,

    /// Whether input and expected output are withheld from the report.
    #[serde(deserialize_with = "null_as_default")]
    pub is_hidden: bool,
}

/// The outcome of one test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseResult {
    /// Zero-based position of the test case.
    pub test_case_index: usize,

    /// Whether the program's output was accepted.
    pub passed: bool,

    /// The input, or the hidden placeholder.
    pub input: String,

    /// The expected output, or the hidden placeholder.
    pub expected_output: String,

    /// What the program printed.
    pub actual_output: String,

    /// Why the test passed or failed.
    pub message: String,

    /// How long the run took.
    #[serde(rename = "executionTime")]
    pub execution_time_ms: u64,

    /// Whether the test case is hidden.
    pub is_hidden: bool,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl TestCase {
    /// A visible test case compared exactly.
    pub fn new(input: impl Into<String>, expected_output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            expected_output: expected_output.into(),
            ..Default::default()
        }
    }

    /// Sets the comparison mode.
    pub fn with_mode(mut self, mode: ComparisonMode) -> Self {
        self.comparison_mode = mode;
        self
    }

    /// Marks the test case hidden.
    pub fn hidden(mut self) -> Self {
        self.is_hidden = true;
        self
    }

    fn result(&self, index: usize) -> TestCaseResult {
        let (input, expected_output) = if self.is_hidden {
            (HIDDEN_PLACEHOLDER.to_string(), HIDDEN_PLACEHOLDER.to_string())
        } else {
            (self.input.clone(), self.expected_output.clone())
        };

        TestCaseResult {
            test_case_index: index,
            passed: false,
            input,
            expected_output,
            actual_output: String::new(),
            message: String::new(),
            execution_time_ms: 0,
            is_hidden: self.is_hidden,
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Runs every test case in order through `execute`, which runs the program with the given stdin.
///
/// A test case whose run fails to execute, or exits with an error, fails without comparing
/// output. Execution failures never abort the remaining test cases.
pub async fn evaluate_test_cases<F, Fut>(
    test_cases: &[TestCase],
    mut execute: F,
) -> Vec<TestCaseResult>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = CoderunnerResult<ExecutionResult>>,
{
    let mut results = Vec::with_capacity(test_cases.len());

    for (index, test_case) in test_cases.iter().enumerate() {
        let mut result = test_case.result(index);

        match execute(test_case.input.clone()).await {
            Ok(execution) if !execution.is_success() => {
                result.actual_output = execution.visible_output().to_string();
                result.message = execution
                    .error
                    .clone()
                    .unwrap_or_else(|| "Runtime error".to_string());
                result.execution_time_ms = execution.execution_time_ms;
            }
            Ok(execution) => {
                let verdict = evaluate_output(
                    &execution.stdout,
                    &test_case.expected_output,
                    &test_case.comparison_mode,
                );
                result.passed = verdict.passed;
                result.actual_output = execution.stdout;
                result.message = verdict.message;
                result.execution_time_ms = execution.execution_time_ms;
            }
            Err(e) => {
                tracing::warn!("test case {} could not be executed: {}", index, e);
                result.message = format!("Test execution failed: {}", e);
            }
        }

        results.push(result);
    }

    results
}

/// Treats an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{evaluation::Tally, execution::ExecutionStatus, CoderunnerError};

    fn ok(stdout: &str) -> ExecutionResult {
        ExecutionResult {
            stdout: stdout.to_string(),
            stderr: String::new(),
            exit_code: 0,
            execution_time_ms: 7,
            timed_out: false,
            truncated: false,
            status: ExecutionStatus::Success,
            error: None,
        }
    }

    #[tokio::test]
    async fn test_cases_are_run_in_order_with_their_input() {
        let cases = vec![
            TestCase::new("2 3", "5"),
            TestCase::new("1 1", "3"),
            TestCase::new("4 4", "8").hidden(),
        ];

        let results = evaluate_test_cases(&cases, |input| async move {
            let sum: i32 = input.split_whitespace().map(|n| n.parse::<i32>().unwrap()).sum();
            Ok(ok(&sum.to_string()))
        })
        .await;

        assert_eq!(results.len(), 3);
        assert!(results[0].passed);
        assert_eq!(results[0].input, "2 3");
        assert_eq!(results[0].execution_time_ms, 7);

        assert!(!results[1].passed);
        assert_eq!(results[1].actual_output, "2");
        assert_eq!(results[1].message, "Expected: \"3\"\nGot: \"2\"");

        assert!(results[2].passed);
        assert_eq!(results[2].test_case_index, 2);
        assert_eq!(results[2].input, HIDDEN_PLACEHOLDER);
        assert_eq!(results[2].expected_output, HIDDEN_PLACEHOLDER);

        let tally = Tally::from_outcomes(results.iter().map(|r| r.passed));
        assert_eq!((tally.passed, tally.failed, tally.total), (2, 1, 3));
        assert!((tally.score - 2.0 / 3.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_failed_runs_fail_their_case() {
        let cases = vec![TestCase::new("", "ok"), TestCase::new("", "ok")];
        let mut call = 0;

        let results = evaluate_test_cases(&cases, |_| {
            call += 1;
            let outcome = if call == 1 {
                Ok(ExecutionResult {
                    stderr: "Traceback: ZeroDivisionError".to_string(),
                    exit_code: 1,
                    status: ExecutionStatus::RuntimeError,
                    ..ok("")
                })
            } else {
                Err(CoderunnerError::ContainerRuntime("engine gone".to_string()))
            };
            async move { outcome }
        })
        .await;

        assert_eq!(results[0].actual_output, "Traceback: ZeroDivisionError");
        assert_eq!(results[0].message, "Runtime error");
        assert!(!results[0].passed);

        assert_eq!(
            results[1].message,
            "Test execution failed: container runtime error: engine gone"
        );
        assert_eq!(results[1].actual_output, "");
    }

    #[test]
    fn test_test_case_defaults() {
        let case: TestCase = serde_json::from_str(r#"{"expectedOutput": "5"}"#).unwrap();
        assert_eq!(case.input, "");
        assert_eq!(case.comparison_mode, ComparisonMode::Exact);
        assert!(!case.is_hidden);
    }

    #[test]
    fn test_test_case_null_fields_fall_back_to_defaults() {
        let case: TestCase = serde_json::from_str(
            r#"{"input": null, "expectedOutput": null, "comparisonMode": null, "isHidden": null}"#,
        )
        .unwrap();
        assert_eq!(case, TestCase::default());

        let case: TestCase =
            serde_json::from_str(r#"{"input": null, "expectedOutput": "ok"}"#).unwrap();
        assert_eq!(case.input, "");
        assert_eq!(case.expected_output, "ok");
    }
}
