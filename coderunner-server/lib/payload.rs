//! Request and response payload definitions for the coderunner server.
//!
//! Request bodies use camelCase field names. `code` and `language` are optional at the type level
//! so that a body missing them is answered with a precise message instead of a generic decoding
//! error.

use coderunner_core::{
    config::LimitsRequest,
    evaluation::{StructuralConstraint, TestCase},
    execution::ExecutionResult,
    registry::LanguageInfo,
};
use serde::{Deserialize, Serialize};

//--------------------------------------------------------------------------------------------------
// Types: Requests
//--------------------------------------------------------------------------------------------------

/// Request payload for a full evaluation
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExecuteRequest {
    /// Program source
    pub code: Option<String>,

    /// Language tag: `python`, `java` or `cpp`
    pub language: Option<String>,

    /// Test cases, run in order
    pub test_cases: Vec<TestCase>,

    /// Structural constraints
    pub structural_constraints: Vec<StructuralConstraint>,

    /// What the score is out of
    pub task_marks: Option<f64>,
}

/// Request payload for a single run without grading
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QuickExecuteRequest {
    /// Program source
    pub code: Option<String>,

    /// Language tag: `python`, `java` or `cpp`
    pub language: Option<String>,

    /// Data fed to stdin
    pub input: Option<String>,

    /// Limits tighter than the service defaults
    pub limits: Option<LimitsRequest>,
}

//--------------------------------------------------------------------------------------------------
// Types: Responses
//--------------------------------------------------------------------------------------------------

/// Response payload for the health check
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `healthy`
    pub status: String,

    /// Service name
    pub service: String,

    /// Current time, RFC 3339
    pub timestamp: String,
}

/// Response payload for a single run
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickExecuteResponse {
    /// Whether the program exited with 0 and nothing went wrong
    pub success: bool,

    /// Program stdout
    pub output: String,

    /// Program stderr, or the service's explanation when there is none
    pub error: Option<String>,

    /// Exit status, `-1` when the program did not exit on its own
    pub exit_code: i32,

    /// Run time in milliseconds
    pub execution_time: u64,

    /// Whether the wall-clock ceiling was hit
    pub timed_out: bool,

    /// Whether output was cut at the capture bound
    pub truncated: bool,
}

/// Response payload listing the supported languages
#[derive(Debug, Serialize)]
pub struct LanguagesResponse {
    /// One entry per language
    pub languages: Vec<LanguageInfo>,
}

/// Response payload for any failed request
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always false
    pub success: bool,

    /// What went wrong
    pub error: String,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl ErrorResponse {
    /// Create an error response
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl From<ExecutionResult> for QuickExecuteResponse {
    fn from(result: ExecutionResult) -> Self {
        let success = result.is_success();
        let error = if result.stderr.is_empty() {
            result.error
        } else {
            Some(result.stderr)
        };

        Self {
            success,
            output: result.stdout,
            error,
            exit_code: result.exit_code,
            execution_time: result.execution_time_ms,
            timed_out: result.timed_out,
            truncated: result.truncated,
        }
    }
}
