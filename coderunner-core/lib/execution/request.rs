use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::{config::LimitsRequest, registry::Language};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A single program run: source, language, stdin and optional tighter limits.
#[derive(Debug, Clone, PartialEq, TypedBuilder)]
pub struct ExecutionRequest {
    /// The language the source is written in.
    pub language: Language,

    /// The program source.
    #[builder(setter(into))]
    pub source: String,

    /// Data fed to the program's stdin.
    #[builder(default, setter(into))]
    pub stdin: String,

    /// Limits tighter than the configured ones.
    #[builder(default, setter(strip_option))]
    pub limits: Option<LimitsRequest>,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// The program exited with status 0.
    Success,
    /// The program (or its compiler) exited with a non-zero status.
    RuntimeError,
    /// The wall-clock ceiling was hit.
    TimedOut,
    /// The program was killed for exceeding its memory ceiling.
    MemoryLimitExceeded,
    /// The service failed to run the program at all.
    InternalError,
}

/// The collected outcome of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    /// Trimmed stdout.
    pub stdout: String,

    /// Trimmed stderr.
    pub stderr: String,

    /// Exit status; `-1` when the program did not exit on its own.
    pub exit_code: i32,

    /// Wall-clock time from container launch to exit.
    pub execution_time_ms: u64,

    /// Whether the wall-clock ceiling was hit.
    pub timed_out: bool,

    /// Whether output was cut at the capture bound.
    pub truncated: bool,

    /// How the run ended.
    pub status: ExecutionStatus,

    /// A service-side explanation when the run did not end normally.
    pub error: Option<String>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl ExecutionResult {
    /// A run that never produced output because the service failed.
    pub fn failed(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            stdout: String::new(),
            stderr: message.clone(),
            exit_code: -1,
            execution_time_ms: 0,
            timed_out: false,
            truncated: false,
            status: ExecutionStatus::InternalError,
            error: Some(message),
        }
    }

    /// Whether the program exited with 0 and the service reported no problem.
    pub fn is_success(&self) -> bool {
        self.exit_code == 0 && self.error.is_none()
    }

    /// Stdout, or stderr when stdout is empty.
    pub fn visible_output(&self) -> &str {
        if self.stdout.is_empty() {
            &self.stderr
        } else {
            &self.stdout
        }
    }
}
