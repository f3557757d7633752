use coderunner_utils::UtilsError;
use thiserror::Error;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The result of a coderunner-core operation.
pub type CoderunnerResult<T> = Result<T, CoderunnerError>;

/// An error that occurred during a coderunner-core operation.
#[derive(pretty_error_debug::Debug, Error)]
pub enum CoderunnerError {
    /// The submission was rejected before dispatch.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The language tag does not name a supported language.
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// Every execution slot is busy and the wait queue is full.
    #[error("execution capacity exhausted: {running} running, {queued} queued (limit {max_queued})")]
    CapacityExhausted {
        /// Runs currently holding a slot.
        running: usize,
        /// Runs currently waiting for a slot.
        queued: usize,
        /// The configured wait queue bound.
        max_queued: usize,
    },

    /// The container engine failed to carry out a request.
    #[error("container runtime error: {0}")]
    ContainerRuntime(String),

    /// Building a sandbox image failed.
    #[error("failed to build image {image}: {reason}")]
    ImageBuild {
        /// The image reference being built.
        image: String,
        /// The engine's explanation.
        reason: String,
    },

    /// The configuration is unusable.
    #[error("configuration error: {0}")]
    Config(String),

    /// An I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// An error from the shared utilities.
    #[error(transparent)]
    Utils(#[from] UtilsError),
}

/// Reasons a submission is rejected before it reaches a container.
#[derive(pretty_error_debug::Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// No source was submitted.
    #[error("source code is empty")]
    MissingSource,

    /// The source exceeds the configured size.
    #[error("Code exceeds maximum size of {max} bytes")]
    SourceTooLarge {
        /// Submitted size in bytes.
        size: usize,
        /// Allowed size in bytes.
        max: usize,
    },

    /// The stdin exceeds the configured size.
    #[error("Input exceeds maximum size of {max} bytes")]
    StdinTooLarge {
        /// Submitted size in bytes.
        size: usize,
        /// Allowed size in bytes.
        max: usize,
    },

    /// A requested limit lies outside what the service allows.
    #[error("{name} must be between {min} and {max}, got {value}")]
    LimitOutOfRange {
        /// The limit name.
        name: &'static str,
        /// The requested value.
        value: String,
        /// The smallest accepted value.
        min: String,
        /// The largest accepted value.
        max: String,
    },

    /// A requested memory limit could not be parsed.
    #[error("invalid memory limit {0:?}")]
    InvalidMemory(String),

    /// Too many test cases were submitted.
    #[error("Too many test cases: {count} (maximum {max})")]
    TooManyTestCases {
        /// Submitted count.
        count: usize,
        /// Allowed count.
        max: usize,
    },

    /// A regex comparison pattern does not compile.
    #[error("Test case {index} has an invalid regex pattern: {reason}")]
    InvalidPattern {
        /// Zero-based index of the offending test case.
        index: usize,
        /// The compiler's explanation.
        reason: String,
    },
}
