use thiserror::Error;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The result of a coderunner-utils operation.
pub type UtilsResult<T> = Result<T, UtilsError>;

/// An error that occurred in one of the shared utilities.
#[derive(pretty_error_debug::Debug, Error)]
pub enum UtilsError {
    /// An environment variable is set but its value cannot be used.
    #[error("invalid value {value:?} for environment variable {name}: {reason}")]
    InvalidEnvVar {
        /// The variable name.
        name: String,
        /// The offending value.
        value: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// A size string such as `256m` could not be parsed.
    #[error("invalid size {0:?}: expected digits with an optional k, m or g suffix")]
    InvalidSize(String),
}
