use std::path::PathBuf;

use coderunner_core::CoderunnerError;
use coderunner_server::ServerError;
use coderunner_utils::UtilsError;
use thiserror::Error;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The result of a coderunner-cli operation.
pub type CoderunnerCliResult<T> = Result<T, CoderunnerCliError>;

/// An error that occurred in one of the coderunner binaries.
#[derive(pretty_error_debug::Debug, Error)]
pub enum CoderunnerCliError {
    /// An I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// An error from the execution core.
    #[error(transparent)]
    Core(#[from] CoderunnerError),

    /// An error from the HTTP server.
    #[error(transparent)]
    Server(#[from] ServerError),

    /// An error from the shared utilities.
    #[error(transparent)]
    Utils(#[from] UtilsError),

    /// The language of a source file could not be determined.
    #[error("cannot infer the language of {0}; pass --language")]
    UnknownLanguage(PathBuf),
}
