//! `coderunner-cli` holds the argument definitions, errors and styling shared by the `cr` and
//! `crserver` binaries.

#![warn(missing_docs)]

mod args;
mod error;
mod styles;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use args::*;
pub use error::*;
pub use styles::*;
