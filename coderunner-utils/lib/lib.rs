//! `coderunner-utils` is a library containing general utilities for the coderunner project.

#![warn(missing_docs)]

mod error;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub mod defaults;
pub mod env;
pub mod size;
pub mod term;

pub use defaults::*;
pub use env::*;
pub use error::*;
pub use size::*;
pub use term::*;
