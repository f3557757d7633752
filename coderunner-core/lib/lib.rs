//! `coderunner-core` runs untrusted submissions in disposable, locked-down containers and grades
//! them.
//!
//! # Overview
//!
//! Every run gets its own container, started from a per-language image, as a non-root user, with
//! no network, capped memory, CPU and process count, and a wall-clock ceiling. The container and
//! the source workspace are removed after the run whatever the outcome.
//!
//! # Key Features
//!
//! - **Isolation**: one throwaway container per run, dropped capabilities, read-only source
//! - **Backpressure**: a bounded pool of execution slots with a bounded wait queue
//! - **Grading**: test cases with exact, whitespace-insensitive or regex comparison, and
//!   pattern-based structural constraints
//!
//! # Modules
//!
//! - [`config`] - Runner configuration and resource limits
//! - [`registry`] - Supported languages and their sandbox images
//! - [`runtime`] - The container engine abstraction and its Docker implementation
//! - [`execution`] - Validation, dispatch, isolated runs and cleanup
//! - [`evaluation`] - Test cases, structural analysis, scoring and reports

#![warn(missing_docs)]

mod error;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub mod config;
pub mod evaluation;
pub mod execution;
pub mod registry;
pub mod runtime;

pub use error::*;
