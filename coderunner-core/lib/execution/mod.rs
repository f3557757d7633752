//! The sandboxed execution pipeline.
//!
//! A submission flows through these stages:
//! - [`validate_request`] rejects malformed or oversized submissions and resolves the limits
//! - the [`Dispatcher`] admits it into a bounded pool of execution slots, or turns it away
//! - the [`IsolatedRunner`] writes the source into a [`Workspace`] and runs it in a disposable
//!   container
//! - the [`collector`] turns the raw container output into an [`ExecutionResult`] and removes the
//!   container and workspace

pub mod collector;
mod dispatcher;
mod request;
mod runner;
mod validator;
mod workspace;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use dispatcher::*;
pub use request::*;
pub use runner::*;
pub use validator::*;
pub use workspace::*;
