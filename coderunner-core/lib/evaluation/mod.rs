//! Grading of submissions.
//!
//! An evaluation combines two kinds of checks:
//! - test cases: the program is run once per case with the case's input, and its output is
//!   compared under the case's [`ComparisonMode`]
//! - structural constraints: the source is scanned for required or forbidden constructs
//!
//! The [`Evaluator`] runs both and folds them into a score out of the task's marks, weighting
//! test cases 70% and structure 30% when both are present.

mod comparison;
mod report;
mod scoring;
mod service;
mod structural;
mod testcases;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use comparison::*;
pub use report::*;
pub use scoring::*;
pub use service::*;
pub use structural::*;
pub use testcases::*;
