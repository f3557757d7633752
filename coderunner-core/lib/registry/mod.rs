//! Sandbox image registry.
//!
//! Maps a language tag to the image its submissions run in, knows how a submission is placed
//! in that image, and builds the shipped images when they are missing.

mod build;
mod image;
mod language;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use build::*;
pub use image::*;
pub use language::*;
