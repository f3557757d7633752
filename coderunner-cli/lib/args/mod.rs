mod cr;
mod crserver;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use cr::*;
pub use crserver::*;
