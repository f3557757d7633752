//! Terminal styling helpers for the coderunner binaries.

use std::sync::LazyLock;

use console::{style, StyledObject};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// A green checkmark.
pub static CHECKMARK: LazyLock<String> = LazyLock::new(|| format!("{}", style("✓").green()));

/// A red cross.
pub static CROSSMARK: LazyLock<String> = LazyLock::new(|| format!("{}", style("✗").red()));

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Highlights a value in yellow, the way the binaries print addresses and names.
pub fn highlight<D>(value: D) -> StyledObject<D> {
    style(value).yellow()
}
