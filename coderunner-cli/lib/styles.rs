use clap::builder::styling::{AnsiColor, Effects, Styles};
use console::{style, StyledObject};

//--------------------------------------------------------------------------------------------------
// Traits
//--------------------------------------------------------------------------------------------------

/// Terminal styles for text the binaries print, matching the help output.
pub trait AnsiStyles {
    /// Styles a command, flag or value the user can type.
    fn literal(&self) -> StyledObject<&Self>;

    /// Styles a placeholder for a user-supplied value.
    fn placeholder(&self) -> StyledObject<&Self>;

    /// Styles a section header.
    fn header(&self) -> StyledObject<&Self>;

    /// Styles an error.
    fn error(&self) -> StyledObject<&Self>;
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl<T: ?Sized> AnsiStyles for T {
    fn literal(&self) -> StyledObject<&Self> {
        style(self).bold()
    }

    fn placeholder(&self) -> StyledObject<&Self> {
        style(self).cyan()
    }

    fn header(&self) -> StyledObject<&Self> {
        style(self).yellow().bold().underlined()
    }

    fn error(&self) -> StyledObject<&Self> {
        style(self).red().bold()
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// The help output styles of every binary.
pub fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD | Effects::UNDERLINE)
        .usage(AnsiColor::Yellow.on_default() | Effects::BOLD | Effects::UNDERLINE)
        .literal(AnsiColor::BrightWhite.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Cyan.on_default())
        .error(AnsiColor::Red.on_default() | Effects::BOLD)
        .valid(AnsiColor::Green.on_default())
        .invalid(AnsiColor::Red.on_default())
}
