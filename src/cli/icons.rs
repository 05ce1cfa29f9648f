//! Styled markers for CLI output.

use console::{style, StyledObject};

/// Green check mark.
pub fn success() -> StyledObject<&'static str> {
    style("✓").green()
}

/// Yellow exclamation mark.
pub fn warn() -> StyledObject<&'static str> {
    style("!").yellow()
}

/// Red cross.
pub fn error() -> StyledObject<&'static str> {
    style("✗").red()
}

pub fn dim_arrow() -> StyledObject<&'static str> {
    style("→").dim()
}
