//! Command-line interface for lotwatch.

mod commands;
pub mod icons;

pub use commands::{is_verbose, run};
