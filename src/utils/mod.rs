//! Shared utility functions.
//!
//! - `html`: rendered-text approximation for parsed markup
//! - `format`: short display helpers for CLI output

mod format;
mod html;

pub use format::{format_duration, truncate};
pub use html::rendered_text;
