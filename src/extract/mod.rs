//! Listing extraction.
//!
//! Each page layout lives in its own module behind [`extract`], so a site
//! redesign means adding a layout rather than touching the harvester or loop.

mod attribute;
pub mod normalize;
mod positional;

use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{Layout, ListingRecord};
use crate::render::ListingContainer;

pub use normalize::NormalizeError;

/// Per-record extraction failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("no block starting with \"Lot #\" found")]
    LotNumberNotFound,
    #[error("expected element not found: {0}")]
    ElementNotFound(&'static str),
    #[error("unexpected layout: {0}")]
    UnexpectedLayout(String),
    #[error("invalid {field}: {source}")]
    Field {
        field: &'static str,
        #[source]
        source: NormalizeError,
    },
}

impl ExtractError {
    pub(crate) fn field(field: &'static str) -> impl FnOnce(NormalizeError) -> Self {
        move |source| ExtractError::Field { field, source }
    }
}

/// Literal prefix of the lot-number line.
pub(crate) const LOT_PREFIX: &str = "Lot #";

/// Extract one listing from a container using the given layout.
///
/// `today` anchors year inference for dates rendered without a year.
pub fn extract(
    layout: Layout,
    container: &ListingContainer,
    today: NaiveDate,
) -> Result<ListingRecord, ExtractError> {
    match layout {
        Layout::Attribute => attribute::extract(container),
        Layout::Positional => positional::extract(container, today),
    }
}

/// Parse the lot number out of a "Lot #12345" line.
pub(crate) fn parse_lot_line(line: &str) -> Result<String, ExtractError> {
    let lot = line
        .trim()
        .strip_prefix(LOT_PREFIX)
        .ok_or(ExtractError::LotNumberNotFound)?
        .trim();
    if lot.is_empty() {
        return Err(ExtractError::UnexpectedLayout(format!(
            "empty lot number in {:?}",
            line
        )));
    }
    Ok(lot.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lot_line() {
        assert_eq!(parse_lot_line("Lot #12345").unwrap(), "12345");
        assert_eq!(parse_lot_line("  Lot # 987 ").unwrap(), "987");
        assert_eq!(
            parse_lot_line("Lot 12345"),
            Err(ExtractError::LotNumberNotFound)
        );
        assert!(matches!(
            parse_lot_line("Lot #"),
            Err(ExtractError::UnexpectedLayout(_))
        ));
    }

    #[test]
    fn test_field_error_message() {
        let err = ExtractError::field("price")(NormalizeError::MalformedAmount("abc".into()));
        assert_eq!(err.to_string(), "invalid price: malformed amount \"abc\"");
    }
}
