//! Positional-text layout.
//!
//! The container's rendered text is split into lines and read by fixed
//! index. Blank separator lines sit between the fields.

use chrono::NaiveDate;

use super::normalize::{
    normalize_amount, normalize_bid_count, normalize_duration, normalize_end_date,
};
use super::{parse_lot_line, ExtractError};
use crate::models::{ListingDetails, ListingRecord};
use crate::render::ListingContainer;

const TITLE_LINE: usize = 0;
const LOT_LINE: usize = 1;
const DISTANCE_LINE: usize = 2;
const END_DATE_LINE: usize = 4;
const COUNTDOWN_LINE: usize = 6;
const BIDS_LINE: usize = 8;
const PRICE_LINE: usize = 10;

pub(super) fn extract(
    container: &ListingContainer,
    today: NaiveDate,
) -> Result<ListingRecord, ExtractError> {
    let lines = container.lines();
    if lines.len() <= PRICE_LINE {
        return Err(ExtractError::UnexpectedLayout(format!(
            "expected at least {} lines, found {}",
            PRICE_LINE + 1,
            lines.len()
        )));
    }

    let title = lines[TITLE_LINE];
    if title.is_empty() {
        return Err(ExtractError::UnexpectedLayout("empty title line".to_string()));
    }
    let lot = parse_lot_line(lines[LOT_LINE])?;

    let end_date =
        normalize_end_date(lines[END_DATE_LINE], today).map_err(ExtractError::field("end_date"))?;
    let time_left_seconds =
        normalize_duration(lines[COUNTDOWN_LINE]).map_err(ExtractError::field("time_left"))?;
    let bid_count = normalize_bid_count(lines[BIDS_LINE]).map_err(ExtractError::field("bids"))?;
    let price = normalize_amount(lines[PRICE_LINE]).map_err(ExtractError::field("price"))?;

    Ok(ListingRecord {
        lot,
        title: title.to_string(),
        price,
        details: ListingDetails::Positional {
            mileage_text: lines[DISTANCE_LINE].to_string(),
            end_date,
            time_left_seconds,
            bid_count,
        },
    })
}
