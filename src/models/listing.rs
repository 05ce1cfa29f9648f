//! Listing models for auction observations.
//!
//! A listing is extracted fresh from every rendered container on every poll,
//! so the same lot seen twice yields two independent rows.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp format used for every datetime column.
pub const ROW_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Page layout a listing container was rendered with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    /// Fields anchored on sub-elements (heading, tagged price, `Lot #` block).
    #[default]
    Attribute,
    /// Fields read by fixed line index from the container's rendered text.
    Positional,
}

impl Layout {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Attribute => "attribute",
            Self::Positional => "positional",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "attribute" | "a" => Some(Self::Attribute),
            "positional" | "b" => Some(Self::Positional),
            _ => None,
        }
    }

    /// Sink column order for rows of this layout.
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Self::Attribute => &["lot", "title", "price", "distance", "unit", "time"],
            Self::Positional => &[
                "lot",
                "title",
                "price",
                "distance",
                "end_date",
                "time_left",
                "bids",
                "time",
            ],
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Layout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str(s).ok_or_else(|| {
            format!("Invalid layout '{}'. Valid options: attribute, positional", s)
        })
    }
}

/// Non-negative monetary amount with exactly two fractional digits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price {
    cents: u64,
}

impl Price {
    pub fn from_cents(cents: u64) -> Self {
        Self { cents }
    }

    pub fn cents(&self) -> u64 {
        self.cents
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.cents / 100, self.cents % 100)
    }
}

impl Serialize for Price {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Layout-specific part of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "layout", rename_all = "snake_case")]
pub enum ListingDetails {
    Attribute {
        distance: u16,
        unit: String,
    },
    Positional {
        /// Raw distance text as rendered (e.g. "1,200 km").
        mileage_text: String,
        /// Auction end in site-local wall-clock time.
        end_date: NaiveDateTime,
        time_left_seconds: u64,
        bid_count: u32,
    },
}

/// One extracted auction listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingRecord {
    pub lot: String,
    pub title: String,
    pub price: Price,
    #[serde(flatten)]
    pub details: ListingDetails,
}

impl ListingRecord {
    pub fn layout(&self) -> Layout {
        match self.details {
            ListingDetails::Attribute { .. } => Layout::Attribute,
            ListingDetails::Positional { .. } => Layout::Positional,
        }
    }

    /// Short human-readable distance, used in logs and tables.
    pub fn distance_display(&self) -> String {
        match &self.details {
            ListingDetails::Attribute { distance, unit } => format!("{} {}", distance, unit),
            ListingDetails::Positional { mileage_text, .. } => mileage_text.clone(),
        }
    }
}

/// A listing handed to the sink, stamped with its observation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Observation {
    #[serde(flatten)]
    pub record: ListingRecord,
    pub observed_at: DateTime<Utc>,
}

impl Observation {
    pub fn new(record: ListingRecord, observed_at: DateTime<Utc>) -> Self {
        Self {
            record,
            observed_at,
        }
    }

    pub fn columns(&self) -> &'static [&'static str] {
        self.record.layout().columns()
    }

    /// Row as a JSON object keyed by column name.
    pub fn to_json_row(&self) -> serde_json::Value {
        let r = &self.record;
        let time = self.observed_at.format(ROW_TIME_FORMAT).to_string();
        match &r.details {
            ListingDetails::Attribute { distance, unit } => serde_json::json!({
                "lot": r.lot,
                "title": r.title,
                "price": r.price.to_string(),
                "distance": distance,
                "unit": unit,
                "time": time,
            }),
            ListingDetails::Positional {
                mileage_text,
                end_date,
                time_left_seconds,
                bid_count,
            } => serde_json::json!({
                "lot": r.lot,
                "title": r.title,
                "price": r.price.to_string(),
                "distance": mileage_text,
                "end_date": end_date.format(ROW_TIME_FORMAT).to_string(),
                "time_left": time_left_seconds,
                "bids": bid_count,
                "time": time,
            }),
        }
    }
}
