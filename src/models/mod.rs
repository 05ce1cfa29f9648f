//! Data models for lotwatch.

mod listing;

pub use listing::{
    Layout, ListingDetails, ListingRecord, Observation, Price, ROW_TIME_FORMAT,
};
