//! Page harvester: extract every listing container of one snapshot.
//!
//! A failing container is logged and skipped; it never aborts the batch.

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::extract::{self, ExtractError};
use crate::models::{Layout, ListingRecord};
use crate::render::ListingContainer;
use crate::utils::truncate;

/// A container that could not be turned into a listing.
#[derive(Debug, Clone)]
pub struct HarvestFailure {
    /// 1-based ordinal of the container on the page.
    pub index: usize,
    /// First rendered line of the container.
    pub context: String,
    pub error: ExtractError,
}

/// Result of harvesting one page.
#[derive(Debug, Clone, Default)]
pub struct HarvestReport {
    /// Extracted listings in DOM order.
    pub records: Vec<ListingRecord>,
    pub failures: Vec<HarvestFailure>,
}

impl HarvestReport {
    pub fn found(&self) -> usize {
        self.records.len() + self.failures.len()
    }
}

/// Run the extractor over every container, in order.
pub fn harvest(containers: &[ListingContainer], layout: Layout, today: NaiveDate) -> HarvestReport {
    info!("Found {} listings ({} layout)", containers.len(), layout);

    let mut report = HarvestReport::default();
    for container in containers {
        match extract::extract(layout, container, today) {
            Ok(record) => {
                info!(
                    index = container.index,
                    lot = %record.lot,
                    price = %record.price,
                    distance = %record.distance_display(),
                    "{}",
                    record.title
                );
                report.records.push(record);
            }
            Err(error) => {
                warn!(
                    "Error extracting listing {} ({}): {}",
                    container.index,
                    truncate(container.context(), 60),
                    error
                );
                report.failures.push(HarvestFailure {
                    index: container.index,
                    context: container.context().to_string(),
                    error,
                });
            }
        }
    }

    report
}
