//! Extract command: run the harvester over a saved snapshot.

use std::path::Path;

use anyhow::Context;
use chrono::Local;
use console::style;

use crate::cli::icons::{error, warn};
use crate::harvest::{harvest, HarvestReport};
use crate::models::{Layout, ListingDetails};
use crate::render::PageSnapshot;
use crate::utils::{format_duration, truncate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

pub async fn cmd_extract(file: &Path, layout: Layout, format: OutputFormat) -> anyhow::Result<()> {
    let json = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let snapshot = PageSnapshot::from_json(&json)
        .with_context(|| format!("{} is not a snapshot file", file.display()))?;

    let report = harvest(&snapshot.containers, layout, Local::now().date_naive());

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report.records)?);
        }
        OutputFormat::Table => print_table(&snapshot, &report),
    }

    Ok(())
}

fn print_table(snapshot: &PageSnapshot, report: &HarvestReport) {
    println!(
        "{} {} ({} containers, captured {})",
        style("Snapshot").bold(),
        snapshot.url,
        snapshot.containers.len(),
        snapshot.captured_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!();
    println!(
        "{:<10} {:<40} {:>12} {:<14} {}",
        style("LOT").bold(),
        style("TITLE").bold(),
        style("PRICE").bold(),
        style("DISTANCE").bold(),
        style("AUCTION").bold()
    );

    for record in &report.records {
        let auction = match &record.details {
            ListingDetails::Attribute { .. } => String::new(),
            ListingDetails::Positional {
                end_date,
                time_left_seconds,
                bid_count,
                ..
            } => format!(
                "ends {} ({} left), {} bids",
                end_date.format("%b %d %H:%M"),
                format_duration(*time_left_seconds),
                bid_count
            ),
        };
        println!(
            "{:<10} {:<40} {:>12} {:<14} {}",
            record.lot,
            truncate(&record.title, 40),
            record.price.to_string(),
            record.distance_display(),
            style(auction).dim()
        );
    }

    if !report.failures.is_empty() {
        println!();
        println!("{} {} failed:", warn(), report.failures.len());
        for failure in &report.failures {
            println!(
                "  {} #{} {}: {}",
                error(),
                failure.index,
                truncate(&failure.context, 40),
                failure.error
            );
        }
    }

    println!();
    println!(
        "{} of {} listings extracted",
        style(report.records.len()).green(),
        report.found()
    );
}
