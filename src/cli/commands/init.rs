//! Initialize command.

use anyhow::Context;

use crate::cli::icons::success;
use crate::config::Config;
use crate::sink::{ListingSink, Sink};

/// Create the configured table for the configured layout.
pub async fn cmd_init(config: &Config) -> anyhow::Result<()> {
    config.validate()?;

    let mut sink = Sink::from_config(&config.sink)?;
    sink.ensure_table(&config.sink.table, config.target.layout)
        .await
        .with_context(|| format!("Failed to create table {}", config.sink.table))?;

    println!(
        "{} Table {} ready for {} listings in {}",
        success(),
        config.sink.table,
        config.target.layout,
        sink.describe()
    );
    Ok(())
}
