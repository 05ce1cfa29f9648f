//! Snapshot command: render the page once and dump its listing containers.

use std::path::Path;

use anyhow::Context;

use crate::cli::icons::success;
use crate::config::Config;
use crate::render::{ChromeRenderSource, ListingContainer, PageSnapshot, RenderError, RenderSource};

async fn capture(
    render: &mut ChromeRenderSource,
    config: &Config,
) -> Result<Vec<ListingContainer>, RenderError> {
    render.navigate(&config.target.url).await?;
    render
        .wait_for_ready(config.collector.ready_timeout())
        .await?;
    render.trigger_lazy_load().await?;
    render.settle(config.collector.settle()).await;
    render.snapshot().await
}

pub async fn cmd_snapshot(config: &Config, output: Option<&Path>) -> anyhow::Result<()> {
    config.validate()?;

    let mut render =
        ChromeRenderSource::new(config.browser.clone(), &config.target.container_selector);
    let result = capture(&mut render, config).await;
    render.close().await;
    let containers = result.context("Failed to render listing page")?;

    let snapshot = PageSnapshot::new(&config.target.url, containers);
    let json = snapshot.to_json()?;

    match output {
        Some(path) => {
            tokio::fs::write(path, json)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!(
                "{} Saved {} containers to {}",
                success(),
                snapshot.containers.len(),
                path.display()
            );
        }
        None => println!("{}", json),
    }

    Ok(())
}
