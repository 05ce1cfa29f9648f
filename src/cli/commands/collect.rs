//! Collect command: the long-running polling loop.

use anyhow::Context;
use clap::Args;
use console::style;

use crate::cli::icons::{dim_arrow, success};
use crate::collector::{shutdown, Collector, CollectorSettings};
use crate::config::{Config, SinkKind};
use crate::models::Layout;
use crate::render::ChromeRenderSource;
use crate::sink::Sink;

/// Flags overriding the configured target, cadence and sink.
#[derive(Debug, Args)]
pub struct CollectArgs {
    /// Listing page URL
    #[arg(long)]
    pub url: Option<String>,
    /// Seconds between ticks
    #[arg(short, long)]
    pub interval: Option<u64>,
    /// Page layout: attribute or positional
    #[arg(long)]
    pub layout: Option<Layout>,
    /// Destination table
    #[arg(long)]
    pub table: Option<String>,
    /// Sink backend: clickhouse or sqlite
    #[arg(long)]
    pub sink: Option<SinkKind>,
    /// Show the browser window
    #[arg(long)]
    pub headed: bool,
    /// Run a single tick and exit
    #[arg(long)]
    pub once: bool,
}

impl CollectArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(ref url) = self.url {
            config.target.url = url.clone();
        }
        if let Some(interval) = self.interval {
            config.collector.interval_secs = interval;
        }
        if let Some(layout) = self.layout {
            config.target.layout = layout;
        }
        if let Some(ref table) = self.table {
            config.sink.table = table.clone();
        }
        if let Some(kind) = self.sink {
            config.sink.kind = kind;
        }
        if self.headed {
            config.browser.headless = false;
        }
    }
}

pub async fn cmd_collect(mut config: Config, args: CollectArgs) -> anyhow::Result<()> {
    args.apply(&mut config);
    config.validate()?;

    let sink = Sink::from_config(&config.sink).context("Failed to set up sink")?;
    let render = ChromeRenderSource::new(config.browser.clone(), &config.target.container_selector);

    let mut settings = CollectorSettings::from_config(&config);
    if args.once {
        settings.max_ticks = Some(1);
    }

    println!(
        "{} Watching {} ({} layout)",
        style("→").cyan(),
        config.target.url,
        config.target.layout
    );
    println!(
        "  {} Sink: {} table {}",
        dim_arrow(),
        sink.describe(),
        config.sink.table
    );
    println!(
        "  {} Every {}s, press Ctrl-C to stop",
        dim_arrow(),
        config.collector.interval_secs
    );

    let (trigger, stop) = shutdown::channel();
    let listener = shutdown::trigger_on_signal(trigger);

    let result = Collector::new(render, sink, settings, stop).run().await;
    listener.abort();
    let stats = result.context("Collector could not start")?;

    println!(
        "{} Stopped after {} ticks: {} persisted, {} extraction failures, {} render failures",
        success(),
        stats.ticks,
        stats.persisted,
        stats.extract_failures,
        stats.render_failures
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let args = CollectArgs {
            url: Some("https://example.com/motors".to_string()),
            interval: Some(90),
            layout: Some(Layout::Positional),
            table: Some("EA2".to_string()),
            sink: Some(SinkKind::Sqlite),
            headed: true,
            once: false,
        };
        let mut config = Config::default();
        args.apply(&mut config);

        assert_eq!(config.target.url, "https://example.com/motors");
        assert_eq!(config.collector.interval_secs, 90);
        assert_eq!(config.target.layout, Layout::Positional);
        assert_eq!(config.sink.table, "EA2");
        assert_eq!(config.sink.kind, SinkKind::Sqlite);
        assert!(!config.browser.headless);
    }

    #[test]
    fn test_no_flags_keep_config() {
        let args = CollectArgs {
            url: None,
            interval: None,
            layout: None,
            table: None,
            sink: None,
            headed: false,
            once: true,
        };
        let mut config = Config::default();
        args.apply(&mut config);
        assert_eq!(config.collector.interval_secs, 30);
        assert!(config.browser.headless);
    }
}
