//! Configuration display command.

use console::style;

use crate::config::Config;

/// Print the effective configuration (file + environment) as TOML, secrets masked.
pub fn cmd_config_show(config: &Config) -> anyhow::Result<()> {
    let source = config
        .source_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults".to_string());
    eprintln!("{} {}", style("# source:").dim(), source);

    print!("{}", config.redacted().to_toml()?);
    Ok(())
}
