//! Browser configuration.

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Settings for the Chrome session that renders the listing page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run without a visible window.
    pub headless: bool,
    /// Explicit Chrome/Chromium executable; auto-detected when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chrome_path: Option<PathBuf>,
    /// DevTools endpoint of an already running browser (e.g. `ws://localhost:9222`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,
    /// Proxy server passed to Chrome as `--proxy-server`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    /// Extra command-line arguments for a locally launched browser.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub chrome_args: Vec<String>,
    /// Navigation timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_path: None,
            remote_url: None,
            proxy: None,
            chrome_args: Vec::new(),
            timeout_secs: 30,
        }
    }
}

impl BrowserConfig {
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = env::var("CHROME_REMOTE_URL") {
            if !url.is_empty() {
                self.remote_url = Some(url);
            }
        }
        self
    }
}
