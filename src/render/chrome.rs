//! Chrome render source.
//!
//! Uses chromiumoxide (CDP) to drive a headless Chrome/Chromium, either
//! launched locally or reached over a remote DevTools endpoint.

#[cfg(feature = "browser")]
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
#[cfg(feature = "browser")]
use tracing::{debug, info, warn};

#[cfg(feature = "browser")]
use chromiumoxide::browser::BrowserConfig as LaunchConfig;
#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
#[cfg(feature = "browser")]
use chromiumoxide::{Browser, Page};
#[cfg(feature = "browser")]
use futures::StreamExt;

use super::{ListingContainer, RenderError, RenderSource};
use crate::config::BrowserConfig;

/// JavaScript resolving once the document has parsed.
#[cfg(feature = "browser")]
const WAIT_FOR_READY_SCRIPT: &str = r#"
    new Promise((resolve) => {
        if (document.readyState === 'complete' || document.readyState === 'interactive') {
            resolve(document.readyState);
        } else {
            document.addEventListener('DOMContentLoaded', () => resolve(document.readyState));
        }
    })
"#;

#[cfg(feature = "browser")]
const SCROLL_TO_BOTTOM_SCRIPT: &str = "window.scrollTo(0, document.body.scrollHeight);";

/// Chrome render source bound to one page.
#[cfg(feature = "browser")]
pub struct ChromeRenderSource {
    config: BrowserConfig,
    container_selector: String,
    browser: Option<Browser>,
    page: Option<Page>,
    handler: Option<tokio::task::JoinHandle<()>>,
    /// Whether we own the browser process (launched rather than connected).
    owns_browser: bool,
}

#[cfg(feature = "browser")]
impl ChromeRenderSource {
    /// Common Chrome executable paths to check.
    const CHROME_PATHS: &'static [&'static str] = &[
        // Linux
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        // macOS
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        // Common install locations
        "/opt/google/chrome/google-chrome",
    ];

    pub fn new(config: BrowserConfig, container_selector: impl Into<String>) -> Self {
        Self {
            config,
            container_selector: container_selector.into(),
            browser: None,
            page: None,
            handler: None,
            owns_browser: false,
        }
    }

    /// Find the Chrome executable: configured path, well-known paths, then PATH.
    fn find_chrome(&self) -> Result<PathBuf, RenderError> {
        if let Some(ref path) = self.config.chrome_path {
            return Ok(path.clone());
        }

        for path in Self::CHROME_PATHS {
            let p = std::path::Path::new(path);
            if p.exists() {
                info!("Found Chrome at: {}", path);
                return Ok(p.to_path_buf());
            }
        }

        for cmd in [
            "google-chrome",
            "google-chrome-stable",
            "chromium",
            "chromium-browser",
        ] {
            if let Ok(path) = which::which(cmd) {
                info!("Found Chrome in PATH: {}", path.display());
                return Ok(path);
            }
        }

        Err(RenderError::Browser(
            "Chrome/Chromium not found. Install it or set browser.chrome_path".to_string(),
        ))
    }

    /// Launch or connect to the browser and open the session page.
    async fn ensure_page(&mut self) -> Result<&Page, RenderError> {
        if self.page.is_none() {
            let (browser, mut handler) = match self.config.remote_url.clone() {
                Some(remote_url) => self.connect_remote(&remote_url).await?,
                None => self.launch().await?,
            };

            self.handler = Some(tokio::spawn(async move {
                while let Some(h) = handler.next().await {
                    if h.is_err() {
                        break;
                    }
                }
            }));

            let page = browser
                .new_page("about:blank")
                .await
                .map_err(|e| RenderError::Browser(e.to_string()))?;
            self.browser = Some(browser);
            self.page = Some(page);
        }

        self.page.as_ref().ok_or(RenderError::Closed)
    }

    async fn launch(&mut self) -> Result<(Browser, chromiumoxide::Handler), RenderError> {
        info!("Launching browser (headless={})", self.config.headless);

        let chrome_path = self.find_chrome()?;
        let mut builder = LaunchConfig::builder().chrome_executable(chrome_path);

        // with_head means NOT headless
        if !self.config.headless {
            builder = builder.with_head();
        }

        if let Some(ref proxy) = self.config.proxy {
            builder = builder.arg(format!("--proxy-server={}", proxy));
        }

        builder = builder
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg("--no-first-run")
            .arg("--no-default-browser-check");

        for arg in &self.config.chrome_args {
            builder = builder.arg(arg);
        }

        let config = builder
            .build()
            .map_err(|e| RenderError::Browser(format!("Failed to build browser config: {}", e)))?;

        let launched = Browser::launch(config)
            .await
            .map_err(|e| RenderError::Browser(format!("Failed to launch browser: {}", e)))?;
        self.owns_browser = true;
        Ok(launched)
    }

    async fn connect_remote(
        &mut self,
        url: &str,
    ) -> Result<(Browser, chromiumoxide::Handler), RenderError> {
        info!(
            "Connecting to remote browser at {} (timeout: {}s)",
            url, self.config.timeout_secs
        );

        // Get WebSocket URL from the /json/version endpoint
        let http_url = url
            .replace("ws://", "http://")
            .replace("wss://", "https://");
        let version_url = format!("{}/json/version", http_url.trim_end_matches('/'));

        let resp: serde_json::Value = reqwest::Client::new()
            .get(&version_url)
            .send()
            .await
            .map_err(|e| RenderError::Browser(format!("Failed to reach remote browser: {}", e)))?
            .json()
            .await
            .map_err(|e| RenderError::Browser(format!("Bad browser version info: {}", e)))?;

        let ws_url = resp
            .get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .ok_or_else(|| RenderError::Browser("No webSocketDebuggerUrl in response".into()))?;

        debug!("Connecting to WebSocket: {}", ws_url);

        let handler_config = chromiumoxide::handler::HandlerConfig {
            request_timeout: Duration::from_secs(self.config.timeout_secs),
            ..Default::default()
        };

        let connected = Browser::connect_with_config(ws_url, handler_config)
            .await
            .map_err(|e| RenderError::Browser(format!("Failed to connect: {}", e)))?;
        self.owns_browser = false;
        Ok(connected)
    }

    fn page(&self) -> Result<&Page, RenderError> {
        self.page.as_ref().ok_or(RenderError::Closed)
    }

    fn snapshot_script(&self) -> String {
        let selector = serde_json::to_string(&self.container_selector)
            .unwrap_or_else(|_| "\"\"".to_string());
        format!(
            "Array.from(document.querySelectorAll({})).map((el, i) => ({{ index: i + 1, html: el.outerHTML, text: el.innerText }}))",
            selector
        )
    }
}

#[cfg(feature = "browser")]
#[async_trait]
impl RenderSource for ChromeRenderSource {
    async fn navigate(&mut self, url: &str) -> Result<(), RenderError> {
        let nav_timeout = Duration::from_secs(self.config.timeout_secs);
        let page = self.ensure_page().await?;

        info!("Navigating to {}", url);
        let nav_params = NavigateParams::builder()
            .url(url)
            .build()
            .map_err(|e| RenderError::Navigation(format!("Invalid URL: {}", e)))?;

        tokio::time::timeout(nav_timeout, page.execute(nav_params))
            .await
            .map_err(|_| {
                RenderError::Navigation(format!(
                    "timed out after {}s for {}",
                    nav_timeout.as_secs(),
                    url
                ))
            })?
            .map_err(|e| RenderError::Navigation(format!("{} ({})", e, url)))?;

        Ok(())
    }

    async fn wait_for_ready(&mut self, timeout: Duration) -> Result<(), RenderError> {
        let page = self.page()?;
        let ready = async {
            let state = page.evaluate(WAIT_FOR_READY_SCRIPT.to_string()).await?;
            debug!(
                "Page ready state: {}",
                state.into_value::<String>().unwrap_or_else(|_| "unknown".to_string())
            );
            page.find_element("body").await?;
            Ok::<_, chromiumoxide::error::CdpError>(())
        };

        match tokio::time::timeout(timeout, ready).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(RenderError::Browser(e.to_string())),
            Err(_) => Err(RenderError::Timeout(timeout)),
        }
    }

    async fn trigger_lazy_load(&mut self) -> Result<(), RenderError> {
        self.page()?
            .evaluate(SCROLL_TO_BOTTOM_SCRIPT.to_string())
            .await
            .map_err(|e| RenderError::Browser(e.to_string()))?;
        Ok(())
    }

    async fn settle(&mut self, duration: Duration) {
        debug!("Settling for {}s", duration.as_secs());
        tokio::time::sleep(duration).await;
    }

    async fn snapshot(&mut self) -> Result<Vec<ListingContainer>, RenderError> {
        let script = self.snapshot_script();
        let result = self
            .page()?
            .evaluate(script)
            .await
            .map_err(|e| RenderError::Browser(e.to_string()))?;

        result
            .into_value::<Vec<ListingContainer>>()
            .map_err(|e| RenderError::Browser(format!("Unexpected snapshot shape: {}", e)))
    }

    async fn refresh(&mut self) -> Result<(), RenderError> {
        self.page()?
            .reload()
            .await
            .map_err(|e| RenderError::Navigation(format!("reload failed: {}", e)))?;
        Ok(())
    }

    async fn close(&mut self) {
        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                debug!("Page close failed: {}", e);
            }
        }

        if let Some(mut browser) = self.browser.take() {
            if self.owns_browser {
                if let Err(e) = browser.close().await {
                    warn!("Browser close failed: {}", e);
                }
                let _ = browser.wait().await;
            }
            info!("Browser session closed");
        }

        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
    }
}

// Stub for when browser feature is disabled
#[cfg(not(feature = "browser"))]
pub struct ChromeRenderSource {
    #[allow(dead_code)]
    config: BrowserConfig,
}

#[cfg(not(feature = "browser"))]
impl ChromeRenderSource {
    pub fn new(config: BrowserConfig, _container_selector: impl Into<String>) -> Self {
        Self { config }
    }
}

#[cfg(not(feature = "browser"))]
#[async_trait]
impl RenderSource for ChromeRenderSource {
    async fn navigate(&mut self, _url: &str) -> Result<(), RenderError> {
        Err(RenderError::Unsupported)
    }

    async fn wait_for_ready(&mut self, _timeout: Duration) -> Result<(), RenderError> {
        Err(RenderError::Unsupported)
    }

    async fn trigger_lazy_load(&mut self) -> Result<(), RenderError> {
        Err(RenderError::Unsupported)
    }

    async fn settle(&mut self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    async fn snapshot(&mut self) -> Result<Vec<ListingContainer>, RenderError> {
        Err(RenderError::Unsupported)
    }

    async fn refresh(&mut self) -> Result<(), RenderError> {
        Err(RenderError::Unsupported)
    }

    async fn close(&mut self) {}
}
