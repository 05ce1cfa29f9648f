//! Render source: a controllable browser session on the listing page.
//!
//! The collector owns exactly one session for the life of the process and
//! drives it through [`RenderSource`]; the Chrome implementation lives in
//! [`chrome`].

pub mod chrome;
pub(crate) mod container;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use chrome::ChromeRenderSource;
pub use container::{ListingContainer, PageSnapshot};

/// Errors from the render session.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("page did not become ready within {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("navigation failed: {0}")]
    Navigation(String),
    #[error("browser error: {0}")]
    Browser(String),
    #[error("render session is closed")]
    Closed,
    #[error("browser support not compiled. Rebuild with: cargo build --features browser")]
    Unsupported,
}

/// A headless browser session that renders the listing page on demand.
#[async_trait]
pub trait RenderSource: Send {
    /// Load `url` in the session's page.
    async fn navigate(&mut self, url: &str) -> Result<(), RenderError>;

    /// Wait for the document to be ready; fails with [`RenderError::Timeout`].
    async fn wait_for_ready(&mut self, timeout: Duration) -> Result<(), RenderError>;

    /// Scroll to the bottom so lazily loaded listings render.
    async fn trigger_lazy_load(&mut self) -> Result<(), RenderError>;

    /// Give asynchronous rendering time to finish.
    async fn settle(&mut self, duration: Duration);

    /// Listing containers currently in the page, in DOM order.
    async fn snapshot(&mut self) -> Result<Vec<ListingContainer>, RenderError>;

    /// Reload the current page.
    async fn refresh(&mut self) -> Result<(), RenderError>;

    /// Release the session. Safe to call more than once.
    async fn close(&mut self);
}
