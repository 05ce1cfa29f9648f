//! Listing containers captured from a rendered page.

use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};

use crate::utils::rendered_text;

/// One rendered block representing a single auction item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingContainer {
    /// 1-based position in DOM order.
    pub index: usize,
    /// Outer HTML of the container element.
    pub html: String,
    /// Rendered text (`innerText`) of the container.
    pub text: String,
}

impl ListingContainer {
    pub fn new(index: usize, html: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            index,
            html: html.into(),
            text: text.into(),
        }
    }

    /// Build a container from markup alone, approximating its rendered text.
    pub fn from_html(index: usize, html: impl Into<String>) -> Self {
        let html = html.into();
        let fragment = Html::parse_fragment(&html);
        let text = container_element(&fragment)
            .map(rendered_text)
            .unwrap_or_default();
        Self { index, html, text }
    }

    /// Rendered text split into lines, each trimmed. Blank lines are kept
    /// because positional layouts count them.
    pub fn lines(&self) -> Vec<&str> {
        self.text.split('\n').map(str::trim).collect()
    }

    /// First non-empty line, for log context.
    pub fn context(&self) -> &str {
        self.text
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or("<empty>")
    }
}

/// The outermost element of a parsed container fragment.
pub(crate) fn container_element(fragment: &Html) -> Option<ElementRef<'_>> {
    fragment.root_element().children().find_map(ElementRef::wrap)
}

/// All listing containers present in one rendered page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub url: String,
    pub captured_at: DateTime<Utc>,
    pub containers: Vec<ListingContainer>,
}

impl PageSnapshot {
    pub fn new(url: impl Into<String>, containers: Vec<ListingContainer>) -> Self {
        Self {
            url: url.into(),
            captured_at: Utc::now(),
            containers,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
