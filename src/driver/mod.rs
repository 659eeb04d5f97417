//! The browser operations the harvest engine needs.
//!
//! [`PageDriver`] is the seam between the engine and a live page.
//! [`EokaDriver`] implements it over an [`eoka::Page`]; tests script their own.

mod eoka_page;

pub use eoka_page::EokaDriver;

use crate::Result;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

/// Reference to one element of the current DOM snapshot.
///
/// The `index`-th match of `selector` in document order. A handle built by
/// [`ElementHandle::keyed`] has a selector that matches exactly one item, so it
/// still points at the same element after the page re-lays out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle {
    selector: String,
    index: usize,
}

impl ElementHandle {
    pub fn nth(selector: impl Into<String>, index: usize) -> Self {
        Self {
            selector: selector.into(),
            index,
        }
    }

    /// Handle for the item whose `attribute` equals `value`.
    ///
    /// `item_selector` is wrapped in `:is()` so the key applies to every
    /// branch of a selector list.
    pub fn keyed(item_selector: &str, attribute: &str, value: &str) -> Self {
        Self::nth(
            format!(":is({})[{}={}]", item_selector, attribute, css_string(value)),
            0,
        )
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'[{}]", self.selector, self.index)
    }
}

/// Quote a value as a CSS string literal.
pub fn css_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\a "),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Armed network observation, returned by [`PageDriver::observe_exchanges`].
///
/// Only exchanges recorded after arming are eligible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeWatch {
    pub pattern: String,
    pub since: u64,
}

/// A completed request/response pair.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub url: String,
    pub status: Option<u16>,
    pub body: Vec<u8>,
}

/// Browser page operations used by the harvest engine.
///
/// Futures are not required to be `Send`: a harvest runs as one sequential
/// task on a single page.
#[async_trait(?Send)]
pub trait PageDriver {
    /// Navigate and wait for the network to settle.
    async fn navigate(&self, url: &str, idle_ms: u64, idle_timeout_ms: u64) -> Result<()>;

    /// Current scrollable height of the document, in pixels.
    async fn page_height(&self) -> Result<u64>;

    async fn scroll_by(&self, dy: u64) -> Result<()>;

    /// Every element matching `selector`, in document order.
    async fn query_all(&self, selector: &str) -> Result<Vec<ElementHandle>>;

    /// First element matching `selector`, if any.
    async fn query_selector(&self, selector: &str) -> Result<Option<ElementHandle>>;

    async fn attribute(&self, element: &ElementHandle, name: &str) -> Result<Option<String>>;

    /// No-op if the element is already visible.
    async fn scroll_into_view(&self, element: &ElementHandle) -> Result<()>;

    async fn click(&self, element: &ElementHandle) -> Result<()>;

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()>;

    /// Start recording completed exchanges whose URL contains `pattern`.
    async fn observe_exchanges(&self, pattern: &str) -> Result<ExchangeWatch>;

    /// Wait for the first exchange matching `watch`. Does not time out on its
    /// own; callers bound it.
    async fn next_exchange(&self, watch: &ExchangeWatch) -> Result<Exchange>;

    /// PNG of the viewport.
    async fn screenshot(&self) -> Result<Vec<u8>>;

    /// Sleep while the page settles.
    async fn wait(&self, ms: u64);
}
