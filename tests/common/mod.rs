//! Scripted in-memory page for driving the harvest engine without a browser.

#![allow(dead_code)]

use async_trait::async_trait;
use eoka_harvest::{Config, ElementHandle, Error, Exchange, ExchangeWatch, PageDriver, Result};
use serde_json::Value;
use std::sync::Mutex;
use std::time::Duration;

pub const ITEM: &str = "div.item";
pub const ID_ATTR: &str = "data-id";
pub const CLOSE: &str = "button.close";
pub const PATTERN: &str = "/api/item";

/// Harvest file used by the engine tests; `extra` is appended to `harvest:`.
pub fn config(extra: &str) -> Config {
    let yaml = format!(
        r#"
name: "Scripted"
target:
  url: "https://shop.test/store"
harvest:
  item_selector: "{ITEM}"
  identity_attribute: "{ID_ATTR}"
  response_pattern: "{PATTERN}"
  dismiss_selector: "{CLOSE}"
  step_px: 200
  settle_ms: 0
  response_timeout_ms: 50
  dismiss_timeout_ms: 10
  dismiss_settle_ms: 0
{extra}"#
    );
    Config::parse(&yaml).expect("test config should parse")
}

/// What the network does after an item is clicked.
#[derive(Debug, Clone)]
pub enum Reply {
    Json(Value),
    Malformed,
    Never,
}

#[derive(Debug, Clone)]
pub struct Item {
    pub identity: Option<String>,
    /// First cursor step at which the item is attached.
    pub appears_at: u64,
    pub reply: Reply,
    pub opens_overlay: bool,
    pub click_fails: bool,
}

impl Item {
    pub fn json(identity: &str) -> Self {
        Self {
            identity: Some(identity.to_string()),
            appears_at: 1,
            reply: Reply::Json(serde_json::json!({ "item": identity })),
            opens_overlay: true,
            click_fails: false,
        }
    }

    pub fn anonymous() -> Self {
        Self {
            identity: None,
            ..Self::json("")
        }
    }

    pub fn reply(mut self, reply: Reply) -> Self {
        self.reply = reply;
        self
    }

    pub fn appears_at(mut self, step: u64) -> Self {
        self.appears_at = step;
        self
    }

    pub fn without_overlay(mut self) -> Self {
        self.opens_overlay = false;
        self
    }

    pub fn click_fails(mut self) -> Self {
        self.click_fails = true;
        self
    }
}

#[derive(Debug, Default)]
struct State {
    offset: u64,
    overlay_open: bool,
    pending: Option<usize>,
    clicks: Vec<String>,
    dismiss_clicks: usize,
}

pub struct ScriptedPage {
    height: u64,
    step_px: u64,
    /// `(after_step, new_height)`: the page grows once this step is reached.
    growth: Option<(u64, u64)>,
    items: Vec<Item>,
    fail_navigation: bool,
    broken_close: bool,
    broken_camera: bool,
    state: Mutex<State>,
}

impl ScriptedPage {
    pub fn new(height: u64) -> Self {
        Self {
            height,
            step_px: 200,
            growth: None,
            items: Vec::new(),
            fail_navigation: false,
            broken_close: false,
            broken_camera: false,
            state: Mutex::new(State::default()),
        }
    }

    pub fn item(mut self, item: Item) -> Self {
        self.items.push(item);
        self
    }

    pub fn grows_to(mut self, after_step: u64, height: u64) -> Self {
        self.growth = Some((after_step, height));
        self
    }

    pub fn unreachable(mut self) -> Self {
        self.fail_navigation = true;
        self
    }

    /// Every click on the close control errors.
    pub fn broken_close(mut self) -> Self {
        self.broken_close = true;
        self
    }

    /// Every screenshot errors.
    pub fn broken_camera(mut self) -> Self {
        self.broken_camera = true;
        self
    }

    /// Identities of item clicks, in order.
    pub fn clicks(&self) -> Vec<String> {
        self.state.lock().unwrap().clicks.clone()
    }

    pub fn dismiss_clicks(&self) -> usize {
        self.state.lock().unwrap().dismiss_clicks
    }

    pub fn overlay_open(&self) -> bool {
        self.state.lock().unwrap().overlay_open
    }

    fn step(&self) -> u64 {
        self.state.lock().unwrap().offset / self.step_px
    }

    fn visible(&self) -> Vec<&Item> {
        let step = self.step();
        self.items.iter().filter(|i| i.appears_at <= step).collect()
    }

    /// Index of the item a keyed handle points at.
    fn resolve(&self, element: &ElementHandle) -> Option<usize> {
        if element.selector() == ITEM {
            let visible = self.visible();
            let item = visible.get(element.index())?;
            return self
                .items
                .iter()
                .position(|i| std::ptr::eq(i, *item));
        }
        self.items.iter().position(|i| {
            i.identity
                .as_deref()
                .is_some_and(|id| element.selector().contains(&format!("=\"{}\"]", id)))
        })
    }
}

#[async_trait(?Send)]
impl PageDriver for ScriptedPage {
    async fn navigate(&self, url: &str, _idle_ms: u64, _idle_timeout_ms: u64) -> Result<()> {
        if self.fail_navigation {
            return Err(Error::ActionFailed(format!(
                "net::ERR_NAME_NOT_RESOLVED at {}",
                url
            )));
        }
        Ok(())
    }

    async fn page_height(&self) -> Result<u64> {
        match self.growth {
            Some((after, grown)) if self.step() >= after => Ok(grown),
            _ => Ok(self.height),
        }
    }

    async fn scroll_by(&self, dy: u64) -> Result<()> {
        self.state.lock().unwrap().offset += dy;
        Ok(())
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<ElementHandle>> {
        if selector != ITEM {
            return Ok(Vec::new());
        }
        Ok((0..self.visible().len())
            .map(|i| ElementHandle::nth(ITEM, i))
            .collect())
    }

    async fn query_selector(&self, selector: &str) -> Result<Option<ElementHandle>> {
        let open = self.state.lock().unwrap().overlay_open;
        Ok((selector == CLOSE && open).then(|| ElementHandle::nth(CLOSE, 0)))
    }

    async fn attribute(&self, element: &ElementHandle, name: &str) -> Result<Option<String>> {
        if name != ID_ATTR {
            return Ok(None);
        }
        Ok(self
            .resolve(element)
            .and_then(|i| self.items[i].identity.clone()))
    }

    async fn scroll_into_view(&self, element: &ElementHandle) -> Result<()> {
        self.resolve(element)
            .map(|_| ())
            .ok_or_else(|| Error::ActionFailed(format!("{} detached", element)))
    }

    async fn click(&self, element: &ElementHandle) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if element.selector() == CLOSE {
            if self.broken_close || !state.overlay_open {
                return Err(Error::ActionFailed("close control not clickable".into()));
            }
            state.overlay_open = false;
            state.dismiss_clicks += 1;
            return Ok(());
        }

        drop(state);
        let idx = self
            .resolve(element)
            .ok_or_else(|| Error::ActionFailed(format!("{} detached", element)))?;
        let item = &self.items[idx];
        let mut state = self.state.lock().unwrap();
        state
            .clicks
            .push(item.identity.clone().unwrap_or_default());
        if item.click_fails {
            return Err(Error::ActionFailed("element intercepted the click".into()));
        }
        if item.opens_overlay {
            state.overlay_open = true;
        }
        state.pending = Some(idx);
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str, _timeout: Duration) -> Result<()> {
        let open = self.state.lock().unwrap().overlay_open;
        if selector == CLOSE && open {
            Ok(())
        } else {
            Err(Error::Timeout(format!("'{}' never appeared", selector)))
        }
    }

    async fn observe_exchanges(&self, pattern: &str) -> Result<ExchangeWatch> {
        self.state.lock().unwrap().pending = None;
        Ok(ExchangeWatch {
            pattern: pattern.to_string(),
            since: 0,
        })
    }

    async fn next_exchange(&self, watch: &ExchangeWatch) -> Result<Exchange> {
        let pending = self.state.lock().unwrap().pending;
        let reply = pending.map(|i| self.items[i].reply.clone());
        let url = format!("https://shop.test{}?operation=itemPage", watch.pattern);
        match reply {
            Some(Reply::Json(v)) => Ok(Exchange {
                url,
                status: Some(200),
                body: v.to_string().into_bytes(),
            }),
            Some(Reply::Malformed) => Ok(Exchange {
                url,
                status: Some(502),
                body: b"<html>Bad Gateway</html>".to_vec(),
            }),
            Some(Reply::Never) | None => std::future::pending().await,
        }
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        if self.broken_camera {
            return Err(Error::ActionFailed("capture failed".into()));
        }
        Ok(b"\x89PNG".to_vec())
    }

    async fn wait(&self, _ms: u64) {}
}
