use super::{ElementHandle, Exchange, ExchangeWatch, PageDriver};
use crate::{Error, Result};
use async_trait::async_trait;
use eoka::Page;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// How often the exchange log is polled.
const EXCHANGE_POLL_MS: u64 = 100;

/// Pause after scrolling an element into view.
const SCROLL_INTO_VIEW_SETTLE_MS: u64 = 200;

/// Wraps `fetch` and `XMLHttpRequest` so completed exchanges whose URL
/// contains an armed pattern are appended to `window.__eokaHarvest.log`.
/// Installing twice is a no-op.
const EXCHANGE_HOOK_JS: &str = r#"(() => {
    if (window.__eokaHarvest) return true;
    const h = { seq: 0, patterns: [], log: [] };
    window.__eokaHarvest = h;
    const wanted = (url) => h.patterns.some(p => String(url).includes(p));
    const record = (url, status, body) => {
        h.log.push({ seq: h.seq++, url: String(url), status: status, body: body });
    };

    const originalFetch = window.fetch;
    window.fetch = function(...args) {
        const p = originalFetch.apply(this, args);
        p.then(resp => {
            if (!wanted(resp.url || args[0])) return;
            resp.clone().text()
                .then(body => record(resp.url || args[0], resp.status, body))
                .catch(() => {});
        }).catch(() => {});
        return p;
    };

    const originalOpen = XMLHttpRequest.prototype.open;
    XMLHttpRequest.prototype.open = function(method, url, ...rest) {
        this.__eokaUrl = url;
        return originalOpen.call(this, method, url, ...rest);
    };
    const originalSend = XMLHttpRequest.prototype.send;
    XMLHttpRequest.prototype.send = function(...args) {
        this.addEventListener('loadend', () => {
            const url = this.responseURL || this.__eokaUrl;
            if (!wanted(url)) return;
            // Binary bodies are recorded as null so they fail to parse.
            let body = null;
            try {
                if (this.responseType === '' || this.responseType === 'text') {
                    body = this.responseText;
                } else if (this.responseType === 'json' && this.response !== null) {
                    body = JSON.stringify(this.response);
                }
            } catch (e) {}
            record(url, this.status, body);
        });
        return originalSend.apply(this, args);
    };
    return true;
})()"#;

#[derive(Debug, Deserialize)]
struct RecordedExchange {
    url: String,
    status: Option<u16>,
    body: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Center {
    x: f64,
    y: f64,
}

/// JS expression for the element a handle points at (may evaluate to undefined).
fn element_expr(element: &ElementHandle) -> String {
    format!(
        "document.querySelectorAll({})[{}]",
        js_string(element.selector()),
        element.index()
    )
}

fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".into())
}

/// [`PageDriver`] over a live eoka page.
pub struct EokaDriver<'a> {
    page: &'a Page,
}

impl<'a> EokaDriver<'a> {
    pub fn new(page: &'a Page) -> Self {
        Self { page }
    }

    async fn install_exchange_hook(&self) -> Result<()> {
        let _: bool = self.page.evaluate(EXCHANGE_HOOK_JS).await?;
        Ok(())
    }

    fn detached(element: &ElementHandle) -> Error {
        Error::ActionFailed(format!("element {} is no longer attached", element))
    }
}

#[async_trait(?Send)]
impl<'a> PageDriver for EokaDriver<'a> {
    async fn navigate(&self, url: &str, idle_ms: u64, idle_timeout_ms: u64) -> Result<()> {
        self.page.goto(url).await?;
        // Pages that poll forever never go idle; the load itself succeeded.
        if let Err(e) = self.page.wait_for_network_idle(idle_ms, idle_timeout_ms).await {
            warn!("Network did not go idle after navigation: {}", e);
        }
        self.install_exchange_hook().await
    }

    async fn page_height(&self) -> Result<u64> {
        let height: f64 = self
            .page
            .evaluate("document.body ? document.body.scrollHeight : 0")
            .await?;
        Ok(height.max(0.0) as u64)
    }

    async fn scroll_by(&self, dy: u64) -> Result<()> {
        self.page
            .execute(&format!("window.scrollBy(0, {})", dy))
            .await?;
        Ok(())
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<ElementHandle>> {
        let count: usize = self
            .page
            .evaluate(&format!(
                "document.querySelectorAll({}).length",
                js_string(selector)
            ))
            .await?;
        Ok((0..count)
            .map(|i| ElementHandle::nth(selector, i))
            .collect())
    }

    async fn query_selector(&self, selector: &str) -> Result<Option<ElementHandle>> {
        let exists: bool = self
            .page
            .evaluate(&format!("!!document.querySelector({})", js_string(selector)))
            .await?;
        Ok(exists.then(|| ElementHandle::nth(selector, 0)))
    }

    async fn attribute(&self, element: &ElementHandle, name: &str) -> Result<Option<String>> {
        let js = format!(
            "(() => {{ const el = {}; return el ? el.getAttribute({}) : null; }})()",
            element_expr(element),
            js_string(name)
        );
        Ok(self.page.evaluate(&js).await?)
    }

    async fn scroll_into_view(&self, element: &ElementHandle) -> Result<()> {
        let js = format!(
            r#"(() => {{
                const el = {};
                if (!el) return false;
                const r = el.getBoundingClientRect();
                const visible = r.top >= 0 && r.bottom <= window.innerHeight;
                if (!visible) el.scrollIntoView({{ block: 'center' }});
                return true;
            }})()"#,
            element_expr(element)
        );
        let found: bool = self.page.evaluate(&js).await?;
        if !found {
            return Err(Self::detached(element));
        }
        self.page.wait(SCROLL_INTO_VIEW_SETTLE_MS).await;
        Ok(())
    }

    async fn click(&self, element: &ElementHandle) -> Result<()> {
        let js = format!(
            r#"(() => {{
                const el = {};
                if (!el) return null;
                const r = el.getBoundingClientRect();
                return {{ x: r.x + r.width / 2, y: r.y + r.height / 2 }};
            }})()"#,
            element_expr(element)
        );
        let center: Option<Center> = self.page.evaluate(&js).await?;
        let center = center.ok_or_else(|| Self::detached(element))?;
        debug!("click {} at ({:.0}, {:.0})", element, center.x, center.y);
        self.page.click_at(center.x, center.y).await?;
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()> {
        self.page
            .wait_for(selector, timeout.as_millis() as u64)
            .await
            .map(|_| ())
            .map_err(|e| Error::Timeout(format!("waiting for '{}': {}", selector, e)))
    }

    async fn observe_exchanges(&self, pattern: &str) -> Result<ExchangeWatch> {
        // The hook is gone if the page navigated since the last item.
        self.install_exchange_hook().await?;
        let js = format!(
            r#"(() => {{
                const h = window.__eokaHarvest;
                const p = {};
                if (!h.patterns.includes(p)) h.patterns.push(p);
                h.log = [];
                return h.seq;
            }})()"#,
            js_string(pattern)
        );
        let since: u64 = self.page.evaluate(&js).await?;
        Ok(ExchangeWatch {
            pattern: pattern.to_string(),
            since,
        })
    }

    async fn next_exchange(&self, watch: &ExchangeWatch) -> Result<Exchange> {
        let js = format!(
            r#"(() => {{
                const h = window.__eokaHarvest;
                if (!h) return null;
                const p = {};
                return h.log.find(e => e.seq >= {} && e.url.includes(p)) || null;
            }})()"#,
            js_string(&watch.pattern),
            watch.since
        );
        loop {
            let found: Option<RecordedExchange> = self.page.evaluate(&js).await?;
            if let Some(e) = found {
                return Ok(Exchange {
                    url: e.url,
                    status: e.status,
                    body: e.body.unwrap_or_default().into_bytes(),
                });
            }
            self.page.wait(EXCHANGE_POLL_MS).await;
        }
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        Ok(self.page.screenshot().await?)
    }

    async fn wait(&self, ms: u64) {
        self.page.wait(ms).await;
    }
}
