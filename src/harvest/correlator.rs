use super::aggregator::CorrelatedResponse;
use super::discovery::DiscoveredElement;
use super::snapshot;
use crate::driver::{ExchangeWatch, PageDriver};
use crate::{Error, Result};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// What happened to the overlay after an item was triggered.
#[derive(Debug)]
pub enum Dismissal {
    Closed,
    /// The click was never issued, so there is nothing to close.
    Skipped,
    Failed(Error),
}

/// Outcome of processing one item.
#[derive(Debug)]
pub struct Correlation {
    pub capture: Result<CorrelatedResponse>,
    pub dismissal: Dismissal,
}

impl Correlation {
    /// Recovery runs if any step failed, including a dismissal after a
    /// successful capture.
    pub fn needs_recovery(&self) -> bool {
        self.capture.is_err() || matches!(self.dismissal, Dismissal::Failed(_))
    }
}

/// Clicks an item and pairs it with the detail response that follows.
///
/// Responses are matched on a URL substring shared by every item, not on
/// anything specific to the clicked element. Two items correlating at once
/// could swap payloads, so callers must await each `correlate` before the next.
#[derive(Debug, Clone, Copy)]
pub struct ActionCorrelator<'a> {
    pub response_pattern: &'a str,
    pub overlay_selector: &'a str,
    pub dismiss_selector: &'a str,
    pub response_timeout: Duration,
    pub dismiss_timeout: Duration,
    pub dismiss_settle_ms: u64,
    pub screenshot_dir: Option<&'a Path>,
}

impl ActionCorrelator<'_> {
    pub async fn correlate<D: PageDriver + ?Sized>(
        &self,
        driver: &D,
        element: &DiscoveredElement,
    ) -> Correlation {
        let watch = match self.trigger(driver, element).await {
            Ok(watch) => watch,
            Err(e) => {
                return Correlation {
                    capture: Err(e),
                    dismissal: Dismissal::Skipped,
                }
            }
        };

        let capture = self.capture(driver, element, &watch).await;

        let dismissal = match self.dismiss(driver).await {
            Ok(()) => Dismissal::Closed,
            Err(e) => Dismissal::Failed(e),
        };

        Correlation { capture, dismissal }
    }

    /// Bring the element into view, arm the network watch, click.
    async fn trigger<D: PageDriver + ?Sized>(
        &self,
        driver: &D,
        element: &DiscoveredElement,
    ) -> Result<ExchangeWatch> {
        driver.scroll_into_view(&element.handle).await?;
        // Armed before the click so a fast response is not missed.
        let watch = driver.observe_exchanges(self.response_pattern).await?;
        driver.click(&element.handle).await?;
        debug!("clicked item {}", element.identity);
        Ok(watch)
    }

    /// Wait for the overlay and the matching exchange together, then parse.
    async fn capture<D: PageDriver + ?Sized>(
        &self,
        driver: &D,
        element: &DiscoveredElement,
        watch: &ExchangeWatch,
    ) -> Result<CorrelatedResponse> {
        let (overlay, exchange) = tokio::join!(
            driver.wait_for_selector(self.overlay_selector, self.dismiss_timeout),
            tokio::time::timeout(self.response_timeout, driver.next_exchange(watch)),
        );

        if let Err(e) = overlay {
            debug!("overlay for item {} not seen: {}", element.identity, e);
        }

        if let Some(dir) = self.screenshot_dir {
            let name = format!("clicked_{}.png", snapshot::file_stem(&element.identity));
            snapshot::capture(driver, dir, &name).await;
        }

        let exchange = match exchange {
            Ok(exchange) => exchange?,
            Err(_) => {
                return Err(Error::Timeout(format!(
                    "no response matching '{}' for item {} within {}ms",
                    self.response_pattern,
                    element.identity,
                    self.response_timeout.as_millis()
                )))
            }
        };

        let payload: Value = serde_json::from_slice(&exchange.body).map_err(|e| {
            Error::MalformedPayload(format!(
                "item {} ({}, status {:?}): {}",
                element.identity, exchange.url, exchange.status, e
            ))
        })?;

        Ok(CorrelatedResponse {
            identity: element.identity.clone(),
            payload,
        })
    }

    /// Wait for the dismiss control, click it, let the page settle.
    async fn dismiss<D: PageDriver + ?Sized>(&self, driver: &D) -> Result<()> {
        driver
            .wait_for_selector(self.dismiss_selector, self.dismiss_timeout)
            .await?;
        let control = driver
            .query_selector(self.dismiss_selector)
            .await?
            .ok_or_else(|| {
                Error::ActionFailed(format!(
                    "dismiss control '{}' disappeared",
                    self.dismiss_selector
                ))
            })?;
        driver.click(&control).await?;
        driver.wait(self.dismiss_settle_ms).await;
        Ok(())
    }
}
