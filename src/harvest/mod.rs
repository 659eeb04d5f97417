//! The harvest loop: scroll, discover, click each new item once, keep what it
//! returns.

mod aggregator;
mod correlator;
mod cursor;
mod discovery;
mod events;
mod recovery;
mod snapshot;
mod tracker;

pub use aggregator::{CorrelatedResponse, ResultAggregator};
pub use correlator::{ActionCorrelator, Correlation, Dismissal};
pub use cursor::{step_count, PageCursor};
pub use discovery::{DiscoveredElement, Discovery, ItemPattern};
pub use events::{HarvestEvent, RecoveryOutcome};
pub use recovery::RecoveryHandler;
pub use tracker::VisitedSet;

use crate::config::{CursorMode, HarvestConfig};
use crate::driver::PageDriver;
use crate::{Error, Result};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Everything one harvest produced.
#[derive(Debug, Serialize)]
pub struct HarvestReport {
    /// Captured responses in completion order.
    pub responses: Vec<CorrelatedResponse>,
    /// Every dispatched identity, in dispatch order, including failures.
    pub visited: Vec<String>,
    /// Scroll steps taken.
    pub steps: u64,
    pub events: Vec<HarvestEvent>,
    pub duration_ms: u64,
}

impl HarvestReport {
    /// Number of items whose payload was captured.
    pub fn processed(&self) -> usize {
        self.responses.len()
    }

    /// Dispatched items that produced no payload.
    pub fn failed(&self) -> usize {
        self.visited.len() - self.responses.len()
    }

    pub fn payloads(&self) -> impl Iterator<Item = &Value> {
        self.responses.iter().map(|r| &r.payload)
    }

    pub fn into_payloads(self) -> Vec<Value> {
        self.responses.into_iter().map(|r| r.payload).collect()
    }

    /// Recovery attempts made, one per failed item.
    pub fn recoveries(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, HarvestEvent::Recovered { .. }))
            .count()
    }
}

/// State for one harvest of one page.
///
/// Items are processed one at a time; `run` consumes the session so visited
/// and result state never outlive it.
pub struct HarvestSession<'a, D: PageDriver + ?Sized> {
    driver: &'a D,
    config: &'a HarvestConfig,
    screenshot_dir: Option<&'a Path>,
    visited: VisitedSet,
    results: ResultAggregator,
    events: Vec<HarvestEvent>,
}

impl<'a, D: PageDriver + ?Sized> HarvestSession<'a, D> {
    pub fn new(driver: &'a D, config: &'a HarvestConfig) -> Self {
        Self {
            driver,
            config,
            screenshot_dir: None,
            visited: VisitedSet::new(),
            results: ResultAggregator::new(),
            events: Vec::new(),
        }
    }

    /// Save debug screenshots under `dir`.
    pub fn with_screenshots(mut self, dir: Option<&'a Path>) -> Self {
        self.screenshot_dir = dir;
        self
    }

    /// Harvest `url`. Only failing to load the page is an error; item and step
    /// failures are recorded in the report.
    pub async fn run(mut self, url: &str) -> Result<HarvestReport> {
        let config = self.config;
        let driver = self.driver;
        let start = Instant::now();

        info!("Navigating to: {}", url);
        driver
            .navigate(
                url,
                config.network_idle.idle_ms,
                config.network_idle.timeout_ms,
            )
            .await
            .map_err(|e| Error::Navigation(format!("{}: {}", url, e)))?;

        let height = driver
            .page_height()
            .await
            .map_err(|e| Error::Navigation(format!("reading page height: {}", e)))?;
        let mut cursor = PageCursor::new(height, config.step_px);
        info!(
            "Page loaded: {}px tall, {} scroll steps of {}px",
            height,
            cursor.total_steps(),
            config.step_px
        );

        let pattern = ItemPattern {
            selector: &config.item_selector,
            identity_attribute: &config.identity_attribute,
        };
        let correlator = ActionCorrelator {
            response_pattern: &config.response_pattern,
            overlay_selector: config.overlay_selector(),
            dismiss_selector: &config.dismiss_selector,
            response_timeout: Duration::from_millis(config.response_timeout_ms),
            dismiss_timeout: Duration::from_millis(config.dismiss_timeout_ms),
            dismiss_settle_ms: config.dismiss_settle_ms,
            screenshot_dir: self.screenshot_dir,
        };
        let recovery = RecoveryHandler {
            dismiss_selector: &config.dismiss_selector,
            settle_ms: config.dismiss_settle_ms,
        };

        while cursor.advance().is_some() {
            let step = cursor.taken();

            if let Err(e) = driver.scroll_by(cursor.step_px()).await {
                warn!("Scroll at step {} failed: {}", step, e);
                self.events.push(HarvestEvent::StepFailed {
                    step,
                    error: e.to_string(),
                });
            }
            driver.wait(config.settle_ms).await;

            if let Some(dir) = self.screenshot_dir {
                snapshot::capture(driver, dir, &format!("scroll_{}.png", step)).await;
            }

            if let CursorMode::Adaptive { max_steps } = config.cursor {
                match driver.page_height().await {
                    Ok(h) => cursor.extend_to(h, max_steps),
                    Err(e) => debug!("Page height re-read failed at step {}: {}", step, e),
                }
            }

            let discovery = match pattern.current_items(driver).await {
                Ok(discovery) => discovery,
                Err(e) => {
                    warn!("Discovery at step {} failed: {}", step, e);
                    self.events.push(HarvestEvent::StepFailed {
                        step,
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            debug!(
                "Step {}/{} (offset {}): found {} items",
                step,
                cursor.total_steps(),
                cursor.position(),
                discovery.items.len()
            );
            if discovery.anonymous > 0 {
                self.events.push(HarvestEvent::AnonymousItems {
                    step,
                    count: discovery.anonymous,
                });
            }

            for element in discovery.items {
                self.process(&correlator, &recovery, element).await;
            }
        }

        info!(
            "Harvest finished: {} captured, {} failed, {} steps",
            self.results.len(),
            self.visited.len() - self.results.len(),
            cursor.taken()
        );

        Ok(HarvestReport {
            responses: self.results.finalize(),
            visited: self.visited.into_vec(),
            steps: cursor.taken(),
            events: self.events,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn process(
        &mut self,
        correlator: &ActionCorrelator<'_>,
        recovery: &RecoveryHandler<'_>,
        element: DiscoveredElement,
    ) {
        if self.visited.already_visited(&element.identity) {
            return;
        }
        // Marked before the click: a failed item is never dispatched again.
        self.visited.mark_visited(&element.identity);

        let correlation = correlator.correlate(self.driver, &element).await;
        let needs_recovery = correlation.needs_recovery();

        match correlation.capture {
            Ok(response) => {
                info!("Captured item {}", element.identity);
                self.results.append(response);
            }
            Err(e) => {
                warn!("Error processing item {}: {}", element.identity, e);
                self.events.push(HarvestEvent::ItemFailed {
                    identity: element.identity.clone(),
                    error: e.to_string(),
                });
            }
        }

        if let Dismissal::Failed(e) = correlation.dismissal {
            warn!("Could not close item {}: {}", element.identity, e);
            self.events.push(HarvestEvent::DismissFailed {
                identity: element.identity.clone(),
                error: e.to_string(),
            });
        }

        if needs_recovery {
            let outcome = recovery.recover(self.driver).await;
            self.events.push(HarvestEvent::Recovered {
                identity: element.identity,
                outcome,
            });
        }
    }
}
