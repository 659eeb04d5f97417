use super::events::RecoveryOutcome;
use crate::driver::PageDriver;
use tracing::{debug, warn};

/// Best-effort return to a harvestable page after a failed item.
#[derive(Debug, Clone, Copy)]
pub struct RecoveryHandler<'a> {
    pub dismiss_selector: &'a str,
    pub settle_ms: u64,
}

impl RecoveryHandler<'_> {
    /// Click the dismiss control if one is present. Never fails.
    pub async fn recover<D: PageDriver + ?Sized>(&self, driver: &D) -> RecoveryOutcome {
        let control = match driver.query_selector(self.dismiss_selector).await {
            Ok(Some(control)) => control,
            Ok(None) => {
                debug!("recovery: no dismiss control present");
                return RecoveryOutcome::ControlAbsent;
            }
            Err(e) => {
                warn!("recovery: dismiss lookup failed: {}", e);
                return RecoveryOutcome::Failed {
                    error: e.to_string(),
                };
            }
        };

        match driver.click(&control).await {
            Ok(()) => {
                driver.wait(self.settle_ms).await;
                debug!("recovery: overlay dismissed");
                RecoveryOutcome::Dismissed
            }
            Err(e) => {
                warn!("recovery: dismiss click failed: {}", e);
                RecoveryOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }
}
