use serde::Serialize;

/// Structured record of anything that degraded a harvest without stopping it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HarvestEvent {
    /// Elements matched the item selector but carried no identity.
    AnonymousItems { step: u64, count: usize },
    /// Scrolling or discovery failed at a cursor stop.
    StepFailed { step: u64, error: String },
    /// An item was dispatched but produced no result.
    ItemFailed { identity: String, error: String },
    /// The overlay opened by an item could not be closed.
    DismissFailed { identity: String, error: String },
    /// Recovery ran after a failed item.
    Recovered {
        identity: String,
        outcome: RecoveryOutcome,
    },
}

/// Result of one best-effort recovery attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RecoveryOutcome {
    /// A dismiss control was found and clicked.
    Dismissed,
    /// No dismiss control on the page.
    ControlAbsent,
    /// Looking for or clicking the control failed.
    Failed { error: String },
}
