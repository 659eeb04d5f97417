use std::collections::HashSet;

/// Identities already dispatched during one harvest, whatever their outcome.
#[derive(Debug, Default)]
pub struct VisitedSet {
    seen: HashSet<String>,
    order: Vec<String>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn already_visited(&self, identity: &str) -> bool {
        self.seen.contains(identity)
    }

    /// Record a dispatch. Returns `false` if the identity was already present.
    pub fn mark_visited(&mut self, identity: &str) -> bool {
        if !self.seen.insert(identity.to_string()) {
            return false;
        }
        self.order.push(identity.to_string());
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Identities in dispatch order.
    pub fn into_vec(self) -> Vec<String> {
        self.order
    }
}
