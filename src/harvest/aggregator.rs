use serde::Serialize;
use serde_json::Value;

/// An item's identity paired with the payload its click produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelatedResponse {
    pub identity: String,
    pub payload: Value,
}

/// Successful responses in completion order.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    responses: Vec<CorrelatedResponse>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, response: CorrelatedResponse) {
        self.responses.push(response);
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    pub fn finalize(self) -> Vec<CorrelatedResponse> {
        self.responses
    }
}
