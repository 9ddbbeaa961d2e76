//! Forwarding of aggregation results to market participants.

use serde::{Deserialize, Serialize};

use marketroles_core::{InternalCommandPayload, TransactionId};

/// Internal command: forward one aggregation result. The transaction id makes
/// forwarding exactly-once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardAggregationResult {
    pub transaction_id: TransactionId,
    pub recipient_gln: String,
    pub grid_area: String,
    pub result: serde_json::Value,
}

impl InternalCommandPayload for ForwardAggregationResult {
    const KIND: &'static str = "ForwardAggregationResult";
}
