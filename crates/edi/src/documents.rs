//! Acknowledgement and reject documents sent back to market participants.
//!
//! ```text
//! {
//!   "documentName": "RejectRequestChangeOfSupplier",
//!   "id": "…", "type": "414", "processType": "E03", "businessSectorType": "23",
//!   "sender": { "id": "…", "codingScheme": "A10", "role": "DDZ" },
//!   "receiver": { "id": "…", "codingScheme": "A10", "role": "DDQ" },
//!   "createdDateTime": "…",
//!   "reasonCode": "A02",
//!   "activityRecord": {
//!     "id": "…", "originalTransaction": "…", "marketEvaluationPoint": "…",
//!     "reasons": [ { "code": "E16", "text": "…" } ]
//!   }
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use marketroles_core::{MessageId, TransactionId};
use marketroles_processes::ProcessKind;

use crate::error_message::OutboundErrorMessage;

const DOCUMENT_TYPE_RESPONSE: &str = "414";
const BUSINESS_SECTOR_ELECTRICITY: &str = "23";
const CODING_SCHEME_GLN: &str = "A10";
const ROLE_METERING_POINT_ADMINISTRATOR: &str = "DDZ";
const ROLE_ENERGY_SUPPLIER: &str = "DDQ";
const REASON_ACCEPTED: &str = "A01";
const REASON_REJECTED: &str = "A02";

/// Business process type as carried in `processType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessType {
    #[serde(rename = "E65")]
    MoveIn,
    #[serde(rename = "E03")]
    ChangeOfSupplier,
}

impl ProcessType {
    fn request_name(self) -> &'static str {
        match self {
            ProcessType::MoveIn => "RequestMoveIn",
            ProcessType::ChangeOfSupplier => "RequestChangeOfSupplier",
        }
    }
}

impl From<ProcessKind> for ProcessType {
    fn from(kind: ProcessKind) -> Self {
        match kind {
            ProcessKind::MoveIn => ProcessType::MoveIn,
            ProcessKind::ChangeOfSupplier => ProcessType::ChangeOfSupplier,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketParticipant {
    pub id: String,
    pub coding_scheme: String,
    pub role: String,
}

impl MarketParticipant {
    fn gln(id: &str, role: &str) -> Self {
        Self {
            id: id.to_string(),
            coding_scheme: CODING_SCHEME_GLN.to_string(),
            role: role.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    pub id: MessageId,
    pub original_transaction: TransactionId,
    pub market_evaluation_point: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<OutboundErrorMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketDocument {
    pub document_name: String,
    pub id: MessageId,
    #[serde(rename = "type")]
    pub document_type: String,
    pub process_type: ProcessType,
    pub business_sector_type: String,
    pub sender: MarketParticipant,
    pub receiver: MarketParticipant,
    pub created_date_time: DateTime<Utc>,
    pub reason_code: String,
    pub activity_record: ActivityRecord,
}

/// Who answers whom about which request.
#[derive(Debug, Clone)]
pub struct DocumentHeader<'a> {
    pub message_id: MessageId,
    pub process: ProcessType,
    /// GLN of the answering administrator.
    pub sender: &'a str,
    /// GLN of the requesting energy supplier.
    pub receiver: &'a str,
    pub transaction_id: &'a TransactionId,
    pub accounting_point_id: &'a str,
    pub created_at: DateTime<Utc>,
}

impl MarketDocument {
    pub fn confirm(header: DocumentHeader<'_>) -> Self {
        Self::build(header, "Confirm", REASON_ACCEPTED, Vec::new())
    }

    pub fn reject(header: DocumentHeader<'_>, reasons: Vec<OutboundErrorMessage>) -> Self {
        Self::build(header, "Reject", REASON_REJECTED, reasons)
    }

    pub fn is_rejection(&self) -> bool {
        self.reason_code == REASON_REJECTED
    }

    pub fn to_json(&self) -> serde_json::Value {
        // Every field is a string, enum, id or timestamp.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    fn build(
        header: DocumentHeader<'_>,
        prefix: &str,
        reason_code: &str,
        reasons: Vec<OutboundErrorMessage>,
    ) -> Self {
        Self {
            document_name: format!("{prefix}{}", header.process.request_name()),
            id: header.message_id,
            document_type: DOCUMENT_TYPE_RESPONSE.to_string(),
            process_type: header.process,
            business_sector_type: BUSINESS_SECTOR_ELECTRICITY.to_string(),
            sender: MarketParticipant::gln(header.sender, ROLE_METERING_POINT_ADMINISTRATOR),
            receiver: MarketParticipant::gln(header.receiver, ROLE_ENERGY_SUPPLIER),
            created_date_time: header.created_at,
            reason_code: reason_code.to_string(),
            activity_record: ActivityRecord {
                id: MessageId::new(),
                original_transaction: header.transaction_id.clone(),
                market_evaluation_point: header.accounting_point_id.to_string(),
                reasons,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(transaction_id: &TransactionId) -> DocumentHeader<'_> {
        DocumentHeader {
            message_id: MessageId::new(),
            process: ProcessType::ChangeOfSupplier,
            sender: "5790001330583",
            receiver: "5799000000015",
            transaction_id,
            accounting_point_id: "571313123456789025",
            created_at: Utc::now(),
        }
    }

    #[test]
    fn reject_document_has_the_outbound_shape() {
        let tx = TransactionId::new("tx-9").unwrap();
        let doc = MarketDocument::reject(
            header(&tx),
            vec![OutboundErrorMessage::new("E16", "Sender mismatch")],
        );
        assert!(doc.is_rejection());

        let json = doc.to_json();
        assert_eq!(json["documentName"], "RejectRequestChangeOfSupplier");
        assert_eq!(json["type"], "414");
        assert_eq!(json["processType"], "E03");
        assert_eq!(json["businessSectorType"], "23");
        assert_eq!(json["reasonCode"], "A02");
        assert_eq!(json["sender"]["codingScheme"], "A10");
        assert_eq!(json["receiver"]["id"], "5799000000015");
        assert_eq!(json["activityRecord"]["originalTransaction"], "tx-9");
        assert_eq!(json["activityRecord"]["reasons"][0]["code"], "E16");
        assert!(json.get("createdDateTime").is_some());
    }

    #[test]
    fn confirm_document_carries_no_reasons() {
        let tx = TransactionId::new("tx-10").unwrap();
        let mut h = header(&tx);
        h.process = ProcessKind::MoveIn.into();
        let doc = MarketDocument::confirm(h);

        assert!(!doc.is_rejection());
        assert_eq!(doc.document_name, "ConfirmRequestMoveIn");
        let json = doc.to_json();
        assert_eq!(json["processType"], "E65");
        assert_eq!(json["reasonCode"], "A01");
        assert!(json["activityRecord"].get("reasons").is_none());
    }
}
