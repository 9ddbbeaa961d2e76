use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use marketroles_core::{AggregateRoot, DomainError, DomainResult, MessageId, TransactionId};

/// Kind of outbound document attached to a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Confirm,
    Reject,
    AggregationResult,
}

/// Reference to an outbound message produced for a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub id: MessageId,
    pub document: DocumentKind,
    /// GLN of the receiving market participant.
    pub recipient: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Aggregate root: Transaction.
///
/// One instance per business transaction id; uniqueness is enforced by the
/// repository, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    id: TransactionId,
    messages: Vec<OutboundMessage>,
    version: u64,
}

impl Transaction {
    pub fn new(id: TransactionId) -> Self {
        Self {
            id,
            messages: Vec::new(),
            version: 0,
        }
    }

    /// Rehydrate from a persisted snapshot.
    pub fn restore(id: TransactionId, messages: Vec<OutboundMessage>, version: u64) -> Self {
        Self {
            id,
            messages,
            version,
        }
    }

    /// Stamp the snapshot version (repositories only).
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    pub fn messages(&self) -> &[OutboundMessage] {
        &self.messages
    }

    pub fn has_document(&self, kind: DocumentKind) -> bool {
        self.messages.iter().any(|m| m.document == kind)
    }

    /// Attach an outbound message. Message ids are unique per transaction.
    pub fn attach(&mut self, message: OutboundMessage) -> DomainResult<()> {
        if self.messages.iter().any(|m| m.id == message.id) {
            return Err(DomainError::conflict(format!(
                "message {} already attached to transaction {}",
                message.id, self.id
            )));
        }
        self.messages.push(message);
        Ok(())
    }
}

impl AggregateRoot for Transaction {
    type Id = TransactionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(document: DocumentKind) -> OutboundMessage {
        OutboundMessage {
            id: MessageId::new(),
            document,
            recipient: "5799000000008".to_string(),
            payload: serde_json::json!({ "ok": true }),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn attach_keeps_order_and_rejects_duplicates() {
        let mut tx = Transaction::new(TransactionId::new("tx-1").unwrap());
        let first = message(DocumentKind::Confirm);
        tx.attach(first.clone()).unwrap();
        tx.attach(message(DocumentKind::AggregationResult)).unwrap();

        assert_eq!(tx.messages().len(), 2);
        assert_eq!(tx.messages()[0].id, first.id);
        assert!(tx.has_document(DocumentKind::Confirm));
        assert!(!tx.has_document(DocumentKind::Reject));

        let err = tx.attach(first).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(tx.messages().len(), 2);
    }

    #[test]
    fn restore_rehydrates_messages_and_version() {
        let msg = message(DocumentKind::Reject);
        let tx = Transaction::restore(TransactionId::new("tx-2").unwrap(), vec![msg.clone()], 4);
        assert_eq!(tx.version(), 4);
        assert_eq!(tx.messages(), &[msg]);
        assert_eq!(tx.id().as_str(), "tx-2");
    }
}
