use serde::{Deserialize, Serialize};

/// A `(code, text)` rejection reason as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutboundErrorMessage {
    pub code: String,
    pub text: String,
}

impl OutboundErrorMessage {
    pub fn new(code: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            text: text.into(),
        }
    }
}

impl core::fmt::Display for OutboundErrorMessage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.code, self.text)
    }
}
