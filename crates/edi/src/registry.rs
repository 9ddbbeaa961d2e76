//! Violation kind → outbound `(code, text)` conversion.
//!
//! One converter per violation kind, registered explicitly. Looking up an
//! unregistered kind is a programming error and fails loudly; `ensure_complete`
//! lets start-up code prove that no such lookup can happen.

use std::collections::HashMap;

use thiserror::Error;
use tracing::error;

use marketroles_core::{BusinessRulesValidationResult, Violation};

use crate::error_message::OutboundErrorMessage;

/// A pure conversion from a violation to its wire representation.
pub type Converter<V> = fn(&V) -> OutboundErrorMessage;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("a converter is already registered for violation kind {0}")]
    DuplicateConverter(String),

    #[error("no converter registered for violation kind {0}")]
    UnregisteredKind(String),

    #[error("violation kinds without a converter: {}", .0.join(", "))]
    MissingConverters(Vec<String>),
}

pub struct ErrorConverterRegistry<V: Violation> {
    converters: HashMap<V::Kind, Converter<V>>,
}

impl<V: Violation> ErrorConverterRegistry<V> {
    pub fn new() -> Self {
        Self {
            converters: HashMap::new(),
        }
    }

    pub fn register(&mut self, kind: V::Kind, converter: Converter<V>) -> Result<(), RegistryError> {
        if self.converters.contains_key(&kind) {
            return Err(RegistryError::DuplicateConverter(format!("{kind:?}")));
        }
        self.converters.insert(kind, converter);
        Ok(())
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, kind: V::Kind, converter: Converter<V>) -> Result<Self, RegistryError> {
        self.register(kind, converter)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.converters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }

    pub fn convert(&self, violation: &V) -> Result<OutboundErrorMessage, RegistryError> {
        let kind = violation.kind();
        match self.converters.get(&kind) {
            Some(converter) => Ok(converter(violation)),
            None => {
                error!(
                    kind = ?kind,
                    code = violation.code(),
                    violation = %violation.message(),
                    "no error converter registered for violation kind"
                );
                Err(RegistryError::UnregisteredKind(format!("{kind:?}")))
            }
        }
    }

    /// Convert every violation of a result, preserving order.
    pub fn convert_all(
        &self,
        result: &BusinessRulesValidationResult<V>,
    ) -> Result<Vec<OutboundErrorMessage>, RegistryError> {
        result.errors().iter().map(|v| self.convert(v)).collect()
    }

    /// Verify that every kind in `V::KINDS` has a converter.
    pub fn ensure_complete(&self) -> Result<(), RegistryError> {
        let missing: Vec<String> = V::KINDS
            .iter()
            .filter(|kind| !self.converters.contains_key(*kind))
            .map(|kind| format!("{kind:?}"))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(RegistryError::MissingConverters(missing))
        }
    }
}

impl<V: Violation> Default for ErrorConverterRegistry<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Violation> core::fmt::Debug for ErrorConverterRegistry<V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut kinds: Vec<String> = self.converters.keys().map(|k| format!("{k:?}")).collect();
        kinds.sort();
        f.debug_struct("ErrorConverterRegistry")
            .field("kinds", &kinds)
            .finish()
    }
}
