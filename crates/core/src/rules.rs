//! Business rule evaluation pipeline.
//!
//! A business rule is a predicate over a snapshot of domain values captured at
//! construction time. A broken rule yields a typed `Violation` that carries
//! enough data to be rendered into a protocol-specific rejection later on.
//!
//! ```text
//! RuleSet [r1, r2, r3]
//!   ↓ evaluate (every rule, in order, no short-circuit)
//! BusinessRulesValidationResult { errors: [v1, v3] }
//! ```
//!
//! Rules only ever get `&self` over owned snapshot data, so evaluation cannot
//! mutate domain state. Evaluation order only affects the order of reported
//! errors.

use core::fmt::Debug;
use core::hash::Hash;

use tracing::trace;

/// A typed business-rule violation.
///
/// `Kind` is the closed set of violation variants; every kind has exactly one
/// stable wire `code`. `KINDS` enumerates the set so that start-up checks can
/// verify that each kind is handled downstream (e.g. has an error converter).
pub trait Violation: Clone + Debug + Send + Sync + 'static {
    type Kind: Copy + Eq + Hash + Debug + Send + Sync + 'static;

    /// Every kind this violation type can take.
    const KINDS: &'static [Self::Kind];

    fn kind(&self) -> Self::Kind;

    /// Stable code of this violation's kind, used verbatim in outbound messages.
    fn code(&self) -> &'static str;

    /// Human-readable description (logs, diagnostics).
    fn message(&self) -> String;
}

/// A single business rule evaluated over a snapshot.
pub trait BusinessRule {
    type Violation: Violation;

    fn is_broken(&self) -> bool;

    /// The violation reported when the rule is broken.
    fn violation(&self) -> Self::Violation;
}

/// Outcome of evaluating an ordered list of rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusinessRulesValidationResult<V> {
    errors: Vec<V>,
}

impl<V> BusinessRulesValidationResult<V> {
    pub fn succeeded() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn from_errors(errors: Vec<V>) -> Self {
        Self { errors }
    }

    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[V] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<V> {
        self.errors
    }
}

impl<V: Violation> BusinessRulesValidationResult<V> {
    /// Codes of all reported violations, in report order.
    pub fn codes(&self) -> Vec<&'static str> {
        self.errors.iter().map(Violation::code).collect()
    }
}

impl<V> Default for BusinessRulesValidationResult<V> {
    fn default() -> Self {
        Self::succeeded()
    }
}

type BoxedRule<V> = Box<dyn BusinessRule<Violation = V> + Send + Sync>;

/// Ordered collection of rules sharing a violation type.
pub struct RuleSet<V> {
    rules: Vec<BoxedRule<V>>,
}

impl<V: Violation> RuleSet<V> {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a rule (builder style).
    pub fn with<R>(mut self, rule: R) -> Self
    where
        R: BusinessRule<Violation = V> + Send + Sync + 'static,
    {
        self.push(rule);
        self
    }

    pub fn push<R>(&mut self, rule: R)
    where
        R: BusinessRule<Violation = V> + Send + Sync + 'static,
    {
        self.rules.push(Box::new(rule));
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluate every rule and collect the violations of all broken ones.
    pub fn evaluate(&self) -> BusinessRulesValidationResult<V> {
        let errors: Vec<V> = self
            .rules
            .iter()
            .filter(|rule| rule.is_broken())
            .map(|rule| rule.violation())
            .collect();

        trace!(rules = self.rules.len(), broken = errors.len(), "evaluated business rules");
        BusinessRulesValidationResult::from_errors(errors)
    }
}

impl<V: Violation> Default for RuleSet<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> core::fmt::Debug for RuleSet<V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RuleSet").field("rules", &self.rules.len()).finish()
    }
}

/// Evaluate borrowed rules without building a `RuleSet`.
pub fn validate<V: Violation>(
    rules: &[&dyn BusinessRule<Violation = V>],
) -> BusinessRulesValidationResult<V> {
    let errors = rules
        .iter()
        .filter(|rule| rule.is_broken())
        .map(|rule| rule.violation())
        .collect();
    BusinessRulesValidationResult::from_errors(errors)
}
