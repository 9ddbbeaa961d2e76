//! Internal command payload contract.

use serde::Serialize;
use serde::de::DeserializeOwned;

/// A typed, deferred unit of business work that can be recorded in the
/// outbox and dispatched later.
///
/// `KIND` is the stable discriminator persisted next to the serialized
/// payload. It is used to route a stored row back to its typed handler, so it
/// must never change once rows with that kind may exist.
///
/// ## Design Constraints
///
/// Commands must be:
/// - **Serializable**: the payload is stored as JSON
/// - **Owned** (`'static`): rows outlive the operation that enqueued them
/// - **Send + Sync**: the processor may run on any worker thread
pub trait InternalCommandPayload:
    Serialize + DeserializeOwned + Clone + core::fmt::Debug + Send + Sync + 'static
{
    /// Stable routing discriminator (e.g. `"EffectuateMoveIn"`).
    const KIND: &'static str;
}
