//! Outbound EDI concerns: turning rule violations into `(code, text)`
//! rejection reasons and shaping acknowledgement / reject documents.

pub mod converters;
pub mod documents;
pub mod error_message;
pub mod registry;

pub use converters::market_error_converters;
pub use documents::{ActivityRecord, DocumentHeader, MarketDocument, MarketParticipant, ProcessType};
pub use error_message::OutboundErrorMessage;
pub use registry::{Converter, ErrorConverterRegistry, RegistryError};
