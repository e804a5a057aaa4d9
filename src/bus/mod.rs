//! Typed messaging between the background worker and the pages it controls.
mod channel;
mod envelope;
pub mod error;
mod logger;

pub use channel::{BusSubscription, MessageBus};
pub use envelope::{EnvelopeOrigin, PageMessage, WorkerEnvelope, WorkerMessage};
pub use error::{BusError, BusErrorCode, BusResult};
