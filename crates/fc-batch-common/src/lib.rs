//! Shared scaffolding for the message batching engine: the narrow message
//! capability the engine depends on, and the logging setup every binary in
//! this workspace uses.

pub mod logging;
pub mod message;

pub use message::InboundMessage;
