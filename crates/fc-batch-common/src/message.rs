//! The capability the engine needs from an inbound message.
//!
//! Concrete message types (WhatsApp webhooks, whatever a transport layer
//! invents) never need to be visible here: anything that can name its user
//! and its own id can be buffered, rate-limited, batched and dispatched.

/// A message the engine can buffer and dispatch.
///
/// Implementors are expected to be cheap to clone (an `Arc<T>` around the
/// transport-layer payload, typically) since the engine stores references in
/// per-user buffers and hands ordered slices to hooks and the processor.
pub trait InboundMessage: Send + Sync + std::fmt::Debug {
    /// Stable identifier, unique per user. Used for deduplication.
    fn message_id(&self) -> &str;

    /// The user this message belongs to.
    fn user_id(&self) -> &str;
}
