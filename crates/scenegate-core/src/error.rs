//! Shared error type across scenegate crates.

use thiserror::Error;

/// Shared result type.
pub type Result<T> = std::result::Result<T, SceneGateError>;

/// Unified error type used by the core protocol and the routing runtime.
#[derive(Debug, Error)]
pub enum SceneGateError {
    /// Fatal framing error. The offending connection must be closed.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
    /// Frame payload exceeds the configured ceiling. Fatal per connection.
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },
    /// No handler registered for the message id or path.
    #[error("no route for {0}")]
    UnknownRoute(String),
    /// Payload bytes did not parse into the registered message type.
    #[error("deserialization failed for message {msg_id}: {reason}")]
    Deserialization { msg_id: i32, reason: String },
    /// A handler returned an error. Contained at the dispatch boundary.
    #[error("handler {handler} failed: {reason}")]
    HandlerFailed { handler: String, reason: String },
    /// A TCP route candidate carried no byte-parser for its message type.
    #[error("message type {0} exposes no parser")]
    NoParserAvailable(String),
    /// Message id 0 is reserved for failed identity resolution.
    #[error("message id {0} is not registrable")]
    InvalidMessageId(i32),
    /// Envelope payload was not one of the accepted representations, or a
    /// typed downcast at dispatch did not match the registered type.
    #[error("invalid payload type: {0}")]
    InvalidPayloadType(String),
    /// Connection was not active at send time.
    #[error("channel {0} inactive")]
    ChannelInactive(u64),
    /// Configuration failed to parse or validate.
    #[error("config: {0}")]
    Config(String),
    /// Internal invariant failure.
    #[error("internal: {0}")]
    Internal(String),
}

impl SceneGateError {
    /// True when the error must close the offending connection.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SceneGateError::ProtocolViolation(_) | SceneGateError::PayloadTooLarge { .. }
        )
    }
}
