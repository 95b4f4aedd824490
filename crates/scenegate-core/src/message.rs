//! Message identity: the structured-message abstraction and msg-id
//! resolution.
//!
//! Two interchangeable strategies map a message to its numeric id, selected
//! once per process by configuration:
//! - [`MessageIdRule::FirstField`] reads an enum-valued discriminator every
//!   message type declares as its first field;
//! - [`MessageIdRule::NameTable`] looks the message type name up in a table
//!   populated at startup.
//!
//! Resolution failure is non-fatal: it logs a warning and returns id 0,
//! which the handler registry guarantees is never a registered id.

use std::any::Any;
use std::collections::HashMap;

use crate::error::Result;

/// A structured application message travelling inside frame payloads.
///
/// Implementations stay encoding-agnostic; the byte-level entry points are
/// the per-type [`PacketParser`] registered with each route and
/// [`Packet::to_bytes`] for the outbound direction.
pub trait Packet: Any + Send {
    /// Type name used by the name-table id strategy.
    fn message_name(&self) -> &'static str;

    /// Enum-valued discriminator declared as the message's first field.
    /// Required by the first-field id strategy; `None` resolves to id 0.
    fn first_field_id(&self) -> Option<i32> {
        None
    }

    /// Serialize the message body for framing.
    fn to_bytes(&self) -> Vec<u8>;

    /// Typed-downcast support for handlers.
    fn as_any(&self) -> &dyn Any;
}

/// Byte-deserialization entry point cached per route descriptor.
pub type PacketParser = fn(&[u8]) -> Result<Box<dyn Packet>>;

/// A message type that can be rebuilt from payload bytes.
///
/// Gives each type a statically known name and the parser entry point the
/// registry caches at registration time.
pub trait DecodePacket: Packet + Sized {
    /// Type name, matching [`Packet::message_name`].
    const NAME: &'static str;

    fn from_bytes(bytes: &[u8]) -> Result<Self>;
}

fn parse_into<M: DecodePacket>(bytes: &[u8]) -> Result<Box<dyn Packet>> {
    M::from_bytes(bytes).map(|m| Box::new(m) as Box<dyn Packet>)
}

/// Monomorphized parser entry point for `M`, suitable for caching in a
/// route descriptor.
pub fn packet_parser<M: DecodePacket>() -> PacketParser {
    parse_into::<M>
}

/// Message-to-id mapping rule, fixed for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageIdRule {
    /// Read the id from the message's first-field discriminator.
    FirstField,
    /// Look the message type name up in the startup-populated table.
    NameTable,
}

/// Resolves messages to numeric ids. Built once at startup and handed to
/// the dispatch pipeline and send helpers explicitly.
#[derive(Debug)]
pub struct MessageIdResolver {
    rule: MessageIdRule,
    name_ids: HashMap<String, i32>,
}

impl MessageIdResolver {
    pub fn new(rule: MessageIdRule, name_ids: HashMap<String, i32>) -> Self {
        Self { rule, name_ids }
    }

    /// Resolver for the first-field strategy; no table needed.
    pub fn first_field() -> Self {
        Self::new(MessageIdRule::FirstField, HashMap::new())
    }

    pub fn rule(&self) -> MessageIdRule {
        self.rule
    }

    /// Resolve the message id, or 0 when the message carries no usable
    /// identity under the active rule.
    pub fn resolve(&self, packet: &dyn Packet) -> i32 {
        match self.rule {
            MessageIdRule::FirstField => match packet.first_field_id() {
                Some(id) => id,
                None => {
                    tracing::warn!(
                        message = packet.message_name(),
                        "message declares no first-field discriminator"
                    );
                    0
                }
            },
            MessageIdRule::NameTable => match self.name_ids.get(packet.message_name()) {
                Some(id) => *id,
                None => {
                    tracing::warn!(
                        message = packet.message_name(),
                        "message name has no registered id"
                    );
                    0
                }
            },
        }
    }
}
