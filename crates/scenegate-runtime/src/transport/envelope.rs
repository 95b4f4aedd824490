//! Internal envelope: correlates a message with its originating entity
//! across process boundaries (gateway to game-logic server and back).

use bytes::{BufMut, Bytes, BytesMut};

use scenegate_core::error::{Result, SceneGateError};
use scenegate_core::message::{MessageIdResolver, Packet};
use scenegate_core::protocol::frame::read_entity_id;
use scenegate_core::protocol::Frame;

use super::channel::Channel;

/// The accepted payload representations of an envelope.
pub enum PacketBody {
    /// Already-typed structured message.
    Message(Box<dyn Packet>),
    /// Zero-copy payload slice.
    Bytes(Bytes),
    /// Owned raw bytes.
    Raw(Vec<u8>),
}

impl PacketBody {
    /// Serialized form of the body.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            PacketBody::Message(m) => m.to_bytes(),
            PacketBody::Bytes(b) => b.to_vec(),
            PacketBody::Raw(v) => v.clone(),
        }
    }
}

impl std::fmt::Debug for PacketBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PacketBody::Message(m) => f.write_fmt(format_args!("Message({})", m.message_name())),
            PacketBody::Bytes(b) => f.write_fmt(format_args!("Bytes({} bytes)", b.len())),
            PacketBody::Raw(v) => f.write_fmt(format_args!("Raw({} bytes)", v.len())),
        }
    }
}

/// Server-internal message: payload plus originating channel, entity id,
/// message id, and sequence. Immutable after construction.
#[derive(Debug)]
pub struct Envelope {
    channel: Channel,
    body: PacketBody,
    entity_id: i64,
    msg_id: i32,
    sequence: i32,
}

impl Envelope {
    pub fn new(
        channel: Channel,
        body: PacketBody,
        entity_id: i64,
        msg_id: i32,
        sequence: i32,
    ) -> Self {
        Self {
            channel,
            body,
            entity_id,
            msg_id,
            sequence,
        }
    }

    /// Wrap a typed message, resolving its id through the active rule.
    pub fn from_packet(
        channel: Channel,
        packet: Box<dyn Packet>,
        entity_id: i64,
        sequence: i32,
        resolver: &MessageIdResolver,
    ) -> Self {
        let msg_id = resolver.resolve(packet.as_ref());
        Self::new(channel, PacketBody::Message(packet), entity_id, msg_id, sequence)
    }

    /// Rebuild an envelope from a relayed frame. The entity id is the
    /// 8-byte payload prefix written by [`super::send_inner`].
    pub fn from_frame(channel: Channel, frame: Frame) -> Result<Self> {
        let entity_id = read_entity_id(&frame.payload, 0).ok_or_else(|| {
            SceneGateError::InvalidPayloadType(format!(
                "inner frame {} payload too short for an entity id",
                frame.msg_id
            ))
        })?;
        let body = PacketBody::Bytes(frame.payload.slice(8..));
        Ok(Self::new(channel, body, entity_id, frame.msg_id, frame.sequence))
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn body(&self) -> &PacketBody {
        &self.body
    }

    pub fn entity_id(&self) -> i64 {
        self.entity_id
    }

    pub fn msg_id(&self) -> i32 {
        self.msg_id
    }

    pub fn sequence(&self) -> i32 {
        self.sequence
    }

    /// Frame payload for relaying: entity id prefix plus the body bytes.
    pub fn to_frame_payload(&self) -> Bytes {
        let body = self.body.to_bytes();
        let mut buf = BytesMut::with_capacity(8 + body.len());
        buf.put_i64_le(self.entity_id);
        buf.put_slice(&body);
        buf.freeze()
    }

    pub(crate) fn into_parts(self) -> (Channel, PacketBody, i64, i32, i32) {
        (self.channel, self.body, self.entity_id, self.msg_id, self.sequence)
    }
}

/// Gateway-side cache entry for replaying client traffic after a
/// reconnect: the frame identity without the connection.
#[derive(Debug, Clone)]
pub struct UserMessage {
    pub msg_id: i32,
    pub sequence: i32,
    pub bytes: Bytes,
}

impl UserMessage {
    pub fn new(msg_id: i32, sequence: i32, bytes: Bytes) -> Self {
        Self {
            msg_id,
            sequence,
            bytes,
        }
    }
}
