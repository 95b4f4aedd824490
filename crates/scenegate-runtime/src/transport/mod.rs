//! Transport boundary: connection handles, outbound send helpers, and the
//! internal envelope format.
//!
//! The socket listeners live outside this crate. They hand inbound bytes
//! to a [`scenegate_core::protocol::FrameStream`] and drain a channel's
//! outbound queue into the wire; everything in between is this module's
//! contract. Send failures are reported as booleans, never as panics into
//! the routing core.

pub mod channel;
pub mod envelope;

pub use channel::Channel;
pub use envelope::{Envelope, PacketBody, UserMessage};

use scenegate_core::message::{MessageIdResolver, Packet};
use scenegate_core::protocol::FrameCodec;

/// Send a structured message to a client connection, framed with the
/// 16-byte header. Returns false when the connection is gone.
pub fn send_client(
    channel: &Channel,
    packet: &dyn Packet,
    sequence: i32,
    resolver: &MessageIdResolver,
    codec: &FrameCodec,
) -> bool {
    let msg_id = resolver.resolve(packet);
    let bytes = packet.to_bytes();
    match codec.encode(msg_id, sequence, &bytes, false) {
        Ok(wire) => channel.send_bytes(wire),
        Err(e) => {
            tracing::error!(msg_id, "encode failed: {e}");
            false
        }
    }
}

/// Send pre-encrypted payload bytes to a client connection; the encrypted
/// flag rides in bit 30 of the length word.
pub fn send_client_encrypted(
    channel: &Channel,
    payload: &[u8],
    sequence: i32,
    msg_id: i32,
    codec: &FrameCodec,
) -> bool {
    match codec.encode(msg_id, sequence, payload, true) {
        Ok(wire) => channel.send_bytes(wire),
        Err(e) => {
            tracing::error!(msg_id, "encode failed: {e}");
            false
        }
    }
}

/// Relay an internal envelope to another server process. The entity id
/// travels as an 8-byte prefix of the frame payload.
pub fn send_inner(channel: &Channel, envelope: &Envelope, codec: &FrameCodec) -> bool {
    if !channel.is_active() {
        tracing::warn!(
            channel = channel.id(),
            msg_id = envelope.msg_id(),
            "inner send failed, connection inactive"
        );
        return false;
    }
    let payload = envelope.to_frame_payload();
    match codec.encode(envelope.msg_id(), envelope.sequence(), &payload, false) {
        Ok(wire) => channel.send_bytes(wire),
        Err(e) => {
            tracing::error!(msg_id = envelope.msg_id(), "encode failed: {e}");
            false
        }
    }
}
