//! Length-prefixed binary frame parsing (panic-free).
//!
//! Wire format, all fields little-endian:
//! - `i32 length` — byte count of everything after this field; bit 30 is
//!   the encrypted flag and must be masked off before numeric use
//! - `i32 msg_id`
//! - `i32 reserved` (always 0)
//! - `i32 sequence`
//! - `length - 12` payload bytes
//!
//! Parsing rules:
//! - Never index (`buf[0]`) without a length guard — use `Buf` and
//!   `remaining()` checks.
//! - Never `unwrap()` / `expect()` / `panic!()` in production paths.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Result, SceneGateError};

/// Full header size: length + msg id + reserved + sequence.
pub const FRAME_HEADER_LEN: usize = 16;

/// Header bytes counted by the length field (everything after it).
pub const FRAME_HEADER_AFTER_LEN: usize = 12;

/// Bit 30 of the length word: payload is encrypted.
pub const ENCRYPTED_FLAG: u32 = 0x4000_0000;

/// Hard ceiling on payload size. Frames above it are a protocol violation.
pub const DEFAULT_MAX_PAYLOAD: usize = 35_000;

/// MTU-driven soft threshold. Payloads above it should be split across
/// frames; splitting and reassembly are not implemented, senders only get
/// a debug note.
pub const DEFAULT_SPLIT_THRESHOLD: usize = 1_300;

/// Client message ids below this are outside the routed protocol range.
pub const MIN_CLIENT_MSG_ID: i32 = 99_999;

/// One complete length-delimited unit of the wire protocol.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Message id.
    pub msg_id: i32,
    /// Sequence number.
    pub sequence: i32,
    /// Encrypted flag carried in bit 30 of the length word.
    pub encrypted: bool,
    /// Opaque payload (zero-copy).
    pub payload: Bytes,
}

/// Frame encoder/decoder with configurable size limits.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_payload: usize,
    split_threshold: usize,
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self {
            max_payload: DEFAULT_MAX_PAYLOAD,
            split_threshold: DEFAULT_SPLIT_THRESHOLD,
        }
    }
}

impl FrameCodec {
    pub fn new(max_payload: usize, split_threshold: usize) -> Self {
        Self {
            max_payload,
            split_threshold,
        }
    }

    pub fn max_payload(&self) -> usize {
        self.max_payload
    }

    /// Decode one frame from the front of `buf`.
    ///
    /// Returns `Ok(None)` when more bytes are needed; the read position is
    /// left untouched so the caller can re-invoke once the transport
    /// delivers more data. Fatal errors mean the connection is
    /// protocol-invalid and must be closed.
    pub fn decode(&self, buf: &mut BytesMut) -> Result<Option<Frame>> {
        if buf.len() < 4 {
            return Ok(None);
        }

        let mut peek = &buf[..];
        let raw = peek.get_i32_le();
        let encrypted = (raw as u32 & ENCRYPTED_FLAG) != 0;
        // Mask the flag bit only; a negative length stays negative.
        let length = raw & !(ENCRYPTED_FLAG as i32);

        if length < FRAME_HEADER_AFTER_LEN as i32 {
            return Err(SceneGateError::ProtocolViolation(format!(
                "frame length {length} cannot hold a {FRAME_HEADER_AFTER_LEN}-byte header"
            )));
        }
        let body_len = length as usize;
        let payload_len = body_len - FRAME_HEADER_AFTER_LEN;
        if payload_len > self.max_payload {
            return Err(SceneGateError::PayloadTooLarge {
                size: payload_len,
                max: self.max_payload,
            });
        }

        // Body not fully buffered yet; rewind by not consuming anything.
        if buf.len() < 4 + body_len {
            return Ok(None);
        }

        buf.advance(4);
        let mut body = buf.split_to(body_len).freeze();
        let msg_id = body.get_i32_le();
        let _reserved = body.get_i32_le();
        let sequence = body.get_i32_le();

        Ok(Some(Frame {
            msg_id,
            sequence,
            encrypted,
            payload: body,
        }))
    }

    /// Encode a frame: 16-byte header followed by the payload.
    pub fn encode(
        &self,
        msg_id: i32,
        sequence: i32,
        payload: &[u8],
        encrypted: bool,
    ) -> Result<Bytes> {
        if payload.len() > self.max_payload {
            return Err(SceneGateError::PayloadTooLarge {
                size: payload.len(),
                max: self.max_payload,
            });
        }
        if payload.len() > self.split_threshold {
            tracing::debug!(
                msg_id,
                len = payload.len(),
                threshold = self.split_threshold,
                "payload exceeds the MTU split threshold; sent as a single frame"
            );
        }

        let mut buf = BytesMut::with_capacity(FRAME_HEADER_LEN + payload.len());
        let mut length = (FRAME_HEADER_AFTER_LEN + payload.len()) as i32;
        if encrypted {
            length |= ENCRYPTED_FLAG as i32;
        }
        buf.put_i32_le(length);
        buf.put_i32_le(msg_id);
        buf.put_i32_le(0);
        buf.put_i32_le(sequence);
        buf.put_slice(payload);
        Ok(buf.freeze())
    }
}

/// Per-connection accumulator: feeds transport bytes in, drains complete
/// frames out. A fatal decode error poisons the stream; the owning
/// connection must be closed.
#[derive(Debug, Default)]
pub struct FrameStream {
    codec: FrameCodec,
    buf: BytesMut,
    poisoned: bool,
}

impl FrameStream {
    pub fn new(codec: FrameCodec) -> Self {
        Self {
            codec,
            buf: BytesMut::new(),
            poisoned: false,
        }
    }

    /// Append raw bytes and drain every complete frame now available.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<Vec<Frame>> {
        if self.poisoned {
            return Err(SceneGateError::ProtocolViolation(
                "stream already poisoned".into(),
            ));
        }
        self.buf.extend_from_slice(bytes);

        let mut frames = Vec::new();
        loop {
            match self.codec.decode(&mut self.buf) {
                Ok(Some(frame)) => frames.push(frame),
                Ok(None) => break,
                Err(e) => {
                    self.poisoned = true;
                    return Err(e);
                }
            }
        }
        Ok(frames)
    }

    /// Bytes buffered but not yet framed.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

/// Peek a message id out of a raw buffer without consuming it, for
/// gateway-style relaying. Ids below the routed range get a warning.
pub fn read_msg_id(bytes: &[u8], offset: usize) -> Option<i32> {
    let mut slice = bytes.get(offset..offset.checked_add(4)?)?;
    let msg_id = slice.get_i32_le();
    if msg_id < MIN_CLIENT_MSG_ID {
        tracing::warn!(offset, msg_id, "message id outside the routed protocol range");
    }
    Some(msg_id)
}

/// Peek an 8-byte entity id out of a raw buffer.
pub fn read_entity_id(bytes: &[u8], offset: usize) -> Option<i64> {
    let mut slice = bytes.get(offset..offset.checked_add(8)?)?;
    Some(slice.get_i64_le())
}
