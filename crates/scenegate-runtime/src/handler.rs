//! Handler traits and per-invocation contexts.
//!
//! Handlers are instantiated fresh for every inbound message by the factory
//! stored in their route descriptor, then executed inside the executor the
//! route names. The context carries everything the original connection and
//! frame provided, plus the send helpers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;

use scenegate_core::error::{Result, SceneGateError};
use scenegate_core::message::{MessageIdResolver, Packet};
use scenegate_core::protocol::FrameCodec;

use crate::transport::{self, Channel, Envelope};

/// Context for one TCP message invocation.
pub struct TcpContext {
    channel: Channel,
    message: Box<dyn Packet>,
    created_at: Instant,
    entity_id: i64,
    sequence: i32,
    resolver: Arc<MessageIdResolver>,
    codec: Arc<FrameCodec>,
}

impl TcpContext {
    pub(crate) fn new(
        channel: Channel,
        message: Box<dyn Packet>,
        entity_id: i64,
        sequence: i32,
        resolver: Arc<MessageIdResolver>,
        codec: Arc<FrameCodec>,
    ) -> Self {
        Self {
            channel,
            message,
            created_at: Instant::now(),
            entity_id,
            sequence,
            resolver,
            codec,
        }
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn message(&self) -> &dyn Packet {
        self.message.as_ref()
    }

    /// Typed view of the request message.
    pub fn request<M: Packet>(&self) -> Result<&M> {
        self.message.as_any().downcast_ref::<M>().ok_or_else(|| {
            SceneGateError::InvalidPayloadType(format!(
                "message {} is not the requested type",
                self.message.message_name()
            ))
        })
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn entity_id(&self) -> i64 {
        self.entity_id
    }

    pub fn sequence(&self) -> i32 {
        self.sequence
    }

    /// Reply to the originating client, echoing this request's sequence.
    pub fn send_client(&self, packet: &dyn Packet) -> bool {
        transport::send_client(&self.channel, packet, self.sequence, &self.resolver, &self.codec)
    }

    /// Forward a message to another server process on behalf of this
    /// request's entity.
    pub fn send_inner(&self, channel: &Channel, packet: Box<dyn Packet>) -> bool {
        let envelope = Envelope::from_packet(
            channel.clone(),
            packet,
            self.entity_id,
            self.sequence,
            &self.resolver,
        );
        transport::send_inner(channel, &envelope, &self.codec)
    }
}

/// TCP message handler. One instance per invocation; no pooling.
pub trait TcpHandler: Send {
    /// Handler name used in diagnostics.
    fn name(&self) -> &'static str;

    fn run(&mut self, ctx: &mut TcpContext) -> Result<()>;
}

/// Context for one HTTP request invocation.
pub struct HttpContext {
    channel: Channel,
    path: String,
    params: HashMap<String, String>,
    body: Bytes,
    created_at: Instant,
}

impl HttpContext {
    pub(crate) fn new(
        channel: Channel,
        path: String,
        params: HashMap<String, String>,
        body: Bytes,
    ) -> Self {
        Self {
            channel,
            path,
            params,
            body,
            created_at: Instant::now(),
        }
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    /// Request path with any query suffix already stripped.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Decoded form/query parameters.
    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Write a raw response body back on the connection.
    pub fn respond(&self, bytes: Bytes) -> bool {
        self.channel.send_bytes(bytes)
    }
}

/// HTTP request handler. One instance per invocation.
pub trait HttpHandler: Send {
    fn name(&self) -> &'static str;

    fn run(&mut self, ctx: &mut HttpContext) -> Result<()>;
}

/// Context for one RPC invocation.
pub struct RpcContext {
    path: String,
    payload: Bytes,
    created_at: Instant,
}

impl RpcContext {
    pub(crate) fn new(path: String, payload: Bytes) -> Self {
        Self {
            path,
            payload,
            created_at: Instant::now(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }
}

/// RPC handler. One instance per invocation.
pub trait RpcHandler: Send {
    fn name(&self) -> &'static str;

    fn run(&mut self, ctx: &mut RpcContext) -> Result<()>;
}

pub type TcpHandlerFactory = fn() -> Box<dyn TcpHandler>;
pub type HttpHandlerFactory = fn() -> Box<dyn HttpHandler>;
pub type RpcHandlerFactory = fn() -> Box<dyn RpcHandler>;

pub(crate) fn build_tcp<H: TcpHandler + Default + 'static>() -> Box<dyn TcpHandler> {
    Box::new(H::default())
}
