//! Inbound dispatch: frame to handler execution.
//!
//! Error containment per invocation:
//! - unknown route: logged and dropped, the connection continues;
//! - payload parse failure: returned to the caller, frame discarded;
//! - handler error (or panic): logged with handler identity inside the
//!   executor, never propagated back to the transport.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;

use scenegate_core::error::{Result, SceneGateError};
use scenegate_core::message::{MessageIdResolver, Packet};
use scenegate_core::protocol::{Frame, FrameCodec};

use crate::handler::{HttpContext, RpcContext, TcpContext};
use crate::registry::HandlerRegistry;
use crate::scene::{ExecutorService, DEFAULT_EXECUTOR};
use crate::transport::{Channel, Envelope, PacketBody};

/// Routes decoded frames to handler executions. All collaborators are
/// passed in explicitly; the pipeline holds no ambient state.
pub struct DispatchPipeline {
    registry: Arc<HandlerRegistry>,
    executors: Arc<ExecutorService>,
    resolver: Arc<MessageIdResolver>,
    codec: Arc<FrameCodec>,
    slow_budget: Duration,
}

impl DispatchPipeline {
    pub fn new(
        registry: Arc<HandlerRegistry>,
        executors: Arc<ExecutorService>,
        resolver: Arc<MessageIdResolver>,
        codec: Arc<FrameCodec>,
        slow_budget: Duration,
    ) -> Self {
        Self {
            registry,
            executors,
            resolver,
            codec,
            slow_budget,
        }
    }

    /// Dispatch a client frame. The entity is not yet known at this
    /// boundary; gateway relays carry it through [`Envelope`] instead.
    pub fn dispatch_frame(&self, channel: Channel, frame: Frame) -> Result<()> {
        self.dispatch_tcp(channel, frame.msg_id, frame.sequence, 0, &frame.payload, None)
    }

    /// Dispatch a server-internal envelope.
    pub fn dispatch_envelope(&self, envelope: Envelope) -> Result<()> {
        let (channel, body, entity_id, msg_id, sequence) = envelope.into_parts();
        match body {
            PacketBody::Message(message) => {
                self.dispatch_tcp(channel, msg_id, sequence, entity_id, &[], Some(message))
            }
            PacketBody::Bytes(bytes) => {
                self.dispatch_tcp(channel, msg_id, sequence, entity_id, &bytes, None)
            }
            PacketBody::Raw(bytes) => {
                self.dispatch_tcp(channel, msg_id, sequence, entity_id, &bytes, None)
            }
        }
    }

    fn dispatch_tcp(
        &self,
        channel: Channel,
        msg_id: i32,
        sequence: i32,
        entity_id: i64,
        payload: &[u8],
        parsed: Option<Box<dyn Packet>>,
    ) -> Result<()> {
        let Some(descriptor) = self.registry.tcp_descriptor(msg_id) else {
            tracing::warn!(
                msg_id,
                remote = %channel.remote_addr(),
                "message has no registered handler; frame dropped"
            );
            return Ok(());
        };

        let message = match parsed {
            Some(message) => message,
            None => (descriptor.parser)(payload).map_err(|e| SceneGateError::Deserialization {
                msg_id,
                reason: e.to_string(),
            })?,
        };

        let mut handler = (descriptor.factory)();
        let mut ctx = TcpContext::new(
            channel,
            message,
            entity_id,
            sequence,
            Arc::clone(&self.resolver),
            Arc::clone(&self.codec),
        );

        let slow_budget = self.slow_budget;
        self.executors.execute(&descriptor.executor, move || {
            let started = Instant::now();
            if let Err(e) = handler.run(&mut ctx) {
                tracing::error!(
                    handler = handler.name(),
                    entity_id = ctx.entity_id(),
                    "handler failed: {e}"
                );
            }
            warn_slow(handler.name(), started.elapsed(), slow_budget);
        });
        Ok(())
    }

    /// Dispatch an HTTP request by path. Runs on the generic I/O executor.
    pub fn dispatch_http(
        &self,
        channel: Channel,
        uri: &str,
        params: HashMap<String, String>,
        body: Bytes,
    ) -> Result<()> {
        let Some(descriptor) = self.registry.http_descriptor(uri) else {
            tracing::warn!(
                uri,
                remote = %channel.remote_addr(),
                "path has no registered handler; request dropped"
            );
            return Ok(());
        };

        let mut handler = (descriptor.factory)();
        let mut ctx = HttpContext::new(channel, descriptor.path.clone(), params, body);

        let slow_budget = self.slow_budget;
        self.executors.execute(DEFAULT_EXECUTOR, move || {
            let started = Instant::now();
            if let Err(e) = handler.run(&mut ctx) {
                tracing::error!(handler = handler.name(), path = ctx.path(), "handler failed: {e}");
            }
            warn_slow(handler.name(), started.elapsed(), slow_budget);
        });
        Ok(())
    }

    /// Dispatch an RPC invocation by path. Runs on the generic I/O
    /// executor.
    pub fn dispatch_rpc(&self, path: &str, payload: Bytes) -> Result<()> {
        let Some(descriptor) = self.registry.rpc_descriptor(path) else {
            tracing::warn!(path, "path has no registered handler; call dropped");
            return Ok(());
        };

        let mut handler = (descriptor.factory)();
        let mut ctx = RpcContext::new(descriptor.path.clone(), payload);

        let slow_budget = self.slow_budget;
        self.executors.execute(DEFAULT_EXECUTOR, move || {
            let started = Instant::now();
            if let Err(e) = handler.run(&mut ctx) {
                tracing::error!(handler = handler.name(), path = ctx.path(), "handler failed: {e}");
            }
            warn_slow(handler.name(), started.elapsed(), slow_budget);
        });
        Ok(())
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    pub fn executors(&self) -> &Arc<ExecutorService> {
        &self.executors
    }
}

fn warn_slow(handler: &str, elapsed: Duration, budget: Duration) {
    if elapsed > budget {
        tracing::warn!(
            handler,
            elapsed_ms = elapsed.as_millis() as u64,
            budget_ms = budget.as_millis() as u64,
            "slow handler"
        );
    }
}
