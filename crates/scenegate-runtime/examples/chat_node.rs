//! Minimal routing node: one registered handler, one scene, frames fed in
//! by hand where a socket listener would normally sit.
//!
//! Run with `cargo run --example chat_node`.

use std::any::Any;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, EnvFilter};

use scenegate_core::error::{Result, SceneGateError};
use scenegate_core::message::{DecodePacket, Packet};
use scenegate_core::protocol::{FrameCodec, FrameStream};
use scenegate_runtime::config;
use scenegate_runtime::handler::{TcpContext, TcpHandler};
use scenegate_runtime::node::Node;
use scenegate_runtime::registry::TcpHandlerDescriptor;
use scenegate_runtime::scene::{Scene, SceneBinding};
use scenegate_runtime::transport::Channel;

const CONFIG: &str = r#"
version: 1
runtime:
  scene_loops: 2
message_ids:
  - { name: ChatSend, id: 100001 }
  - { name: ChatAck, id: 100002 }
"#;

#[derive(Debug, Serialize, Deserialize)]
struct ChatSend {
    text: String,
}

impl Packet for ChatSend {
    fn message_name(&self) -> &'static str {
        Self::NAME
    }

    fn to_bytes(&self) -> Vec<u8> {
        bincode::serialize(self).unwrap_or_default()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl DecodePacket for ChatSend {
    const NAME: &'static str = "ChatSend";

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| SceneGateError::Deserialization {
            msg_id: 0,
            reason: e.to_string(),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatAck {
    ok: bool,
}

impl Packet for ChatAck {
    fn message_name(&self) -> &'static str {
        Self::NAME
    }

    fn to_bytes(&self) -> Vec<u8> {
        bincode::serialize(self).unwrap_or_default()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl DecodePacket for ChatAck {
    const NAME: &'static str = "ChatAck";

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| SceneGateError::Deserialization {
            msg_id: 0,
            reason: e.to_string(),
        })
    }
}

#[derive(Default)]
struct ChatHandler;

impl TcpHandler for ChatHandler {
    fn name(&self) -> &'static str {
        "ChatHandler"
    }

    fn run(&mut self, ctx: &mut TcpContext) -> Result<()> {
        let req = ctx.request::<ChatSend>()?;
        tracing::info!(text = %req.text, entity = ctx.entity_id(), "chat received");
        ctx.send_client(&ChatAck { ok: true });
        Ok(())
    }
}

struct Lobby {
    binding: SceneBinding,
}

impl Scene for Lobby {
    fn name(&self) -> &str {
        "lobby"
    }

    fn binding(&self) -> &SceneBinding {
        &self.binding
    }

    fn binding_mut(&mut self) -> &mut SceneBinding {
        &mut self.binding
    }
}

fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cfg = config::load_from_str(CONFIG).expect("config load failed");
    let node = Node::new(&cfg).expect("node build failed");

    node.registry()
        .register_tcp(TcpHandlerDescriptor::new::<ChatSend, ChatHandler>(100_001, "lobby"))
        .expect("register failed");

    let mut lobby = Lobby {
        binding: SceneBinding::default(),
    };
    node.executors().register_scene(&mut lobby);

    // Where a socket read loop would sit: encode a request, feed the bytes
    // through the stream accumulator, dispatch the resulting frames.
    let (out_tx, mut out_rx) = tokio::sync::mpsc::channel::<Bytes>(16);
    let channel = Channel::new(1, None, out_tx);

    let wire = node
        .codec()
        .encode(100_001, 1, &ChatSend { text: "hello".into() }.to_bytes(), false)
        .expect("encode failed");

    let mut stream = FrameStream::new(FrameCodec::default());
    for frame in stream.feed(&wire).expect("framing failed") {
        node.pipeline()
            .dispatch_frame(channel.clone(), frame)
            .expect("dispatch failed");
    }

    // Give the lobby loop a beat, then drain the outbound queue.
    std::thread::sleep(std::time::Duration::from_millis(50));
    while let Ok(reply) = out_rx.try_recv() {
        tracing::info!(bytes = reply.len(), "reply frame queued for the wire");
    }

    node.shutdown();
}
