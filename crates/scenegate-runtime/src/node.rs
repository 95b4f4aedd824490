//! Wired routing core for one server process.
//!
//! Builds the registry, the scene-loop pool, the id resolver, and the
//! dispatch pipeline from one validated config. Transport adapters take a
//! [`Node`] and feed it decoded frames; the hot-reload loader takes its
//! registry handle and feeds it handler candidates.

use std::sync::Arc;
use std::time::Duration;

use scenegate_core::error::Result;
use scenegate_core::message::MessageIdResolver;
use scenegate_core::protocol::FrameCodec;

use crate::config::ServerConfig;
use crate::dispatch::DispatchPipeline;
use crate::registry::HandlerRegistry;
use crate::scene::ExecutorService;

pub struct Node {
    registry: Arc<HandlerRegistry>,
    executors: Arc<ExecutorService>,
    resolver: Arc<MessageIdResolver>,
    codec: Arc<FrameCodec>,
    pipeline: Arc<DispatchPipeline>,
}

impl Node {
    /// Build the routing core. Returns `Err` instead of panicking so the
    /// host binary can report startup failures.
    pub fn new(cfg: &ServerConfig) -> Result<Self> {
        let registry = Arc::new(HandlerRegistry::new());
        let executors = Arc::new(ExecutorService::new(cfg.runtime.scene_loops)?);
        let resolver = Arc::new(cfg.resolver());
        let codec = Arc::new(cfg.codec());

        let pipeline = Arc::new(DispatchPipeline::new(
            Arc::clone(&registry),
            Arc::clone(&executors),
            Arc::clone(&resolver),
            Arc::clone(&codec),
            Duration::from_millis(cfg.runtime.slow_handler_budget_ms),
        ));

        Ok(Self {
            registry,
            executors,
            resolver,
            codec,
            pipeline,
        })
    }

    pub fn registry(&self) -> Arc<HandlerRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn executors(&self) -> Arc<ExecutorService> {
        Arc::clone(&self.executors)
    }

    pub fn resolver(&self) -> Arc<MessageIdResolver> {
        Arc::clone(&self.resolver)
    }

    pub fn codec(&self) -> Arc<FrameCodec> {
        Arc::clone(&self.codec)
    }

    pub fn pipeline(&self) -> Arc<DispatchPipeline> {
        Arc::clone(&self.pipeline)
    }

    /// Stop the scene loops and join their workers.
    pub fn shutdown(&self) {
        self.executors.shutdown();
    }
}
