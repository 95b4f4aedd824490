//! Named-executor registry over the scene-loop pool.

use dashmap::DashMap;

use scenegate_core::error::Result;

use super::scene_loop::{SceneLoop, SceneLoopGroup};
use super::Scene;

/// Name of the generic I/O executor registered at startup. Handlers that
/// declare no executor run here.
pub const DEFAULT_EXECUTOR: &str = "io";

/// Maps logical executor names to scene loops. Read on every dispatch,
/// written at startup and on scene lifecycle events.
pub struct ExecutorService {
    executors: DashMap<String, SceneLoop>,
    group: SceneLoopGroup,
}

impl ExecutorService {
    /// Create the fixed loop pool and register the default I/O executor.
    pub fn new(pool_size: usize) -> Result<Self> {
        let group = SceneLoopGroup::new(pool_size)?;
        let executors = DashMap::new();
        executors.insert(DEFAULT_EXECUTOR.to_string(), group.next());
        Ok(Self { executors, group })
    }

    pub fn register(&self, name: impl Into<String>, scene_loop: SceneLoop) {
        self.executors.insert(name.into(), scene_loop);
    }

    pub fn executor(&self, name: &str) -> Option<SceneLoop> {
        self.executors.get(name).map(|e| e.value().clone())
    }

    /// Submit a task to the named executor. An unregistered name drops the
    /// task with a warning; it is never an error.
    pub fn execute<F>(&self, name: &str, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        match self.executor(name) {
            Some(l) => l.execute(task),
            None => tracing::warn!(executor = name, "executor not registered; task dropped"),
        }
    }

    /// Bind a scene to the next loop in round-robin order and publish its
    /// executor name. Returns the bound loop.
    pub fn register_scene(&self, scene: &mut dyn Scene) -> SceneLoop {
        let scene_loop = self.group.next();
        tracing::info!(
            scene = scene.name(),
            scene_loop = scene_loop.name(),
            "scene bound"
        );
        scene.binding_mut().register(scene_loop.clone());
        self.executors.insert(scene.name().to_string(), scene_loop.clone());
        scene_loop
    }

    /// Remove the executor-name entry only; the loop keeps serving its
    /// other scenes.
    pub fn remove_scene(&self, name: &str) {
        self.executors.remove(name);
    }

    /// Tear a scene down: cancel its timers, drop its binding, and remove
    /// its executor entry.
    pub fn destroy_scene(&self, scene: &mut dyn Scene) {
        scene.binding_mut().unbind();
        self.executors.remove(scene.name());
        tracing::info!(scene = scene.name(), "scene destroyed");
    }

    pub fn pool_size(&self) -> usize {
        self.group.size()
    }

    /// Stop every loop and join the workers.
    pub fn shutdown(&self) {
        self.group.shutdown();
    }
}
