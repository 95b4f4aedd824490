//! Scenes and their execution affinity.
//!
//! A scene is a stateful server-side entity (room, zone, battlefield) that
//! owns exactly one scene loop at a time. Binding happens through
//! [`ExecutorService::register_scene`]; from then on every task and timer
//! touching the scene's state must be submitted through its bound loop.

pub mod executors;
pub mod promise;
pub mod scene_loop;

pub use executors::{ExecutorService, DEFAULT_EXECUTOR};
pub use promise::ScenePromise;
pub use scene_loop::{SceneLoop, SceneLoopGroup, ScheduledHandle};

use std::time::Duration;

/// Loop binding and timer bookkeeping embedded by every scene.
#[derive(Debug, Default)]
pub struct SceneBinding {
    scene_loop: Option<SceneLoop>,
    timers: Vec<ScheduledHandle>,
}

impl SceneBinding {
    pub fn is_registered(&self) -> bool {
        self.scene_loop.is_some()
    }

    pub fn scene_loop(&self) -> Option<&SceneLoop> {
        self.scene_loop.as_ref()
    }

    pub(crate) fn register(&mut self, scene_loop: SceneLoop) {
        self.scene_loop = Some(scene_loop);
    }

    /// Run a task on the bound loop. Unbound scenes drop the task with a
    /// warning, mirroring the missing-executor contract.
    pub fn execute<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        match &self.scene_loop {
            Some(l) => l.execute(task),
            None => tracing::warn!("scene not bound to a loop; task dropped"),
        }
    }

    /// Schedule a fixed-rate task on the bound loop and track it for
    /// cancellation at scene destruction.
    pub fn schedule_fixed_rate<F>(&mut self, every: Duration, task: F) -> Option<ScheduledHandle>
    where
        F: FnMut() + Send + 'static,
    {
        match &self.scene_loop {
            Some(l) => {
                let handle = l.schedule_fixed_rate(every, task);
                self.timers.push(handle.clone());
                Some(handle)
            }
            None => {
                tracing::warn!("scene not bound to a loop; timer dropped");
                None
            }
        }
    }

    /// Cancel every tracked timer. Called when the scene is destroyed so
    /// stale timers cannot fire against dead state.
    pub fn cancel_timers(&mut self) {
        for t in self.timers.drain(..) {
            t.cancel();
        }
    }

    pub(crate) fn unbind(&mut self) {
        self.cancel_timers();
        self.scene_loop = None;
    }
}

/// A stateful entity requiring serialized, single-threaded access.
pub trait Scene: Send {
    /// Logical executor name this scene is published under.
    fn name(&self) -> &str;

    fn binding(&self) -> &SceneBinding;

    fn binding_mut(&mut self) -> &mut SceneBinding;
}
