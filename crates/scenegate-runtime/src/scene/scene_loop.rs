//! Single-threaded execution domains ("scene loops").
//!
//! A [`SceneLoopGroup`] owns a fixed set of loops, created once at startup.
//! Each loop is a dedicated OS thread draining an unbounded task queue on a
//! current-thread tokio runtime, so submitted closures and fixed-rate
//! timers all execute on that one thread in FIFO order. Work for one scene
//! therefore never runs concurrently with other work for the same scene.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use scenegate_core::error::{Result, SceneGateError};

type Task = Box<dyn FnOnce() + Send + 'static>;

enum LoopTask {
    Run(Task),
    FixedRate {
        every: Duration,
        task: Box<dyn FnMut() + Send + 'static>,
        cancelled: Arc<AtomicBool>,
    },
    Stop,
}

/// Handle to one single-threaded execution domain.
#[derive(Clone)]
pub struct SceneLoop {
    name: Arc<str>,
    tx: mpsc::UnboundedSender<LoopTask>,
}

impl SceneLoop {
    /// Thread name of this loop, e.g. `scene-loop-2`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Submit a task. Tasks for one loop execute in submission order and
    /// never overlap. A task submitted to a stopped loop is dropped with a
    /// warning.
    pub fn execute<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.tx.send(LoopTask::Run(Box::new(task))).is_err() {
            tracing::warn!(scene_loop = %self.name, "loop stopped; task dropped");
        }
    }

    /// Schedule a task ticking every `every` on this loop's thread until
    /// the returned handle is cancelled.
    pub fn schedule_fixed_rate<F>(&self, every: Duration, task: F) -> ScheduledHandle
    where
        F: FnMut() + Send + 'static,
    {
        let cancelled = Arc::new(AtomicBool::new(false));
        let send = self.tx.send(LoopTask::FixedRate {
            every,
            task: Box::new(task),
            cancelled: Arc::clone(&cancelled),
        });
        if send.is_err() {
            tracing::warn!(scene_loop = %self.name, "loop stopped; timer dropped");
            cancelled.store(true, Ordering::Relaxed);
        }
        ScheduledHandle { cancelled }
    }

    fn stop(&self) {
        let _ = self.tx.send(LoopTask::Stop);
    }
}

impl std::fmt::Debug for SceneLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneLoop").field("name", &self.name).finish()
    }
}

/// Cancellation handle for a fixed-rate task.
#[derive(Debug, Clone)]
pub struct ScheduledHandle {
    cancelled: Arc<AtomicBool>,
}

impl ScheduledHandle {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Fixed pool of scene loops, handed out round-robin.
pub struct SceneLoopGroup {
    loops: Vec<SceneLoop>,
    next: AtomicUsize,
    workers: Mutex<Vec<std::thread::JoinHandle<()>>>,
}

impl SceneLoopGroup {
    /// Spawn `size` loops. The pool size is fixed for the process lifetime.
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(SceneGateError::Internal("scene loop pool cannot be empty".into()));
        }

        let mut loops = Vec::with_capacity(size);
        let mut workers = Vec::with_capacity(size);
        for i in 0..size {
            let name: Arc<str> = Arc::from(format!("scene-loop-{i}"));
            let (tx, rx) = mpsc::unbounded_channel();
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
                .map_err(|e| SceneGateError::Internal(format!("loop runtime build failed: {e}")))?;

            let worker = std::thread::Builder::new()
                .name(name.to_string())
                .spawn(move || run_loop(rt, rx))
                .map_err(|e| SceneGateError::Internal(format!("loop thread spawn failed: {e}")))?;

            loops.push(SceneLoop { name, tx });
            workers.push(worker);
        }

        Ok(Self {
            loops,
            next: AtomicUsize::new(0),
            workers: Mutex::new(workers),
        })
    }

    pub fn size(&self) -> usize {
        self.loops.len()
    }

    /// Next loop in round-robin order, wrapping modulo the pool size.
    pub fn next(&self) -> SceneLoop {
        let i = self.next.fetch_add(1, Ordering::Relaxed) % self.loops.len();
        self.loops[i].clone()
    }

    /// Stop every loop and join the worker threads. Queued tasks submitted
    /// before the stop still run.
    pub fn shutdown(&self) {
        for l in &self.loops {
            l.stop();
        }
        let workers = {
            let mut guard = self.workers.lock().unwrap_or_else(|p| p.into_inner());
            std::mem::take(&mut *guard)
        };
        for w in workers {
            if w.join().is_err() {
                tracing::error!("scene loop worker terminated abnormally");
            }
        }
    }
}

fn run_loop(rt: tokio::runtime::Runtime, mut rx: mpsc::UnboundedReceiver<LoopTask>) {
    let local = tokio::task::LocalSet::new();
    local.block_on(&rt, async move {
        while let Some(task) = rx.recv().await {
            match task {
                LoopTask::Run(f) => run_guarded(f),
                LoopTask::FixedRate {
                    every,
                    mut task,
                    cancelled,
                } => {
                    tokio::task::spawn_local(async move {
                        let mut tick = tokio::time::interval(every);
                        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                        // interval fires immediately; consume the first tick
                        // so the task first runs after one full period.
                        tick.tick().await;
                        loop {
                            tick.tick().await;
                            if cancelled.load(Ordering::Relaxed) {
                                break;
                            }
                            if catch_unwind(AssertUnwindSafe(&mut task)).is_err() {
                                tracing::error!("fixed-rate task panicked; timer cancelled");
                                break;
                            }
                        }
                    });
                }
                LoopTask::Stop => break,
            }
        }
    });
}

fn run_guarded(f: Task) {
    if catch_unwind(AssertUnwindSafe(f)).is_err() {
        tracing::error!("task panicked; scene loop continues");
    }
}
