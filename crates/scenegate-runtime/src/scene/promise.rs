//! Completion primitive bound to one scene loop.
//!
//! `set_success`/`set_failure` may be called from any thread; every
//! listener runs on the bound loop's thread, preserving the single-writer
//! guarantee for scene state touched from completion callbacks.

use std::sync::{Arc, Mutex};

use scenegate_core::error::SceneGateError;

use super::scene_loop::SceneLoop;

type Completion = std::result::Result<(), SceneGateError>;
type Listener = Box<dyn FnOnce(&Completion) + Send + 'static>;

enum State {
    Pending(Vec<Listener>),
    Done(Arc<Completion>),
}

/// A future whose listeners execute inside the owning scene's loop.
#[derive(Clone)]
pub struct ScenePromise {
    state: Arc<Mutex<State>>,
    scene_loop: SceneLoop,
    voided: bool,
}

impl ScenePromise {
    pub fn new(scene_loop: SceneLoop) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::Pending(Vec::new()))),
            scene_loop,
            voided: false,
        }
    }

    /// Fire-and-forget variant: completions are recorded but listeners are
    /// rejected until [`ScenePromise::unvoid`].
    pub fn void(scene_loop: SceneLoop) -> Self {
        Self {
            voided: true,
            ..Self::new(scene_loop)
        }
    }

    pub fn is_void(&self) -> bool {
        self.voided
    }

    /// Writable view of a void promise; a non-void promise returns itself.
    pub fn unvoid(&self) -> ScenePromise {
        let mut p = self.clone();
        p.voided = false;
        p
    }

    /// Loop whose thread runs the listeners.
    pub fn scene_loop(&self) -> &SceneLoop {
        &self.scene_loop
    }

    /// Complete successfully. Returns false when already completed.
    pub fn set_success(&self) -> bool {
        self.complete(Ok(()))
    }

    /// Same as [`ScenePromise::set_success`]; kept for call sites racing
    /// several writers.
    pub fn try_success(&self) -> bool {
        self.complete(Ok(()))
    }

    /// Complete with an error. Returns false when already completed.
    pub fn set_failure(&self, err: SceneGateError) -> bool {
        self.complete(Err(err))
    }

    /// Attach a listener. Runs on the bound loop's thread, immediately if
    /// the promise is already complete. Void promises drop listeners with
    /// a warning.
    pub fn add_listener<F>(&self, listener: F)
    where
        F: FnOnce(&Completion) + Send + 'static,
    {
        if self.voided {
            tracing::warn!(
                scene_loop = self.scene_loop.name(),
                "listener added to a void promise; dropped"
            );
            return;
        }
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        match &mut *state {
            State::Pending(listeners) => listeners.push(Box::new(listener)),
            State::Done(result) => {
                let result = Arc::clone(result);
                self.scene_loop.execute(move || listener(&result));
            }
        }
    }

    pub fn is_done(&self) -> bool {
        let state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        matches!(&*state, State::Done(_))
    }

    pub fn is_success(&self) -> bool {
        let state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        matches!(&*state, State::Done(r) if r.is_ok())
    }

    fn complete(&self, result: Completion) -> bool {
        let listeners = {
            let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
            match &mut *state {
                State::Done(_) => return false,
                State::Pending(listeners) => {
                    let listeners = std::mem::take(listeners);
                    *state = State::Done(Arc::new(result));
                    listeners
                }
            }
        };
        // Listener notification is a re-submission onto the owning loop.
        if !listeners.is_empty() {
            let result = {
                let state = self.state.lock().unwrap_or_else(|p| p.into_inner());
                match &*state {
                    State::Done(r) => Arc::clone(r),
                    State::Pending(_) => return true,
                }
            };
            for listener in listeners {
                let result = Arc::clone(&result);
                self.scene_loop.execute(move || listener(&result));
            }
        }
        true
    }
}
