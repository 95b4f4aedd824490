//! Scene-loop affinity and promise-threading tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

use scenegate_runtime::scene::{
    ExecutorService, Scene, SceneBinding, SceneLoopGroup, ScenePromise, DEFAULT_EXECUTOR,
};

struct Room {
    name: String,
    binding: SceneBinding,
}

impl Room {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            binding: SceneBinding::default(),
        }
    }
}

impl Scene for Room {
    fn name(&self) -> &str {
        &self.name
    }

    fn binding(&self) -> &SceneBinding {
        &self.binding
    }

    fn binding_mut(&mut self) -> &mut SceneBinding {
        &mut self.binding
    }
}

/// Submit a no-op task and wait for it, draining everything queued before.
fn flush(executors: &ExecutorService, name: &str) {
    let (tx, rx) = mpsc::channel();
    executors.execute(name, move || {
        let _ = tx.send(());
    });
    rx.recv_timeout(Duration::from_secs(5)).expect("flush task must run");
}

#[test]
fn round_robin_assignment_wraps() {
    let group = SceneLoopGroup::new(3).unwrap();
    let first: Vec<String> = (0..3).map(|_| group.next().name().to_string()).collect();
    let second: Vec<String> = (0..3).map(|_| group.next().name().to_string()).collect();

    // All three loops handed out once, then the cycle repeats.
    let mut sorted = first.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(sorted.len(), 3);
    assert_eq!(first, second);
    group.shutdown();
}

#[test]
fn same_scene_tasks_never_overlap() {
    let executors = Arc::new(ExecutorService::new(2).unwrap());
    let mut room = Room::new("room-overlap");
    executors.register_scene(&mut room);

    // Non-reentrant guard: entering while another task is inside trips it.
    let inside = Arc::new(AtomicBool::new(false));
    let violations = Arc::new(AtomicUsize::new(0));
    let done = Arc::new(AtomicUsize::new(0));

    let mut sources = Vec::new();
    for _ in 0..2 {
        let executors = Arc::clone(&executors);
        let inside = Arc::clone(&inside);
        let violations = Arc::clone(&violations);
        let done = Arc::clone(&done);
        sources.push(std::thread::spawn(move || {
            for _ in 0..50 {
                let inside = Arc::clone(&inside);
                let violations = Arc::clone(&violations);
                let done = Arc::clone(&done);
                executors.execute("room-overlap", move || {
                    if inside.swap(true, Ordering::SeqCst) {
                        violations.fetch_add(1, Ordering::SeqCst);
                    }
                    std::thread::sleep(Duration::from_micros(200));
                    inside.store(false, Ordering::SeqCst);
                    done.fetch_add(1, Ordering::SeqCst);
                });
            }
        }));
    }
    for s in sources {
        s.join().unwrap();
    }
    flush(&executors, "room-overlap");

    assert_eq!(done.load(Ordering::SeqCst), 100);
    assert_eq!(violations.load(Ordering::SeqCst), 0);
    executors.shutdown();
}

#[test]
fn tasks_run_in_submission_order() {
    let executors = ExecutorService::new(1).unwrap();
    let order = Arc::new(Mutex::new(Vec::new()));
    for i in 0..20 {
        let order = Arc::clone(&order);
        executors.execute(DEFAULT_EXECUTOR, move || {
            order.lock().unwrap().push(i);
        });
    }
    flush(&executors, DEFAULT_EXECUTOR);
    assert_eq!(*order.lock().unwrap(), (0..20).collect::<Vec<_>>());
    executors.shutdown();
}

#[test]
fn unknown_executor_drops_task_silently() {
    let executors = ExecutorService::new(1).unwrap();
    let ran = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&ran);
    executors.execute("never-registered", move || {
        flag.store(true, Ordering::SeqCst);
    });
    flush(&executors, DEFAULT_EXECUTOR);
    assert!(!ran.load(Ordering::SeqCst));
    executors.shutdown();
}

#[test]
fn scene_registration_publishes_and_unregisters() {
    let executors = ExecutorService::new(2).unwrap();
    let mut room = Room::new("room-life");

    assert!(!room.binding().is_registered());
    assert!(executors.executor("room-life").is_none());

    let bound = executors.register_scene(&mut room);
    assert!(room.binding().is_registered());
    assert_eq!(
        executors.executor("room-life").map(|l| l.name().to_string()),
        Some(bound.name().to_string())
    );

    executors.remove_scene("room-life");
    assert!(executors.executor("room-life").is_none());
    executors.shutdown();
}

#[test]
fn panicking_task_does_not_kill_the_loop() {
    let executors = ExecutorService::new(1).unwrap();
    executors.execute(DEFAULT_EXECUTOR, || panic!("handler bug"));

    let ran = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&ran);
    executors.execute(DEFAULT_EXECUTOR, move || {
        flag.store(true, Ordering::SeqCst);
    });
    flush(&executors, DEFAULT_EXECUTOR);
    assert!(ran.load(Ordering::SeqCst));
    executors.shutdown();
}

#[test]
fn fixed_rate_timer_ticks_until_cancelled() {
    let executors = ExecutorService::new(1).unwrap();
    let mut room = Room::new("room-timer");
    executors.register_scene(&mut room);

    let ticks = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&ticks);
    let handle = room
        .binding_mut()
        .schedule_fixed_rate(Duration::from_millis(20), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .expect("scene is bound");

    std::thread::sleep(Duration::from_millis(150));
    assert!(ticks.load(Ordering::SeqCst) >= 3);

    handle.cancel();
    std::thread::sleep(Duration::from_millis(60));
    let after_cancel = ticks.load(Ordering::SeqCst);
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(ticks.load(Ordering::SeqCst), after_cancel);
    executors.shutdown();
}

#[test]
fn destroying_a_scene_cancels_its_timers() {
    let executors = ExecutorService::new(1).unwrap();
    let mut room = Room::new("room-destroy");
    executors.register_scene(&mut room);

    let ticks = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&ticks);
    room.binding_mut()
        .schedule_fixed_rate(Duration::from_millis(20), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .expect("scene is bound");

    std::thread::sleep(Duration::from_millis(90));
    executors.destroy_scene(&mut room);
    assert!(executors.executor("room-destroy").is_none());
    assert!(!room.binding().is_registered());

    std::thread::sleep(Duration::from_millis(60));
    let after_destroy = ticks.load(Ordering::SeqCst);
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(ticks.load(Ordering::SeqCst), after_destroy);
    executors.shutdown();
}

#[test]
fn promise_listeners_run_on_the_bound_loop() {
    let group = SceneLoopGroup::new(2).unwrap();
    let scene_loop = group.next();
    let promise = ScenePromise::new(scene_loop.clone());

    let (tx, rx) = mpsc::channel();
    promise.add_listener(move |result| {
        let thread = std::thread::current().name().unwrap_or("").to_string();
        let _ = tx.send((thread, result.is_ok()));
    });

    // Complete from a foreign thread; the listener must still run inside
    // the loop's thread.
    let writer = promise.clone();
    std::thread::spawn(move || {
        assert!(writer.set_success());
    })
    .join()
    .unwrap();

    let (thread, ok) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(thread, scene_loop.name());
    assert!(ok);
    group.shutdown();
}

#[test]
fn promise_completes_exactly_once() {
    let group = SceneLoopGroup::new(1).unwrap();
    let promise = ScenePromise::new(group.next());

    assert!(promise.set_success());
    assert!(!promise.try_success());
    assert!(!promise.set_failure(scenegate_core::SceneGateError::Internal("late".into())));
    assert!(promise.is_done());
    assert!(promise.is_success());

    // Late listeners still fire, on the loop.
    let (tx, rx) = mpsc::channel();
    promise.add_listener(move |result| {
        let _ = tx.send(result.is_ok());
    });
    assert!(rx.recv_timeout(Duration::from_secs(5)).unwrap());
    group.shutdown();
}

#[test]
fn void_promise_rejects_listeners_until_unvoided() {
    let group = SceneLoopGroup::new(1).unwrap();
    let void = ScenePromise::void(group.next());
    assert!(void.is_void());

    let (tx, rx) = mpsc::channel();
    let probe = tx.clone();
    void.add_listener(move |_| {
        let _ = probe.send("void");
    });

    let writable = void.unvoid();
    assert!(!writable.is_void());
    writable.add_listener(move |_| {
        let _ = tx.send("unvoided");
    });

    // Both views share the same completion.
    assert!(void.set_success());
    assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), "unvoided");
    assert!(rx.try_recv().is_err());
    group.shutdown();
}
