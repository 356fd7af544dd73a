//! Dispatch bridge: marshals cross-thread work onto the engine thread.
//!
//! Clients enqueue closures; the engine thread drains them between playback
//! steps. Three submission modes are supported:
//!
//! - [`Dispatch::run`] blocks the caller until the engine has executed the
//!   closure exactly once and returns its result.
//! - [`Dispatch::run_async`] enqueues and returns immediately; the closure
//!   owns whatever argument memory it captured and is dropped after running.
//! - [`Dispatch::suspend`] / [`Dispatch::resume`] cooperatively park the
//!   engine at its next safe point. Suspension is reference-counted and the
//!   queue is still drained while parked, so `run` does not starve. More
//!   resumes than suspends is a fatal caller bug and panics.
//!
//! Submissions from one thread are executed in submission order. Closures
//! run on the engine thread outside the registry and handle locks. Calling
//! `run` from the engine thread itself would deadlock and is forbidden.

use crossbeam_utils::Backoff;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

type Work<T> = Box<dyn FnOnce(&mut T) + Send>;

struct State<T> {
    queue: VecDeque<Work<T>>,
    /// Outstanding suspend() calls not yet matched by resume().
    suspend_count: usize,
    /// True while the engine waits at its safe point.
    parked: bool,
    /// True between engine thread start and exit.
    running: bool,
}

/// Cross-thread work queue for a single engine thread. See the module docs.
pub(crate) struct Dispatch<T> {
    state: Mutex<State<T>>,
    /// Wakes the engine: new work, suspension changes, client-count changes.
    work_cond: Condvar,
    /// Wakes suspenders once the engine has parked.
    park_cond: Condvar,
}

impl<T> Dispatch<T> {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(State {
                queue: VecDeque::new(),
                suspend_count: 0,
                parked: false,
                running: false,
            }),
            work_cond: Condvar::new(),
            park_cond: Condvar::new(),
        }
    }

    // ---------------------------------------------------------------------
    // CLIENT SIDE
    // ---------------------------------------------------------------------

    /// Enqueues `f` and returns without waiting.
    pub(crate) fn run_async(&self, f: impl FnOnce(&mut T) + Send + 'static) {
        let mut st = self.state.lock();
        st.queue.push_back(Box::new(f));
        self.work_cond.notify_all();
    }

    /// Runs `f` on the engine thread and blocks until it completes,
    /// returning its result.
    pub(crate) fn run<R: Send + 'static>(
        &self,
        f: impl FnOnce(&mut T) -> R + Send + 'static,
    ) -> R {
        let done = Arc::new(Completion::new());
        let signal = Arc::clone(&done);
        self.run_async(move |target| signal.complete(f(target)));
        done.wait()
    }

    /// Parks the engine at its next safe point. Returns once the engine has
    /// actually parked (immediately if the engine thread is not running).
    /// Reentrant; each call must be matched by one [`resume`](Self::resume).
    pub(crate) fn suspend(&self) {
        let mut st = self.state.lock();
        st.suspend_count += 1;
        if !st.running {
            return;
        }
        self.work_cond.notify_all();
        while !st.parked {
            self.park_cond.wait(&mut st);
        }
    }

    /// Releases one suspension; the engine continues once the count drops
    /// to zero.
    ///
    /// # Panics
    ///
    /// Panics if no suspension is outstanding.
    pub(crate) fn resume(&self) {
        let mut st = self.state.lock();
        assert!(st.suspend_count > 0, "unbalanced resume");
        st.suspend_count -= 1;
        if st.suspend_count == 0 {
            self.work_cond.notify_all();
        }
    }

    /// Wakes the engine without enqueuing work, so it re-checks its exit
    /// condition (used when a client is destroyed).
    pub(crate) fn poke(&self) {
        self.work_cond.notify_all();
    }

    // ---------------------------------------------------------------------
    // ENGINE SIDE
    // ---------------------------------------------------------------------

    pub(crate) fn set_running(&self, running: bool) {
        self.state.lock().running = running;
    }

    /// Removes the next queued closure, if any.
    pub(crate) fn try_pop(&self) -> Option<Work<T>> {
        self.state.lock().queue.pop_front()
    }

    /// The engine's safe point: while suspended, park here, keep draining
    /// the queue, and only return once the suspend count reaches zero.
    pub(crate) fn safepoint(&self, target: &mut T) {
        let mut st = self.state.lock();
        if st.suspend_count == 0 {
            return;
        }
        st.parked = true;
        self.park_cond.notify_all();
        loop {
            if let Some(work) = st.queue.pop_front() {
                drop(st);
                work(target);
                st = self.state.lock();
                continue;
            }
            if st.suspend_count == 0 {
                break;
            }
            self.work_cond.wait(&mut st);
        }
        st.parked = false;
    }

    /// Blocks until work arrives, a suspension starts, a poke lands, or the
    /// timeout expires. Returns immediately if work is already queued.
    pub(crate) fn wait_for_work(&self, timeout: Duration) {
        let mut st = self.state.lock();
        if !st.queue.is_empty() || st.suspend_count > 0 {
            return;
        }
        let _ = self.work_cond.wait_for(&mut st, timeout);
    }
}

/// One-shot completion slot for synchronous dispatch.
///
/// The waiter spins briefly before parking; engine turnaround is usually
/// fast enough that the condvar never gets involved.
struct Completion<R> {
    slot: Mutex<Option<R>>,
    cond: Condvar,
}

impl<R> Completion<R> {
    fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            cond: Condvar::new(),
        }
    }

    fn complete(&self, value: R) {
        let mut slot = self.slot.lock();
        *slot = Some(value);
        self.cond.notify_all();
    }

    fn wait(&self) -> R {
        let backoff = Backoff::new();
        loop {
            if let Some(value) = self.slot.lock().take() {
                return value;
            }
            if backoff.is_completed() {
                break;
            }
            backoff.snooze();
        }

        let mut slot = self.slot.lock();
        loop {
            if let Some(value) = slot.take() {
                return value;
            }
            self.cond.wait(&mut slot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Instant;

    /// Minimal engine loop: drain work until asked to stop.
    fn drive(dispatch: Arc<Dispatch<Vec<u64>>>, stop: Arc<AtomicBool>) -> thread::JoinHandle<Vec<u64>> {
        thread::spawn(move || {
            let mut state = Vec::new();
            dispatch.set_running(true);
            loop {
                dispatch.safepoint(&mut state);
                while let Some(work) = dispatch.try_pop() {
                    work(&mut state);
                }
                if stop.load(Ordering::SeqCst) {
                    break;
                }
                dispatch.wait_for_work(Duration::from_millis(5));
            }
            dispatch.set_running(false);
            state
        })
    }

    #[test]
    fn test_run_returns_result() {
        let dispatch = Arc::new(Dispatch::new());
        let stop = Arc::new(AtomicBool::new(false));
        let engine = drive(Arc::clone(&dispatch), Arc::clone(&stop));

        let doubled = dispatch.run(|state: &mut Vec<u64>| {
            state.push(21);
            state.last().copied().unwrap() * 2
        });
        assert_eq!(doubled, 42);

        stop.store(true, Ordering::SeqCst);
        dispatch.poke();
        assert_eq!(engine.join().unwrap(), vec![21]);
    }

    #[test]
    fn test_submission_order_is_preserved() {
        let dispatch = Arc::new(Dispatch::new());
        let stop = Arc::new(AtomicBool::new(false));
        let engine = drive(Arc::clone(&dispatch), Arc::clone(&stop));

        for i in 0..100u64 {
            dispatch.run_async(move |state: &mut Vec<u64>| state.push(i));
        }
        // A sync call submitted last observes everything before it.
        let len = dispatch.run(|state: &mut Vec<u64>| state.len());
        assert_eq!(len, 100);

        stop.store(true, Ordering::SeqCst);
        dispatch.poke();
        let state = engine.join().unwrap();
        assert_eq!(state, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_suspended_engine_still_drains_queue() {
        let dispatch = Arc::new(Dispatch::new());
        let stop = Arc::new(AtomicBool::new(false));
        let engine = drive(Arc::clone(&dispatch), Arc::clone(&stop));

        dispatch.suspend();
        // Engine is parked now, yet sync dispatch completes.
        let value = dispatch.run(|_: &mut Vec<u64>| 7u64);
        assert_eq!(value, 7);

        dispatch.resume();
        stop.store(true, Ordering::SeqCst);
        dispatch.poke();
        engine.join().unwrap();
    }

    #[test]
    fn test_suspend_is_reentrant() {
        let dispatch = Arc::new(Dispatch::new());
        let stop = Arc::new(AtomicBool::new(false));
        let engine = drive(Arc::clone(&dispatch), Arc::clone(&stop));

        dispatch.suspend();
        dispatch.suspend();
        dispatch.resume();
        // Still suspended: the engine must remain parked.
        assert!(dispatch.state.lock().parked);

        dispatch.resume();
        stop.store(true, Ordering::SeqCst);
        dispatch.poke();
        engine.join().unwrap();
    }

    #[test]
    #[should_panic(expected = "unbalanced resume")]
    fn test_unbalanced_resume_panics() {
        let dispatch = Dispatch::<Vec<u64>>::new();
        dispatch.resume();
    }

    #[test]
    fn test_suspend_without_engine_does_not_block() {
        let dispatch = Dispatch::<Vec<u64>>::new();
        let started = Instant::now();
        dispatch.suspend();
        dispatch.resume();
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
