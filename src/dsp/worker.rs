//! Background analysis thread (C6).
//!
//! One dedicated thread, woken by a condition variable, runs whatever
//! closure it was started with and clears the shared `busy` flag before
//! going back to sleep. Not a thread pool: only ever one analysis pass in
//! flight, and the audio thread drops a trigger on the floor rather than
//! queuing a second one if `busy` is still set.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Shared trigger: the audio thread sets `busy` and notifies the condvar;
/// the worker clears `busy` again once it goes back to waiting.
#[derive(Default)]
pub struct Trigger {
    mutex: Mutex<()>,
    condvar: Condvar,
    busy: AtomicBool,
}

impl Trigger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// `true` if an analysis pass is currently queued or running.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Attempt to hand off a new analysis request. Returns `false` without
    /// effect if the worker is still busy with the previous one.
    pub fn notify(&self) -> bool {
        if self.busy.load(Ordering::Acquire) {
            return false;
        }
        self.busy.store(true, Ordering::Release);
        self.condvar.notify_one();
        true
    }
}

/// Owns the background thread. Dropping a `Worker` without calling
/// [`Worker::stop`] first still stops it (via `Drop`), but callers that hold
/// FFT plans or scratch buffers the worker's closure borrows must call
/// `stop` explicitly before those buffers are dropped.
pub struct Worker {
    execute: Arc<AtomicBool>,
    trigger: Arc<Trigger>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Spawn the thread, running `work` every time the trigger fires, until
    /// `stop` is called.
    pub fn start(trigger: Arc<Trigger>, mut work: impl FnMut() + Send + 'static) -> Self {
        let execute = Arc::new(AtomicBool::new(true));
        let thread_execute = Arc::clone(&execute);
        let thread_trigger = Arc::clone(&trigger);

        let handle = std::thread::spawn(move || {
            while thread_execute.load(Ordering::Acquire) {
                let mut guard = thread_trigger.mutex.lock();
                thread_trigger.busy.store(false, Ordering::Release);
                thread_trigger.condvar.wait(&mut guard);
                drop(guard);

                if thread_execute.load(Ordering::Acquire) {
                    work();
                }
            }
        });

        Self {
            execute,
            trigger,
            handle: Some(handle),
        }
    }

    /// `true` if the thread is alive and accepting work.
    pub fn is_running(&self) -> bool {
        self.execute.load(Ordering::Acquire) && self.handle.is_some()
    }

    /// Stop the thread and join it. Idempotent: a second call is a no-op.
    pub fn stop(&mut self) {
        self.execute.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            // wake the thread up so it can observe `execute == false`.
            self.trigger.condvar.notify_one();
            let _ = handle.join();
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[test]
    fn runs_work_once_per_notify() {
        let trigger = Trigger::new();
        let runs = Arc::new(AtomicUsize::new(0));
        let thread_runs = Arc::clone(&runs);

        let mut worker = Worker::start(Arc::clone(&trigger), move || {
            thread_runs.fetch_add(1, Ordering::SeqCst);
        });

        assert!(trigger.notify());
        // give the worker thread a moment to run and clear busy again.
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(!trigger.is_busy());

        worker.stop();
    }

    #[test]
    fn second_notify_while_busy_is_dropped() {
        let trigger = Trigger::new();
        // never clears busy on its own within the test window: simulate by
        // not starting a worker at all, so notify() always observes busy
        // once set manually.
        assert!(trigger.notify());
        assert!(!trigger.notify());
    }

    #[test]
    fn stop_is_idempotent() {
        let trigger = Trigger::new();
        let mut worker = Worker::start(Arc::clone(&trigger), || {});
        worker.stop();
        worker.stop();
        assert!(!worker.is_running());
    }

    #[test]
    fn rapid_start_stop_restart_does_not_deadlock() {
        for _ in 0..5 {
            let trigger = Trigger::new();
            let mut worker = Worker::start(Arc::clone(&trigger), || {});
            trigger.notify();
            worker.stop();
            assert!(!worker.is_running());
        }
    }
}
