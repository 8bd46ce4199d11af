//! One-shot, cancelable, re-armable timers.

use crossbeam::channel::{bounded, RecvTimeoutError, Sender};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// State shared with an armed worker.
#[derive(Debug)]
struct ArmedTask {
    cancel_tx: Sender<()>,
    pending: Arc<AtomicBool>,
}

/// A one-shot timer that runs an action on a dedicated worker thread after
/// a delay.
///
/// `schedule` atomically replaces any previously armed firing, so the task
/// is always in one of two states: idle, or armed with exactly one pending
/// action. A firing that loses the race with `cancel` may still run its
/// action; actions are therefore written to re-check the event loop's
/// status under the lock and become no-ops when stale.
#[derive(Debug)]
pub struct ScheduledTask<T> {
    duration: Duration,
    armed: Option<ArmedTask>,
    _param: PhantomData<fn(T)>,
}

impl<T: Send + 'static> ScheduledTask<T> {
    /// Create an idle task.
    pub fn new() -> Self {
        Self {
            duration: Duration::ZERO,
            armed: None,
            _param: PhantomData,
        }
    }

    /// Arm the task: cancel any pending firing, then run `action(param)`
    /// after `duration` on a fresh worker thread.
    pub fn schedule<F>(&mut self, duration: Duration, param: T, action: F)
    where
        F: FnOnce(T) + Send + 'static,
    {
        self.cancel();
        self.duration = duration;

        let (cancel_tx, cancel_rx) = bounded::<()>(1);
        let pending = Arc::new(AtomicBool::new(true));
        let worker_pending = Arc::clone(&pending);

        thread::Builder::new()
            .name("scheduled-task".to_string())
            .spawn(move || {
                match cancel_rx.recv_timeout(duration) {
                    Err(RecvTimeoutError::Timeout) => {
                        worker_pending.store(false, Ordering::SeqCst);
                        action(param);
                    }
                    // Canceled, or the handle was dropped after a cancel.
                    _ => worker_pending.store(false, Ordering::SeqCst),
                }
            })
            .expect("failed to spawn scheduled-task thread");

        self.armed = Some(ArmedTask { cancel_tx, pending });
    }

    /// Cancel any pending firing. No-op when idle.
    pub fn cancel(&mut self) {
        if let Some(armed) = self.armed.take() {
            armed.pending.store(false, Ordering::SeqCst);
            let _ = armed.cancel_tx.try_send(());
        }
    }

    /// Whether a firing is pending.
    pub fn is_scheduled(&self) -> bool {
        self.armed
            .as_ref()
            .is_some_and(|armed| armed.pending.load(Ordering::SeqCst))
    }

    /// The last-requested duration. Zero before the first `schedule`.
    pub fn get_duration(&self) -> Duration {
        self.duration
    }
}

impl<T: Send + 'static> Default for ScheduledTask<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for ScheduledTask<T> {
    fn drop(&mut self) {
        if let Some(armed) = self.armed.take() {
            armed.pending.store(false, Ordering::SeqCst);
            let _ = armed.cancel_tx.try_send(());
        }
    }
}
