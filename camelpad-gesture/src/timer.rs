//! One-shot timers that call back into lock-guarded state
//!
//! Every timer is a tokio task that sleeps until its deadline, then locks the
//! shared state and hands over its id and kind. The state decides whether the
//! id is still the one it is waiting for; a stale id is simply ignored, which
//! covers the window where a timer has already woken up but its owner moved
//! on (or was stopped) before the callback got the lock.

use parking_lot::Mutex;
use std::sync::Weak;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::types::ButtonId;

/// Unique per scheduler, never reused.
pub(crate) type TimerId = u64;

/// What a timer was armed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimerKind {
    /// Hold threshold reached for a button still down
    LongPress(ButtonId),
    /// No second press arrived within the double-press window
    DoublePress(ButtonId),
    /// Chord window elapsed for a lone press; hand it to the detector
    DeferredPress(ButtonId),
    /// Overlap window settled; resolve the chord
    Chord,
}

/// Receiver of timer expiries, called with the state lock held.
pub(crate) trait TimerTarget: Send + 'static {
    fn on_timer(&mut self, id: TimerId, kind: TimerKind);
}

/// Handle to an armed timer. Dropping it cancels the task.
#[derive(Debug)]
pub(crate) struct Timer {
    id: TimerId,
    task: Option<JoinHandle<()>>,
}

impl Timer {
    pub(crate) fn id(&self) -> TimerId {
        self.id
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Arms timers whose callbacks lock `target`.
///
/// Holds a weak reference so outstanding timers never keep the state alive.
pub(crate) struct Scheduler<T> {
    runtime: Handle,
    target: Weak<Mutex<T>>,
    next_id: TimerId,
}

impl<T: TimerTarget> Scheduler<T> {
    pub(crate) fn new(runtime: Handle, target: Weak<Mutex<T>>) -> Self {
        Self {
            runtime,
            target,
            next_id: 0,
        }
    }

    pub(crate) fn arm(&mut self, deadline: Instant, kind: TimerKind) -> Timer {
        self.next_id += 1;
        let id = self.next_id;
        let target = self.target.clone();

        let task = self.runtime.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if let Some(target) = target.upgrade() {
                target.lock().on_timer(id, kind);
            }
        });

        Timer {
            id,
            task: Some(task),
        }
    }
}
