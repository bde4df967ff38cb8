//! Public gesture engine handle
//!
//! `GestureEngine` owns all detection state behind one mutex. Raw events and
//! timer expiries both go through that lock, and gestures are delivered to the
//! sink while it is still held, so delivery order is the order in which the
//! triggering conditions became true.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::config::TimingConfig;
use crate::coordinator::Coordinator;
use crate::error::GestureError;
use crate::timer::{Scheduler, TimerId, TimerKind, TimerTarget};
use crate::types::{Gesture, RawButtonEvent};

type GestureSink = Box<dyn Fn(Gesture) + Send>;

struct EngineCore {
    coordinator: Coordinator,
    scheduler: Scheduler<EngineCore>,
    sink: GestureSink,
    stopped: bool,
}

fn deliver(sink: &GestureSink, gesture: Gesture) {
    debug!(gesture = %gesture, "gesture detected");
    sink(gesture);
}

impl EngineCore {
    fn process_event(&mut self, event: RawButtonEvent) {
        if self.stopped {
            trace!(button = event.button, "engine stopped, event dropped");
            return;
        }
        let EngineCore {
            coordinator,
            scheduler,
            sink,
            ..
        } = self;
        coordinator.process_event(event, scheduler, &mut |g| deliver(sink, g));
    }
}

impl TimerTarget for EngineCore {
    fn on_timer(&mut self, id: TimerId, kind: TimerKind) {
        if self.stopped {
            return;
        }
        let EngineCore {
            coordinator,
            scheduler,
            sink,
            ..
        } = self;
        coordinator.on_timer(id, kind, scheduler, &mut |g| deliver(sink, g));
    }
}

/// Turns raw button transitions into [`Gesture`]s.
///
/// The sink is called from whichever thread triggered the gesture (the
/// caller of [`process_event`](Self::process_event) or a timer task) with the
/// engine lock held, so it must not call back into the engine. Use
/// [`with_channel`](Self::with_channel) when the consumer needs to do real work.
///
/// Dropping the engine stops it.
pub struct GestureEngine {
    core: Arc<Mutex<EngineCore>>,
}

impl GestureEngine {
    /// Create an engine on the current tokio runtime.
    pub fn new<F>(timing: TimingConfig, on_gesture: F) -> Result<Self, GestureError>
    where
        F: Fn(Gesture) + Send + 'static,
    {
        let runtime = Handle::try_current().map_err(|_| GestureError::NoRuntime)?;
        Ok(Self::with_runtime(runtime, timing, on_gesture))
    }

    /// Create an engine whose timers run on `runtime`.
    pub fn with_runtime<F>(runtime: Handle, timing: TimingConfig, on_gesture: F) -> Self
    where
        F: Fn(Gesture) + Send + 'static,
    {
        let core = Arc::new_cyclic(|weak| {
            Mutex::new(EngineCore {
                coordinator: Coordinator::new(timing),
                scheduler: Scheduler::new(runtime, weak.clone()),
                sink: Box::new(on_gesture),
                stopped: false,
            })
        });
        debug!(?timing, "gesture engine started");
        Self { core }
    }

    /// Create an engine that delivers gestures through an unbounded channel.
    pub fn with_channel(
        timing: TimingConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<Gesture>), GestureError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let engine = Self::new(timing, move |gesture| {
            // Receiver gone means nobody is listening any more.
            let _ = tx.send(gesture);
        })?;
        Ok((engine, rx))
    }

    /// Feed one raw transition. Never blocks beyond the engine lock.
    pub fn process_event(&self, event: RawButtonEvent) {
        self.core.lock().process_event(event);
    }

    /// Swap timing. Timers already armed keep their deadlines.
    pub fn reload(&self, timing: TimingConfig) {
        let mut core = self.core.lock();
        if core.coordinator.timing() != timing {
            debug!(?timing, "gesture timing reloaded");
            core.coordinator.reload(timing);
        }
    }

    pub fn timing(&self) -> TimingConfig {
        self.core.lock().coordinator.timing()
    }

    /// Cancel every pending timer and drop all state.
    ///
    /// Once this returns no gesture can be delivered; later events are
    /// ignored. Calling it again does nothing.
    pub fn stop(&self) {
        let mut core = self.core.lock();
        if core.stopped {
            return;
        }
        core.stopped = true;
        core.coordinator.stop();
        debug!("gesture engine stopped");
    }

    pub fn is_stopped(&self) -> bool {
        self.core.lock().stopped
    }
}

impl Drop for GestureEngine {
    fn drop(&mut self) {
        self.stop();
    }
}
