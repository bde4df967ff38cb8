//! Per-button press / double-press / long-press detection
//!
//! Each button runs its own small state machine:
//!
//! ```text
//!   Idle --press--> Pressed --release (held < threshold)--> WaitDouble --timeout--> Idle  [Press]
//!                     |                                        |
//!                     +--long timer--> LongPressed             +--press--> DoublePressed
//!                     |  [LongPress]      |                                   |
//!                     |                   +--release--> Idle                  +--release--> Idle  [DoublePress]
//! ```
//!
//! Any (state, event) pair not shown is a no-op, so duplicated or
//! out-of-order transport events are absorbed silently.

use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

use crate::config::TimingConfig;
use crate::timer::{Scheduler, Timer, TimerId, TimerKind, TimerTarget};
use crate::types::{ButtonId, Gesture};

#[derive(Debug, Default)]
enum Phase {
    #[default]
    Idle,
    Pressed {
        pressed_at: Instant,
        long_press: Timer,
    },
    /// Long press already reported for this hold
    LongPressed,
    WaitDouble {
        double_press: Timer,
    },
    /// Second press of a double press is down
    DoublePressed,
}

/// Detection state of a single button.
#[derive(Debug, Default)]
pub(crate) struct ButtonState {
    phase: Phase,
}

#[cfg(test)]
impl ButtonState {
    pub fn is_pressed(&self) -> bool {
        matches!(
            self.phase,
            Phase::Pressed { .. } | Phase::LongPressed | Phase::DoublePressed
        )
    }

    pub fn pressed_at(&self) -> Option<Instant> {
        match self.phase {
            Phase::Pressed { pressed_at, .. } => Some(pressed_at),
            _ => None,
        }
    }

    pub fn waiting_double(&self) -> bool {
        matches!(self.phase, Phase::WaitDouble { .. })
    }

    pub fn in_double_press(&self) -> bool {
        matches!(self.phase, Phase::DoublePressed)
    }

    pub fn has_long_press_timer(&self) -> bool {
        matches!(self.phase, Phase::Pressed { .. })
    }
}

/// Independent timing state machines, one per button id.
///
/// Entries are created on a button's first event and live until [`Detector::stop`].
pub(crate) struct Detector {
    double_press_window: Duration,
    long_press_threshold: Duration,
    states: HashMap<ButtonId, ButtonState>,
}

impl Detector {
    pub(crate) fn new(timing: &TimingConfig) -> Self {
        Self {
            double_press_window: timing.double_press_window(),
            long_press_threshold: timing.long_press_threshold(),
            states: HashMap::new(),
        }
    }

    /// Applies to timers armed from now on.
    pub(crate) fn set_timing(&mut self, timing: &TimingConfig) {
        self.double_press_window = timing.double_press_window();
        self.long_press_threshold = timing.long_press_threshold();
    }

    #[cfg(test)]
    pub(crate) fn state(&self, button: ButtonId) -> Option<&ButtonState> {
        self.states.get(&button)
    }

    pub(crate) fn handle_press<T: TimerTarget>(
        &mut self,
        button: ButtonId,
        at: Instant,
        scheduler: &mut Scheduler<T>,
    ) {
        let state = self.states.entry(button).or_default();

        state.phase = match std::mem::take(&mut state.phase) {
            Phase::Idle => {
                let long_press = scheduler.arm(
                    at + self.long_press_threshold,
                    TimerKind::LongPress(button),
                );
                trace!(button, "pressed");
                Phase::Pressed {
                    pressed_at: at,
                    long_press,
                }
            }
            Phase::WaitDouble { double_press } => {
                drop(double_press);
                trace!(button, "second press");
                Phase::DoublePressed
            }
            held => held,
        };
    }

    pub(crate) fn handle_release<T: TimerTarget>(
        &mut self,
        button: ButtonId,
        at: Instant,
        scheduler: &mut Scheduler<T>,
        emit: &mut dyn FnMut(Gesture),
    ) {
        let Some(state) = self.states.get_mut(&button) else {
            return;
        };

        state.phase = match std::mem::take(&mut state.phase) {
            Phase::Pressed {
                pressed_at,
                long_press,
            } => {
                drop(long_press);
                if at.saturating_duration_since(pressed_at) >= self.long_press_threshold {
                    // Threshold passed but the timer has not run yet; it wins the tie.
                    emit(Gesture::LongPress(button));
                    Phase::Idle
                } else {
                    let double_press = scheduler.arm(
                        at + self.double_press_window,
                        TimerKind::DoublePress(button),
                    );
                    trace!(button, "released, waiting for second press");
                    Phase::WaitDouble { double_press }
                }
            }
            Phase::LongPressed => Phase::Idle,
            Phase::DoublePressed => {
                emit(Gesture::DoublePress(button));
                Phase::Idle
            }
            idle => idle,
        };
    }

    /// True while `button` waits for a second press on timer `id`.
    pub(crate) fn is_waiting_on(&self, button: ButtonId, id: TimerId) -> bool {
        matches!(
            self.states.get(&button).map(|s| &s.phase),
            Some(Phase::WaitDouble { double_press }) if double_press.id() == id
        )
    }

    pub(crate) fn on_timer(
        &mut self,
        button: ButtonId,
        id: TimerId,
        kind: TimerKind,
        emit: &mut dyn FnMut(Gesture),
    ) {
        let Some(state) = self.states.get_mut(&button) else {
            return;
        };

        let current = match (&state.phase, kind) {
            (Phase::Pressed { long_press, .. }, TimerKind::LongPress(_)) => long_press.id(),
            (Phase::WaitDouble { double_press }, TimerKind::DoublePress(_)) => double_press.id(),
            _ => return,
        };
        if current != id {
            return;
        }

        state.phase = match kind {
            TimerKind::LongPress(_) => {
                emit(Gesture::LongPress(button));
                Phase::LongPressed
            }
            _ => {
                emit(Gesture::Press(button));
                Phase::Idle
            }
        };
    }

    /// Drop the hold a chord took over, without emitting anything.
    ///
    /// A button waiting out its double-press window is left alone: that tap
    /// already finished and still owes its `Press`.
    pub(crate) fn consume(&mut self, button: ButtonId) {
        if let Some(state) = self.states.get_mut(&button) {
            if !matches!(state.phase, Phase::WaitDouble { .. }) {
                state.phase = Phase::Idle;
            }
        }
    }

    /// Cancel every outstanding timer.
    pub(crate) fn stop(&mut self) {
        self.states.clear();
    }
}
