//! Chord arbitration in front of the per-button detector
//!
//! Every raw event lands here first. A press that is the only button held is
//! parked for one chord window before the detector sees it; if a second
//! button goes down meanwhile, both are collected as an overlap and the
//! detector is kept out of it. The overlap resolves into a single chord
//! when the window settles (each joining press restarts it) or as soon as
//! any participant is released.

use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::config::TimingConfig;
use crate::detector::Detector;
use crate::timer::{Scheduler, Timer, TimerId, TimerKind, TimerTarget};
use crate::types::{ButtonId, ButtonSet, Gesture, RawButtonEvent};

#[derive(Debug, Default)]
enum ChordPhase {
    #[default]
    Idle,
    CollectingOverlap {
        timer: Timer,
    },
}

/// A lone press waiting out the chord window.
#[derive(Debug)]
struct DeferredPress {
    button: ButtonId,
    pressed_at: Instant,
    timer: Timer,
}

pub(crate) struct Coordinator {
    timing: TimingConfig,
    chord_window: Duration,
    /// Buttons currently held that have not been consumed by a chord
    pressed: BTreeMap<ButtonId, Instant>,
    phase: ChordPhase,
    deferred: Option<DeferredPress>,
    detector: Detector,
}

impl Coordinator {
    pub(crate) fn new(timing: TimingConfig) -> Self {
        Self {
            timing,
            chord_window: timing.chord_window(),
            pressed: BTreeMap::new(),
            phase: ChordPhase::Idle,
            deferred: None,
            detector: Detector::new(&timing),
        }
    }

    pub(crate) fn timing(&self) -> TimingConfig {
        self.timing
    }

    pub(crate) fn reload(&mut self, timing: TimingConfig) {
        self.timing = timing;
        self.chord_window = timing.chord_window();
        self.detector.set_timing(&timing);
    }

    pub(crate) fn is_collecting(&self) -> bool {
        matches!(self.phase, ChordPhase::CollectingOverlap { .. })
    }

    pub(crate) fn process_event<T: TimerTarget>(
        &mut self,
        event: RawButtonEvent,
        scheduler: &mut Scheduler<T>,
        emit: &mut dyn FnMut(Gesture),
    ) {
        if event.pressed {
            self.on_press(event.button, event.timestamp, scheduler);
        } else {
            self.on_release(event.button, event.timestamp, scheduler, emit);
        }
    }

    fn on_press<T: TimerTarget>(
        &mut self,
        button: ButtonId,
        at: Instant,
        scheduler: &mut Scheduler<T>,
    ) {
        if self.pressed.contains_key(&button) {
            trace!(button, "repeated press ignored");
            return;
        }
        self.pressed.insert(button, at);

        if self.pressed.len() >= 2 {
            // A parked press can no longer pass the lone-button check.
            self.deferred = None;
            if !self.is_collecting() {
                debug!(buttons = ?self.pressed.keys().collect::<Vec<_>>(), "overlap started");
            }
            // Replacing the phase cancels the previous window.
            let timer = scheduler.arm(at + self.chord_window, TimerKind::Chord);
            self.phase = ChordPhase::CollectingOverlap { timer };
        } else {
            let timer = scheduler.arm(at + self.chord_window, TimerKind::DeferredPress(button));
            self.deferred = Some(DeferredPress {
                button,
                pressed_at: at,
                timer,
            });
        }
    }

    fn on_release<T: TimerTarget>(
        &mut self,
        button: ButtonId,
        at: Instant,
        scheduler: &mut Scheduler<T>,
        emit: &mut dyn FnMut(Gesture),
    ) {
        if !self.pressed.contains_key(&button) {
            // Never pressed, or already consumed by a chord.
            trace!(button, "release of untracked button ignored");
            return;
        }

        let was_collecting = self.is_collecting();
        if was_collecting {
            self.resolve_chord(emit);
        }

        if self.pressed.remove(&button).is_some() && !was_collecting {
            self.forward_deferred(button, scheduler);
            self.detector.handle_release(button, at, scheduler, emit);
        }

        if self.pressed.is_empty() {
            self.phase = ChordPhase::Idle;
        }
    }

    /// Hand a parked press for `button` to the detector now, if there is one.
    fn forward_deferred<T: TimerTarget>(&mut self, button: ButtonId, scheduler: &mut Scheduler<T>) {
        if self.deferred.as_ref().is_some_and(|d| d.button == button) {
            if let Some(deferred) = self.deferred.take() {
                self.detector
                    .handle_press(deferred.button, deferred.pressed_at, scheduler);
            }
        }
    }

    fn resolve_chord(&mut self, emit: &mut dyn FnMut(Gesture)) {
        self.phase = ChordPhase::Idle;

        match ButtonSet::new(self.pressed.keys().copied()) {
            Some(set) => {
                for &button in set.as_slice() {
                    self.detector.consume(button);
                }
                self.deferred = None;
                self.pressed.clear();
                debug!(buttons = ?set.as_slice(), "chord resolved");
                emit(Gesture::Chord(set));
            }
            None => {
                debug!("overlap collapsed before the chord window settled");
            }
        }
    }

    pub(crate) fn on_timer<T: TimerTarget>(
        &mut self,
        id: TimerId,
        kind: TimerKind,
        scheduler: &mut Scheduler<T>,
        emit: &mut dyn FnMut(Gesture),
    ) {
        match kind {
            TimerKind::Chord => {
                let current = matches!(
                    &self.phase,
                    ChordPhase::CollectingOverlap { timer } if timer.id() == id
                );
                if current {
                    self.resolve_chord(emit);
                }
            }
            TimerKind::DeferredPress(button) => {
                let current = self
                    .deferred
                    .as_ref()
                    .is_some_and(|d| d.timer.id() == id && d.button == button);
                let alone = !self.is_collecting()
                    && self.pressed.len() == 1
                    && self.pressed.contains_key(&button);
                if current && alone {
                    self.forward_deferred(button, scheduler);
                } else if current {
                    self.deferred = None;
                }
            }
            TimerKind::DoublePress(button) => {
                // A second press still parked for the chord window arrived in time.
                if self.detector.is_waiting_on(button, id) {
                    self.forward_deferred(button, scheduler);
                }
                self.detector.on_timer(button, id, kind, emit);
            }
            TimerKind::LongPress(button) => {
                self.detector.on_timer(button, id, kind, emit);
            }
        }
    }

    pub(crate) fn stop(&mut self) {
        self.phase = ChordPhase::Idle;
        self.deferred = None;
        self.pressed.clear();
        self.detector.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tokio::runtime::Handle;
    use tokio::time::sleep;

    struct Harness {
        coordinator: Coordinator,
        scheduler: Scheduler<Harness>,
        emitted: Vec<Gesture>,
    }

    impl TimerTarget for Harness {
        fn on_timer(&mut self, id: TimerId, kind: TimerKind) {
            let Harness {
                coordinator,
                scheduler,
                emitted,
            } = self;
            coordinator.on_timer(id, kind, scheduler, &mut |g| emitted.push(g));
        }
    }

    fn harness() -> Arc<Mutex<Harness>> {
        let timing = TimingConfig::new(300, 500, 50);
        Arc::new_cyclic(|weak| {
            Mutex::new(Harness {
                coordinator: Coordinator::new(timing),
                scheduler: Scheduler::new(Handle::current(), weak.clone()),
                emitted: Vec::new(),
            })
        })
    }

    fn send(h: &Arc<Mutex<Harness>>, button: ButtonId, pressed: bool) {
        let mut guard = h.lock();
        let Harness {
            coordinator,
            scheduler,
            emitted,
        } = &mut *guard;
        let event = RawButtonEvent::at(button, pressed, Instant::now());
        coordinator.process_event(event, scheduler, &mut |g| emitted.push(g));
    }

    fn emitted(h: &Arc<Mutex<Harness>>) -> Vec<Gesture> {
        h.lock().emitted.clone()
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[tokio::test(start_paused = true)]
    async fn test_lone_press_parked_for_chord_window() {
        let h = harness();
        send(&h, 0, true);
        assert!(h.lock().coordinator.deferred.is_some());
        assert!(h.lock().coordinator.detector.state(0).is_none());

        sleep(ms(51)).await;
        let guard = h.lock();
        assert!(guard.coordinator.deferred.is_none());
        assert!(guard.coordinator.detector.state(0).unwrap().is_pressed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlap_enters_collecting() {
        let h = harness();
        send(&h, 0, true);
        sleep(ms(20)).await;
        send(&h, 1, true);
        {
            let guard = h.lock();
            assert!(guard.coordinator.is_collecting());
            assert!(guard.coordinator.deferred.is_none());
        }

        sleep(ms(51)).await;
        assert_eq!(emitted(&h), vec![Gesture::chord([0, 1]).unwrap()]);
        let guard = h.lock();
        assert!(!guard.coordinator.is_collecting());
        assert!(guard.coordinator.pressed.is_empty());
        assert!(guard.coordinator.detector.state(0).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_early_release_resolves_immediately() {
        let h = harness();
        send(&h, 2, true);
        sleep(ms(5)).await;
        send(&h, 1, true);
        sleep(ms(10)).await;
        send(&h, 2, false);
        assert_eq!(emitted(&h), vec![Gesture::chord([1, 2]).unwrap()]);

        sleep(ms(10)).await;
        send(&h, 1, false);
        sleep(ms(1000)).await;
        assert_eq!(emitted(&h).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_join_after_forward_consumes_detector_state() {
        let h = harness();
        send(&h, 0, true);
        sleep(ms(100)).await; // 0 forwarded, long-press timer armed
        send(&h, 1, true);
        sleep(ms(60)).await;
        assert_eq!(emitted(&h), vec![Gesture::chord([0, 1]).unwrap()]);

        // No long press for 0 from the consumed hold.
        sleep(ms(1000)).await;
        send(&h, 0, false);
        send(&h, 1, false);
        sleep(ms(1000)).await;
        assert_eq!(emitted(&h).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_quick_tap_inside_chord_window() {
        let h = harness();
        send(&h, 3, true);
        sleep(ms(10)).await;
        send(&h, 3, false);
        assert!(h.lock().coordinator.detector.state(3).unwrap().waiting_double());

        sleep(ms(301)).await;
        assert_eq!(emitted(&h), vec![Gesture::Press(3)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_press_parked_past_double_deadline() {
        let h = harness();
        // first tap released at t=10, double-press deadline t=310
        send(&h, 0, true);
        sleep(ms(10)).await;
        send(&h, 0, false);
        // second press at t=290 is parked until t=340
        sleep(ms(280)).await;
        send(&h, 0, true);
        sleep(ms(30)).await;
        assert!(emitted(&h).is_empty());
        assert!(h.lock().coordinator.detector.state(0).unwrap().in_double_press());

        sleep(ms(30)).await;
        send(&h, 0, false);
        assert_eq!(emitted(&h), vec![Gesture::DoublePress(0)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_chord_spares_member_waiting_for_double() {
        let h = harness();
        send(&h, 0, true);
        sleep(ms(10)).await;
        send(&h, 0, false);
        // second press of 0 is parked, then 1 joins it
        sleep(ms(90)).await;
        send(&h, 0, true);
        sleep(ms(10)).await;
        send(&h, 1, true);
        sleep(ms(51)).await;
        assert_eq!(emitted(&h), vec![Gesture::chord([0, 1]).unwrap()]);
        assert!(h.lock().coordinator.detector.state(0).unwrap().waiting_double());

        // double-press deadline of the first tap is t=310
        sleep(ms(200)).await;
        assert_eq!(
            emitted(&h),
            vec![Gesture::chord([0, 1]).unwrap(), Gesture::Press(0)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_clears_everything() {
        let h = harness();
        send(&h, 0, true);
        send(&h, 1, true);
        h.lock().coordinator.stop();
        sleep(ms(1000)).await;
        assert!(emitted(&h).is_empty());
        assert!(!h.lock().coordinator.is_collecting());
    }
}
