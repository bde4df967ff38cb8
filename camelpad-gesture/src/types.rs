//! Button events in, gestures out

use serde::ser::{Serialize, Serializer};
use std::fmt;
use tokio::time::Instant;

/// Button index as reported by the pad (0-based).
pub type ButtonId = u8;

/// One electrical transition of one button, already debounced upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawButtonEvent {
    pub button: ButtonId,
    pub pressed: bool,
    pub timestamp: Instant,
}

impl RawButtonEvent {
    pub fn at(button: ButtonId, pressed: bool, timestamp: Instant) -> Self {
        Self {
            button,
            pressed,
            timestamp,
        }
    }

    /// Press stamped with the current clock.
    pub fn press(button: ButtonId) -> Self {
        Self::at(button, true, Instant::now())
    }

    /// Release stamped with the current clock.
    pub fn release(button: ButtonId) -> Self {
        Self::at(button, false, Instant::now())
    }
}

/// Snapshot of all button states as a bitmask (bit N = button N held).
///
/// The pad reports whole-mask snapshots; the engine wants one event per
/// button, so [`ButtonMask::transitions`] diffs two snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ButtonMask(pub u16);

impl ButtonMask {
    pub const BUTTONS: u8 = 16;

    pub fn is_pressed(&self, button: ButtonId) -> bool {
        button < Self::BUTTONS && self.0 & (1 << button) != 0
    }

    /// Held buttons in ascending order.
    pub fn pressed_buttons(&self) -> impl Iterator<Item = ButtonId> + '_ {
        (0..Self::BUTTONS).filter(move |&b| self.is_pressed(b))
    }

    /// Events that turn `prev` into `next`.
    ///
    /// Releases come first so a button swap inside one report is not
    /// mistaken for an overlap.
    pub fn transitions(prev: ButtonMask, next: ButtonMask, at: Instant) -> Vec<RawButtonEvent> {
        let released = ButtonMask(prev.0 & !next.0);
        let pressed = ButtonMask(next.0 & !prev.0);
        released
            .pressed_buttons()
            .map(|b| RawButtonEvent::at(b, false, at))
            .chain(pressed.pressed_buttons().map(|b| RawButtonEvent::at(b, true, at)))
            .collect()
    }
}

/// Sorted, duplicate-free set of at least two buttons.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ButtonSet(Vec<ButtonId>);

impl ButtonSet {
    /// Returns `None` if fewer than two distinct buttons are given.
    pub fn new(buttons: impl IntoIterator<Item = ButtonId>) -> Option<Self> {
        let mut buttons: Vec<ButtonId> = buttons.into_iter().collect();
        buttons.sort_unstable();
        buttons.dedup();
        (buttons.len() >= 2).then_some(Self(buttons))
    }

    pub fn as_slice(&self) -> &[ButtonId] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, button: ButtonId) -> bool {
        self.0.binary_search(&button).is_ok()
    }
}

/// Gesture category, independent of the buttons involved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureKind {
    Press,
    DoublePress,
    LongPress,
    Chord,
}

impl GestureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GestureKind::Press => "press",
            GestureKind::DoublePress => "double_press",
            GestureKind::LongPress => "long_press",
            GestureKind::Chord => "chord",
        }
    }
}

impl fmt::Display for GestureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified user action.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Gesture {
    Press(ButtonId),
    DoublePress(ButtonId),
    LongPress(ButtonId),
    Chord(ButtonSet),
}

impl Gesture {
    /// Chord over the given buttons in any order.
    pub fn chord(buttons: impl IntoIterator<Item = ButtonId>) -> Option<Self> {
        ButtonSet::new(buttons).map(Gesture::Chord)
    }

    pub fn kind(&self) -> GestureKind {
        match self {
            Gesture::Press(_) => GestureKind::Press,
            Gesture::DoublePress(_) => GestureKind::DoublePress,
            Gesture::LongPress(_) => GestureKind::LongPress,
            Gesture::Chord(_) => GestureKind::Chord,
        }
    }

    /// Buttons involved, ascending.
    pub fn buttons(&self) -> &[ButtonId] {
        match self {
            Gesture::Press(b) | Gesture::DoublePress(b) | Gesture::LongPress(b) => {
                std::slice::from_ref(b)
            }
            Gesture::Chord(set) => set.as_slice(),
        }
    }

    /// True if this is a chord over exactly `buttons` (order ignored).
    pub fn matches_chord(&self, buttons: &[ButtonId]) -> bool {
        match (self, ButtonSet::new(buttons.iter().copied())) {
            (Gesture::Chord(set), Some(other)) => *set == other,
            _ => false,
        }
    }

    /// Lookup key for action mapping, e.g. `press:0` or `chord:1,2,5`.
    pub fn key(&self) -> String {
        let buttons = self
            .buttons()
            .iter()
            .map(|b| b.to_string())
            .collect::<Vec<_>>()
            .join(",");
        format!("{}:{}", self.kind(), buttons)
    }
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let buttons = self
            .buttons()
            .iter()
            .map(|b| b.to_string())
            .collect::<Vec<_>>()
            .join("+");
        write!(f, "{}({})", self.kind(), buttons)
    }
}

impl Serialize for Gesture {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        #[derive(serde::Serialize)]
        struct Record<'a> {
            kind: &'static str,
            buttons: &'a [ButtonId],
        }

        Record {
            kind: self.kind().as_str(),
            buttons: self.buttons(),
        }
        .serialize(s)
    }
}
