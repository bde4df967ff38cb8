//! Gesture detection for the camel-pad macropad
//!
//! Turns debounced press/release transitions into one of four gestures:
//!
//! - `Press`: a short tap with no second tap inside the double-press window
//! - `DoublePress`: two taps of the same button inside the window
//! - `LongPress`: a hold past the threshold, reported while still held
//! - `Chord`: two or more buttons down together inside the chord window
//!
//! ```text
//! RawButtonEvent ──> [Coordinator: chord arbitration] ──> [Detector: per-button timing]
//!                              │                                   │
//!                              └──────────── Gesture sink <────────┘
//! ```
//!
//! Timers run as tokio tasks, so the engine must be created inside (or
//! handed) a tokio runtime.

pub mod config;
pub mod error;
pub mod types;

mod coordinator;
mod detector;
mod engine;
mod timer;

pub use config::TimingConfig;
pub use engine::GestureEngine;
pub use error::GestureError;
pub use types::{ButtonId, ButtonMask, ButtonSet, Gesture, GestureKind, RawButtonEvent};
