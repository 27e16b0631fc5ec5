//! Desktop input mapped to camera actions.
//!
//! # Invariants
//! - Consumers see actions and look offsets, never windowing-layer events.
//! - Escape-to-close and movement keys go through the same binding table.

pub mod action;
pub mod cursor;

pub use action::{Action, InputState, Key, KeyBindings};
pub use cursor::CursorTracker;

pub fn crate_info() -> &'static str {
    "spherefield-input v0.1.0"
}
