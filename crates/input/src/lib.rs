//! Input: keyboard and pointer events mapped to high-level actions.
//!
//! # Invariants
//! - Demos consume [`Action`]s and read [`InputState`], never raw window
//!   events; the desktop app and the headless simulator drive the same demo
//!   code.
//! - Controls are plain descriptors; any UI can render them.

pub mod action;
pub mod control;
pub mod state;

pub use action::{Action, ControlId, Steer, bind_key};
pub use control::{Control, WheelTurn, wheel_turn};
pub use state::{InputState, Key, to_ndc};
