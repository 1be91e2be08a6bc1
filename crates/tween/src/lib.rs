//! Frame timing and tweening.
//!
//! Demos are driven by one update per animation frame. [`FrameClock`] turns
//! wall-clock time into clamped [`FrameTime`] snapshots; [`Tween`] animates a
//! value toward a target over a duration with an [`Ease`] curve, the way a
//! timeline library animates object properties.
//!
//! # Invariants
//! - `FrameTime::dt` is never zero or larger than the clock's max clamp.
//! - A tween reports `Completed` exactly once, on the frame it lands on its
//!   target; every later `advance` reports `Idle`.

mod clock;
mod ease;
mod tween;

pub use clock::{FrameClock, FrameTime, Interval};
pub use ease::{Ease, lerp, smoothstep};
pub use tween::{Lerp, Tween, TweenStatus};
