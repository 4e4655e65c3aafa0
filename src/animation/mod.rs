//! Time-boxed value interpolation built on the frame scheduler.
//!
//! A [`Tween`] interpolates any [`Lerp`] value from `from` to `to` over a
//! fixed duration with an [`Easing`] curve, invoking a callback once per
//! frame. Multiple tweens run concurrently; each owns its own scheduler
//! registration and state.

pub mod easing;
pub mod tween;

pub use easing::Easing;
pub use tween::{Lerp, Tween};
