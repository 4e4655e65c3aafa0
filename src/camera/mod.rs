//! Observable camera state.
//!
//! The camera model is the single source of truth for "where is the
//! viewport looking". It is a typed, observable state cell: it never
//! mutates on its own initiative and performs no coordinate math - all
//! changes are driven by the viewport controller, all consumers (the
//! boundary engine, render layers) subscribe.

pub mod model;
pub mod state;

pub use model::{CameraModel, SubscriberId};
pub use state::{CameraPatch, CameraState, DualSpacePosition};
