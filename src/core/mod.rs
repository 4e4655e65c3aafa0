//! Core types, configuration and errors shared across the crate.

pub mod config;
pub mod error;
pub mod types;

pub use config::ViewportConfig;
pub use error::{ArchError, Result};
pub use types::{RegionId, SceneId};
