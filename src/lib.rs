//! Archipelago - viewport/boundary/camera coordination core
//!
//! The engine behind a pannable, zoomable "world" site: a camera viewport
//! over a large coordinate plane populated with lazily-loaded island
//! regions. Content rendering, routing and asset loading live outside this
//! crate; what lives here is the coordinate math, the frame scheduling and
//! tweening primitives, and the boundary engine that decides which regions
//! are loaded, preloaded or actively rendering.

pub mod animation;
pub mod boundary;
pub mod camera;
pub mod core;
pub mod scene;
pub mod scheduler;
pub mod viewport;
