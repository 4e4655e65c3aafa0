//! Coordinate transforms between world space and the content layer.
//!
//! Three representations are in play: raw css translation of the content
//! layer, the "true" translation of the separately-composited render layer,
//! and zoom-relative world coordinates. The functions here are the css side
//! of that bridge, written so that the forward and inverse directions are
//! exact inverses of one another.
//!
//! The content layer is transformed with `translate(x, y) scale(zoom)`; the
//! scale's effective origin is compensated manually via [`zoom_offset`]
//! rather than relying on a transform-origin, so every quantity stays plain
//! arithmetic.

use glam::Vec2;

/// Per-axis compensation for scaling about the viewport center:
/// `viewport/2 - viewport*zoom/2`.
pub fn zoom_offset(viewport: Vec2, zoom: f32) -> Vec2 {
    viewport / 2.0 - viewport * zoom / 2.0
}

/// The css translation that centers the given world point in the viewport.
pub fn world_to_screen(world: Vec2, zoom: f32, viewport: Vec2) -> Vec2 {
    let camera = -world;
    let screen_left = camera * zoom - zoom_offset(viewport, zoom);
    screen_left + viewport / 2.0
}

/// The world point centered in the viewport for a given css translation.
/// Exact inverse of [`world_to_screen`].
pub fn screen_to_world(position: Vec2, zoom: f32, viewport: Vec2) -> Vec2 {
    let screen_left = position - viewport / 2.0;
    let camera = (screen_left + zoom_offset(viewport, zoom)) / zoom;
    -camera
}

/// The world point currently under a viewport-local cursor position, given
/// the content layer's css translation and zoom.
pub fn world_under_cursor(cursor: Vec2, position: Vec2, zoom: f32, viewport: Vec2) -> Vec2 {
    (cursor - position - zoom_offset(viewport, zoom)) / zoom
}

/// Solve for the css translation that keeps `world` under `cursor` at the
/// given zoom - the core of zoom-to-cursor.
pub fn position_fixing_cursor(cursor: Vec2, world: Vec2, zoom: f32, viewport: Vec2) -> Vec2 {
    cursor - zoom_offset(viewport, zoom) - world * zoom
}

/// Axis-aligned rectangle in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldRect {
    pub min: Vec2,
    pub max: Vec2,
}

impl WorldRect {
    /// Center of the rectangle.
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) / 2.0
    }

    /// Closest point inside the rectangle to an arbitrary point.
    pub fn closest_point(&self, p: Vec2) -> Vec2 {
        p.clamp(self.min, self.max)
    }
}

/// The world-space rectangle the viewport currently shows, for a given css
/// translation, zoom and viewport size. Computed once per camera update and
/// shared across all boundary checks.
pub fn visible_world_rect(position: Vec2, zoom: f32, viewport: Vec2) -> WorldRect {
    let center = screen_to_world(position, zoom, viewport);
    let half = viewport / (2.0 * zoom);
    WorldRect {
        min: center - half,
        max: center + half,
    }
}
