//! Camera state types - plain snapshots, no behavior.

use glam::{Vec2, Vec3};

use crate::viewport::transform;

/// Frozen snapshot of the camera. Copyable; consumers never hold references
/// back into the model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    /// Translation of the content layer, in css pixels.
    pub position: Vec3,
    /// Translation for the separately-composited render layer, in world
    /// units under that layer's convention (see [`DualSpacePosition`]).
    pub true_position: Vec3,
    /// Uniform scale applied to both layers.
    pub zoom: f32,
    /// Vertical field of view of the render layer, radians.
    pub fov: f32,
    /// Viewport dimensions in pixels.
    pub viewport: Vec2,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            true_position: Vec3::ZERO,
            zoom: 1.0,
            fov: 50.0_f32.to_radians(),
            viewport: Vec2::new(1920.0, 1080.0),
        }
    }
}

/// Partial camera update, shallow-merged by [`super::CameraModel::set_state`].
///
/// A single patch carrying several fields produces exactly one subscriber
/// notification, which is what keeps downstream recomputation (boundary
/// checks, render uniforms) from running once per field.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CameraPatch {
    pub position: Option<Vec3>,
    pub true_position: Option<Vec3>,
    pub zoom: Option<f32>,
    pub fov: Option<f32>,
    pub viewport: Option<Vec2>,
}

impl CameraPatch {
    pub fn position(mut self, position: Vec3) -> Self {
        self.position = Some(position);
        self
    }

    pub fn true_position(mut self, true_position: Vec3) -> Self {
        self.true_position = Some(true_position);
        self
    }

    pub fn zoom(mut self, zoom: f32) -> Self {
        self.zoom = Some(zoom);
        self
    }

    pub fn fov(mut self, fov: f32) -> Self {
        self.fov = Some(fov);
        self
    }

    pub fn viewport(mut self, viewport: Vec2) -> Self {
        self.viewport = Some(viewport);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply this patch onto a state, returning the merged result.
    pub fn merge_into(&self, state: &CameraState) -> CameraState {
        CameraState {
            position: self.position.unwrap_or(state.position),
            true_position: self.true_position.unwrap_or(state.true_position),
            zoom: self.zoom.unwrap_or(state.zoom),
            fov: self.fov.unwrap_or(state.fov),
            viewport: self.viewport.unwrap_or(state.viewport),
        }
    }
}

/// The css-space and true-space representations of one camera location,
/// always constructed together.
///
/// The content layer and the render layer describe the same world point
/// under different conventions: the content layer takes a css translation
/// with the zoom origin compensated, the render layer takes world units
/// with Y up. Constructing both from one world point makes drift between
/// the two structurally impossible.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DualSpacePosition {
    pub css: Vec3,
    pub true_space: Vec3,
}

impl DualSpacePosition {
    /// Derive both representations from a world point, for the given zoom
    /// and viewport.
    pub fn from_world(world: Vec3, zoom: f32, viewport: Vec2) -> Self {
        let css = transform::world_to_screen(world.truncate(), zoom, viewport);
        Self {
            css: css.extend(0.0),
            true_space: Vec3::new(world.x, -world.y, world.z),
        }
    }

    /// Derive both representations from an already-computed css translation.
    /// The z channels are not derivable from a 2D translation and stay 0;
    /// callers carrying a z thread it through themselves.
    pub fn from_css(css: Vec2, zoom: f32, viewport: Vec2) -> Self {
        let world = transform::screen_to_world(css, zoom, viewport);
        Self {
            css: css.extend(0.0),
            true_space: Vec3::new(world.x, -world.y, 0.0),
        }
    }

    /// The world point both representations describe.
    pub fn world(&self, zoom: f32, viewport: Vec2) -> Vec3 {
        transform::screen_to_world(self.css.truncate(), zoom, viewport).extend(self.css.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_merge_partial() {
        let state = CameraState::default();
        let merged = CameraPatch::default()
            .zoom(0.5)
            .position(Vec3::new(10.0, 20.0, 0.0))
            .merge_into(&state);

        assert_eq!(merged.zoom, 0.5);
        assert_eq!(merged.position, Vec3::new(10.0, 20.0, 0.0));
        // Untouched fields survive
        assert_eq!(merged.true_position, state.true_position);
        assert_eq!(merged.fov, state.fov);
        assert_eq!(merged.viewport, state.viewport);
    }

    #[test]
    fn test_dual_space_roundtrips_through_world() {
        let viewport = Vec2::new(1000.0, 800.0);
        let world = Vec3::new(2400.0, -300.0, 5.0);
        let dual = DualSpacePosition::from_world(world, 0.5, viewport);

        let back = dual.world(0.5, viewport);
        assert!((back.x - world.x).abs() < 1e-3);
        assert!((back.y - world.y).abs() < 1e-3);
    }

    #[test]
    fn test_dual_space_true_space_y_flipped() {
        let dual = DualSpacePosition::from_world(
            Vec3::new(100.0, 250.0, 0.0),
            1.0,
            Vec2::new(1000.0, 800.0),
        );
        assert_eq!(dual.true_space.x, 100.0);
        assert_eq!(dual.true_space.y, -250.0);
    }

    #[test]
    fn test_from_css_agrees_with_from_world() {
        let viewport = Vec2::new(1280.0, 720.0);
        let world = Vec3::new(-500.0, 900.0, 0.0);
        let a = DualSpacePosition::from_world(world, 0.3, viewport);
        let b = DualSpacePosition::from_css(a.css.truncate(), 0.3, viewport);

        assert!((a.true_space - b.true_space).length() < 1e-2);
    }
}
