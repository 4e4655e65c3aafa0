//! Circle-vs-rectangle intersection, shared by every boundary check.
//!
//! Load, active and preload zones are all circles tested against the same
//! viewport rectangle, so there is exactly one implementation of the test.

use glam::Vec2;

use crate::viewport::transform::WorldRect;

/// Whether a circle overlaps an axis-aligned rectangle.
///
/// Closest-point formulation: clamp the center into the rect and compare
/// squared distances, no sqrt. Touching counts as intersecting.
pub fn circle_intersects_rect(center: Vec2, radius: f32, rect: &WorldRect) -> bool {
    let closest = rect.closest_point(center);
    center.distance_squared(closest) <= radius * radius
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rect() -> WorldRect {
        WorldRect {
            min: Vec2::new(-500.0, -400.0),
            max: Vec2::new(500.0, 400.0),
        }
    }

    #[test]
    fn test_center_inside_rect_intersects() {
        assert!(circle_intersects_rect(Vec2::new(100.0, 50.0), 1.0, &rect()));
    }

    #[test]
    fn test_circle_reaching_edge_intersects() {
        // Center 2400px right of the rect edge, radius covers it.
        assert!(circle_intersects_rect(Vec2::new(2900.0, 0.0), 3000.0, &rect()));
        assert!(!circle_intersects_rect(Vec2::new(2900.0, 0.0), 1600.0, &rect()));
    }

    #[test]
    fn test_corner_uses_euclidean_distance() {
        // 300 past the corner on both axes: diagonal distance ~424.
        let center = Vec2::new(800.0, 700.0);
        assert!(!circle_intersects_rect(center, 420.0, &rect()));
        assert!(circle_intersects_rect(center, 430.0, &rect()));
    }

    #[test]
    fn test_touching_counts_as_intersecting() {
        assert!(circle_intersects_rect(Vec2::new(600.0, 0.0), 100.0, &rect()));
    }

    proptest! {
        #[test]
        fn prop_intersection_monotonic_in_radius(
            cx in -10_000.0f32..10_000.0,
            cy in -10_000.0f32..10_000.0,
            r in 0.0f32..5_000.0,
            extra in 0.0f32..5_000.0,
        ) {
            let center = Vec2::new(cx, cy);
            // A hit at radius r is still a hit at any larger radius.
            if circle_intersects_rect(center, r, &rect()) {
                prop_assert!(circle_intersects_rect(center, r + extra, &rect()));
            }
        }
    }
}
