//! Viewport configuration with documented constants
//!
//! All magic numbers are collected here with explanations of their purpose
//! and how they interact with each other. The config is injected into the
//! viewport controller and boundary engine at construction; there is no
//! global config instance.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Configuration for the camera/viewport systems
///
/// These values have been tuned for a smooth feel over a world plane that is
/// tens of thousands of pixels wide. Changing them affects pacing, not
/// correctness.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    // === ZOOM ===
    /// Lower zoom clamp (zoomed all the way out)
    ///
    /// Must be strictly positive: zoom appears as a divisor in the inverse
    /// viewport transform, so a zero zoom is structurally impossible rather
    /// than handled after the fact.
    pub min_zoom: f32,

    /// Upper zoom clamp (1.0 = native pixel scale)
    pub max_zoom: f32,

    /// Multiplicative zoom sensitivity per wheel delta unit
    ///
    /// Applied as `zoom * exp(-delta * wheel_zoom_step)`, so successive
    /// wheel ticks compose multiplicatively and zoom-in/zoom-out are exact
    /// inverses of each other.
    pub wheel_zoom_step: f32,

    /// Zoom factor applied by the zoom-in/zoom-out buttons
    ///
    /// A button press multiplies (or divides) the target zoom by this
    /// factor; the trailing loop eases there.
    pub button_zoom_factor: f32,

    // === TRAILING LOOP ===
    /// Per-frame exponential chase factor for the trailing loop
    ///
    /// Each frame, `current += (target - current) * trailing_factor`.
    /// Deliberately not frame-rate-normalized: the original feel was tuned
    /// at 60fps and the simplification is accepted.
    pub trailing_factor: f32,

    /// L1 distance below which the trailing loop snaps to the target
    ///
    /// Once position, true position and zoom are all within this threshold
    /// the loop snaps exactly and removes itself from the scheduler, so a
    /// settled camera costs zero frames.
    pub settle_threshold: f32,

    // === NAVIGATION ===
    /// Base duration for an auto-computed navigation animation (ms)
    pub auto_duration_base_ms: f32,

    /// Additional duration per pixel of travel distance (ms/px)
    ///
    /// `duration = clamp(base + distance * per_px, base, max)` - short hops
    /// stay snappy, cross-world jumps take up to `auto_duration_max_ms`.
    pub auto_duration_per_px: f32,

    /// Upper clamp for auto-computed navigation durations (ms)
    pub auto_duration_max_ms: f32,

    /// Skip the animation entirely when already this close (px)
    pub snap_distance_px: f32,

    // === PERSPECTIVE ===
    /// Baseline vertical field of view for the 3D render layer (radians)
    ///
    /// Recomputed on resize as
    /// `fov = 2 * atan(tan(base_fov/2) * new_height / initial_height)`
    /// so 3D content keeps its visual scale across a height change.
    pub base_fov: f32,

    /// Viewport dimensions the base fov was tuned against (px)
    pub initial_viewport: Vec2,

    // === BOUNDARY ===
    /// Preload radius as a multiple of a region's load radius
    ///
    /// The preload zone is intentionally wider than the load zone to give
    /// async asset fetches a head start before the region becomes visible.
    pub preload_factor: f32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_zoom: 0.15,
            max_zoom: 1.0,
            wheel_zoom_step: 0.0015,
            button_zoom_factor: 1.35,

            trailing_factor: 0.11,
            settle_threshold: 0.01,

            auto_duration_base_ms: 800.0,
            auto_duration_per_px: 0.3,
            auto_duration_max_ms: 3000.0,
            snap_distance_px: 1.0,

            base_fov: 50.0_f32.to_radians(),
            initial_viewport: Vec2::new(1920.0, 1080.0),

            preload_factor: 2.0,
        }
    }
}

impl ViewportConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML, falling back to defaults for absent fields
    pub fn from_toml_str(s: &str) -> crate::core::Result<Self> {
        let config: Self = toml::from_str(s)?;
        config
            .validate()
            .map_err(crate::core::ArchError::InvalidConfig)?;
        Ok(config)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.min_zoom <= 0.0 {
            return Err(format!("min_zoom ({}) must be > 0", self.min_zoom));
        }
        if self.min_zoom > self.max_zoom {
            return Err(format!(
                "min_zoom ({}) must be <= max_zoom ({})",
                self.min_zoom, self.max_zoom
            ));
        }
        if !(0.0..=1.0).contains(&self.trailing_factor) || self.trailing_factor == 0.0 {
            return Err(format!(
                "trailing_factor ({}) must be in (0, 1]",
                self.trailing_factor
            ));
        }
        if self.settle_threshold <= 0.0 {
            return Err("settle_threshold must be positive".into());
        }
        if self.auto_duration_base_ms <= 0.0 || self.auto_duration_max_ms < self.auto_duration_base_ms
        {
            return Err(format!(
                "auto durations must satisfy 0 < base ({}) <= max ({})",
                self.auto_duration_base_ms, self.auto_duration_max_ms
            ));
        }
        if self.button_zoom_factor <= 1.0 {
            return Err(format!(
                "button_zoom_factor ({}) must be > 1",
                self.button_zoom_factor
            ));
        }
        if self.preload_factor < 1.0 {
            return Err(format!(
                "preload_factor ({}) must be >= 1 (preload zone encloses load zone)",
                self.preload_factor
            ));
        }
        if self.initial_viewport.x <= 0.0 || self.initial_viewport.y <= 0.0 {
            return Err("initial_viewport dimensions must be positive".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        assert!(ViewportConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_zoom_rejected() {
        let config = ViewportConfig {
            min_zoom: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_zoom_range_rejected() {
        let config = ViewportConfig {
            min_zoom: 2.0,
            max_zoom: 1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_preload_factor_below_one_rejected() {
        let config = ViewportConfig {
            preload_factor: 0.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_toml_partial() {
        let config = ViewportConfig::from_toml_str("min_zoom = 0.25\n").unwrap();
        assert_eq!(config.min_zoom, 0.25);
        // Everything else falls back to defaults
        assert_eq!(config.max_zoom, 1.0);
        assert_eq!(config.preload_factor, 2.0);
    }

    #[test]
    fn test_from_toml_invalid_rejected() {
        assert!(ViewportConfig::from_toml_str("min_zoom = -1.0\n").is_err());
    }
}
