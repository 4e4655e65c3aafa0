//! Easing curves for tweened transitions.

/// Pure `[0,1] -> [0,1]` easing maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Easing {
    Linear,
    QuadIn,
    QuadOut,
    QuadInOut,
    CubicIn,
    CubicOut,
    #[default]
    CubicInOut,
    QuartIn,
    QuartOut,
    QuartInOut,
    ExpoIn,
    ExpoOut,
    ExpoInOut,
}

impl Easing {
    /// Apply the curve to a normalized time parameter t. Input is clamped
    /// to [0, 1].
    pub fn apply(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,

            Self::QuadIn => t * t,
            Self::QuadOut => 1.0 - (1.0 - t).powi(2),
            Self::QuadInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }

            Self::CubicIn => t * t * t,
            Self::CubicOut => 1.0 - (1.0 - t).powi(3),
            Self::CubicInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }

            Self::QuartIn => t.powi(4),
            Self::QuartOut => 1.0 - (1.0 - t).powi(4),
            Self::QuartInOut => {
                if t < 0.5 {
                    8.0 * t.powi(4)
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(4) / 2.0
                }
            }

            Self::ExpoIn => {
                if t == 0.0 {
                    0.0
                } else {
                    2.0_f32.powf(10.0 * t - 10.0)
                }
            }
            Self::ExpoOut => {
                if t == 1.0 {
                    1.0
                } else {
                    1.0 - 2.0_f32.powf(-10.0 * t)
                }
            }
            Self::ExpoInOut => {
                if t == 0.0 {
                    0.0
                } else if t == 1.0 {
                    1.0
                } else if t < 0.5 {
                    2.0_f32.powf(20.0 * t - 10.0) / 2.0
                } else {
                    (2.0 - 2.0_f32.powf(-20.0 * t + 10.0)) / 2.0
                }
            }
        }
    }

    /// Parse an easing name as used by navigation options.
    pub fn from_name(name: &str) -> Option<Self> {
        let parsed = match name.to_lowercase().replace('_', "-").as_str() {
            "linear" => Self::Linear,
            "quad-in" => Self::QuadIn,
            "quad-out" => Self::QuadOut,
            "quad-in-out" => Self::QuadInOut,
            "cubic-in" => Self::CubicIn,
            "cubic-out" => Self::CubicOut,
            "cubic-in-out" => Self::CubicInOut,
            "quart-in" => Self::QuartIn,
            "quart-out" => Self::QuartOut,
            "quart-in-out" => Self::QuartInOut,
            "expo-in" => Self::ExpoIn,
            "expo-out" => Self::ExpoOut,
            "expo-in-out" => Self::ExpoInOut,
            _ => return None,
        };
        Some(parsed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::QuadIn => "quad-in",
            Self::QuadOut => "quad-out",
            Self::QuadInOut => "quad-in-out",
            Self::CubicIn => "cubic-in",
            Self::CubicOut => "cubic-out",
            Self::CubicInOut => "cubic-in-out",
            Self::QuartIn => "quart-in",
            Self::QuartOut => "quart-out",
            Self::QuartInOut => "quart-in-out",
            Self::ExpoIn => "expo-in",
            Self::ExpoOut => "expo-out",
            Self::ExpoInOut => "expo-in-out",
        }
    }

    pub const ALL: [Easing; 13] = [
        Self::Linear,
        Self::QuadIn,
        Self::QuadOut,
        Self::QuadInOut,
        Self::CubicIn,
        Self::CubicOut,
        Self::CubicInOut,
        Self::QuartIn,
        Self::QuartOut,
        Self::QuartInOut,
        Self::ExpoIn,
        Self::ExpoOut,
        Self::ExpoInOut,
    ];
}
