/// Sentinel for parameters and values that have not been set.
pub const UNSET_VALUE: f64 = -1.234_321_012_343_21e308;

/// Absolute tolerance below which a length or coordinate difference is zero.
pub const ZERO_TOLERANCE: f64 = 2.328_306_436_538_696_3e-10;

/// Distance below which end points and hits count as coincident.
pub const LINEAR_TOLERANCE: f64 = 1e-7;

/// Default relative tolerance for arc-length integration and inversion.
pub const DEFAULT_FRACTIONAL_TOLERANCE: f64 = 1e-8;

/// Returns true when `v` is a finite number that is not [`UNSET_VALUE`].
pub fn is_valid_double(v: f64) -> bool {
    v.is_finite() && v != UNSET_VALUE
}

/// Thresholds used when comparing one-sided evaluations at a parameter.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ContinuityTolerance {
    /// Maximum distance between the two one-sided points.
    pub point: f64,
    /// Maximum difference between first derivatives (parametric kinds).
    pub d1: f64,
    /// Maximum difference between second derivatives (parametric kinds).
    pub d2: f64,
    /// Minimum cosine of the angle between unit tangents (geometric kinds).
    pub cos_angle: f64,
    /// Maximum difference between curvature vectors (geometric kinds).
    pub curvature: f64,
}

impl ContinuityTolerance {
    /// cos(1 degree)
    pub const DEFAULT_COS_ANGLE: f64 = 0.999_847_695_156_391_2;
    pub const DEFAULT_CURVATURE: f64 = 1.490_116_119_385e-8;

    /// Same defaults with caller-chosen angle and curvature thresholds.
    pub fn with_angle_and_curvature(cos_angle: f64, curvature: f64) -> Self {
        Self {
            cos_angle,
            curvature,
            ..Self::default()
        }
    }
}

impl Default for ContinuityTolerance {
    fn default() -> Self {
        Self {
            point: ZERO_TOLERANCE,
            d1: ZERO_TOLERANCE,
            d2: ZERO_TOLERANCE,
            cos_angle: Self::DEFAULT_COS_ANGLE,
            curvature: Self::DEFAULT_CURVATURE,
        }
    }
}
