//! Shape classification from control hulls.

use curvekit_core::tolerance::{DEFAULT_FRACTIONAL_TOLERANCE, ZERO_TOLERANCE};
use curvekit_math::{Plane, Ray};

use crate::curve::{AnyCurve, Curve};

/// Whether the curve is a straight segment within `tolerance`.
///
/// The hull must lie on the line through the end points and advance along
/// it, so curves that fold back are not linear.
pub fn is_linear(curve: &AnyCurve, tolerance: f64) -> bool {
    let (start, end) = (curve.start_point(), curve.end_point());
    let chord = end - start;
    if chord.length() <= tolerance.max(ZERO_TOLERANCE) {
        return false;
    }
    let line = Ray::new(start, chord);
    let hull = curve.control_hull();
    let mut last = f64::NEG_INFINITY;
    for p in hull {
        if line.distance_to_point(p) > tolerance {
            return false;
        }
        let along = (p - start).dot(line.direction);
        if along < last - tolerance {
            return false;
        }
        last = last.max(along);
    }
    true
}

/// Plane containing the curve within `tolerance`, if there is one.
///
/// Linear curves get an arbitrary plane through their line.
pub fn is_planar(curve: &AnyCurve, tolerance: f64) -> Option<Plane> {
    let hull = curve.control_hull();
    if hull.len() < 3 {
        let start = curve.start_point();
        let dir = (curve.end_point() - start).try_normalize()?;
        return Some(Plane::new(start, dir.any_orthonormal_vector()));
    }
    let (plane, deviation) = Plane::fit_to_points(&hull)?;
    (deviation <= tolerance).then_some(plane)
}

/// Whether the curve is shorter than `tolerance`.
pub fn is_short(curve: &AnyCurve, tolerance: f64) -> bool {
    // The control polygon bounds the length of polynomial curves from above.
    if !curve.is_rational() {
        let hull = curve.control_hull();
        let polygon: f64 = hull.windows(2).map(|w| (w[1] - w[0]).length()).sum();
        if polygon < tolerance {
            return true;
        }
    }
    curve.length(None, DEFAULT_FRACTIONAL_TOLERANCE).value < tolerance
}
