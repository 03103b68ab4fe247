//! Closest-point projection onto a curve.

use curvekit_core::traits::BoundingBox;
use curvekit_math::{Aabb3, Point3};

use crate::curve::Curve;

const SAMPLES_PER_SPAN: usize = 16;
const MAX_NEWTON_ITERATIONS: usize = 32;

/// Parameter of the curve point closest to `point`.
///
/// Each span is sampled to find a starting bracket, then the foot point is
/// refined by Newton iteration on `(C(t) - P) · C'(t) = 0`. `None` when the
/// closest point is farther than `max_distance`; points outside the control
/// hull box grown by that distance are rejected without sampling.
pub fn closest_point<C>(curve: &C, point: Point3, max_distance: Option<f64>) -> Option<f64>
where
    C: Curve + BoundingBox<Box = Aabb3> + ?Sized,
{
    if let Some(max) = max_distance {
        if !curve.bounding_box().expand(max).contains_point(point) {
            return None;
        }
    }
    let domain = curve.domain();
    let spans = curve.span_vector();

    let mut params: Vec<f64> = Vec::with_capacity(spans.len() * SAMPLES_PER_SPAN);
    for w in spans.windows(2) {
        for i in 0..SAMPLES_PER_SPAN {
            params.push(w[0] + (w[1] - w[0]) * i as f64 / SAMPLES_PER_SPAN as f64);
        }
    }
    params.push(domain.t1());

    let distance = |t: f64| (curve.point_at(t) - point).length_squared();
    let (best_index, _) = params
        .iter()
        .map(|&t| distance(t))
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(&b.1))?;

    let lo = params[best_index.saturating_sub(1)];
    let hi = params[(best_index + 1).min(params.len() - 1)];
    let mut t = params[best_index];
    for _ in 0..MAX_NEWTON_ITERATIONS {
        let d = curve.derivatives_at(t, 2);
        let offset = d[0] - point;
        let f = offset.dot(d[1]);
        let df = d[1].length_squared() + offset.dot(d[2]);
        if df <= 0.0 {
            break;
        }
        let next = (t - f / df).clamp(lo, hi);
        if (next - t).abs() <= f64::EPSILON * domain.length().max(1.0) {
            t = next;
            break;
        }
        t = next;
    }

    let t = if distance(t) <= distance(params[best_index]) {
        t
    } else {
        params[best_index]
    };
    match max_distance {
        Some(max) if distance(t).sqrt() > max => None,
        _ => Some(t),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::{BezierCurve, NurbsCurve};
    use curvekit_math::{DVec3, Plane};

    #[test]
    fn test_closest_point_on_line() {
        let line = NurbsCurve::line(DVec3::ZERO, DVec3::new(10.0, 0.0, 0.0));
        let t = closest_point(&line, DVec3::new(3.3, 4.0, 0.0), None).unwrap();
        assert!((t - 0.33).abs() < 1e-12);
        // Beyond the end clamps to the end.
        let t = closest_point(&line, DVec3::new(12.0, 1.0, 0.0), None).unwrap();
        assert_eq!(t, 1.0);
    }

    #[test]
    fn test_closest_point_on_circle() {
        let circle = NurbsCurve::circle(&Plane::xy(), 2.0).unwrap();
        let target = DVec3::new(3.0, 3.0, 1.0);
        let t = closest_point(&circle, target, None).unwrap();
        let p = circle.point_at(t);
        let expected = DVec3::new(1.0, 1.0, 0.0).normalize() * 2.0;
        assert!((p - expected).length() < 1e-9);
    }

    #[test]
    fn test_max_distance() {
        let line = NurbsCurve::line(DVec3::ZERO, DVec3::X);
        assert!(closest_point(&line, DVec3::new(0.5, 2.0, 0.0), Some(1.0)).is_none());
        assert!(closest_point(&line, DVec3::new(0.5, 0.5, 0.0), Some(1.0)).is_some());
    }

    #[test]
    fn test_max_distance_on_hull_boundary() {
        // Curve bulges to y = 1 between control points at y = 0 and y = 2.
        let bump = BezierCurve::new(vec![DVec3::ZERO, DVec3::new(1.0, 2.0, 0.0), DVec3::new(2.0, 0.0, 0.0)]).unwrap();
        let above = DVec3::new(1.0, 2.5, 0.0);
        let t = closest_point(&bump, above, Some(1.6)).unwrap();
        assert!((bump.point_at(t) - DVec3::new(1.0, 1.0, 0.0)).length() < 1e-9);
        assert!(closest_point(&bump, above, Some(1.4)).is_none());
        assert!(closest_point(&bump, DVec3::new(1.0, 4.0, 0.0), Some(1.9)).is_none());
    }
}
