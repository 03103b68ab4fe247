//! Adaptive polyline approximation of curves.

use curvekit_math::Point3;

use crate::curve::Curve;

/// Maximum recursion depth for adaptive subdivision.
const MAX_DEPTH: u32 = 12;

/// Convert a curve to a polyline using adaptive subdivision.
///
/// Every smooth span is subdivided separately, so kinks are always
/// vertices of the polyline.
pub fn curve_to_polyline<C: Curve + ?Sized>(curve: &C, tolerance: f64) -> Vec<Point3> {
    sample_curve(curve, tolerance)
        .into_iter()
        .map(|(_, p)| p)
        .collect()
}

/// Like [`curve_to_polyline`], keeping the curve parameter of each vertex.
///
/// A segment is accepted once the curve at its quarter points stays within
/// `tolerance` of the chord.
pub fn sample_curve<C: Curve + ?Sized>(curve: &C, tolerance: f64) -> Vec<(f64, Point3)> {
    let spans = curve.span_vector();
    let Some(&t_min) = spans.first() else {
        return Vec::new();
    };
    let mut samples = vec![(t_min, curve.point_at(t_min))];
    for w in spans.windows(2) {
        let p0 = samples[samples.len() - 1].1;
        let p1 = curve.point_at(w[1]);
        subdivide_curve(curve, (w[0], p0), (w[1], p1), tolerance, &mut samples, 0);
    }
    samples
}

fn subdivide_curve<C: Curve + ?Sized>(
    curve: &C,
    start: (f64, Point3),
    end: (f64, Point3),
    tolerance: f64,
    samples: &mut Vec<(f64, Point3)>,
    depth: u32,
) {
    let (t0, p0) = start;
    let (t1, p1) = end;
    if depth >= MAX_DEPTH {
        samples.push(end);
        return;
    }

    let t_mid = (t0 + t1) * 0.5;
    let p_mid = curve.point_at(t_mid);
    let deviation = [0.25, 0.75]
        .iter()
        .map(|&x| curve.point_at(t0 + (t1 - t0) * x))
        .chain(std::iter::once(p_mid))
        .map(|p| distance_to_segment(p, p0, p1))
        .fold(0.0, f64::max);

    if deviation > tolerance {
        let mid = (t_mid, p_mid);
        subdivide_curve(curve, start, mid, tolerance, samples, depth + 1);
        subdivide_curve(curve, mid, end, tolerance, samples, depth + 1);
    } else {
        samples.push(end);
    }
}

fn distance_to_segment(p: Point3, a: Point3, b: Point3) -> f64 {
    let ab = b - a;
    let len2 = ab.length_squared();
    if len2 == 0.0 {
        return (p - a).length();
    }
    let x = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    (p - (a + ab * x)).length()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::{NurbsCurve, PolyCurve};
    use curvekit_math::{DVec3, Plane};

    #[test]
    fn test_curve_to_polyline_line() {
        let line = NurbsCurve::line(DVec3::ZERO, DVec3::new(10.0, 0.0, 0.0));
        let points = curve_to_polyline(&line, 0.01);
        // A line should produce exactly 2 points (no subdivision needed)
        assert_eq!(points.len(), 2);
        assert!((points[0] - DVec3::ZERO).length() < 1e-10);
        assert!((points[1] - DVec3::new(10.0, 0.0, 0.0)).length() < 1e-10);
    }

    #[test]
    fn test_curve_to_polyline_circle() {
        let circle = NurbsCurve::circle(&Plane::xy(), 5.0).unwrap();
        let points = curve_to_polyline(&circle, 0.01);
        assert!(points.len() > 8);
        for p in &points {
            assert!((p.length() - 5.0).abs() < 1e-9);
        }
        // Closed: first and last coincide.
        assert!((points[0] - points[points.len() - 1]).length() < 1e-9);
    }

    #[test]
    fn test_samples_keep_kinks() {
        let poly = PolyCurve::from_segments(vec![
            NurbsCurve::line(DVec3::ZERO, DVec3::X).into(),
            NurbsCurve::line(DVec3::X, DVec3::new(1.0, 1.0, 0.0)).into(),
        ])
        .unwrap();
        let samples = sample_curve(&poly, 0.1);
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[1].0, 1.0);
        assert!((samples[1].1 - DVec3::X).length() < 1e-12);
    }
}
