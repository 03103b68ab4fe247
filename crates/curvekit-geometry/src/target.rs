//! External geometry that curves can be intersected with or projected onto.

use curvekit_math::{Plane, Transform};

use crate::curve::{AnyCurve, Curve};
use crate::tessellate::sample_curve;

const MAX_BISECTIONS: usize = 64;

/// Geometry supplied by the caller, for example as an extension target.
pub trait GeometryTarget: Send + Sync {
    /// Increasing curve parameters where `curve` meets the target.
    fn intersect_curve(&self, curve: &AnyCurve, tolerance: f64) -> Vec<f64>;

    /// Images of `curve` on the target. Empty when projection is not
    /// supported.
    fn project_curve(&self, curve: &AnyCurve, tolerance: f64) -> Vec<AnyCurve> {
        let _ = (curve, tolerance);
        Vec::new()
    }
}

impl GeometryTarget for Plane {
    /// Crossings of the plane. A curve lying in the plane reports its
    /// domain ends.
    fn intersect_curve(&self, curve: &AnyCurve, tolerance: f64) -> Vec<f64> {
        let samples: Vec<(f64, f64)> = sample_curve(curve, tolerance)
            .into_iter()
            .map(|(t, p)| (t, self.signed_distance(p)))
            .collect();
        if samples.iter().all(|&(_, d)| d.abs() <= tolerance) {
            let domain = curve.domain();
            return vec![domain.t0(), domain.t1()];
        }

        let mut hits: Vec<f64> = Vec::new();
        for (i, &(t, d)) in samples.iter().enumerate() {
            if d == 0.0 {
                hits.push(t);
                continue;
            }
            if let Some(&(tn, dn)) = samples.get(i + 1) {
                if dn != 0.0 && d.signum() != dn.signum() {
                    hits.push(bisect(self, curve, (t, d), tn, tolerance));
                }
            }
        }
        hits.dedup_by(|a, b| (*a - *b).abs() <= f64::EPSILON * (1.0 + a.abs()));
        hits
    }

    fn project_curve(&self, curve: &AnyCurve, _tolerance: f64) -> Vec<AnyCurve> {
        let mut projected = curve.clone();
        projected.transform(&Transform::planar_projection(self));
        vec![projected]
    }
}

/// Root of the signed distance between `lo` (distance `d_lo`) and `hi`.
fn bisect(
    plane: &Plane,
    curve: &AnyCurve,
    (mut lo, mut d_lo): (f64, f64),
    mut hi: f64,
    tolerance: f64,
) -> f64 {
    for _ in 0..MAX_BISECTIONS {
        let mid = 0.5 * (lo + hi);
        let d = plane.signed_distance(curve.point_at(mid));
        if d.abs() <= tolerance * 1e-3 || mid == lo || mid == hi {
            return mid;
        }
        if d.signum() == d_lo.signum() {
            (lo, d_lo) = (mid, d);
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::NurbsCurve;
    use curvekit_math::DVec3;

    #[test]
    fn test_line_crosses_plane() {
        let line: AnyCurve = NurbsCurve::line(DVec3::new(0.0, 0.0, -1.0), DVec3::new(0.0, 0.0, 3.0)).into();
        let hits = Plane::xy().intersect_curve(&line, 1e-9);
        assert_eq!(hits.len(), 1);
        assert!((hits[0] - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_circle_crosses_plane_twice() {
        let circle: AnyCurve = NurbsCurve::circle(&Plane::xy(), 2.0).unwrap().into();
        let hits = Plane::yz().intersect_curve(&circle, 1e-9);
        assert_eq!(hits.len(), 2);
        for t in hits {
            assert!(circle.point_at(t).x.abs() < 1e-8);
        }
    }

    #[test]
    fn test_curve_in_plane() {
        let line: AnyCurve = NurbsCurve::line(DVec3::ZERO, DVec3::X).into();
        assert_eq!(Plane::xy().intersect_curve(&line, 1e-9), vec![0.0, 1.0]);
    }

    #[test]
    fn test_project_curve() {
        let line: AnyCurve = NurbsCurve::line(DVec3::new(0.0, 0.0, 1.0), DVec3::new(1.0, 0.0, 2.0)).into();
        let images = Plane::xy().project_curve(&line, 1e-9);
        assert_eq!(images.len(), 1);
        assert!((images[0].end_point() - DVec3::X).length() < 1e-12);
    }
}
