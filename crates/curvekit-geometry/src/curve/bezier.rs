//! Bezier curves on the fixed domain `[0, 1]`.

use curvekit_core::traits::{BoundingBox, Validate};
use curvekit_core::{KernelError, Result};
use curvekit_math::{
    euclidean_derivatives, from_homogeneous, to_homogeneous, Aabb3, Interval, Point3, Point4,
    Transform, Vector3,
};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use super::{flatten_to_dimension, hull_is_closed, occupied_dimension, Curve, EvalSide, NurbsCurve};
use crate::fit;
use crate::length::LengthCache;
use crate::nurbs::deboor::{elevate_bezier, subdivide_bezier};

/// A single polynomial (or rational) span given by its control points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BezierCurve {
    dimension: u32,
    rational: bool,
    control_points: Vec<Point4>,
    #[serde(skip)]
    length_cache: LengthCache,
}

impl BezierCurve {
    /// Non-rational Bezier through the given control points.
    pub fn new(points: Vec<Point3>) -> Result<Self> {
        let cvs = points.into_iter().map(|p| to_homogeneous(p, 1.0)).collect();
        Self::from_homogeneous(3, false, cvs)
    }

    pub fn new_rational(points: Vec<Point3>, weights: Vec<f64>) -> Result<Self> {
        if points.len() != weights.len() {
            return Err(KernelError::Geometry(format!(
                "{} weights for {} control points",
                weights.len(),
                points.len()
            )));
        }
        let cvs = points
            .into_iter()
            .zip(weights)
            .map(|(p, w)| to_homogeneous(p, w))
            .collect();
        Self::from_homogeneous(3, true, cvs)
    }

    /// Build from homogeneous control points `(x·w, y·w, z·w, w)`.
    pub fn from_homogeneous(dimension: u32, rational: bool, control_points: Vec<Point4>) -> Result<Self> {
        let curve = Self {
            dimension,
            rational,
            control_points,
            length_cache: LengthCache::default(),
        };
        curve.validate()?;
        Ok(curve)
    }

    pub(crate) fn from_parts(dimension: u32, rational: bool, control_points: Vec<Point4>) -> Self {
        Self {
            dimension,
            rational,
            control_points,
            length_cache: LengthCache::default(),
        }
    }

    /// Interpolating Bezier through `points` at uniform parameters `i / (n - 1)`.
    pub fn loft(points: &[Point3]) -> Result<Self> {
        let n = points.len();
        if n < 2 {
            return Err(KernelError::Geometry("loft needs at least two points".into()));
        }
        let degree = n - 1;
        let matrix = DMatrix::from_fn(n, n, |i, j| {
            bernstein(degree, j, i as f64 / degree as f64)
        });
        let cvs = fit::solve_interpolation(matrix, points)?;
        Self::new(cvs)
    }

    pub fn degree(&self) -> usize {
        self.control_points.len() - 1
    }

    pub fn order(&self) -> usize {
        self.control_points.len()
    }

    pub fn cv_count(&self) -> usize {
        self.control_points.len()
    }

    /// Homogeneous control points.
    pub fn control_points(&self) -> &[Point4] {
        &self.control_points
    }

    /// Euclidean location of every control point.
    pub fn euclidean_points(&self) -> Vec<Point3> {
        self.control_points.iter().map(|&h| from_homogeneous(h)).collect()
    }

    pub fn control_point(&self, index: usize) -> Result<Point3> {
        self.cv(index).map(from_homogeneous)
    }

    pub fn weight(&self, index: usize) -> Result<f64> {
        self.cv(index).map(|h| h.w)
    }

    /// Move a control point, keeping its weight.
    pub fn set_control_point(&mut self, index: usize, point: Point3) -> Result<()> {
        let w = self.weight(index)?;
        self.control_points[index] = to_homogeneous(point, w);
        self.dimension = occupied_dimension(&self.control_points, self.dimension);
        self.length_cache.invalidate();
        Ok(())
    }

    /// Change a weight, keeping the Euclidean location. Makes the curve rational.
    pub fn set_weight(&mut self, index: usize, weight: f64) -> Result<()> {
        if !(weight > 0.0 && weight.is_finite()) {
            return Err(KernelError::Geometry(format!("weight {weight} must be positive")));
        }
        let p = self.control_point(index)?;
        self.control_points[index] = to_homogeneous(p, weight);
        if weight != 1.0 {
            self.rational = true;
        }
        self.length_cache.invalidate();
        Ok(())
    }

    pub fn make_rational(&mut self) {
        self.rational = true;
    }

    /// Drop the weights when they are all equal. Returns false otherwise.
    pub fn make_non_rational(&mut self) -> bool {
        if !self.rational {
            return true;
        }
        let w0 = self.control_points[0].w;
        if self.control_points.iter().any(|h| h.w != w0) {
            return false;
        }
        for h in &mut self.control_points {
            *h /= w0;
        }
        self.rational = false;
        true
    }

    /// Degree elevation without changing the shape.
    pub fn increase_degree(&mut self, desired: usize) -> Result<()> {
        if desired < self.degree() {
            return Err(KernelError::InvalidOperation(format!(
                "cannot lower degree {} to {desired}",
                self.degree()
            )));
        }
        while self.degree() < desired {
            self.control_points = elevate_bezier(&self.control_points);
        }
        self.length_cache.invalidate();
        Ok(())
    }

    pub fn change_dimension(&mut self, dimension: u32) -> Result<()> {
        if !(1..=3).contains(&dimension) {
            return Err(KernelError::InvalidOperation(format!(
                "dimension {dimension} is not 1, 2 or 3"
            )));
        }
        flatten_to_dimension(&mut self.control_points, dimension);
        self.dimension = dimension;
        self.length_cache.invalidate();
        Ok(())
    }

    pub fn reverse(&mut self) {
        self.control_points.reverse();
        self.length_cache.invalidate();
    }

    pub fn transform(&mut self, xform: &Transform) {
        for h in &mut self.control_points {
            *h = xform.transform_homogeneous(*h);
        }
        self.dimension = occupied_dimension(&self.control_points, self.dimension);
        self.length_cache.invalidate();
    }

    /// Split at an interior parameter into the pieces over `[0, t]` and
    /// `[t, 1]`, each reparameterized to `[0, 1]`.
    pub fn split(&self, t: f64) -> Result<(Self, Self)> {
        if !(t > 0.0 && t < 1.0) {
            return Err(KernelError::ParameterNotInterior { t, t0: 0.0, t1: 1.0 });
        }
        let (left, right) = subdivide_bezier(&self.control_points, t);
        Ok((self.with_points(left), self.with_points(right)))
    }

    /// The piece over `subdomain`, reparameterized to `[0, 1]`.
    pub fn trim(&self, subdomain: Interval) -> Result<Self> {
        let (a, b) = (subdomain.t0(), subdomain.t1());
        if !(subdomain.is_increasing() && a >= 0.0 && b <= 1.0) {
            return Err(KernelError::InvalidInterval { t0: a, t1: b });
        }
        Ok(self.restricted(a, b))
    }

    /// The same polynomial over a larger interval `[a, b] ⊇ [0, 1]`,
    /// reparameterized to `[0, 1]`.
    pub fn extended(&self, domain: Interval) -> Result<Self> {
        let (a, b) = (domain.t0(), domain.t1());
        if !(domain.is_increasing() && a <= 0.0 && b >= 1.0) {
            return Err(KernelError::InvalidInterval { t0: a, t1: b });
        }
        Ok(self.restricted(a, b))
    }

    fn restricted(&self, a: f64, b: f64) -> Self {
        let mut cvs = self.control_points.clone();
        if b != 1.0 {
            cvs = subdivide_bezier(&cvs, b).0;
        }
        if a != 0.0 {
            cvs = subdivide_bezier(&cvs, a / b).1;
        }
        self.with_points(cvs)
    }

    pub fn set_start_point(&mut self, point: Point3) -> bool {
        let w = self.control_points[0].w;
        self.control_points[0] = to_homogeneous(point, w);
        self.dimension = occupied_dimension(&self.control_points, self.dimension);
        self.length_cache.invalidate();
        true
    }

    pub fn set_end_point(&mut self, point: Point3) -> bool {
        let last = self.control_points.len() - 1;
        let w = self.control_points[last].w;
        self.control_points[last] = to_homogeneous(point, w);
        self.dimension = occupied_dimension(&self.control_points, self.dimension);
        self.length_cache.invalidate();
        true
    }

    /// Equivalent clamped NURBS on `[0, 1]`.
    pub fn to_nurbs(&self) -> NurbsCurve {
        let order = self.order();
        let mut knots = vec![0.0; order];
        knots.extend(std::iter::repeat(1.0).take(order));
        NurbsCurve::from_parts(
            self.dimension,
            self.rational,
            self.degree(),
            knots,
            self.control_points.clone(),
            false,
        )
    }

    fn with_points(&self, control_points: Vec<Point4>) -> Self {
        Self::from_parts(self.dimension, self.rational, control_points)
    }

    fn cv(&self, index: usize) -> Result<Point4> {
        self.control_points
            .get(index)
            .copied()
            .ok_or(KernelError::IndexOutOfRange {
                what: "control point",
                index,
                len: self.control_points.len(),
            })
    }
}

/// Bernstein polynomial `B_{i,n}(t)`.
pub fn bernstein(n: usize, i: usize, t: f64) -> f64 {
    curvekit_math::binomial(n, i) * t.powi(i as i32) * (1.0 - t).powi((n - i) as i32)
}

impl Curve for BezierCurve {
    fn domain(&self) -> Interval {
        Interval::UNIT
    }

    fn dimension(&self) -> u32 {
        self.dimension
    }

    fn is_rational(&self) -> bool {
        self.rational
    }

    fn is_closed(&self) -> bool {
        hull_is_closed(&self.euclidean_points())
    }

    fn derivatives_at_side(&self, t: f64, order: usize, _side: EvalSide) -> Vec<Vector3> {
        let p = self.degree();
        let mut hders = vec![Point4::ZERO; order + 1];
        let mut diffs = self.control_points.clone();
        let mut scale = 1.0;

        for (k, hder) in hders.iter_mut().enumerate().take(order.min(p) + 1) {
            if k > 0 {
                scale *= (p + 1 - k) as f64;
                diffs = diffs.windows(2).map(|w| w[1] - w[0]).collect();
            }
            *hder = scale * subdivide_bezier(&diffs, t).0[diffs.len() - 1];
        }
        euclidean_derivatives(&hders)
    }

    fn span_vector(&self) -> Vec<f64> {
        vec![0.0, 1.0]
    }

    fn length_cache(&self) -> &LengthCache {
        &self.length_cache
    }
}

impl Validate for BezierCurve {
    fn validate(&self) -> Result<()> {
        if !(1..=3).contains(&self.dimension) {
            return Err(KernelError::Geometry(format!(
                "dimension {} is not 1, 2 or 3",
                self.dimension
            )));
        }
        if self.control_points.len() < 2 {
            return Err(KernelError::Geometry("bezier needs at least two control points".into()));
        }
        for (i, h) in self.control_points.iter().enumerate() {
            if !h.is_finite() {
                return Err(KernelError::Geometry(format!("control point {i} is not finite")));
            }
            if self.rational && h.w <= 0.0 {
                return Err(KernelError::Geometry(format!("weight {i} must be positive")));
            }
            if !self.rational && h.w != 1.0 {
                return Err(KernelError::Geometry(format!(
                    "non-rational control point {i} has weight {}",
                    h.w
                )));
            }
        }
        Ok(())
    }
}

impl BoundingBox for BezierCurve {
    type Box = Aabb3;

    fn bounding_box(&self) -> Aabb3 {
        Aabb3::from_points(&self.euclidean_points()).unwrap_or(Aabb3::new(Point3::ZERO, Point3::ZERO))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use curvekit_math::DVec3;

    fn quadratic() -> BezierCurve {
        BezierCurve::new(vec![
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(0.5, 1.0, 0.0),
            DVec3::new(1.0, 0.0, 0.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_bezier_quadratic() {
        let curve = quadratic();

        // Endpoints should interpolate
        assert!((curve.point_at(0.0) - DVec3::ZERO).length() < 1e-10);
        assert!((curve.point_at(1.0) - DVec3::new(1.0, 0.0, 0.0)).length() < 1e-10);

        // At t=0.5: 0.25*P0 + 0.5*P1 + 0.25*P2 = (0.5, 0.5, 0)
        let pm = curve.point_at(0.5);
        assert!((pm.x - 0.5).abs() < 1e-10);
        assert!((pm.y - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_bezier_derivatives() {
        let curve = quadratic();
        let d = curve.derivatives_at(0.0, 3);
        assert_eq!(d.len(), 4);
        // C'(0) = 2 (P1 - P0), C'' = 2 (P2 - 2 P1 + P0)
        assert!((d[1] - DVec3::new(1.0, 2.0, 0.0)).length() < 1e-12);
        assert!((d[2] - DVec3::new(0.0, -4.0, 0.0)).length() < 1e-12);
        assert!(d[3].length() < 1e-12);
    }

    #[test]
    fn test_rational_quarter_circle() {
        let w = std::f64::consts::FRAC_1_SQRT_2;
        let curve = BezierCurve::new_rational(
            vec![DVec3::X, DVec3::new(1.0, 1.0, 0.0), DVec3::Y],
            vec![1.0, w, 1.0],
        )
        .unwrap();
        for i in 0..=10 {
            let p = curve.point_at(i as f64 / 10.0);
            assert!((p.length() - 1.0).abs() < 1e-12);
        }
        let k = curve.curvature_at(0.3).unwrap();
        assert!((k.length() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_split_rejects_ends() {
        let curve = quadratic();
        assert!(curve.split(0.0).is_err());
        assert!(curve.split(1.0).is_err());
        let (a, b) = curve.split(0.25).unwrap();
        assert!((a.end_point() - curve.point_at(0.25)).length() < 1e-12);
        assert!((b.point_at(0.5) - curve.point_at(0.625)).length() < 1e-12);
    }

    #[test]
    fn test_trim_and_extend() {
        let curve = quadratic();
        let piece = curve.trim(Interval::new(0.2, 0.6)).unwrap();
        assert!((piece.start_point() - curve.point_at(0.2)).length() < 1e-12);
        assert!((piece.end_point() - curve.point_at(0.6)).length() < 1e-12);

        let longer = curve.extended(Interval::new(-0.5, 1.5)).unwrap();
        assert!((longer.start_point() - curve.point_at(-0.5)).length() < 1e-12);
        assert!((longer.point_at(0.5) - curve.point_at(0.5)).length() < 1e-12);
        assert!(curve.extended(Interval::new(0.1, 1.5)).is_err());
    }

    #[test]
    fn test_increase_degree_keeps_shape() {
        let curve = quadratic();
        let mut raised = curve.clone();
        raised.increase_degree(5).unwrap();
        assert_eq!(raised.degree(), 5);
        for i in 0..=8 {
            let t = i as f64 / 8.0;
            assert!((raised.point_at(t) - curve.point_at(t)).length() < 1e-12);
        }
        assert!(raised.increase_degree(2).is_err());
    }

    #[test]
    fn test_loft_interpolates() {
        let pts = [
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(1.0, 2.0, 0.0),
            DVec3::new(3.0, 1.0, 0.0),
            DVec3::new(4.0, 0.0, 1.0),
        ];
        let curve = BezierCurve::loft(&pts).unwrap();
        for (i, p) in pts.iter().enumerate() {
            assert!((curve.point_at(i as f64 / 3.0) - *p).length() < 1e-9);
        }
    }

    #[test]
    fn test_index_errors() {
        let mut curve = quadratic();
        assert!(matches!(
            curve.control_point(3),
            Err(KernelError::IndexOutOfRange { index: 3, len: 3, .. })
        ));
        assert!(curve.set_weight(0, -1.0).is_err());
        assert!(curve.set_control_point(7, DVec3::ZERO).is_err());
    }

    #[test]
    fn test_make_non_rational() {
        let mut curve = BezierCurve::new_rational(vec![DVec3::ZERO, DVec3::X], vec![2.0, 2.0]).unwrap();
        assert!(curve.make_non_rational());
        assert!(!curve.is_rational());
        assert!((curve.end_point() - DVec3::X).length() < 1e-15);

        let mut uneven = BezierCurve::new_rational(vec![DVec3::ZERO, DVec3::X], vec![1.0, 2.0]).unwrap();
        assert!(!uneven.make_non_rational());
    }

    #[test]
    fn test_change_dimension_drops_z() {
        let mut curve = BezierCurve::new(vec![DVec3::ZERO, DVec3::new(1.0, 1.0, 1.0)]).unwrap();
        curve.change_dimension(2).unwrap();
        assert_eq!(curve.dimension(), 2);
        assert_eq!(curve.end_point().z, 0.0);
        assert!(curve.change_dimension(4).is_err());
    }

    #[test]
    fn test_reverse_is_involution() {
        let curve = quadratic();
        let mut twice = curve.clone();
        twice.reverse();
        assert!((twice.point_at(0.25) - curve.point_at(0.75)).length() < 1e-15);
        twice.reverse();
        assert_eq!(twice, curve);
    }
}
