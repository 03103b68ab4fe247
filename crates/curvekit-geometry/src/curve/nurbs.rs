//! Non-uniform rational B-spline curves.

use std::f64::consts::{FRAC_PI_2, TAU};

use curvekit_core::tolerance::ZERO_TOLERANCE;
use curvekit_core::traits::{BoundingBox, Validate};
use curvekit_core::{KernelError, Result};
use curvekit_math::{
    euclidean_derivatives, from_homogeneous, to_homogeneous, Aabb3, Interval, Plane, Point3,
    Point4, Transform, Vector3,
};
use serde::{Deserialize, Serialize};

use super::{
    flatten_to_dimension, hull_is_closed, occupied_dimension, BezierCurve, Curve, EvalSide,
};
use crate::fit;
use crate::length::LengthCache;
use crate::nurbs::deboor::{self, elevate_bezier, ensure_multiplicity, keep_from, keep_until};
use crate::nurbs::knot::{
    clamped_uniform_knots, greville_abscissa, multiplicity_of, periodic_uniform_knots,
};

/// A NURBS curve with homogeneous control points `(x·w, y·w, z·w, w)`.
///
/// The knot vector is the full one: `cv_count + degree + 1` values, and the
/// domain is `[knots[degree], knots[cv_count]]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NurbsCurve {
    dimension: u32,
    rational: bool,
    degree: usize,
    knots: Vec<f64>,
    control_points: Vec<Point4>,
    periodic: bool,
    #[serde(skip)]
    length_cache: LengthCache,
}

impl NurbsCurve {
    /// Non-rational curve through the given control points.
    pub fn new(degree: usize, knots: Vec<f64>, points: Vec<Point3>) -> Result<Self> {
        let cvs = points.into_iter().map(|p| to_homogeneous(p, 1.0)).collect();
        Self::from_homogeneous(3, false, degree, knots, cvs)
    }

    pub fn new_rational(
        degree: usize,
        knots: Vec<f64>,
        points: Vec<Point3>,
        weights: Vec<f64>,
    ) -> Result<Self> {
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
        Self::from_homogeneous(3, true, degree, knots, cvs)
    }

    /// Build from homogeneous control points and validate.
    pub fn from_homogeneous(
        dimension: u32,
        rational: bool,
        degree: usize,
        knots: Vec<f64>,
        control_points: Vec<Point4>,
    ) -> Result<Self> {
        let curve = Self::from_parts(dimension, rational, degree, knots, control_points, false);
        curve.validate()?;
        Ok(curve)
    }

    pub(crate) fn from_parts(
        dimension: u32,
        rational: bool,
        degree: usize,
        knots: Vec<f64>,
        control_points: Vec<Point4>,
        periodic: bool,
    ) -> Self {
        Self {
            dimension,
            rational,
            degree,
            knots,
            control_points,
            periodic,
            length_cache: LengthCache::default(),
        }
    }

    /// Clamped curve with uniformly spaced knots `knot_delta` apart.
    pub fn clamped_uniform(degree: usize, points: &[Point3], knot_delta: f64) -> Result<Self> {
        check_uniform_input(degree, points.len(), knot_delta)?;
        let knots = clamped_uniform_knots(degree, points.len(), knot_delta);
        Self::new(degree, knots, points.to_vec())
    }

    /// Closed, smooth curve whose control polygon wraps around `points`.
    pub fn periodic_uniform(degree: usize, points: &[Point3], knot_delta: f64) -> Result<Self> {
        check_uniform_input(degree, points.len(), knot_delta)?;
        let mut cvs: Vec<Point4> = points.iter().map(|&p| to_homogeneous(p, 1.0)).collect();
        let wrapped: Vec<Point4> = cvs[..degree].to_vec();
        cvs.extend(wrapped);
        let knots = periodic_uniform_knots(degree, cvs.len(), knot_delta);
        let curve = Self::from_parts(3, false, degree, knots, cvs, true);
        curve.validate()?;
        Ok(curve)
    }

    /// Degree 1 segment on `[0, 1]`.
    pub fn line(from: Point3, to: Point3) -> Self {
        Self::from_parts(
            3,
            false,
            1,
            vec![0.0, 0.0, 1.0, 1.0],
            vec![to_homogeneous(from, 1.0), to_homogeneous(to, 1.0)],
            false,
        )
    }

    /// Rational quadratic arc in `plane`, centered at its origin, from
    /// `start_angle` to `end_angle` (radians from the x axis). The domain is
    /// `[0, arc length]`.
    pub fn arc(plane: &Plane, radius: f64, start_angle: f64, end_angle: f64) -> Result<Self> {
        let sweep = end_angle - start_angle;
        if !(radius > 0.0 && radius.is_finite()) {
            return Err(KernelError::Geometry(format!("arc radius {radius} must be positive")));
        }
        if sweep == 0.0 || !sweep.is_finite() || sweep.abs() > TAU * (1.0 + 1e-12) {
            return Err(KernelError::Geometry(format!("arc sweep {sweep} is out of range")));
        }

        let full = (sweep.abs() - TAU).abs() <= TAU * 1e-12;
        let narcs = ((sweep.abs() / FRAC_PI_2) - 1e-9).ceil().max(1.0) as usize;
        let dtheta = sweep / narcs as f64;
        let w1 = (dtheta * 0.5).cos();
        let length = radius * sweep.abs();

        let point = |angle: f64, r: f64| {
            plane.origin + r * (angle.cos() * plane.x_axis + angle.sin() * plane.y_axis)
        };

        let mut cvs = Vec::with_capacity(2 * narcs + 1);
        let mut knots = vec![0.0; 3];
        cvs.push(to_homogeneous(point(start_angle, radius), 1.0));
        for i in 1..=narcs {
            let angle = start_angle + dtheta * i as f64;
            let mid = angle - dtheta * 0.5;
            cvs.push(to_homogeneous(point(mid, radius / w1), w1));
            cvs.push(to_homogeneous(point(angle, radius), 1.0));
            if i < narcs {
                let k = length * i as f64 / narcs as f64;
                knots.push(k);
                knots.push(k);
            }
        }
        knots.extend([length; 3]);
        if full {
            let last = cvs.len() - 1;
            cvs[last] = cvs[0];
        }

        Ok(Self::from_parts(3, true, 2, knots, cvs, false))
    }

    pub fn circle(plane: &Plane, radius: f64) -> Result<Self> {
        Self::arc(plane, radius, 0.0, TAU)
    }

    /// Arc that leaves `start` along `tangent` and ends at `end`.
    ///
    /// When `end` lies ahead on the tangent line the result is a line;
    /// `None` when no such arc exists.
    pub fn tangent_arc(start: Point3, tangent: Vector3, end: Point3) -> Option<Self> {
        let dir = tangent.try_normalize()?;
        let chord = end - start;
        let chord_len = chord.length();
        if chord_len <= ZERO_TOLERANCE {
            return None;
        }

        let normal = dir.cross(chord);
        if normal.length() <= ZERO_TOLERANCE * chord_len {
            return (chord.dot(dir) > 0.0).then(|| Self::line(start, end));
        }

        let toward = normal.cross(dir).normalize();
        let radius = chord.length_squared() / (2.0 * chord.dot(toward));
        let center = start + toward * radius;
        let plane = Plane::from_frame(center, start - center, dir)?;
        let local = end - center;
        let mut angle = local.dot(plane.y_axis).atan2(local.dot(plane.x_axis));
        if angle <= 0.0 {
            angle += TAU;
        }
        Self::arc(&plane, radius, 0.0, angle).ok()
    }

    /// Interpolating curve through `points` (chord-length parameters).
    pub fn interpolate(points: &[Point3], degree: usize) -> Result<Self> {
        fit::interpolate(points, degree)
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn order(&self) -> usize {
        self.degree + 1
    }

    pub fn cv_count(&self) -> usize {
        self.control_points.len()
    }

    pub fn knots(&self) -> &[f64] {
        &self.knots
    }

    /// Homogeneous control points.
    pub fn control_points(&self) -> &[Point4] {
        &self.control_points
    }

    pub fn euclidean_points(&self) -> Vec<Point3> {
        self.control_points.iter().map(|&h| from_homogeneous(h)).collect()
    }

    pub fn control_point(&self, index: usize) -> Result<Point3> {
        self.cv(index).map(from_homogeneous)
    }

    pub fn weight(&self, index: usize) -> Result<f64> {
        self.cv(index).map(|h| h.w)
    }

    /// Number of knots sharing the value of `knots[index]`.
    pub fn knot_multiplicity(&self, index: usize) -> Result<usize> {
        let value = self.knots.get(index).ok_or(KernelError::IndexOutOfRange {
            what: "knot",
            index,
            len: self.knots.len(),
        })?;
        Ok(multiplicity_of(&self.knots, *value))
    }

    pub fn greville_abscissae(&self) -> Vec<f64> {
        (0..self.control_points.len())
            .map(|i| greville_abscissa(self.degree, &self.knots, i))
            .collect()
    }

    /// Whether the curve starts at its first control point.
    pub fn is_clamped_start(&self) -> bool {
        let p = self.degree;
        self.knots[1..=p].iter().all(|&k| k == self.knots[p])
    }

    /// Whether the curve ends at its last control point.
    pub fn is_clamped_end(&self) -> bool {
        let n = self.control_points.len();
        self.knots[n..n + self.degree].iter().all(|&k| k == self.knots[n])
    }

    pub fn control_polygon_length(&self) -> f64 {
        self.euclidean_points()
            .windows(2)
            .map(|w| (w[1] - w[0]).length())
            .sum()
    }

    /// Move a control point, keeping its weight.
    pub fn set_control_point(&mut self, index: usize, point: Point3) -> Result<()> {
        let w = self.weight(index)?;
        self.control_points[index] = to_homogeneous(point, w);
        if let Some(twin) = self.periodic_twin(index) {
            self.control_points[twin] = self.control_points[index];
        }
        self.dimension = occupied_dimension(&self.control_points, self.dimension);
        self.length_cache.invalidate();
        Ok(())
    }

    /// Change a weight, keeping the Euclidean location.
    pub fn set_weight(&mut self, index: usize, weight: f64) -> Result<()> {
        if !(weight > 0.0 && weight.is_finite()) {
            return Err(KernelError::Geometry(format!("weight {weight} must be positive")));
        }
        let p = self.control_point(index)?;
        self.control_points[index] = to_homogeneous(p, weight);
        if let Some(twin) = self.periodic_twin(index) {
            self.control_points[twin] = self.control_points[index];
        }
        if weight != 1.0 {
            self.rational = true;
        }
        self.length_cache.invalidate();
        Ok(())
    }

    /// Raise the multiplicity of the interior knot `t` to `multiplicity`.
    pub fn insert_knot(&mut self, t: f64, multiplicity: usize) -> Result<()> {
        let domain = self.domain();
        if !domain.includes(t, true) {
            return Err(KernelError::ParameterNotInterior {
                t,
                t0: domain.t0(),
                t1: domain.t1(),
            });
        }
        if multiplicity == 0 || multiplicity > self.degree {
            return Err(KernelError::InvalidOperation(format!(
                "knot multiplicity {multiplicity} must be between 1 and {}",
                self.degree
            )));
        }
        let (knots, cvs) =
            ensure_multiplicity(self.degree, &self.knots, &self.control_points, t, multiplicity);
        if knots.len() != self.knots.len() {
            self.periodic = false;
        }
        self.knots = knots;
        self.control_points = cvs;
        self.length_cache.invalidate();
        Ok(())
    }

    /// Make the curve start at its first control point and end at its last.
    pub fn clamp_ends(&mut self) {
        if self.is_clamped_start() && self.is_clamped_end() {
            return;
        }
        let (knots, cvs) = deboor::clamp(self.degree, &self.knots, &self.control_points);
        self.knots = knots;
        self.control_points = cvs;
        self.periodic = false;
        self.length_cache.invalidate();
    }

    /// Clamp and raise every interior knot to full multiplicity, so each span
    /// is a Bezier segment.
    pub fn make_piecewise_bezier(&mut self) {
        self.clamp_ends();
        let spans = self.span_vector();
        for &t in &spans[1..spans.len() - 1] {
            let (knots, cvs) =
                ensure_multiplicity(self.degree, &self.knots, &self.control_points, t, self.degree);
            self.knots = knots;
            self.control_points = cvs;
        }
        self.length_cache.invalidate();
    }

    /// One Bezier curve per non-empty span, in order.
    pub fn bezier_segments(&self) -> Vec<BezierCurve> {
        let mut piecewise = self.clone();
        piecewise.make_piecewise_bezier();
        let p = piecewise.degree;
        (0..piecewise.span_count())
            .map(|i| {
                BezierCurve::from_parts(
                    self.dimension,
                    self.rational,
                    piecewise.control_points[i * p..=i * p + p].to_vec(),
                )
            })
            .collect()
    }

    /// Degree elevation without changing the shape.
    pub fn increase_degree(&mut self, desired: usize) -> Result<()> {
        if desired < self.degree {
            return Err(KernelError::InvalidOperation(format!(
                "cannot lower degree {} to {desired}",
                self.degree
            )));
        }
        if desired == self.degree {
            return Ok(());
        }
        let breaks = self.span_vector();
        let mut knots = vec![breaks[0]; desired + 1];
        let mut cvs: Vec<Point4> = Vec::new();
        for (i, segment) in self.bezier_segments().iter().enumerate() {
            let mut elevated = segment.control_points().to_vec();
            while elevated.len() <= desired {
                elevated = elevate_bezier(&elevated);
            }
            let skip = usize::from(i > 0);
            cvs.extend_from_slice(&elevated[skip..]);
            let repeat = if i + 2 == breaks.len() { desired + 1 } else { desired };
            knots.extend(std::iter::repeat(breaks[i + 1]).take(repeat));
        }
        self.degree = desired;
        self.knots = knots;
        self.control_points = cvs;
        self.periodic = false;
        self.length_cache.invalidate();
        Ok(())
    }

    /// Affinely remap the knots so the domain becomes `domain`.
    pub fn set_domain(&mut self, domain: Interval) -> Result<()> {
        if !(domain.is_increasing() && domain.t0().is_finite() && domain.t1().is_finite()) {
            return Err(KernelError::InvalidInterval {
                t0: domain.t0(),
                t1: domain.t1(),
            });
        }
        let old = self.domain();
        if old == domain {
            return Ok(());
        }
        for k in &mut self.knots {
            *k = domain.parameter_at(old.normalized_parameter_at(*k));
        }
        self.length_cache.invalidate();
        Ok(())
    }

    /// Reverse direction; the domain becomes `[-t1, -t0]`.
    pub fn reverse(&mut self) {
        self.knots.reverse();
        for k in &mut self.knots {
            *k = -*k;
        }
        self.control_points.reverse();
        self.length_cache.invalidate();
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

    pub fn transform(&mut self, xform: &Transform) {
        for h in &mut self.control_points {
            *h = xform.transform_homogeneous(*h);
        }
        self.dimension = occupied_dimension(&self.control_points, self.dimension);
        self.length_cache.invalidate();
    }

    /// Move the start point; unclamped starts are clamped first.
    pub fn set_start_point(&mut self, point: Point3) -> bool {
        if !self.is_clamped_start() {
            self.clamp_ends();
        }
        let w = self.control_points[0].w;
        self.control_points[0] = to_homogeneous(point, w);
        self.dimension = occupied_dimension(&self.control_points, self.dimension);
        self.length_cache.invalidate();
        true
    }

    /// Move the end point; unclamped ends are clamped first.
    pub fn set_end_point(&mut self, point: Point3) -> bool {
        if !self.is_clamped_end() {
            self.clamp_ends();
        }
        let last = self.control_points.len() - 1;
        let w = self.control_points[last].w;
        self.control_points[last] = to_homogeneous(point, w);
        self.dimension = occupied_dimension(&self.control_points, self.dimension);
        self.length_cache.invalidate();
        true
    }

    /// Split at an interior parameter into `[t0, t]` and `[t, t1]`.
    pub fn split(&self, t: f64) -> Result<(Self, Self)> {
        let domain = self.domain();
        if !domain.includes(t, true) {
            return Err(KernelError::ParameterNotInterior {
                t,
                t0: domain.t0(),
                t1: domain.t1(),
            });
        }
        let p = self.degree;
        let (knots, cvs) = ensure_multiplicity(p, &self.knots, &self.control_points, t, p);
        let (lk, lc) = keep_until(p, &knots, &cvs, t);
        let (rk, rc) = keep_from(p, &knots, &cvs, t);
        Ok((self.with_parts(lk, lc), self.with_parts(rk, rc)))
    }

    /// The piece over an increasing `subdomain` of the domain.
    pub fn trim(&self, subdomain: Interval) -> Result<Self> {
        let domain = self.domain();
        let (a, b) = (subdomain.t0(), subdomain.t1());
        if !(subdomain.is_increasing() && domain.includes_interval(subdomain)) {
            return Err(KernelError::InvalidInterval { t0: a, t1: b });
        }
        if subdomain == domain {
            return Ok(self.clone());
        }

        let p = self.degree;
        let mut knots = self.knots.clone();
        let mut cvs = self.control_points.clone();
        if b < domain.t1() {
            (knots, cvs) = ensure_multiplicity(p, &knots, &cvs, b, p);
            (knots, cvs) = keep_until(p, &knots, &cvs, b);
        }
        if a > domain.t0() {
            (knots, cvs) = ensure_multiplicity(p, &knots, &cvs, a, p);
            (knots, cvs) = keep_from(p, &knots, &cvs, a);
        }
        Ok(self.with_parts(knots, cvs))
    }

    /// The same curve analytically continued over a larger `domain`.
    pub fn extend_domain(&self, domain: Interval) -> Result<Self> {
        let current = self.domain();
        if !(domain.is_increasing() && domain.includes_interval(current)) {
            return Err(KernelError::InvalidInterval {
                t0: domain.t0(),
                t1: domain.t1(),
            });
        }
        if self.periodic {
            return Err(KernelError::InvalidOperation(
                "periodic curves cannot be extended".into(),
            ));
        }

        let p = self.degree;
        let mut curve = self.clone();
        curve.clamp_ends();
        curve.periodic = false;

        if domain.t1() > current.t1() {
            let n = curve.control_points.len() - 1;
            let span_start = curve.knots[n];
            let (knots, cvs) = ensure_multiplicity(p, &curve.knots, &curve.control_points, span_start, p);
            curve.knots = knots;
            curve.control_points = cvs;

            let n = curve.control_points.len() - 1;
            let s = (domain.t1() - span_start) / (current.t1() - span_start);
            let extended = deboor::subdivide_bezier(&curve.control_points[n - p..], s).0;
            curve.control_points[n - p..].copy_from_slice(&extended);
            let len = curve.knots.len();
            for k in &mut curve.knots[len - p - 1..] {
                *k = domain.t1();
            }
        }

        if domain.t0() < current.t0() {
            let span_end = curve.knots[p + 1];
            let (knots, cvs) = ensure_multiplicity(p, &curve.knots, &curve.control_points, span_end, p);
            curve.knots = knots;
            curve.control_points = cvs;

            let span_end = curve.knots[p + 1];
            let s = (domain.t0() - current.t0()) / (span_end - current.t0());
            let extended = deboor::subdivide_bezier(&curve.control_points[..=p], s).1;
            curve.control_points[..=p].copy_from_slice(&extended);
            for k in &mut curve.knots[..=p] {
                *k = domain.t0();
            }
        }

        curve.length_cache.invalidate();
        Ok(curve)
    }

    /// Concatenate clamped pieces whose domains abut into one curve.
    ///
    /// Pieces are raised to a common degree; rational pieces are rescaled so
    /// the shared control point keeps a single weight.
    pub(crate) fn concatenate(pieces: Vec<NurbsCurve>) -> Result<Self> {
        let degree = pieces.iter().map(|c| c.degree).max().ok_or_else(|| {
            KernelError::InvalidOperation("nothing to concatenate".into())
        })?;
        let rational = pieces.iter().any(|c| c.rational);
        let dimension = pieces.iter().map(|c| c.dimension).max().unwrap_or(3);

        let mut knots: Vec<f64> = Vec::new();
        let mut cvs: Vec<Point4> = Vec::new();
        for mut piece in pieces {
            piece.clamp_ends();
            piece.increase_degree(degree)?;
            if let Some(&joint) = cvs.last() {
                let scale = joint.w / piece.control_points[0].w;
                knots.pop();
                knots.extend_from_slice(&piece.knots[degree + 1..]);
                cvs.extend(piece.control_points[1..].iter().map(|&h| h * scale));
            } else {
                knots = piece.knots;
                cvs = piece.control_points;
            }
        }
        Ok(Self::from_parts(dimension, rational, degree, knots, cvs, false))
    }

    fn with_parts(&self, knots: Vec<f64>, control_points: Vec<Point4>) -> Self {
        Self::from_parts(self.dimension, self.rational, self.degree, knots, control_points, false)
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

    /// The wrapped copy of a control point on periodic curves.
    fn periodic_twin(&self, index: usize) -> Option<usize> {
        if !self.periodic {
            return None;
        }
        let period = self.control_points.len() - self.degree;
        if index < self.degree {
            Some(index + period)
        } else if index >= period {
            Some(index - period)
        } else {
            None
        }
    }

    fn wrap(&self, t: f64) -> f64 {
        let domain = self.domain();
        if self.periodic && !domain.includes(t, false) {
            domain.t0() + (t - domain.t0()).rem_euclid(domain.length())
        } else {
            t
        }
    }
}

fn check_uniform_input(degree: usize, count: usize, knot_delta: f64) -> Result<()> {
    if degree == 0 || count <= degree {
        return Err(KernelError::Geometry(format!(
            "{count} control points are not enough for degree {degree}"
        )));
    }
    if !(knot_delta > 0.0 && knot_delta.is_finite()) {
        return Err(KernelError::Geometry(format!("knot spacing {knot_delta} must be positive")));
    }
    Ok(())
}

impl Curve for NurbsCurve {
    fn domain(&self) -> Interval {
        Interval::new(self.knots[self.degree], self.knots[self.control_points.len()])
    }

    fn dimension(&self) -> u32 {
        self.dimension
    }

    fn is_rational(&self) -> bool {
        self.rational
    }

    fn is_periodic(&self) -> bool {
        self.periodic
    }

    fn is_closed(&self) -> bool {
        if self.periodic {
            return true;
        }
        let points = self.euclidean_points();
        if self.is_clamped_start() && self.is_clamped_end() {
            hull_is_closed(&points)
        } else {
            let (start, end) = (self.start_point(), self.end_point());
            (start - end).length() <= ZERO_TOLERANCE
                && points.iter().any(|p| (*p - start).length() > ZERO_TOLERANCE)
        }
    }

    fn derivatives_at_side(&self, t: f64, order: usize, side: EvalSide) -> Vec<Vector3> {
        let hders = deboor::curve_derivatives(
            self.degree,
            &self.knots,
            &self.control_points,
            self.wrap(t),
            order,
            side,
        );
        euclidean_derivatives(&hders)
    }

    fn span_vector(&self) -> Vec<f64> {
        let mut spans: Vec<f64> = self.knots[self.degree..=self.control_points.len()].to_vec();
        spans.dedup();
        spans
    }

    fn discontinuity_candidates(&self, order: usize) -> Vec<f64> {
        let spans = self.span_vector();
        if spans.len() <= 2 {
            return Vec::new();
        }
        spans[1..spans.len() - 1]
            .iter()
            .copied()
            .filter(|&t| multiplicity_of(&self.knots, t) + order >= self.degree)
            .collect()
    }

    fn length_cache(&self) -> &LengthCache {
        &self.length_cache
    }
}

impl Validate for NurbsCurve {
    fn validate(&self) -> Result<()> {
        let p = self.degree;
        let count = self.control_points.len();
        if !(1..=3).contains(&self.dimension) {
            return Err(KernelError::Geometry(format!(
                "dimension {} is not 1, 2 or 3",
                self.dimension
            )));
        }
        if p == 0 {
            return Err(KernelError::Geometry("degree must be at least 1".into()));
        }
        if count < p + 1 {
            return Err(KernelError::Geometry(format!(
                "{count} control points are not enough for degree {p}"
            )));
        }
        if self.knots.len() != count + p + 1 {
            return Err(KernelError::Geometry(format!(
                "expected {} knots, found {}",
                count + p + 1,
                self.knots.len()
            )));
        }
        if self.knots.iter().any(|k| !k.is_finite()) {
            return Err(KernelError::Geometry("knots must be finite".into()));
        }
        if let Some(i) = self.knots.windows(2).position(|w| w[1] < w[0]) {
            return Err(KernelError::Geometry(format!("knot {} decreases", i + 1)));
        }
        let inner = &self.knots[1..self.knots.len() - 1];
        for &k in inner {
            let m = multiplicity_of(inner, k);
            if m > p {
                return Err(KernelError::Geometry(format!(
                    "knot {k} has multiplicity {m}, more than degree {p}"
                )));
            }
        }
        if !self.domain().is_increasing() {
            return Err(KernelError::Geometry("domain is empty".into()));
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
        if self.periodic {
            let period = count - p;
            let wraps = (0..p).all(|i| {
                (self.control_points[i] - self.control_points[i + period]).length() <= ZERO_TOLERANCE
            });
            if !wraps {
                return Err(KernelError::Geometry(
                    "periodic control points do not wrap".into(),
                ));
            }
        }
        Ok(())
    }
}

impl BoundingBox for NurbsCurve {
    type Box = Aabb3;

    fn bounding_box(&self) -> Aabb3 {
        Aabb3::from_points(&self.euclidean_points()).unwrap_or(Aabb3::new(Point3::ZERO, Point3::ZERO))
    }
}
