//! Chains of curves joined end to start.

use curvekit_core::tolerance::ZERO_TOLERANCE;
use curvekit_core::traits::{BoundingBox, Validate};
use curvekit_core::{KernelError, Result, LINEAR_TOLERANCE};
use curvekit_math::{Aabb3, Interval, Point3, Transform, Vector3};
use serde::{Deserialize, Serialize};

use super::{AnyCurve, Curve, EvalSide, NurbsCurve};
use crate::length::LengthCache;

/// An ordered chain of segments. Segment `i` owns the global parameter range
/// `[breaks[i], breaks[i + 1]]`, mapped affinely onto its own domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolyCurve {
    segments: Vec<AnyCurve>,
    breaks: Vec<f64>,
    #[serde(skip)]
    length_cache: LengthCache,
}

impl PolyCurve {
    /// Chain with one segment; the chain domain is the segment's domain.
    pub fn new(first: impl Into<AnyCurve>) -> Self {
        let first = first.into();
        let domain = first.domain();
        Self {
            segments: vec![first],
            breaks: vec![domain.t0(), domain.t1()],
            length_cache: LengthCache::default(),
        }
    }

    /// Chain the curves in order; consecutive ends must meet.
    pub fn from_segments(segments: Vec<AnyCurve>) -> Result<Self> {
        let mut iter = segments.into_iter();
        let first = iter
            .next()
            .ok_or_else(|| KernelError::Geometry("poly-curve needs at least one segment".into()))?;
        let mut poly = Self::new(first);
        for segment in iter {
            poly.append(segment)?;
        }
        Ok(poly)
    }

    pub(crate) fn from_parts(segments: Vec<AnyCurve>, breaks: Vec<f64>) -> Self {
        debug_assert!(
            breaks.len() == segments.len() + 1,
            "{} breaks for {} segments",
            breaks.len(),
            segments.len()
        );
        Self {
            segments,
            breaks,
            length_cache: LengthCache::default(),
        }
    }

    /// Append a segment whose start meets the current end.
    pub fn append(&mut self, segment: impl Into<AnyCurve>) -> Result<()> {
        let segment = segment.into();
        let gap = (segment.start_point() - self.end_point()).length();
        if gap > LINEAR_TOLERANCE {
            return Err(KernelError::Geometry(format!(
                "segment starts {gap} away from the chain end"
            )));
        }
        self.push(segment);
        Ok(())
    }

    /// Append a segment after moving its start onto the current end.
    pub fn append_and_match(&mut self, segment: impl Into<AnyCurve>) -> Result<()> {
        let mut segment = segment.into();
        if !segment.set_start_point(self.end_point()) {
            return Err(KernelError::Geometry("segment start cannot be moved".into()));
        }
        self.push(segment);
        Ok(())
    }

    fn push(&mut self, segment: AnyCurve) {
        let last = self.breaks[self.breaks.len() - 1];
        self.breaks.push(last + segment.domain().length());
        self.segments.push(segment);
        self.length_cache.invalidate();
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn segments(&self) -> &[AnyCurve] {
        &self.segments
    }

    pub fn breaks(&self) -> &[f64] {
        &self.breaks
    }

    pub fn segment(&self, index: usize) -> Result<&AnyCurve> {
        self.segments.get(index).ok_or(KernelError::IndexOutOfRange {
            what: "segment",
            index,
            len: self.segments.len(),
        })
    }

    /// Global parameter range of segment `index`.
    pub fn segment_domain(&self, index: usize) -> Result<Interval> {
        self.segment(index)?;
        Ok(Interval::new(self.breaks[index], self.breaks[index + 1]))
    }

    /// Segment containing `t`. A break belongs to the segment after it,
    /// except the domain end.
    pub fn segment_index(&self, t: f64) -> usize {
        self.segment_index_side(t, EvalSide::Default)
    }

    /// Like [`PolyCurve::segment_index`]; `Below` assigns a break to the
    /// segment that ends there.
    pub fn segment_index_side(&self, t: f64, side: EvalSide) -> usize {
        let last = self.segments.len() - 1;
        let count = self.breaks[..=last].partition_point(|&b| b <= t);
        let mut index = count.saturating_sub(1).min(last);
        if side == EvalSide::Below && index > 0 && t <= self.breaks[index] {
            index -= 1;
        }
        index
    }

    /// First and last segment touched by `subdomain`.
    pub fn segment_indexes(&self, subdomain: Interval) -> Option<(usize, usize)> {
        let sub = subdomain.make_increasing();
        self.domain().intersection(sub)?;
        Some((
            self.segment_index_side(sub.t0(), EvalSide::Above),
            self.segment_index_side(sub.t1(), EvalSide::Below),
        ))
    }

    /// Map a chain parameter to the parameter of the segment holding it.
    pub fn segment_curve_parameter(&self, t: f64) -> f64 {
        let i = self.segment_index(t);
        self.local_parameter(i, t)
    }

    /// Map a segment parameter back to the chain.
    pub fn polycurve_parameter(&self, index: usize, local: f64) -> Result<f64> {
        let global = self.segment_domain(index)?;
        let domain = self.segments[index].domain();
        Ok(global.parameter_at(domain.normalized_parameter_at(local)))
    }

    fn local_parameter(&self, index: usize, t: f64) -> f64 {
        let global = Interval::new(self.breaks[index], self.breaks[index + 1]);
        self.segments[index]
            .domain()
            .parameter_at(global.normalized_parameter_at(t))
    }

    /// Index of the first segment whose end misses the next start by more
    /// than `tolerance`.
    pub fn has_gap(&self, tolerance: f64) -> Option<usize> {
        self.segments
            .windows(2)
            .position(|w| (w[1].start_point() - w[0].end_point()).length() > tolerance)
    }

    /// Replace nested poly-curve segments by their own segments.
    pub fn remove_nesting(&mut self) {
        if !self.segments.iter().any(|s| matches!(s, AnyCurve::Poly(_))) {
            return;
        }
        let mut segments = Vec::with_capacity(self.segments.len());
        let mut breaks = vec![self.breaks[0]];
        for (i, segment) in self.segments.iter().enumerate() {
            let global = Interval::new(self.breaks[i], self.breaks[i + 1]);
            match segment {
                AnyCurve::Poly(inner) => {
                    let mut inner = inner.clone();
                    inner.remove_nesting();
                    let inner_domain = inner.domain();
                    for (j, sub) in inner.segments.into_iter().enumerate() {
                        let b = if j + 2 == inner.breaks.len() {
                            global.t1()
                        } else {
                            global.parameter_at(inner_domain.normalized_parameter_at(inner.breaks[j + 1]))
                        };
                        segments.push(sub);
                        breaks.push(b);
                    }
                }
                other => {
                    segments.push(other.clone());
                    breaks.push(global.t1());
                }
            }
        }
        self.segments = segments;
        self.breaks = breaks;
    }

    /// The segments, with nesting removed.
    pub fn explode(&self) -> Vec<AnyCurve> {
        let mut flat = self.clone();
        flat.remove_nesting();
        flat.segments
    }

    /// Single NURBS with the same shape and domain.
    pub fn to_nurbs(&self) -> Result<NurbsCurve> {
        let mut pieces = Vec::with_capacity(self.segments.len());
        for (domain, segment) in self.explode_with_domains() {
            let mut piece = segment.to_nurbs()?;
            piece.set_domain(domain)?;
            pieces.push(piece);
        }
        NurbsCurve::concatenate(pieces)
    }

    fn explode_with_domains(&self) -> Vec<(Interval, AnyCurve)> {
        let mut flat = self.clone();
        flat.remove_nesting();
        flat.segments
            .into_iter()
            .enumerate()
            .map(|(i, s)| (Interval::new(flat.breaks[i], flat.breaks[i + 1]), s))
            .collect()
    }

    pub fn set_domain(&mut self, domain: Interval) -> Result<()> {
        if !(domain.is_increasing() && domain.t0().is_finite() && domain.t1().is_finite()) {
            return Err(KernelError::InvalidInterval {
                t0: domain.t0(),
                t1: domain.t1(),
            });
        }
        let old = self.domain();
        let last = self.breaks.len() - 1;
        for (i, b) in self.breaks.iter_mut().enumerate() {
            *b = match i {
                0 => domain.t0(),
                i if i == last => domain.t1(),
                _ => domain.parameter_at(old.normalized_parameter_at(*b)),
            };
        }
        self.length_cache.invalidate();
        Ok(())
    }

    /// Reverse direction; the domain becomes `[-t1, -t0]`.
    pub fn reverse(&mut self) {
        self.segments.reverse();
        for s in &mut self.segments {
            s.reverse();
        }
        self.breaks.reverse();
        for b in &mut self.breaks {
            *b = -*b;
        }
        self.length_cache.invalidate();
    }

    pub fn change_dimension(&mut self, dimension: u32) -> Result<()> {
        for s in &mut self.segments {
            s.change_dimension(dimension)?;
        }
        self.length_cache.invalidate();
        Ok(())
    }

    pub fn make_rational(&mut self) {
        for s in &mut self.segments {
            s.make_rational();
        }
    }

    pub fn transform(&mut self, xform: &Transform) {
        for s in &mut self.segments {
            s.transform(xform);
        }
        self.length_cache.invalidate();
    }

    pub fn set_start_point(&mut self, point: Point3) -> bool {
        self.length_cache.invalidate();
        self.segments[0].set_start_point(point)
    }

    pub fn set_end_point(&mut self, point: Point3) -> bool {
        self.length_cache.invalidate();
        let last = self.segments.len() - 1;
        self.segments[last].set_end_point(point)
    }

    /// Split at an interior parameter. A split exactly on a break
    /// regroups whole segments.
    pub fn split(&self, t: f64) -> Result<(PolyCurve, PolyCurve)> {
        let domain = self.domain();
        if !domain.includes(t, true) {
            return Err(KernelError::ParameterNotInterior {
                t,
                t0: domain.t0(),
                t1: domain.t1(),
            });
        }
        let i = self.segment_index(t);
        if t == self.breaks[i] {
            let left = Self::from_parts(self.segments[..i].to_vec(), self.breaks[..=i].to_vec());
            let right = Self::from_parts(self.segments[i..].to_vec(), self.breaks[i..].to_vec());
            return Ok((left, right));
        }

        let (a, b) = self.segments[i].split(self.local_parameter(i, t))?;
        let mut left_segments = self.segments[..i].to_vec();
        left_segments.push(a);
        let mut left_breaks = self.breaks[..=i].to_vec();
        left_breaks.push(t);

        let mut right_segments = vec![b];
        right_segments.extend_from_slice(&self.segments[i + 1..]);
        let mut right_breaks = vec![t];
        right_breaks.extend_from_slice(&self.breaks[i + 1..]);

        Ok((
            Self::from_parts(left_segments, left_breaks),
            Self::from_parts(right_segments, right_breaks),
        ))
    }

    /// The piece over an increasing `subdomain` of the domain.
    pub fn trim(&self, subdomain: Interval) -> Result<PolyCurve> {
        let domain = self.domain();
        let (a, b) = (subdomain.t0(), subdomain.t1());
        if !(subdomain.is_increasing() && domain.includes_interval(subdomain)) {
            return Err(KernelError::InvalidInterval { t0: a, t1: b });
        }
        let first = self.segment_index_side(a, EvalSide::Above);
        let last = self.segment_index_side(b, EvalSide::Below);

        let mut segments = Vec::with_capacity(last - first + 1);
        let mut breaks = vec![a];
        for i in first..=last {
            let lo = if i == first { a } else { self.breaks[i] };
            let hi = if i == last { b } else { self.breaks[i + 1] };
            let segment_domain = self.segments[i].domain();
            let local = Interval::new(
                segment_domain.clamp(self.local_parameter(i, lo)),
                segment_domain.clamp(self.local_parameter(i, hi)),
            );
            let piece = if lo == self.breaks[i] && hi == self.breaks[i + 1] {
                self.segments[i].clone()
            } else {
                self.segments[i].trim(local)?
            };
            segments.push(piece);
            breaks.push(hi);
        }
        Ok(Self::from_parts(segments, breaks))
    }

    /// Analytic continuation: the first and last segments are extended.
    pub fn extend_domain(&self, domain: Interval) -> Result<PolyCurve> {
        let current = self.domain();
        if !(domain.is_increasing() && domain.includes_interval(current)) {
            return Err(KernelError::InvalidInterval {
                t0: domain.t0(),
                t1: domain.t1(),
            });
        }
        let mut extended = self.clone();
        extended.remove_nesting();
        let last = extended.segments.len() - 1;

        if domain.t1() > current.t1() {
            let i = last;
            let local = extended.segments[i].domain();
            let scale = local.length() / (extended.breaks[i + 1] - extended.breaks[i]);
            let new_end = local.t1() + (domain.t1() - current.t1()) * scale;
            extended.segments[i] = extended.segments[i]
                .extend_domain(Interval::new(local.t0(), new_end))?;
            extended.breaks[i + 1] = domain.t1();
        }
        if domain.t0() < current.t0() {
            let local = extended.segments[0].domain();
            let scale = local.length() / (extended.breaks[1] - extended.breaks[0]);
            let new_start = local.t0() - (current.t0() - domain.t0()) * scale;
            let seg_end = extended.segments[0].domain().t1();
            extended.segments[0] = extended.segments[0]
                .extend_domain(Interval::new(new_start, seg_end))?;
            extended.breaks[0] = domain.t0();
        }
        extended.length_cache.invalidate();
        Ok(extended)
    }
}

impl Curve for PolyCurve {
    fn domain(&self) -> Interval {
        Interval::new(self.breaks[0], self.breaks[self.breaks.len() - 1])
    }

    fn dimension(&self) -> u32 {
        self.segments.iter().map(|s| s.dimension()).max().unwrap_or(3)
    }

    fn is_rational(&self) -> bool {
        self.segments.iter().any(|s| s.is_rational())
    }

    fn is_closed(&self) -> bool {
        if self.segments.len() == 1 {
            return self.segments[0].is_closed();
        }
        (self.start_point() - self.end_point()).length() <= ZERO_TOLERANCE
    }

    fn derivatives_at_side(&self, t: f64, order: usize, side: EvalSide) -> Vec<Vector3> {
        let i = self.segment_index_side(t, side);
        let global = Interval::new(self.breaks[i], self.breaks[i + 1]);
        let segment = &self.segments[i];
        let local_domain = segment.domain();
        let scale = local_domain.length() / global.length();
        let local = local_domain.parameter_at(global.normalized_parameter_at(t));

        let mut ders = segment.derivatives_at_side(local, order, side);
        let mut factor = 1.0;
        for d in ders.iter_mut().skip(1) {
            factor *= scale;
            *d *= factor;
        }
        ders
    }

    fn span_vector(&self) -> Vec<f64> {
        let mut spans = vec![self.breaks[0]];
        for (i, segment) in self.segments.iter().enumerate() {
            let global = Interval::new(self.breaks[i], self.breaks[i + 1]);
            let local = segment.domain();
            let inner = segment.span_vector();
            for &s in &inner[1..inner.len() - 1] {
                spans.push(global.parameter_at(local.normalized_parameter_at(s)));
            }
            spans.push(global.t1());
        }
        spans
    }

    fn discontinuity_candidates(&self, order: usize) -> Vec<f64> {
        let mut candidates = Vec::new();
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                candidates.push(self.breaks[i]);
            }
            let global = Interval::new(self.breaks[i], self.breaks[i + 1]);
            let local = segment.domain();
            candidates.extend(
                segment
                    .discontinuity_candidates(order)
                    .into_iter()
                    .map(|s| global.parameter_at(local.normalized_parameter_at(s))),
            );
        }
        candidates
    }

    fn length_cache(&self) -> &LengthCache {
        &self.length_cache
    }
}

impl Validate for PolyCurve {
    fn validate(&self) -> Result<()> {
        if self.segments.is_empty() {
            return Err(KernelError::Geometry("poly-curve has no segments".into()));
        }
        if self.breaks.len() != self.segments.len() + 1 {
            return Err(KernelError::Geometry(format!(
                "{} breaks for {} segments",
                self.breaks.len(),
                self.segments.len()
            )));
        }
        if let Some(i) = self.breaks.windows(2).position(|w| !(w[1] > w[0])) {
            return Err(KernelError::NonIncreasing { index: i + 1 });
        }
        for segment in &self.segments {
            segment.validate()?;
        }
        if let Some(i) = self.has_gap(LINEAR_TOLERANCE) {
            return Err(KernelError::Geometry(format!(
                "gap between segments {i} and {}",
                i + 1
            )));
        }
        Ok(())
    }
}

impl BoundingBox for PolyCurve {
    type Box = Aabb3;

    fn bounding_box(&self) -> Aabb3 {
        self.segments
            .iter()
            .map(|s| s.bounding_box())
            .reduce(|a, b| a.merge(&b))
            .unwrap_or(Aabb3::new(Point3::ZERO, Point3::ZERO))
    }
}
