//! Planar offset curves.
//!
//! Every smooth piece of the input is sampled at `C(t) + d · normalize(n × C'(t))`
//! with `n` the plane normal, so positive distances go to the left of the
//! direction of travel. Samples where the offset turns back (the radius of
//! curvature on the offset side is below `|d|`) are dropped, self-crossings
//! of the offset polyline are cut out, and the cleaned polylines are refit
//! by cubic interpolation, sampling more densely until the fit meets the
//! tolerance. Kinks of the input are reconnected by the corner style.

use curvekit_core::tolerance::ZERO_TOLERANCE;
use curvekit_core::{ContinuityTolerance, KernelError, Result};
use curvekit_geometry::{AnyCurve, Continuity, Curve, EvalSide, NurbsCurve, PolyCurve};
use curvekit_math::{Aabb3, Interval, Plane, Point3, Ray, Vector3};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::blend::{blend_ends, BlendContinuity, BlendEnd};

/// How offset pieces are reconnected where the input has a kink and the
/// offsets leave a gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CornerStyle {
    /// Extend both pieces along their tangents until they meet.
    Sharp,
    /// Circular arc around the kink.
    Round,
    /// Tangent-continuous cubic.
    Smooth,
    /// Straight line between the piece ends.
    Chamfer,
}

/// Closure of an offset of an open curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EndStyle {
    /// One-sided offset.
    None,
    /// Outline at both distances closed by straight caps.
    Flat,
    /// Outline at both distances closed by half circles.
    Round,
}

/// Longest sharp corner, in multiples of the offset distance, before it is
/// chamfered instead.
pub const MITER_LIMIT: f64 = 4.0;

/// Samples per span, tried in order until the refit meets the tolerance.
const DENSITIES: [usize; 6] = [8, 16, 32, 64, 128, 256];
const MAX_LOOP_CUTS: usize = 64;
const CROSSING_ITERATIONS: usize = 16;

/// Offset `curve` by `distance` in `plane`.
///
/// The curve is expected to lie in a plane parallel to `plane`. Returns
/// several curves when parts of the offset vanish, and an empty list when
/// nothing survives.
pub fn offset(
    curve: &AnyCurve,
    plane: &Plane,
    distance: f64,
    tolerance: f64,
    corner_style: CornerStyle,
    end_style: EndStyle,
) -> Result<Vec<AnyCurve>> {
    if !distance.is_finite() {
        return Err(KernelError::InvalidOperation(format!(
            "offset distance {distance} is not finite"
        )));
    }
    if !(tolerance > 0.0 && tolerance.is_finite()) {
        return Err(KernelError::InvalidOperation(format!(
            "offset tolerance {tolerance} must be positive"
        )));
    }
    if distance == 0.0 {
        return Ok(vec![curve.clone()]);
    }

    let side = |distance: f64| Offsetter {
        curve,
        plane,
        distance,
        tolerance,
    };
    let left = side(distance).run(corner_style)?;
    if curve.is_closed() || end_style == EndStyle::None {
        if left.is_empty() {
            debug!(distance, "offset degenerated");
        }
        return Ok(left);
    }

    let right = side(-distance).run(corner_style)?;
    match (left.as_slice(), right.as_slice()) {
        ([l], [r]) => Ok(vec![outline(curve, l, r, end_style)?]),
        _ => {
            warn!(
                left = left.len(),
                right = right.len(),
                "offset is broken and cannot be capped"
            );
            Ok(left.into_iter().chain(right).collect())
        }
    }
}

/// Close the two sides of an open offset with end caps.
fn outline(curve: &AnyCurve, left: &AnyCurve, right: &AnyCurve, style: EndStyle) -> Result<AnyCurve> {
    let domain = curve.domain();
    let end_tangent = curve.derivatives_at_side(domain.t1(), 1, EvalSide::Below)[1];
    let start_tangent = -curve.derivatives_at_side(domain.t0(), 1, EvalSide::Above)[1];
    let mut back = right.clone();
    back.reverse();

    let cap = |from: Point3, tangent: Vector3, to: Point3| -> AnyCurve {
        match style {
            EndStyle::Round => NurbsCurve::tangent_arc(from, tangent, to)
                .unwrap_or_else(|| NurbsCurve::line(from, to))
                .into(),
            _ => NurbsCurve::line(from, to).into(),
        }
    };
    let end_cap = cap(left.end_point(), end_tangent, back.start_point());
    let start_cap = cap(back.end_point(), start_tangent, left.start_point());

    let mut chain = PolyCurve::new(left.clone());
    chain.append_and_match(end_cap)?;
    chain.append_and_match(back)?;
    chain.append_and_match(start_cap)?;
    chain.remove_nesting();
    let start = chain.start_point();
    chain.set_end_point(start);
    Ok(chain.into())
}

#[derive(Debug, Clone, Copy)]
struct Sample {
    /// Curve parameter, or `None` for points created by trimming.
    t: Option<f64>,
    point: Point3,
}

type Run = Vec<Sample>;

/// Connection between two consecutive runs.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Link {
    Joined,
    Break,
    /// Across the seam of a closed smooth piece.
    Smooth,
    /// Across a kink: `below` ends the first piece, `above` starts the next.
    Corner { below: f64, above: f64 },
}

enum Resolved {
    Joined,
    Break,
    Connect(Vec<AnyCurve>),
}

struct Offsetter<'a> {
    curve: &'a AnyCurve,
    plane: &'a Plane,
    distance: f64,
    tolerance: f64,
}

impl Offsetter<'_> {
    fn run(&self, corner_style: CornerStyle) -> Result<Vec<AnyCurve>> {
        let continuity = ContinuityTolerance::default();
        let closed = self.curve.is_closed();
        let (pieces, seam_corner) = smooth_pieces(self.curve, &continuity);

        // Runs in order, tagged with their piece and strand.
        let mut runs: Vec<Run> = Vec::new();
        let mut tags: Vec<(usize, usize)> = Vec::new();
        for (p, piece) in pieces.iter().enumerate() {
            for (s, strand) in self.offset_piece(piece)?.into_iter().enumerate() {
                for run in strand {
                    runs.push(run);
                    tags.push((p, s));
                }
            }
        }
        if runs.is_empty() {
            return Ok(Vec::new());
        }

        let count = pieces.len();
        let piece_end = |p: usize| pieces[p].last().map_or(0.0, |i| i.t1());
        let piece_start = |p: usize| pieces[p].first().map_or(0.0, |i| i.t0());
        let is_last_of_piece = |i: usize| i + 1 == tags.len() || tags[i + 1].0 != tags[i].0;
        let is_first_of_piece = |i: usize| i == 0 || tags[i - 1].0 != tags[i].0;
        let link = |i: usize, j: usize| {
            let ((pi, si), (pj, sj)) = (tags[i], tags[j]);
            if pi == pj && j == i + 1 {
                if si == sj {
                    Link::Joined
                } else {
                    Link::Break
                }
            } else if pi == pj && count == 1 {
                if seam_corner {
                    Link::Corner {
                        below: piece_end(pi),
                        above: piece_start(pj),
                    }
                } else {
                    Link::Smooth
                }
            } else if pj == (pi + 1) % count && is_last_of_piece(i) && is_first_of_piece(j) {
                Link::Corner {
                    below: piece_end(pi),
                    above: piece_start(pj),
                }
            } else {
                Link::Break
            }
        };

        let n = runs.len();
        let link_count = if closed { n } else { n - 1 };
        let mut resolved = Vec::with_capacity(link_count);
        for i in 0..link_count {
            let j = (i + 1) % n;
            let kind = link(i, j);
            resolved.push(self.resolve(&mut runs, i, j, kind, corner_style)?);
        }

        let mut chains: Vec<Vec<AnyCurve>> = vec![Vec::new()];
        for (i, run) in runs.iter().enumerate() {
            let chain = chains.len() - 1;
            if let Some(fitted) = fit(run)? {
                chains[chain].push(fitted);
            }
            match resolved.get_mut(i) {
                Some(Resolved::Connect(curves)) => chains[chain].append(curves),
                Some(Resolved::Break) if i + 1 < n => chains.push(Vec::new()),
                _ => {}
            }
        }

        let wraps = closed && !matches!(resolved.last(), Some(Resolved::Break));
        let mut output = Vec::new();
        if wraps && chains.len() > 1 {
            let first = chains.remove(0);
            if let Some(last) = chains.last_mut() {
                last.extend(first);
            }
        }
        let single = chains.len() == 1;
        for chain in chains {
            if let Some(c) = assemble(chain, wraps && single)? {
                output.push(c);
            }
        }
        Ok(output)
    }

    /// Offset runs of one smooth piece, grouped into strands that connect.
    fn offset_piece(&self, piece: &[Interval]) -> Result<Vec<Vec<Run>>> {
        let mut strands = Vec::new();
        for (round, &density) in DENSITIES.iter().enumerate() {
            let mut runs = self.sample_piece(piece, density);
            for run in &mut runs {
                self.cut_loops(run);
            }
            strands = self.strands(runs);

            let mut worst: f64 = 0.0;
            for run in strands.iter().flatten() {
                if let Some(fitted) = fit(run)? {
                    worst = worst.max(self.fit_error(run, &fitted));
                }
            }
            if worst <= self.tolerance {
                break;
            }
            if round + 1 == DENSITIES.len() {
                warn!(worst, tolerance = self.tolerance, "offset refit did not reach tolerance");
            }
        }
        Ok(strands)
    }

    /// Offset point at `t`, or `None` where the offset is undefined or
    /// turns back.
    fn point(&self, t: f64, side: EvalSide) -> Option<Point3> {
        self.point_and_derivative(t, side).map(|(p, _)| p)
    }

    fn point_and_derivative(&self, t: f64, side: EvalSide) -> Option<(Point3, Vector3)> {
        let d = self.curve.derivatives_at_side(t, 2, side);
        let normal = self.plane.normal;
        let across = normal.cross(d[1]);
        let len = across.length();
        let dir = across.try_normalize()?;
        let len2 = d[1].length_squared();
        let curvature = d[1].cross(d[2]).cross(d[1]) / (len2 * len2);
        if 1.0 - self.distance * curvature.dot(dir) <= ZERO_TOLERANCE {
            return None;
        }
        let turn = normal.cross(d[2]);
        let ddir = (turn - dir * dir.dot(turn)) / len;
        Some((d[0] + dir * self.distance, d[1] + ddir * self.distance))
    }

    /// Sample every span of the piece `density` times, splitting into runs
    /// where the offset is undefined.
    fn sample_piece(&self, piece: &[Interval], density: usize) -> Vec<Run> {
        let spans = self.curve.span_vector();
        let mut runs = Vec::new();
        let mut run: Run = Vec::new();
        for (k, interval) in piece.iter().enumerate() {
            let mut cuts = vec![interval.t0()];
            cuts.extend(
                spans
                    .iter()
                    .copied()
                    .filter(|&s| s > interval.t0() && s < interval.t1()),
            );
            cuts.push(interval.t1());

            let mut params: Vec<(f64, EvalSide)> = Vec::with_capacity(cuts.len() * density + 1);
            for w in cuts.windows(2) {
                for i in 0..density {
                    params.push((w[0] + (w[1] - w[0]) * i as f64 / density as f64, EvalSide::Default));
                }
            }
            params[0].1 = EvalSide::Above;
            if k + 1 == piece.len() {
                params.push((interval.t1(), EvalSide::Below));
            }

            for (t, side) in params {
                match self.point(t, side) {
                    Some(point) => run.push(Sample { t: Some(t), point }),
                    None if !run.is_empty() => runs.push(std::mem::take(&mut run)),
                    None => {}
                }
            }
        }
        if !run.is_empty() {
            runs.push(run);
        }
        runs.retain(|r| r.len() >= 2);
        runs
    }

    /// Remove the loops where a run crosses itself.
    fn cut_loops(&self, run: &mut Run) {
        for _ in 0..MAX_LOOP_CUTS {
            let n = run.len();
            let closed = n > 3 && (run[0].point - run[n - 1].point).length() <= ZERO_TOLERANCE;
            let Some((i, j, x)) = self.self_crossing(run, closed) else {
                return;
            };
            let mut kept = Vec::with_capacity(n);
            if closed && 2 * (j - i) > n {
                // The loop runs through the seam.
                push_distinct(&mut kept, x);
                for &s in &run[i + 1..=j] {
                    push_distinct(&mut kept, s);
                }
                kept.push(x);
            } else {
                kept.extend_from_slice(&run[..=i]);
                push_distinct(&mut kept, x);
                for &s in &run[j + 1..] {
                    push_distinct(&mut kept, s);
                }
            }
            *run = kept;
        }
        debug!("offset loop removal hit its cap");
    }

    fn self_crossing(&self, run: &Run, closed: bool) -> Option<(usize, usize, Sample)> {
        let segments = run.len().saturating_sub(1);
        for i in 0..segments {
            for j in i + 2..segments {
                if closed && i == 0 && j + 1 == segments {
                    continue;
                }
                if let Some((a, b)) = self.segment_crossing(run[i], run[i + 1], run[j], run[j + 1]) {
                    let x = self.refine_crossing((run[i], run[i + 1], a), (run[j], run[j + 1], b));
                    return Some((i, j, x));
                }
            }
        }
        None
    }

    /// Group consecutive runs that cross into strands, trimming them at the
    /// crossing.
    fn strands(&self, runs: Vec<Run>) -> Vec<Vec<Run>> {
        let mut strands: Vec<Vec<Run>> = Vec::new();
        for run in runs {
            let trimmed = strands
                .last()
                .and_then(|s| s.last())
                .and_then(|prev| self.trim_pair(prev, &run));
            match (trimmed, strands.last_mut()) {
                (Some((head, tail)), Some(strand)) => {
                    if let Some(last) = strand.last_mut() {
                        *last = head;
                    }
                    strand.push(tail);
                }
                _ => strands.push(vec![run]),
            }
        }
        strands
    }

    /// Cut the end of `a` and the start of `b` back to their last crossing.
    fn trim_pair(&self, a: &Run, b: &Run) -> Option<(Run, Run)> {
        let (box_a, box_b) = (run_box(a)?, run_box(b)?);
        let slack = 1e-8 * box_a.merge(&box_b).extents().max_element().max(1.0);
        if !box_a.expand(slack).intersects(&box_b) {
            return None;
        }
        for i in (0..a.len().saturating_sub(1)).rev() {
            for j in 0..b.len().saturating_sub(1) {
                if let Some((s, u)) = self.segment_crossing(a[i], a[i + 1], b[j], b[j + 1]) {
                    let x = self.refine_crossing((a[i], a[i + 1], s), (b[j], b[j + 1], u));
                    let mut head = a[..=i].to_vec();
                    push_distinct(&mut head, x);
                    let mut tail = vec![x];
                    for &p in &b[j + 1..] {
                        push_distinct(&mut tail, p);
                    }
                    return Some((head, tail));
                }
            }
        }
        None
    }

    /// Parameters along both segments where they cross in the plane.
    fn segment_crossing(&self, a0: Sample, a1: Sample, b0: Sample, b1: Sample) -> Option<(f64, f64)> {
        const EPS: f64 = 1e-9;
        let local = |s: Sample| self.plane.to_local(s.point);
        let (p, r) = (local(a0), local(b0));
        let da = local(a1) - p;
        let db = local(b1) - r;
        let scale = da.truncate().length() * db.truncate().length();
        let cross = da.x * db.y - da.y * db.x;
        if scale == 0.0 || cross.abs() <= 1e-12 * scale {
            return None;
        }
        let w = r - p;
        let a = (w.x * db.y - w.y * db.x) / cross;
        let b = (w.x * da.y - w.y * da.x) / cross;
        let inside = |x: f64| (-EPS..=1.0 + EPS).contains(&x);
        (inside(a) && inside(b)).then(|| (a.clamp(0.0, 1.0), b.clamp(0.0, 1.0)))
    }

    /// Polyline crossing moved onto the exact offset by Newton iteration
    /// when both segments carry curve parameters.
    fn refine_crossing(&self, a: (Sample, Sample, f64), b: (Sample, Sample, f64)) -> Sample {
        let lerp = |(s0, s1, x): (Sample, Sample, f64)| s0.point + (s1.point - s0.point) * x;
        let rough = Sample {
            t: None,
            point: lerp(a),
        };
        let range = |(s0, s1, _): (Sample, Sample, f64)| Some((s0.t?, s1.t?));
        let (Some((a0, a1)), Some((b0, b1))) = (range(a), range(b)) else {
            return rough;
        };
        let (mut ta, mut tb) = (a0 + (a1 - a0) * a.2, b0 + (b1 - b0) * b.2);
        let local = |v: Vector3| (v.dot(self.plane.x_axis), v.dot(self.plane.y_axis));

        for _ in 0..CROSSING_ITERATIONS {
            let (Some((pa, da)), Some((pb, db))) = (
                self.point_and_derivative(ta, EvalSide::Default),
                self.point_and_derivative(tb, EvalSide::Default),
            ) else {
                return rough;
            };
            let (fx, fy) = local(pa - pb);
            if fx.hypot(fy) <= self.tolerance * 1e-3 {
                return Sample { t: None, point: pa };
            }
            let (ax, ay) = local(da);
            let (bx, by) = local(-db);
            let det = ax * by - ay * bx;
            if det.abs() <= f64::EPSILON {
                return rough;
            }
            ta = (ta - (fx * by - fy * bx) / det).clamp(a0.min(a1), a0.max(a1));
            tb = (tb - (ax * fy - ay * fx) / det).clamp(b0.min(b1), b0.max(b1));
        }
        rough
    }

    /// Largest distance, normal to the fit, between the fit and the exact
    /// offset halfway between consecutive samples.
    fn fit_error(&self, run: &Run, fitted: &AnyCurve) -> f64 {
        // Chord-length parameters as assigned by the interpolation.
        let mut u = Vec::with_capacity(run.len());
        let mut acc = 0.0;
        let mut last: Option<Point3> = None;
        for s in run {
            match last {
                Some(l) if (s.point - l).length() <= ZERO_TOLERANCE => {}
                Some(l) => {
                    acc += (s.point - l).length();
                    last = Some(s.point);
                }
                None => last = Some(s.point),
            }
            u.push(acc);
        }

        let mut worst: f64 = 0.0;
        for k in 0..run.len().saturating_sub(1) {
            let (Some(t0), Some(t1)) = (run[k].t, run[k + 1].t) else {
                continue;
            };
            if u[k + 1] <= u[k] {
                continue;
            }
            let Some(exact) = self.point(0.5 * (t0 + t1), EvalSide::Default) else {
                continue;
            };
            let d = fitted.derivatives_at(0.5 * (u[k] + u[k + 1]), 1);
            let diff = exact - d[0];
            let normal_part = match d[1].try_normalize() {
                Some(tangent) => diff - tangent * diff.dot(tangent),
                None => diff,
            };
            worst = worst.max(normal_part.length());
        }
        worst
    }

    fn resolve(
        &self,
        runs: &mut [Run],
        i: usize,
        j: usize,
        link: Link,
        style: CornerStyle,
    ) -> Result<Resolved> {
        let (Some(end), Some(start)) = (runs[i].last().copied(), runs[j].first().copied()) else {
            return Ok(Resolved::Break);
        };
        let meet = (end.point - start.point).length() <= ZERO_TOLERANCE;
        match link {
            Link::Joined => Ok(Resolved::Joined),
            Link::Break => Ok(Resolved::Break),
            Link::Smooth if meet => Ok(Resolved::Joined),
            Link::Smooth => Ok(if self.trim_runs(runs, i, j) {
                Resolved::Joined
            } else {
                Resolved::Break
            }),
            Link::Corner { below, above } => {
                let ta = self.curve.derivatives_at_side(below, 1, EvalSide::Below)[1];
                let tb = self.curve.derivatives_at_side(above, 1, EvalSide::Above)[1];
                let (Some(ta), Some(tb)) = (ta.try_normalize(), tb.try_normalize()) else {
                    return Ok(Resolved::Break);
                };
                let turn = ta.cross(tb).dot(self.plane.normal);
                if turn * self.distance > 0.0 {
                    // The offsets overlap: cut both back to where they cross.
                    if meet || self.trim_runs(runs, i, j) {
                        return Ok(Resolved::Joined);
                    }
                    let (Some(end), Some(start)) = (runs[i].last(), runs[j].first()) else {
                        return Ok(Resolved::Break);
                    };
                    return Ok(Resolved::Connect(vec![NurbsCurve::line(end.point, start.point).into()]));
                }
                if meet {
                    return Ok(Resolved::Joined);
                }
                let kink = self.curve.point_at(below);
                self.corner(style, (end.point, ta), (start.point, tb), kink)
                    .map(Resolved::Connect)
            }
        }
    }

    fn trim_runs(&self, runs: &mut [Run], i: usize, j: usize) -> bool {
        match self.trim_pair(&runs[i], &runs[j]) {
            Some((head, tail)) => {
                runs[i] = head;
                runs[j] = tail;
                true
            }
            None => false,
        }
    }

    /// Connector across the gap at a convex kink.
    fn corner(
        &self,
        style: CornerStyle,
        (ea, ta): (Point3, Vector3),
        (eb, tb): (Point3, Vector3),
        kink: Point3,
    ) -> Result<Vec<AnyCurve>> {
        let chamfer = || vec![AnyCurve::from(NurbsCurve::line(ea, eb))];
        Ok(match style {
            CornerStyle::Chamfer => chamfer(),
            CornerStyle::Sharp => match Ray::new(ea, ta).closest_approach(&Ray::new(eb, -tb)) {
                Some((s1, s2)) if s1 > 0.0 && s2 > 0.0 => {
                    let miter = ea + ta * s1;
                    if (miter - kink).length() <= MITER_LIMIT * self.distance.abs() {
                        vec![
                            NurbsCurve::line(ea, miter).into(),
                            NurbsCurve::line(miter, eb).into(),
                        ]
                    } else {
                        chamfer()
                    }
                }
                _ => chamfer(),
            },
            CornerStyle::Round => NurbsCurve::tangent_arc(ea, ta, eb)
                .map(|arc| vec![arc.into()])
                .unwrap_or_else(chamfer),
            CornerStyle::Smooth => {
                let from = BlendEnd {
                    point: ea,
                    tangent: ta,
                    curvature: Vector3::ZERO,
                };
                let to = BlendEnd {
                    point: eb,
                    tangent: tb,
                    curvature: Vector3::ZERO,
                };
                match blend_ends(&from, &to, BlendContinuity::Tangency)? {
                    Some(blend) => vec![blend.into()],
                    None => Vec::new(),
                }
            }
        })
    }
}

/// Split the domain at tangent discontinuities. On closed curves with a
/// smooth seam the last piece wraps into the first. Also reports whether
/// the seam of a closed curve is a kink.
fn smooth_pieces(curve: &AnyCurve, tolerance: &ContinuityTolerance) -> (Vec<Vec<Interval>>, bool) {
    let domain = curve.domain();
    let mut cuts = vec![domain.t0()];
    let mut t = domain.t0();
    while let Some(next) = curve.next_discontinuity(Continuity::G1, t, domain.t1(), tolerance) {
        cuts.push(next);
        t = next;
    }
    cuts.push(domain.t1());

    let mut pieces: Vec<Vec<Interval>> = cuts
        .windows(2)
        .map(|w| vec![Interval::new(w[0], w[1])])
        .collect();
    let closed = curve.is_closed();
    let seam_corner = closed && !curve.is_continuous(Continuity::G1Locus, domain.t1(), tolerance);
    if closed && !seam_corner && pieces.len() > 1 {
        let first = pieces.remove(0);
        if let Some(last) = pieces.last_mut() {
            last.extend(first);
        }
    }
    (pieces, seam_corner)
}

fn push_distinct(run: &mut Run, sample: Sample) {
    match run.last() {
        Some(last) if (last.point - sample.point).length() <= ZERO_TOLERANCE => {}
        _ => run.push(sample),
    }
}

fn run_box(run: &Run) -> Option<Aabb3> {
    let points: Vec<Point3> = run.iter().map(|s| s.point).collect();
    Aabb3::from_points(&points)
}

/// Cubic interpolation through a run; `None` for fewer than two distinct
/// points.
fn fit(run: &Run) -> Result<Option<AnyCurve>> {
    let points: Vec<Point3> = run.iter().map(|s| s.point).collect();
    let Some(&first) = points.first() else {
        return Ok(None);
    };
    if points.iter().all(|p| (*p - first).length() <= ZERO_TOLERANCE) {
        return Ok(None);
    }
    let fitted = NurbsCurve::interpolate(&points, 3).or_else(|_| NurbsCurve::interpolate(&points, 1))?;
    Ok(Some(fitted.into()))
}

/// Chain pieces into one curve.
fn assemble(pieces: Vec<AnyCurve>, closed: bool) -> Result<Option<AnyCurve>> {
    let mut iter = pieces.into_iter();
    let Some(first) = iter.next() else {
        return Ok(None);
    };
    let mut chain = PolyCurve::new(first);
    for piece in iter {
        chain.append_and_match(piece)?;
    }
    chain.remove_nesting();
    if closed {
        let start = chain.start_point();
        chain.set_end_point(start);
    }
    if chain.segment_count() == 1 {
        return Ok(chain.segments().first().cloned());
    }
    Ok(Some(chain.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use curvekit_geometry::closest::closest_point;
    use curvekit_geometry::BezierCurve;
    use curvekit_math::DVec3;
    use std::f64::consts::PI;

    fn square() -> AnyCurve {
        let p = [
            DVec3::ZERO,
            DVec3::new(2.0, 0.0, 0.0),
            DVec3::new(2.0, 2.0, 0.0),
            DVec3::new(0.0, 2.0, 0.0),
        ];
        let segments = (0..4)
            .map(|i| NurbsCurve::line(p[i], p[(i + 1) % 4]).into())
            .collect();
        PolyCurve::from_segments(segments).unwrap().into()
    }

    fn length(c: &AnyCurve) -> f64 {
        c.length(None, 1e-10).value
    }

    #[test]
    fn test_square_outward_sharp() {
        let out = offset(&square(), &Plane::xy(), -0.5, 1e-6, CornerStyle::Sharp, EndStyle::None).unwrap();
        assert_eq!(out.len(), 1);
        assert!(out[0].is_closed());
        assert!((length(&out[0]) - 12.0).abs() < 1e-6);
    }

    #[test]
    fn test_square_outward_round_and_chamfer() {
        let round = offset(&square(), &Plane::xy(), -0.5, 1e-6, CornerStyle::Round, EndStyle::None).unwrap();
        assert!((length(&round[0]) - (8.0 + PI)).abs() < 1e-6);

        let chamfer = offset(&square(), &Plane::xy(), -0.5, 1e-6, CornerStyle::Chamfer, EndStyle::None).unwrap();
        let diagonal = 0.5 * 2f64.sqrt();
        assert!((length(&chamfer[0]) - (8.0 + 4.0 * diagonal)).abs() < 1e-6);
    }

    #[test]
    fn test_square_outward_smooth_corners() {
        let out = offset(&square(), &Plane::xy(), -0.5, 1e-6, CornerStyle::Smooth, EndStyle::None).unwrap();
        assert_eq!(out.len(), 1);
        let curve = &out[0];
        assert!(curve.is_closed());
        let d = curve.domain();
        let tol = ContinuityTolerance::default();
        assert_eq!(curve.next_discontinuity(Continuity::G1, d.t0(), d.t1(), &tol), None);
        // Each blend spans the same ends as a chamfer but bulges past it.
        let len = length(curve);
        assert!(len > 8.0 + 4.0 * 0.5 * 2f64.sqrt() && len < 12.0);
    }

    #[test]
    fn test_trim_pair_needs_overlapping_runs() {
        let curve = square();
        let plane = Plane::xy();
        let offsetter = Offsetter { curve: &curve, plane: &plane, distance: 0.5, tolerance: 1e-6 };
        let run = |pts: &[[f64; 2]]| -> Run {
            pts.iter().map(|p| Sample { t: None, point: DVec3::new(p[0], p[1], 0.0) }).collect()
        };
        let a = run(&[[0.0, 0.0], [2.0, 0.0]]);
        let crossing = run(&[[1.0, -1.0], [1.0, 1.0]]);
        let apart = run(&[[5.0, -1.0], [5.0, 1.0]]);

        let (head, tail) = offsetter.trim_pair(&a, &crossing).unwrap();
        assert!((head.last().unwrap().point - DVec3::new(1.0, 0.0, 0.0)).length() < 1e-12);
        assert!((tail[0].point - DVec3::new(1.0, 0.0, 0.0)).length() < 1e-12);
        assert!(offsetter.trim_pair(&a, &apart).is_none());
        assert!(offsetter.trim_pair(&a, &Vec::new()).is_none());
    }

    #[test]
    fn test_square_inward_trims_corners() {
        let out = offset(&square(), &Plane::xy(), 0.5, 1e-6, CornerStyle::Sharp, EndStyle::None).unwrap();
        assert_eq!(out.len(), 1);
        assert!((length(&out[0]) - 4.0).abs() < 1e-6);
        assert!((out[0].start_point() - DVec3::new(0.5, 0.5, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_circle_offsets() {
        let circle: AnyCurve = NurbsCurve::circle(&Plane::xy(), 2.0).unwrap().into();
        let inner = offset(&circle, &Plane::xy(), 0.5, 1e-5, CornerStyle::Round, EndStyle::None).unwrap();
        assert_eq!(inner.len(), 1);
        assert!((length(&inner[0]) - 3.0 * PI).abs() < 1e-4);
        for i in 0..20 {
            let t = inner[0].domain().parameter_at(i as f64 / 20.0);
            assert!((inner[0].point_at(t).length() - 1.5).abs() < 1e-4);
        }

        let collapsed = offset(&circle, &Plane::xy(), 3.0, 1e-5, CornerStyle::Round, EndStyle::None).unwrap();
        assert!(collapsed.is_empty());
    }

    #[test]
    fn test_parabola_loop_is_removed() {
        // y = x^2 has radius 0.5 at its vertex; offsetting by 1 toward the
        // inside forms a swallowtail whose branches cross at (0, 1.25).
        let parabola: AnyCurve = BezierCurve::new(vec![
            DVec3::new(-2.0, 4.0, 0.0),
            DVec3::new(0.0, -4.0, 0.0),
            DVec3::new(2.0, 4.0, 0.0),
        ])
        .unwrap()
        .into();
        let out = offset(&parabola, &Plane::xy(), 1.0, 1e-5, CornerStyle::Sharp, EndStyle::None).unwrap();
        assert_eq!(out.len(), 1);
        let poly = out[0].as_poly().unwrap();
        assert_eq!(poly.segment_count(), 2);
        let joint = poly.segments()[0].end_point();
        assert!((joint - DVec3::new(0.0, 1.25, 0.0)).length() < 1e-6);

        for i in 0..=40 {
            let t = out[0].domain().parameter_at(i as f64 / 40.0);
            let p = out[0].point_at(t);
            let foot = closest_point(&parabola, p, None).unwrap();
            assert!((parabola.point_at(foot) - p).length() > 1.0 - 1e-4);
        }
    }

    #[test]
    fn test_open_line_with_end_caps() {
        let line: AnyCurve = NurbsCurve::line(DVec3::ZERO, DVec3::new(4.0, 0.0, 0.0)).into();
        let one_sided = offset(&line, &Plane::xy(), 1.0, 1e-6, CornerStyle::Sharp, EndStyle::None).unwrap();
        assert_eq!(one_sided.len(), 1);
        assert!((one_sided[0].start_point() - DVec3::new(0.0, 1.0, 0.0)).length() < 1e-12);

        let flat = offset(&line, &Plane::xy(), 1.0, 1e-6, CornerStyle::Sharp, EndStyle::Flat).unwrap();
        assert_eq!(flat.len(), 1);
        assert!(flat[0].is_closed());
        assert!((length(&flat[0]) - 12.0).abs() < 1e-6);

        let round = offset(&line, &Plane::xy(), 1.0, 1e-6, CornerStyle::Sharp, EndStyle::Round).unwrap();
        assert!((length(&round[0]) - (8.0 + 2.0 * PI)).abs() < 1e-6);
    }

    #[test]
    fn test_zero_distance_and_bad_input() {
        let line: AnyCurve = NurbsCurve::line(DVec3::ZERO, DVec3::X).into();
        assert_eq!(
            offset(&line, &Plane::xy(), 0.0, 1e-6, CornerStyle::Sharp, EndStyle::None).unwrap(),
            vec![line.clone()]
        );
        assert!(offset(&line, &Plane::xy(), f64::NAN, 1e-6, CornerStyle::Sharp, EndStyle::None).is_err());
        assert!(offset(&line, &Plane::xy(), 1.0, 0.0, CornerStyle::Sharp, EndStyle::None).is_err());
    }
}
