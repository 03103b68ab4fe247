//! De Boor evaluation and knot refinement on homogeneous control points.
//!
//! Control points are stored as `(x·w, y·w, z·w, w)`. Every routine here
//! works in that space; callers project with
//! [`curvekit_math::euclidean_derivatives`].

use curvekit_math::Point4;

use super::knot::{ders_basis_functions, find_span, find_span_side, multiplicity_of};
use crate::curve::EvalSide;

/// Homogeneous derivatives `[A, A', ..., A^(order)]` at `t`.
#[allow(clippy::needless_range_loop)]
pub fn curve_derivatives(
    degree: usize,
    knots: &[f64],
    control_points: &[Point4],
    t: f64,
    order: usize,
    side: EvalSide,
) -> Vec<Point4> {
    let n = control_points.len() - 1;
    let span = find_span_side(degree, knots, n, t, side);
    let nders = ders_basis_functions(degree, knots, span, t, order);

    let mut ders = vec![Point4::ZERO; order + 1];
    for k in 0..=order.min(degree) {
        for j in 0..=degree {
            ders[k] += nders[k][j] * control_points[span - degree + j];
        }
    }
    ders
}

/// Evaluate the homogeneous curve point at `t`.
pub fn curve_point(degree: usize, knots: &[f64], control_points: &[Point4], t: f64) -> Point4 {
    curve_derivatives(degree, knots, control_points, t, 0, EvalSide::Default)[0]
}

/// Insert `t` into the knot vector `times` times (Boehm's algorithm).
///
/// The insertion count is capped so the multiplicity of `t` among the knots
/// at or below its span never exceeds `degree`. Returns the refined knots
/// and control points; the curve shape is unchanged.
pub fn insert_knot(
    degree: usize,
    knots: &[f64],
    control_points: &[Point4],
    t: f64,
    times: usize,
) -> (Vec<f64>, Vec<Point4>) {
    let p = degree;
    let np = control_points.len() - 1;
    let k = find_span(p, knots, np, t);
    let s = knots[..=k].iter().filter(|&&u| u == t).count();
    let r = times.min(p.saturating_sub(s));

    if r == 0 {
        return (knots.to_vec(), control_points.to_vec());
    }

    let mut new_knots = Vec::with_capacity(knots.len() + r);
    new_knots.extend_from_slice(&knots[..=k]);
    new_knots.extend(std::iter::repeat(t).take(r));
    new_knots.extend_from_slice(&knots[k + 1..]);

    let mut new_cvs = vec![Point4::ZERO; np + 1 + r];
    new_cvs[..=k - p].copy_from_slice(&control_points[..=k - p]);
    for i in k - s..=np {
        new_cvs[i + r] = control_points[i];
    }

    let mut temp: Vec<Point4> = (0..=p - s).map(|i| control_points[k - p + i]).collect();
    for j in 1..=r {
        let l = k - p + j;
        for i in 0..=p - j - s {
            let alpha = (t - knots[l + i]) / (knots[i + k + 1] - knots[l + i]);
            temp[i] = alpha * temp[i + 1] + (1.0 - alpha) * temp[i];
        }
        new_cvs[l] = temp[0];
        new_cvs[k + r - j - s] = temp[p - j - s];
    }
    let l = k - p + r;
    for i in l + 1..k - s {
        new_cvs[i] = temp[i - l];
    }

    (new_knots, new_cvs)
}

/// Raise the total multiplicity of `t` to at least `target`.
pub fn ensure_multiplicity(
    degree: usize,
    knots: &[f64],
    control_points: &[Point4],
    t: f64,
    target: usize,
) -> (Vec<f64>, Vec<Point4>) {
    let m = multiplicity_of(knots, t);
    if m >= target {
        return (knots.to_vec(), control_points.to_vec());
    }
    insert_knot(degree, knots, control_points, t, target - m)
}

/// Keep the part of the curve at and above `t`, which must already have
/// multiplicity `degree`. The result starts with `degree + 1` copies of `t`.
pub fn keep_from(
    degree: usize,
    knots: &[f64],
    control_points: &[Point4],
    t: f64,
) -> (Vec<f64>, Vec<Point4>) {
    let n = control_points.len() - 1;
    let k = find_span(degree, knots, n, t);
    let first = k - degree;

    let mut new_knots = Vec::with_capacity(knots.len() - first);
    new_knots.push(t);
    new_knots.extend_from_slice(&knots[first + 1..]);
    (new_knots, control_points[first..].to_vec())
}

/// Keep the part of the curve at and below `t`, which must already have
/// multiplicity `degree`. The result ends with `degree + 1` copies of `t`.
pub fn keep_until(
    degree: usize,
    knots: &[f64],
    control_points: &[Point4],
    t: f64,
) -> (Vec<f64>, Vec<Point4>) {
    let l = knots.partition_point(|&u| u < t);
    let mut new_knots = Vec::with_capacity(l + degree + 1);
    new_knots.extend_from_slice(&knots[..l + degree]);
    new_knots.push(t);
    (new_knots, control_points[..l].to_vec())
}

/// Clamp both ends of the knot vector at the domain ends.
pub fn clamp(degree: usize, knots: &[f64], control_points: &[Point4]) -> (Vec<f64>, Vec<Point4>) {
    let n = control_points.len() - 1;
    let (a, b) = (knots[degree], knots[n + 1]);

    let (knots, cvs) = ensure_multiplicity(degree, knots, control_points, b, degree);
    let (knots, cvs) = keep_until(degree, &knots, &cvs, b);
    let (knots, cvs) = ensure_multiplicity(degree, &knots, &cvs, a, degree);
    keep_from(degree, &knots, &cvs, a)
}

/// Raise the degree of a Bezier control polygon by one.
pub fn elevate_bezier(control_points: &[Point4]) -> Vec<Point4> {
    let n = control_points.len() - 1;
    let m = n + 1;
    let mut elevated = Vec::with_capacity(m + 1);
    elevated.push(control_points[0]);
    for i in 1..m {
        let a = i as f64 / m as f64;
        elevated.push(a * control_points[i - 1] + (1.0 - a) * control_points[i]);
    }
    elevated.push(control_points[n]);
    elevated
}

/// Split a Bezier control polygon at `t` with de Casteljau's algorithm.
///
/// Works for any `t`; values outside `[0, 1]` extrapolate, which is how
/// Bezier domains are extended.
pub fn subdivide_bezier(control_points: &[Point4], t: f64) -> (Vec<Point4>, Vec<Point4>) {
    let n = control_points.len();
    let mut work = control_points.to_vec();
    let mut left = Vec::with_capacity(n);
    let mut right = Vec::with_capacity(n);

    left.push(work[0]);
    right.push(work[n - 1]);
    for r in 1..n {
        for i in 0..n - r {
            work[i] = work[i].lerp(work[i + 1], t);
        }
        left.push(work[0]);
        right.push(work[n - r - 1]);
    }
    right.reverse();
    (left, right)
}

#[cfg(test)]
mod tests {
    use super::*;
    use curvekit_math::{from_homogeneous, DVec4};

    fn quadratic() -> (Vec<f64>, Vec<Point4>) {
        let knots = vec![0.0, 0.0, 0.0, 1.0, 2.0, 2.0, 2.0];
        let cvs = vec![
            DVec4::new(0.0, 0.0, 0.0, 1.0),
            DVec4::new(1.0, 2.0, 0.0, 1.0),
            DVec4::new(3.0, 2.0, 0.0, 1.0),
            DVec4::new(4.0, 0.0, 0.0, 1.0),
        ];
        (knots, cvs)
    }

    #[test]
    fn test_curve_point_linear() {
        let knots = vec![0.0, 0.0, 1.0, 2.0, 2.0];
        let cps = vec![
            DVec4::new(0.0, 0.0, 0.0, 1.0),
            DVec4::new(1.0, 0.0, 0.0, 1.0),
            DVec4::new(1.0, 1.0, 0.0, 1.0),
        ];

        let p = from_homogeneous(curve_point(1, &knots, &cps, 0.5));
        assert!((p.x - 0.5).abs() < 1e-10);
        assert!(p.y.abs() < 1e-10);

        let p = from_homogeneous(curve_point(1, &knots, &cps, 1.5));
        assert!((p.x - 1.0).abs() < 1e-10);
        assert!((p.y - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_one_sided_derivative_at_kink() {
        let knots = vec![0.0, 0.0, 1.0, 2.0, 2.0];
        let cps = vec![
            DVec4::new(0.0, 0.0, 0.0, 1.0),
            DVec4::new(1.0, 0.0, 0.0, 1.0),
            DVec4::new(1.0, 1.0, 0.0, 1.0),
        ];
        let below = curve_derivatives(1, &knots, &cps, 1.0, 1, EvalSide::Below);
        let above = curve_derivatives(1, &knots, &cps, 1.0, 1, EvalSide::Above);
        assert!((below[1].x - 1.0).abs() < 1e-12 && below[1].y.abs() < 1e-12);
        assert!(above[1].x.abs() < 1e-12 && (above[1].y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_insert_knot_preserves_shape() {
        let (knots, cvs) = quadratic();
        let (k2, c2) = insert_knot(2, &knots, &cvs, 0.5, 1);
        assert_eq!(k2.len(), knots.len() + 1);
        assert_eq!(c2.len(), cvs.len() + 1);
        for i in 0..=20 {
            let t = i as f64 * 0.1;
            let a = curve_point(2, &knots, &cvs, t);
            let b = curve_point(2, &k2, &c2, t);
            assert!((a - b).length() < 1e-12, "mismatch at {t}");
        }
    }

    #[test]
    fn test_insert_knot_caps_multiplicity() {
        let (knots, cvs) = quadratic();
        let (k2, _) = insert_knot(2, &knots, &cvs, 1.0, 5);
        assert_eq!(multiplicity_of(&k2, 1.0), 2);
    }

    #[test]
    fn test_keep_from_and_until() {
        let (knots, cvs) = quadratic();
        let (k, c) = ensure_multiplicity(2, &knots, &cvs, 0.7, 2);
        let (lk, lc) = keep_until(2, &k, &c, 0.7);
        let (rk, rc) = keep_from(2, &k, &c, 0.7);
        assert_eq!(lk.len(), lc.len() + 3);
        assert_eq!(rk.len(), rc.len() + 3);
        let split = curve_point(2, &knots, &cvs, 0.7);
        assert!((lc[lc.len() - 1] - split).length() < 1e-12);
        assert!((rc[0] - split).length() < 1e-12);
        let mid = curve_point(2, &knots, &cvs, 1.3);
        assert!((curve_point(2, &rk, &rc, 1.3) - mid).length() < 1e-12);
    }

    #[test]
    fn test_clamp_unclamped_vector() {
        let knots = vec![-2.0, -1.0, 0.0, 1.0, 2.0, 3.0, 4.0];
        let cvs = vec![
            DVec4::new(0.0, 0.0, 0.0, 1.0),
            DVec4::new(1.0, 1.0, 0.0, 1.0),
            DVec4::new(2.0, 0.0, 0.0, 1.0),
            DVec4::new(3.0, 1.0, 0.0, 1.0),
        ];
        let (k, c) = clamp(2, &knots, &cvs);
        assert_eq!(&k[..3], &[0.0, 0.0, 0.0]);
        assert_eq!(&k[k.len() - 3..], &[2.0, 2.0, 2.0]);
        assert_eq!(k.len(), c.len() + 3);
        assert!((c[0] - curve_point(2, &knots, &cvs, 0.0)).length() < 1e-12);
        assert!((c[c.len() - 1] - curve_point(2, &knots, &cvs, 2.0)).length() < 1e-12);
    }

    #[test]
    fn test_subdivide_bezier_midpoint() {
        let cvs = vec![
            DVec4::new(0.0, 0.0, 0.0, 1.0),
            DVec4::new(0.5, 1.0, 0.0, 1.0),
            DVec4::new(1.0, 0.0, 0.0, 1.0),
        ];
        let (left, right) = subdivide_bezier(&cvs, 0.5);
        assert!((left[2] - DVec4::new(0.5, 0.5, 0.0, 1.0)).length() < 1e-12);
        assert_eq!(left[2], right[0]);
        assert_eq!(right[2], cvs[2]);
    }

    #[test]
    fn test_elevate_bezier_keeps_ends() {
        let cvs = vec![DVec4::new(0.0, 0.0, 0.0, 1.0), DVec4::new(3.0, 0.0, 0.0, 1.0)];
        let up = elevate_bezier(&cvs);
        assert_eq!(up.len(), 3);
        assert!((up[1].x - 1.5).abs() < 1e-12);
    }
}
