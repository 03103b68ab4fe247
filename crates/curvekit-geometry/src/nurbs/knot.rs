//! Knot vector utilities for B-spline/NURBS evaluation.

use crate::curve::EvalSide;

/// Find the knot span index for parameter `t` in the knot vector.
///
/// Returns the largest index `i` in `[degree, n]` such that
/// `knots[i] <= t` and `knots[i] < knots[i+1]`. Parameters outside the
/// domain land in the first or last non-empty span, so evaluation there
/// continues the end polynomials.
///
/// # Arguments
/// * `degree` - Degree of the B-spline
/// * `knots` - The knot vector
/// * `n` - Number of control points minus 1
/// * `t` - Parameter value
pub fn find_span(degree: usize, knots: &[f64], n: usize, t: f64) -> usize {
    let count = knots[..=n].partition_point(|&k| k <= t);
    let mut span = count.saturating_sub(1).clamp(degree, n);

    // Skip empty spans at either end.
    while span > degree && knots[span] >= knots[span + 1] {
        span -= 1;
    }
    while span < n && knots[span] >= knots[span + 1] {
        span += 1;
    }
    span
}

/// Like [`find_span`], but at a knot value `t` the span is taken from the
/// requested side: `Below` returns the span that ends at `t`.
pub fn find_span_side(degree: usize, knots: &[f64], n: usize, t: f64, side: EvalSide) -> usize {
    let mut span = find_span(degree, knots, n, t);
    if side == EvalSide::Below {
        while span > degree && (knots[span] >= t || knots[span] >= knots[span + 1]) {
            span -= 1;
        }
    }
    span
}

/// Compute the non-vanishing basis functions at parameter `t`.
///
/// Returns a vector of `degree + 1` basis function values N_{span-degree,degree}(t)
/// through N_{span,degree}(t).
///
/// # Arguments
/// * `degree` - Degree of the B-spline
/// * `knots` - The knot vector
/// * `span` - The knot span index (from `find_span`)
/// * `t` - Parameter value
pub fn basis_functions(degree: usize, knots: &[f64], span: usize, t: f64) -> Vec<f64> {
    let mut n = vec![0.0; degree + 1];
    let mut left = vec![0.0; degree + 1];
    let mut right = vec![0.0; degree + 1];

    n[0] = 1.0;

    for j in 1..=degree {
        left[j] = t - knots[span + 1 - j];
        right[j] = knots[span + j] - t;
        let mut saved = 0.0;

        for r in 0..j {
            let temp = n[r] / (right[r + 1] + left[j - r]);
            n[r] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }

        n[j] = saved;
    }

    n
}

/// Compute basis functions and their derivatives up to order `order` at `t`.
///
/// Row `k` of the result holds the k-th derivatives of the `degree + 1`
/// non-vanishing basis functions. Rows beyond `degree` are zero.
#[allow(clippy::needless_range_loop)]
pub fn ders_basis_functions(
    degree: usize,
    knots: &[f64],
    span: usize,
    t: f64,
    order: usize,
) -> Vec<Vec<f64>> {
    let p = degree;
    let nd = order.min(p);
    let mut ders = vec![vec![0.0; p + 1]; order + 1];

    // Triangular table of basis functions and knot differences
    let mut ndu = vec![vec![0.0; p + 1]; p + 1];
    let mut left = vec![0.0; p + 1];
    let mut right = vec![0.0; p + 1];

    ndu[0][0] = 1.0;

    for j in 1..=p {
        left[j] = t - knots[span + 1 - j];
        right[j] = knots[span + j] - t;
        let mut saved = 0.0;

        for r in 0..j {
            // Lower triangle
            ndu[j][r] = right[r + 1] + left[j - r];
            let temp = ndu[r][j - 1] / ndu[j][r];

            // Upper triangle
            ndu[r][j] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        ndu[j][j] = saved;
    }

    for j in 0..=p {
        ders[0][j] = ndu[j][p];
    }

    let mut a = vec![vec![0.0; p + 1]; 2];

    for r in 0..=p {
        let mut s1 = 0usize;
        let mut s2 = 1usize;
        a[0][0] = 1.0;

        for k in 1..=nd {
            let mut d = 0.0;
            let rk = r as isize - k as isize;
            let pk = p - k;

            if rk >= 0 {
                a[s2][0] = a[s1][0] / ndu[pk + 1][rk as usize];
                d = a[s2][0] * ndu[rk as usize][pk];
            }

            let j1 = if rk >= -1 { 1 } else { (-rk) as usize };
            let j2 = if r <= pk + 1 { k - 1 } else { p - r };

            for j in j1..=j2 {
                let idx = (rk + j as isize) as usize;
                a[s2][j] = (a[s1][j] - a[s1][j - 1]) / ndu[pk + 1][idx];
                d += a[s2][j] * ndu[idx][pk];
            }

            if r <= pk {
                a[s2][k] = -a[s1][k - 1] / ndu[pk + 1][r];
                d += a[s2][k] * ndu[r][pk];
            }

            ders[k][r] = d;

            // Swap rows
            std::mem::swap(&mut s1, &mut s2);
        }
    }

    // Multiply through by the correct factors
    let mut factor = p as f64;
    for k in 1..=nd {
        for val in &mut ders[k] {
            *val *= factor;
        }
        factor *= (p - k) as f64;
    }

    ders
}

/// Number of knots equal to `knots[index]`.
pub fn knot_multiplicity(knots: &[f64], index: usize) -> usize {
    multiplicity_of(knots, knots[index])
}

/// Number of knots equal to `t`.
pub fn multiplicity_of(knots: &[f64], t: f64) -> usize {
    knots.iter().filter(|&&k| k == t).count()
}

/// Clamped knot vector with uniformly spaced interior knots.
pub fn clamped_uniform_knots(degree: usize, cv_count: usize, delta: f64) -> Vec<f64> {
    let interior = cv_count - degree - 1;
    let end = (cv_count - degree) as f64 * delta;
    let mut knots = Vec::with_capacity(cv_count + degree + 1);
    knots.extend(std::iter::repeat(0.0).take(degree + 1));
    knots.extend((1..=interior).map(|i| i as f64 * delta));
    knots.extend(std::iter::repeat(end).take(degree + 1));
    knots
}

/// Uniform unclamped knot vector whose domain starts at 0.
pub fn periodic_uniform_knots(degree: usize, cv_count: usize, delta: f64) -> Vec<f64> {
    (0..cv_count + degree + 1)
        .map(|i| (i as f64 - degree as f64) * delta)
        .collect()
}

/// Greville abscissa of control point `index`: the average of the `degree`
/// knots that follow it.
pub fn greville_abscissa(degree: usize, knots: &[f64], index: usize) -> f64 {
    knots[index + 1..=index + degree].iter().sum::<f64>() / degree as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_span_uniform() {
        // Degree 2, 5 control points, uniform knot vector
        let knots = vec![0.0, 0.0, 0.0, 1.0, 2.0, 3.0, 3.0, 3.0];
        let n = 4; // 5 control points - 1
        let degree = 2;

        assert_eq!(find_span(degree, &knots, n, 0.0), 2);
        assert_eq!(find_span(degree, &knots, n, 0.5), 2);
        assert_eq!(find_span(degree, &knots, n, 1.0), 3);
        assert_eq!(find_span(degree, &knots, n, 1.5), 3);
        assert_eq!(find_span(degree, &knots, n, 2.5), 4);
        assert_eq!(find_span(degree, &knots, n, 3.0), 4);
        assert_eq!(find_span(degree, &knots, n, -1.0), 2);
        assert_eq!(find_span(degree, &knots, n, 7.0), 4);
    }

    #[test]
    fn test_find_span_side_at_knot() {
        let knots = vec![0.0, 0.0, 0.0, 1.0, 2.0, 3.0, 3.0, 3.0];
        assert_eq!(find_span_side(2, &knots, 4, 1.0, EvalSide::Above), 3);
        assert_eq!(find_span_side(2, &knots, 4, 1.0, EvalSide::Below), 2);
        assert_eq!(find_span_side(2, &knots, 4, 0.0, EvalSide::Below), 2);
    }

    #[test]
    fn test_find_span_unclamped_start() {
        // Knot 0 repeated twice inside an unclamped vector.
        let knots = vec![-2.0, -1.0, 0.0, 0.0, 1.0, 2.0, 3.0];
        assert_eq!(find_span(2, &knots, 3, 0.0), 3);
    }

    #[test]
    fn test_basis_functions_partition_of_unity() {
        let knots = vec![0.0, 0.0, 0.0, 1.0, 2.0, 3.0, 3.0, 3.0];
        let degree = 2;
        let n = 4;

        // Basis functions should sum to 1 (partition of unity)
        for &t in &[0.0, 0.5, 1.0, 1.5, 2.0, 2.5, 3.0] {
            let span = find_span(degree, &knots, n, t);
            let basis = basis_functions(degree, &knots, span, t);
            let sum: f64 = basis.iter().sum();
            assert!(
                (sum - 1.0).abs() < 1e-12,
                "Partition of unity failed at t={}: sum={}",
                t,
                sum
            );
        }
    }

    #[test]
    fn test_basis_functions_non_negative() {
        let knots = vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        let degree = 3;
        let n = 3;

        for i in 0..=20 {
            let t = i as f64 / 20.0;
            let span = find_span(degree, &knots, n, t);
            let basis = basis_functions(degree, &knots, span, t);
            for (j, &val) in basis.iter().enumerate() {
                assert!(val >= -1e-15, "Negative basis at t={}, j={}: {}", t, j, val);
            }
        }
    }

    #[test]
    fn test_derivatives_sum_to_zero() {
        let knots = vec![0.0, 0.0, 0.0, 0.0, 0.5, 1.0, 1.0, 1.0, 1.0];
        let degree = 3;
        for &t in &[0.1, 0.5, 0.75] {
            let span = find_span(degree, &knots, 4, t);
            let ders = ders_basis_functions(degree, &knots, span, t, 4);
            assert!((ders[0].iter().sum::<f64>() - 1.0).abs() < 1e-12);
            for k in 1..=3 {
                assert!(ders[k].iter().sum::<f64>().abs() < 1e-9, "order {k} at {t}");
            }
            assert!(ders[4].iter().all(|&v| v == 0.0));
        }
    }

    #[test]
    fn test_bernstein_first_derivative() {
        // Cubic Bezier basis: B0' = -3(1-t)^2
        let knots = vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        let t = 0.3;
        let ders = ders_basis_functions(3, &knots, 3, t, 1);
        assert!((ders[1][0] + 3.0 * (1.0 - t) * (1.0 - t)).abs() < 1e-12);
    }

    #[test]
    fn test_uniform_knot_vectors() {
        let clamped = clamped_uniform_knots(2, 5, 1.0);
        assert_eq!(clamped, vec![0.0, 0.0, 0.0, 1.0, 2.0, 3.0, 3.0, 3.0]);
        let periodic = periodic_uniform_knots(2, 5, 0.5);
        assert_eq!(periodic.len(), 8);
        assert_eq!(periodic[2], 0.0);
        assert_eq!(periodic[5], 1.5);
        assert!((greville_abscissa(2, &clamped, 2) - 1.5).abs() < 1e-15);
        assert_eq!(knot_multiplicity(&clamped, 0), 3);
    }
}
