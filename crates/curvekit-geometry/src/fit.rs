//! Global curve interpolation.

use curvekit_core::tolerance::ZERO_TOLERANCE;
use curvekit_core::{KernelError, Result};
use curvekit_math::{DVec3, Point3};
use nalgebra::{DMatrix, DVector};

use crate::curve::NurbsCurve;
use crate::nurbs::knot::{basis_functions, find_span};

/// Solve `A · P = points` for the control points `P`, one coordinate at a
/// time through a single LU factorization.
pub fn solve_interpolation(matrix: DMatrix<f64>, points: &[Point3]) -> Result<Vec<Point3>> {
    let n = points.len();
    if matrix.nrows() != n || matrix.ncols() != n {
        return Err(KernelError::Geometry(format!(
            "{}x{} interpolation matrix for {n} points",
            matrix.nrows(),
            matrix.ncols()
        )));
    }
    let lu = matrix.lu();
    let mut columns: [Vec<f64>; 3] = Default::default();
    for (axis, column) in columns.iter_mut().enumerate() {
        let b = DVector::from_iterator(n, points.iter().map(|p| p[axis]));
        let x = lu
            .solve(&b)
            .ok_or_else(|| KernelError::Geometry("singular interpolation matrix".into()))?;
        *column = x.iter().copied().collect();
    }
    Ok((0..n)
        .map(|i| DVec3::new(columns[0][i], columns[1][i], columns[2][i]))
        .collect())
}

/// Clamped NURBS of the given degree through `points`.
///
/// Consecutive duplicates are dropped. Parameters follow chord length, so
/// the domain is `[0, total chord length]`; interior knots average the
/// parameters. The degree drops when there are too few points.
pub fn interpolate(points: &[Point3], degree: usize) -> Result<NurbsCurve> {
    if degree == 0 {
        return Err(KernelError::Geometry("interpolation degree must be positive".into()));
    }
    let mut unique: Vec<Point3> = Vec::with_capacity(points.len());
    for &p in points {
        if unique.last().map_or(true, |&q: &Point3| (p - q).length() > ZERO_TOLERANCE) {
            unique.push(p);
        }
    }
    let n = unique.len();
    if n < 2 {
        return Err(KernelError::Geometry(
            "interpolation needs two distinct points".into(),
        ));
    }
    let p = degree.min(n - 1);

    let mut params = Vec::with_capacity(n);
    params.push(0.0);
    for w in unique.windows(2) {
        let last = params[params.len() - 1];
        params.push(last + (w[1] - w[0]).length());
    }
    let end = params[n - 1];

    let mut knots = vec![0.0; p + 1];
    for j in 1..n - p {
        knots.push(params[j..j + p].iter().sum::<f64>() / p as f64);
    }
    knots.extend(std::iter::repeat(end).take(p + 1));

    let mut matrix = DMatrix::<f64>::zeros(n, n);
    for (row, &u) in params.iter().enumerate() {
        let span = find_span(p, &knots, n - 1, u);
        for (j, b) in basis_functions(p, &knots, span, u).into_iter().enumerate() {
            matrix[(row, span - p + j)] = b;
        }
    }

    let cvs = solve_interpolation(matrix, &unique)?;
    NurbsCurve::new(p, knots, cvs)
}
