//! Homogeneous (weighted) point helpers shared by rational curve evaluation.

use crate::{Point3, Point4, Vector3};

/// Weighted control vertex `(x*w, y*w, z*w, w)` for the Euclidean point `p`.
pub fn to_homogeneous(p: Point3, w: f64) -> Point4 {
    (p * w).extend(w)
}

/// Euclidean point of a homogeneous vertex. A zero weight yields the raw direction.
pub fn from_homogeneous(h: Point4) -> Point3 {
    if h.w == 0.0 {
        h.truncate()
    } else {
        h.truncate() / h.w
    }
}

/// Binomial coefficient `n choose k` as a float.
pub fn binomial(n: usize, k: usize) -> f64 {
    if k > n {
        return 0.0;
    }
    let k = k.min(n - k);
    let mut c = 1.0;
    for i in 0..k {
        c = c * (n - i) as f64 / (i + 1) as f64;
    }
    c
}

/// Converts derivatives of a homogeneous curve `[A, A', ...]` into Euclidean
/// derivatives `[C, C', ...]` with the quotient rule
/// `C^(k) = (A^(k) - sum_{i=1..k} binom(k,i) w^(i) C^(k-i)) / w`.
pub fn euclidean_derivatives(hders: &[Point4]) -> Vec<Vector3> {
    let mut ders: Vec<Vector3> = Vec::with_capacity(hders.len());
    let Some(first) = hders.first() else {
        return ders;
    };
    let w0 = first.w;
    if w0 == 0.0 {
        return hders.iter().map(|h| h.truncate()).collect();
    }
    for k in 0..hders.len() {
        let mut v = hders[k].truncate();
        for i in 1..=k {
            v -= binomial(k, i) * hders[i].w * ders[k - i];
        }
        ders.push(v / w0);
    }
    ders
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{dvec3, dvec4};

    #[test]
    fn test_binomial() {
        assert_eq!(binomial(4, 2), 6.0);
        assert_eq!(binomial(5, 0), 1.0);
        assert_eq!(binomial(3, 4), 0.0);
    }

    #[test]
    fn test_round_trip() {
        let h = to_homogeneous(dvec3(1.0, 2.0, 3.0), 0.5);
        assert_eq!(h, dvec4(0.5, 1.0, 1.5, 0.5));
        assert!((from_homogeneous(h) - dvec3(1.0, 2.0, 3.0)).length() < 1e-15);
    }

    #[test]
    fn test_quotient_rule_first_derivative() {
        // A(t) = (t, 0, 0, 1 + t): C(t) = t / (1 + t), C'(t) = 1 / (1 + t)^2
        let t = 0.5;
        let hders = [dvec4(t, 0.0, 0.0, 1.0 + t), dvec4(1.0, 0.0, 0.0, 1.0)];
        let ders = euclidean_derivatives(&hders);
        assert!((ders[0].x - t / (1.0 + t)).abs() < 1e-14);
        assert!((ders[1].x - 1.0 / ((1.0 + t) * (1.0 + t))).abs() < 1e-14);
    }
}
