//! Parametric and geometric continuity tests.
//!
//! Parametric kinds (`C0` .. `G2`) only look at interior parameters; the
//! ends of the domain are always continuous. The locus kinds treat the
//! domain end of an open curve as a discontinuity, and compare the end with
//! the start on closed curves.

use curvekit_core::ContinuityTolerance;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::curve::{Curve, EvalSide};
use crate::evaluate::{curvature_vector, unit_tangent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Continuity {
    C0,
    C1,
    C2,
    G1,
    G2,
    C0Locus,
    C1Locus,
    C2Locus,
    G1Locus,
    G2Locus,
}

impl Continuity {
    pub fn is_locus(self) -> bool {
        matches!(
            self,
            Self::C0Locus | Self::C1Locus | Self::C2Locus | Self::G1Locus | Self::G2Locus
        )
    }

    /// The same test without the locus convention.
    pub fn parametric(self) -> Self {
        match self {
            Self::C0Locus => Self::C0,
            Self::C1Locus => Self::C1,
            Self::C2Locus => Self::C2,
            Self::G1Locus => Self::G1,
            Self::G2Locus => Self::G2,
            other => other,
        }
    }

    /// Highest derivative order the test inspects.
    pub fn order(self) -> usize {
        match self.parametric() {
            Self::C0 => 0,
            Self::C1 | Self::G1 => 1,
            _ => 2,
        }
    }
}

/// Whether `curve` has continuity `kind` at `t`.
pub fn is_continuous<C: Curve + ?Sized>(
    curve: &C,
    kind: Continuity,
    t: f64,
    tolerance: &ContinuityTolerance,
) -> bool {
    let domain = curve.domain();
    let order = kind.order();

    if t <= domain.t0() || t > domain.t1() {
        return true;
    }
    if t == domain.t1() {
        if !kind.is_locus() {
            return true;
        }
        if !curve.is_closed() {
            return false;
        }
        if kind == Continuity::C0Locus {
            return true;
        }
        let below = curve.derivatives_at_side(domain.t1(), order, EvalSide::Below);
        let above = curve.derivatives_at_side(domain.t0(), order, EvalSide::Above);
        return compare(&below, &above, kind, tolerance);
    }

    let below = curve.derivatives_at_side(t, order, EvalSide::Below);
    let above = curve.derivatives_at_side(t, order, EvalSide::Above);
    compare(&below, &above, kind, tolerance)
}

/// First parameter strictly between `t0` and `t1` (searching from `t0`)
/// where `kind` fails. Locus kinds also report the domain end when the
/// search reaches it.
pub fn next_discontinuity<C: Curve + ?Sized>(
    curve: &C,
    kind: Continuity,
    t0: f64,
    t1: f64,
    tolerance: &ContinuityTolerance,
) -> Option<f64> {
    if t0 == t1 {
        return None;
    }
    let (lo, hi) = (t0.min(t1), t0.max(t1));
    let mut candidates: Vec<f64> = curve
        .discontinuity_candidates(kind.order())
        .into_iter()
        .filter(|&c| c > lo && c < hi)
        .collect();
    candidates.sort_by(f64::total_cmp);
    candidates.dedup();
    if t0 > t1 {
        candidates.reverse();
    }

    if let Some(t) = candidates
        .into_iter()
        .find(|&c| !is_continuous(curve, kind, c, tolerance))
    {
        trace!(t, ?kind, "discontinuity");
        return Some(t);
    }

    let end = curve.domain().t1();
    if kind.is_locus() && t0 < end && t1 >= end && !is_continuous(curve, kind, end, tolerance) {
        return Some(end);
    }
    None
}

fn compare(
    below: &[curvekit_math::Vector3],
    above: &[curvekit_math::Vector3],
    kind: Continuity,
    tolerance: &ContinuityTolerance,
) -> bool {
    if (below[0] - above[0]).length() > tolerance.point {
        return false;
    }
    match kind {
        Continuity::C0 | Continuity::C0Locus => true,
        Continuity::C1 | Continuity::C1Locus => vectors_match(below[1], above[1], tolerance.d1),
        Continuity::C2 | Continuity::C2Locus => {
            vectors_match(below[1], above[1], tolerance.d1)
                && vectors_match(below[2], above[2], tolerance.d2)
        }
        Continuity::G1 | Continuity::G1Locus => tangents_match(below[1], above[1], tolerance),
        Continuity::G2 | Continuity::G2Locus => {
            tangents_match(below[1], above[1], tolerance)
                && match (
                    curvature_vector(below[1], below[2]),
                    curvature_vector(above[1], above[2]),
                ) {
                    (Some(kb), Some(ka)) => {
                        let scale = kb.length().max(ka.length()).max(1.0);
                        (kb - ka).length() <= tolerance.curvature * scale
                    }
                    _ => false,
                }
        }
    }
}

/// Derivative vectors agree to `tolerance`, relative to their size once
/// they exceed unit length.
fn vectors_match(a: curvekit_math::Vector3, b: curvekit_math::Vector3, tolerance: f64) -> bool {
    let scale = a.length().max(b.length()).max(1.0);
    (a - b).length() <= tolerance * scale
}

fn tangents_match(
    a: curvekit_math::Vector3,
    b: curvekit_math::Vector3,
    tolerance: &ContinuityTolerance,
) -> bool {
    match (unit_tangent(a), unit_tangent(b)) {
        (Some(ta), Some(tb)) => ta.dot(tb) >= tolerance.cos_angle,
        _ => false,
    }
}
