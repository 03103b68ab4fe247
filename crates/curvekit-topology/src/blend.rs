//! Bezier connectors between curve ends.

use curvekit_core::tolerance::ZERO_TOLERANCE;
use curvekit_core::Result;
use curvekit_geometry::{AnyCurve, BezierCurve, Curve, EvalSide};
use curvekit_math::{Point3, Vector3};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlendContinuity {
    /// Straight connector.
    Position,
    /// Cubic matching the end tangents.
    Tangency,
    /// Quintic matching end tangents and curvature vectors.
    Curvature,
}

/// Where a connector attaches: position, unit direction of travel and
/// curvature vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendEnd {
    pub point: Point3,
    pub tangent: Vector3,
    pub curvature: Vector3,
}

impl BlendEnd {
    /// The end of `curve` as seen by something continuing past it.
    pub fn at_end<C: Curve + ?Sized>(curve: &C) -> Option<Self> {
        Self::at(curve, curve.domain().t1(), EvalSide::Below)
    }

    /// The start of `curve` as seen by something arriving at it.
    pub fn at_start<C: Curve + ?Sized>(curve: &C) -> Option<Self> {
        Self::at(curve, curve.domain().t0(), EvalSide::Above)
    }

    fn at<C: Curve + ?Sized>(curve: &C, t: f64, side: EvalSide) -> Option<Self> {
        let d = curve.derivatives_at_side(t, 2, side);
        let tangent = d[1].try_normalize()?;
        let len2 = d[1].length_squared();
        Some(Self {
            point: d[0],
            tangent,
            curvature: d[1].cross(d[2]).cross(d[1]) / (len2 * len2),
        })
    }

    /// The same end traversed the other way.
    pub fn reversed(self) -> Self {
        Self {
            tangent: -self.tangent,
            ..self
        }
    }
}

/// Connector leaving `from` and arriving at `to`.
///
/// `None` when the two points coincide.
pub fn blend_ends(
    from: &BlendEnd,
    to: &BlendEnd,
    continuity: BlendContinuity,
) -> Result<Option<BezierCurve>> {
    let (a, b) = (from.point, to.point);
    let chord = (b - a).length();
    if chord <= ZERO_TOLERANCE {
        return Ok(None);
    }
    let points = match continuity {
        BlendContinuity::Position => vec![a, b],
        BlendContinuity::Tangency => {
            let h = chord / 3.0;
            vec![a, a + from.tangent * h, b - to.tangent * h, b]
        }
        BlendContinuity::Curvature => {
            // C'(0) = 5h T and the normal part of C''(0) = 25 h^2 K.
            let h = chord / 5.0;
            let k = 1.25 * h * h;
            vec![
                a,
                a + from.tangent * h,
                a + from.tangent * (2.0 * h) + from.curvature * k,
                b - to.tangent * (2.0 * h) + to.curvature * k,
                b - to.tangent * h,
                b,
            ]
        }
    };
    BezierCurve::new(points).map(Some)
}

/// Connector from the end of `first` to the start of `second`.
///
/// `None` when either end has no tangent or the ends coincide.
pub fn blend_curves(
    first: &AnyCurve,
    second: &AnyCurve,
    continuity: BlendContinuity,
) -> Result<Option<BezierCurve>> {
    let (Some(from), Some(to)) = (BlendEnd::at_end(first), BlendEnd::at_start(second)) else {
        return Ok(None);
    };
    blend_ends(&from, &to, continuity)
}

/// Cubic of roughly `length` that continues past `end` with matching
/// tangent and curvature.
pub fn curvature_extension(end: &BlendEnd, length: f64) -> Result<BezierCurve> {
    // C'(0) = 3h T and the normal part of C''(0) = 9 h^2 K.
    let h = length / 3.0;
    let p1 = end.point + end.tangent * h;
    let p2 = p1 + end.tangent * h + end.curvature * (1.5 * h * h);
    let out = (p2 - p1).try_normalize().unwrap_or(end.tangent);
    BezierCurve::new(vec![end.point, p1, p2, p2 + out * h])
}

/// Cubic from `end` to `target` matching tangent and curvature at `end`.
pub fn curvature_connector(end: &BlendEnd, target: Point3) -> Result<Option<BezierCurve>> {
    let chord = (target - end.point).length();
    if chord <= ZERO_TOLERANCE {
        return Ok(None);
    }
    let h = chord / 3.0;
    let p1 = end.point + end.tangent * h;
    let p2 = p1 + end.tangent * h + end.curvature * (1.5 * h * h);
    BezierCurve::new(vec![end.point, p1, p2, target]).map(Some)
}
