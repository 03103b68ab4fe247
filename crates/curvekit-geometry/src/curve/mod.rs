//! Curve traits and implementations.

mod any;
mod bezier;
mod nurbs;
mod polycurve;

use curvekit_core::tolerance::ZERO_TOLERANCE;
use curvekit_core::ContinuityTolerance;
use curvekit_math::{Interval, Plane, Point3, Point4, Vector3};

pub use any::AnyCurve;
pub use bezier::BezierCurve;
pub use nurbs::NurbsCurve;
pub use polycurve::PolyCurve;

use crate::continuity::{self, Continuity};
use crate::evaluate;
use crate::length::{self, ArcLength, LengthCache};

/// Which one-sided limit to take when evaluating at a span boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EvalSide {
    /// Limit from above, except at the end of the domain.
    #[default]
    Default,
    /// Limit from smaller parameters.
    Below,
    /// Limit from larger parameters.
    Above,
}

/// Trait for parametric curves in 3D space.
///
/// Implementations must be safe to evaluate from many threads at once;
/// the only interior state is the memoized length.
pub trait Curve: Send + Sync {
    /// Increasing parameter domain.
    fn domain(&self) -> Interval;

    /// Number of meaningful coordinates (1 to 3).
    fn dimension(&self) -> u32;

    fn is_rational(&self) -> bool;

    fn is_periodic(&self) -> bool {
        false
    }

    /// Whether the curve ends meet.
    fn is_closed(&self) -> bool;

    /// Position and derivatives `[C, C', ..., C^(order)]` at `t`.
    ///
    /// Parameters outside the domain extend the end spans, except on
    /// periodic curves where they wrap.
    fn derivatives_at_side(&self, t: f64, order: usize, side: EvalSide) -> Vec<Vector3>;

    /// Increasing parameters bounding the smooth spans, domain ends included.
    fn span_vector(&self) -> Vec<f64>;

    /// Interior parameters where continuity of the given derivative order
    /// might fail. Everything else is smooth.
    fn discontinuity_candidates(&self, order: usize) -> Vec<f64> {
        let _ = order;
        let spans = self.span_vector();
        if spans.len() <= 2 {
            return Vec::new();
        }
        spans[1..spans.len() - 1].to_vec()
    }

    fn length_cache(&self) -> &LengthCache;

    fn derivatives_at(&self, t: f64, order: usize) -> Vec<Vector3> {
        self.derivatives_at_side(t, order, EvalSide::Default)
    }

    fn point_at(&self, t: f64) -> Point3 {
        self.derivatives_at(t, 0)[0]
    }

    fn start_point(&self) -> Point3 {
        self.point_at(self.domain().t0())
    }

    fn end_point(&self) -> Point3 {
        self.point_at(self.domain().t1())
    }

    fn span_count(&self) -> usize {
        self.span_vector().len().saturating_sub(1)
    }

    /// Unit tangent, or `None` where the first derivative vanishes.
    fn tangent_at(&self, t: f64) -> Option<Vector3> {
        evaluate::unit_tangent(self.derivatives_at(t, 1)[1])
    }

    /// Curvature vector `K` with `|K| = 1 / radius`.
    fn curvature_at(&self, t: f64) -> Option<Vector3> {
        let d = self.derivatives_at(t, 2);
        evaluate::curvature_vector(d[1], d[2])
    }

    fn torsion_at(&self, t: f64) -> Option<f64> {
        let d = self.derivatives_at(t, 3);
        evaluate::torsion(d[1], d[2], d[3])
    }

    /// Frenet frame: x = tangent, y = principal normal, normal = binormal.
    fn frame_at(&self, t: f64) -> Option<Plane> {
        evaluate::frenet_frame(&self.derivatives_at(t, 2))
    }

    fn is_continuous(&self, kind: Continuity, t: f64, tolerance: &ContinuityTolerance) -> bool {
        continuity::is_continuous(self, kind, t, tolerance)
    }

    fn next_discontinuity(
        &self,
        kind: Continuity,
        t0: f64,
        t1: f64,
        tolerance: &ContinuityTolerance,
    ) -> Option<f64> {
        continuity::next_discontinuity(self, kind, t0, t1, tolerance)
    }

    /// Arc length over `subdomain` (the whole domain when `None`).
    fn length(&self, subdomain: Option<Interval>, fractional_tolerance: f64) -> ArcLength {
        length::length(self, subdomain, fractional_tolerance)
    }

    fn normalized_length_parameter(
        &self,
        s: f64,
        fractional_tolerance: f64,
        subdomain: Option<Interval>,
    ) -> Option<f64> {
        length::normalized_length_parameter(self, s, fractional_tolerance, subdomain)
    }
}

/// Closed when the end control points coincide and the hull is not a
/// single point.
pub(crate) fn hull_is_closed(points: &[Point3]) -> bool {
    let (Some(&first), Some(&last)) = (points.first(), points.last()) else {
        return false;
    };
    points.len() >= 3
        && (first - last).length() <= ZERO_TOLERANCE
        && points.iter().any(|p| (*p - first).length() > ZERO_TOLERANCE)
}

/// Smallest dimension that still holds every control point.
pub(crate) fn occupied_dimension(points: &[Point4], current: u32) -> u32 {
    let needs_z = points.iter().any(|p| p.z != 0.0);
    let needs_y = points.iter().any(|p| p.y != 0.0);
    let required = if needs_z {
        3
    } else if needs_y {
        2
    } else {
        1
    };
    current.max(required)
}

/// Zero every coordinate at or beyond `dimension`.
pub(crate) fn flatten_to_dimension(points: &mut [Point4], dimension: u32) {
    for p in points {
        if dimension < 3 {
            p.z = 0.0;
        }
        if dimension < 2 {
            p.y = 0.0;
        }
    }
}
