//! Closed sum of the curve representations.

use curvekit_core::traits::{BoundingBox, Validate};
use curvekit_core::{KernelError, Result};
use curvekit_math::{Aabb3, Interval, Point3, Transform, Vector3};
use serde::{Deserialize, Serialize};

use super::{BezierCurve, Curve, EvalSide, NurbsCurve, PolyCurve};
use crate::length::LengthCache;

/// Any curve the kernel knows about. Poly-curve segments are stored as
/// `AnyCurve`, so chains may nest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AnyCurve {
    Bezier(BezierCurve),
    Nurbs(NurbsCurve),
    Poly(PolyCurve),
}

macro_rules! dispatch {
    ($self:expr, $c:ident => $body:expr) => {
        match $self {
            AnyCurve::Bezier($c) => $body,
            AnyCurve::Nurbs($c) => $body,
            AnyCurve::Poly($c) => $body,
        }
    };
}

impl AnyCurve {
    /// Split at an interior parameter. Both pieces keep this curve's kind.
    pub fn split(&self, t: f64) -> Result<(AnyCurve, AnyCurve)> {
        Ok(match self {
            AnyCurve::Bezier(c) => {
                let (a, b) = c.split(t)?;
                (a.into(), b.into())
            }
            AnyCurve::Nurbs(c) => {
                let (a, b) = c.split(t)?;
                (a.into(), b.into())
            }
            AnyCurve::Poly(c) => {
                let (a, b) = c.split(t)?;
                (a.into(), b.into())
            }
        })
    }

    /// The piece over `subdomain`. The whole domain returns a copy.
    pub fn trim(&self, subdomain: Interval) -> Result<AnyCurve> {
        if subdomain == self.domain() {
            return Ok(self.clone());
        }
        Ok(match self {
            AnyCurve::Bezier(c) => c.trim(subdomain)?.into(),
            AnyCurve::Nurbs(c) => c.trim(subdomain)?.into(),
            AnyCurve::Poly(c) => c.trim(subdomain)?.into(),
        })
    }

    pub fn reverse(&mut self) {
        dispatch!(self, c => c.reverse())
    }

    /// Reparameterize affinely. Bezier curves live on `[0, 1]`, so they are
    /// converted to their NURBS form when another domain is requested.
    pub fn set_domain(&mut self, domain: Interval) -> Result<()> {
        match self {
            AnyCurve::Bezier(c) => {
                if domain == Interval::UNIT {
                    return Ok(());
                }
                let mut nurbs = c.to_nurbs();
                nurbs.set_domain(domain)?;
                *self = AnyCurve::Nurbs(nurbs);
                Ok(())
            }
            AnyCurve::Nurbs(c) => c.set_domain(domain),
            AnyCurve::Poly(c) => c.set_domain(domain),
        }
    }

    /// Single NURBS with the same shape and domain.
    pub fn to_nurbs(&self) -> Result<NurbsCurve> {
        match self {
            AnyCurve::Bezier(c) => Ok(c.to_nurbs()),
            AnyCurve::Nurbs(c) => Ok(c.clone()),
            AnyCurve::Poly(c) => c.to_nurbs(),
        }
    }

    pub fn change_dimension(&mut self, dimension: u32) -> Result<()> {
        dispatch!(self, c => c.change_dimension(dimension))
    }

    pub fn make_rational(&mut self) {
        dispatch!(self, c => c.make_rational())
    }

    pub fn transform(&mut self, xform: &Transform) {
        dispatch!(self, c => c.transform(xform))
    }

    pub fn set_start_point(&mut self, point: Point3) -> bool {
        dispatch!(self, c => c.set_start_point(point))
    }

    pub fn set_end_point(&mut self, point: Point3) -> bool {
        dispatch!(self, c => c.set_end_point(point))
    }

    /// Analytic continuation over a larger domain. Bezier curves are
    /// continued as NURBS; poly-curves extend their end segments.
    pub fn extend_domain(&self, domain: Interval) -> Result<AnyCurve> {
        match self {
            AnyCurve::Bezier(c) => {
                let mut nurbs = c.to_nurbs();
                nurbs = nurbs.extend_domain(domain)?;
                Ok(nurbs.into())
            }
            AnyCurve::Nurbs(c) => Ok(c.extend_domain(domain)?.into()),
            AnyCurve::Poly(c) => Ok(c.extend_domain(domain)?.into()),
        }
    }

    /// Euclidean control points in order; poly-curves concatenate segments.
    pub fn control_hull(&self) -> Vec<Point3> {
        match self {
            AnyCurve::Bezier(c) => c.euclidean_points(),
            AnyCurve::Nurbs(c) => c.euclidean_points(),
            AnyCurve::Poly(c) => c.segments().iter().flat_map(|s| s.control_hull()).collect(),
        }
    }

    /// Highest polynomial degree among the pieces.
    pub fn degree(&self) -> usize {
        match self {
            AnyCurve::Bezier(c) => c.degree(),
            AnyCurve::Nurbs(c) => c.degree(),
            AnyCurve::Poly(c) => c.segments().iter().map(|s| s.degree()).max().unwrap_or(1),
        }
    }

    pub fn as_poly(&self) -> Option<&PolyCurve> {
        match self {
            AnyCurve::Poly(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_nurbs(&self) -> Option<&NurbsCurve> {
        match self {
            AnyCurve::Nurbs(c) => Some(c),
            _ => None,
        }
    }
}

impl Curve for AnyCurve {
    fn domain(&self) -> Interval {
        dispatch!(self, c => c.domain())
    }

    fn dimension(&self) -> u32 {
        dispatch!(self, c => c.dimension())
    }

    fn is_rational(&self) -> bool {
        dispatch!(self, c => c.is_rational())
    }

    fn is_periodic(&self) -> bool {
        dispatch!(self, c => c.is_periodic())
    }

    fn is_closed(&self) -> bool {
        dispatch!(self, c => c.is_closed())
    }

    fn derivatives_at_side(&self, t: f64, order: usize, side: EvalSide) -> Vec<Vector3> {
        dispatch!(self, c => c.derivatives_at_side(t, order, side))
    }

    fn span_vector(&self) -> Vec<f64> {
        dispatch!(self, c => c.span_vector())
    }

    fn discontinuity_candidates(&self, order: usize) -> Vec<f64> {
        dispatch!(self, c => c.discontinuity_candidates(order))
    }

    fn length_cache(&self) -> &LengthCache {
        dispatch!(self, c => c.length_cache())
    }
}

impl Validate for AnyCurve {
    fn validate(&self) -> Result<()> {
        dispatch!(self, c => c.validate())
    }
}

impl BoundingBox for AnyCurve {
    type Box = Aabb3;

    fn bounding_box(&self) -> Aabb3 {
        dispatch!(self, c => c.bounding_box())
    }
}

impl From<BezierCurve> for AnyCurve {
    fn from(c: BezierCurve) -> Self {
        AnyCurve::Bezier(c)
    }
}

impl From<NurbsCurve> for AnyCurve {
    fn from(c: NurbsCurve) -> Self {
        AnyCurve::Nurbs(c)
    }
}

impl From<PolyCurve> for AnyCurve {
    fn from(c: PolyCurve) -> Self {
        AnyCurve::Poly(c)
    }
}

impl TryFrom<AnyCurve> for NurbsCurve {
    type Error = KernelError;

    fn try_from(c: AnyCurve) -> Result<Self> {
        match c {
            AnyCurve::Nurbs(n) => Ok(n),
            other => other.to_nurbs(),
        }
    }
}
