//! curvekit geometry: Bezier, NURBS and poly-curves.
//!
//! Curves share the [`Curve`] trait for evaluation, continuity and arc
//! length; [`AnyCurve`] is the closed set of representations that
//! poly-curves and the topology operations work with.

pub mod closest;
pub mod continuity;
pub mod curve;
pub mod evaluate;
pub mod fit;
pub mod length;
pub mod nurbs;
pub mod persist;
pub mod shape;
pub mod target;
pub mod tessellate;

pub use continuity::Continuity;
pub use curve::{AnyCurve, BezierCurve, Curve, EvalSide, NurbsCurve, PolyCurve};
pub use length::ArcLength;
pub use target::GeometryTarget;
