//! curvekit topology: operations that assemble new curves from existing
//! ones. Joining chains curves through shared end points; extension and
//! offset build on the blend connectors.

pub mod blend;
pub mod extend;
pub mod join;
pub mod offset;

pub use blend::{blend_curves, blend_ends, BlendContinuity, BlendEnd};
pub use extend::{extend, CurveEnd, ExtendTarget, ExtensionStyle};
pub use join::{join_curves, JoinGraph, JoinedCurve};
pub use offset::{offset, CornerStyle, EndStyle};
