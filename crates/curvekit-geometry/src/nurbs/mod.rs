//! NURBS core algorithms: knot vector utilities and De Boor evaluation.

pub mod deboor;
pub mod knot;

pub use deboor::{curve_derivatives, curve_point, insert_knot};
pub use knot::{basis_functions, ders_basis_functions, find_span, find_span_side};
