//! Scalar parameter ranges.

use std::fmt;

use curvekit_core::error::{KernelError, Result};
use curvekit_core::tolerance::{is_valid_double, UNSET_VALUE};
use serde::{Deserialize, Serialize};

/// A closed parameter range `[t0, t1]`.
///
/// The ends are kept in the order given: `t0 > t1` is a decreasing interval,
/// which callers use to request reversed evaluation. It is different from
/// [`Interval::UNSET`], whose ends are both the unset sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    t0: f64,
    t1: f64,
}

impl Interval {
    pub const UNSET: Interval = Interval {
        t0: UNSET_VALUE,
        t1: UNSET_VALUE,
    };

    pub const UNIT: Interval = Interval { t0: 0.0, t1: 1.0 };

    pub const fn new(t0: f64, t1: f64) -> Self {
        Self { t0, t1 }
    }

    /// Builds an interval that must be usable as a domain.
    pub fn checked(t0: f64, t1: f64) -> Result<Self> {
        let ival = Self::new(t0, t1);
        if ival.is_valid() {
            Ok(ival)
        } else {
            Err(KernelError::InvalidInterval { t0, t1 })
        }
    }

    pub fn t0(self) -> f64 {
        self.t0
    }

    pub fn t1(self) -> f64 {
        self.t1
    }

    pub fn min(self) -> f64 {
        self.t0.min(self.t1)
    }

    pub fn max(self) -> f64 {
        self.t0.max(self.t1)
    }

    pub fn mid(self) -> f64 {
        0.5 * (self.t0 + self.t1)
    }

    /// Signed length `t1 - t0`.
    pub fn length(self) -> f64 {
        self.t1 - self.t0
    }

    /// Both ends are finite and set.
    pub fn is_set(self) -> bool {
        is_valid_double(self.t0) && is_valid_double(self.t1)
    }

    /// Set and not a singleton: the requirement for a curve domain.
    pub fn is_valid(self) -> bool {
        self.is_set() && self.t0 != self.t1
    }

    pub fn is_singleton(self) -> bool {
        self.is_set() && self.t0 == self.t1
    }

    pub fn is_increasing(self) -> bool {
        self.is_set() && self.t0 < self.t1
    }

    pub fn is_decreasing(self) -> bool {
        self.is_set() && self.t0 > self.t1
    }

    /// Maps a normalized parameter (0 at `t0`, 1 at `t1`) into the interval.
    pub fn parameter_at(self, x: f64) -> f64 {
        if x == 0.0 {
            self.t0
        } else if x == 1.0 {
            self.t1
        } else {
            (1.0 - x) * self.t0 + x * self.t1
        }
    }

    /// Inverse of [`Interval::parameter_at`]. A singleton maps everything to 0.
    pub fn normalized_parameter_at(self, t: f64) -> f64 {
        let len = self.length();
        if len == 0.0 {
            0.0
        } else {
            (t - self.t0) / len
        }
    }

    /// True when `t` lies between the ends (exclusive when `strict`).
    pub fn includes(self, t: f64, strict: bool) -> bool {
        if !self.is_set() || !is_valid_double(t) {
            return false;
        }
        if strict {
            self.min() < t && t < self.max()
        } else {
            self.min() <= t && t <= self.max()
        }
    }

    pub fn includes_interval(self, other: Interval) -> bool {
        self.includes(other.t0, false) && self.includes(other.t1, false)
    }

    /// Clamps `t` to `[min, max]`.
    pub fn clamp(self, t: f64) -> f64 {
        t.clamp(self.min(), self.max())
    }

    /// The same range traversed the other way: `[t1, t0]`.
    pub fn reversed(self) -> Self {
        Self::new(self.t1, self.t0)
    }

    /// `[-t1, -t0]`, the domain of a reversed curve.
    pub fn negated(self) -> Self {
        Self::new(-self.t1, -self.t0)
    }

    pub fn make_increasing(self) -> Self {
        if self.is_decreasing() {
            self.reversed()
        } else {
            self
        }
    }

    /// Overlap of two intervals as an increasing interval.
    pub fn intersection(self, other: Interval) -> Option<Interval> {
        let lo = self.min().max(other.min());
        let hi = self.max().min(other.max());
        if lo <= hi {
            Some(Interval::new(lo, hi))
        } else {
            None
        }
    }

    /// Smallest increasing interval containing both.
    pub fn union(self, other: Interval) -> Interval {
        Interval::new(self.min().min(other.min()), self.max().max(other.max()))
    }
}

impl Default for Interval {
    fn default() -> Self {
        Self::UNSET
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.t0, self.t1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_differs_from_decreasing() {
        let dec = Interval::new(2.0, 1.0);
        assert!(dec.is_valid());
        assert!(dec.is_decreasing());
        assert!(!Interval::UNSET.is_set());
        assert!(!Interval::UNSET.is_valid());
        assert_ne!(dec, Interval::UNSET);
    }

    #[test]
    fn test_checked_rejects_singleton() {
        assert!(Interval::checked(1.0, 1.0).is_err());
        assert!(Interval::checked(f64::NAN, 1.0).is_err());
        assert!(Interval::checked(0.0, 3.0).is_ok());
    }

    #[test]
    fn test_parameter_round_trip() {
        let ival = Interval::new(2.0, 6.0);
        let t = ival.parameter_at(0.25);
        assert!((t - 3.0).abs() < 1e-12);
        assert!((ival.normalized_parameter_at(t) - 0.25).abs() < 1e-12);
        assert_eq!(ival.parameter_at(1.0), 6.0);
    }

    #[test]
    fn test_includes_strict() {
        let ival = Interval::new(0.0, 1.0);
        assert!(ival.includes(0.0, false));
        assert!(!ival.includes(0.0, true));
        assert!(ival.includes(0.5, true));
        assert!(Interval::new(1.0, 0.0).includes(0.5, true));
    }

    #[test]
    fn test_negated_twice_is_identity() {
        let ival = Interval::new(-1.0, 4.0);
        assert_eq!(ival.negated(), Interval::new(-4.0, 1.0));
        assert_eq!(ival.negated().negated(), ival);
    }

    #[test]
    fn test_intersection_and_union() {
        let a = Interval::new(0.0, 2.0);
        let b = Interval::new(3.0, 1.0);
        assert_eq!(a.intersection(b), Some(Interval::new(1.0, 2.0)));
        assert_eq!(a.union(b), Interval::new(0.0, 3.0));
        assert_eq!(a.intersection(Interval::new(5.0, 6.0)), None);
    }
}
