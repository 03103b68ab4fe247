//! Arc length by adaptive Gauss–Kronrod quadrature, and its inverse.
//!
//! Each smooth span is integrated separately with the 7/15 point pair and
//! bisected until the Kronrod/Gauss difference meets the requested
//! fractional tolerance. Inversion brackets the span holding the target
//! length, seeds linearly and refines with a safeguarded Newton iteration.

use std::sync::OnceLock;

use curvekit_core::tolerance::{is_valid_double, DEFAULT_FRACTIONAL_TOLERANCE, ZERO_TOLERANCE};
use curvekit_core::{KernelError, Result};
use curvekit_math::Interval;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::curve::Curve;

/// Bisection depth cap for the adaptive quadrature.
pub const MAX_DEPTH: u32 = 24;

/// Iteration cap for length inversion.
pub const MAX_INVERSION_ITERATIONS: usize = 64;

// Kronrod abscissae on [-1, 1]; odd entries are the Gauss-7 nodes.
const XGK: [f64; 8] = [
    0.991_455_371_120_812_6,
    0.949_107_912_342_758_5,
    0.864_864_423_359_769_1,
    0.741_531_185_599_394_4,
    0.586_087_235_467_691_1,
    0.405_845_151_377_397_2,
    0.207_784_955_007_898_5,
    0.0,
];

const WGK: [f64; 8] = [
    0.022_935_322_010_529_22,
    0.063_092_092_629_978_55,
    0.104_790_010_322_250_2,
    0.140_653_259_715_525_9,
    0.169_004_726_639_267_9,
    0.190_350_578_064_785_4,
    0.204_432_940_075_298_9,
    0.209_482_141_084_727_8,
];

const WG: [f64; 4] = [
    0.129_484_966_168_869_7,
    0.279_705_391_489_276_7,
    0.381_830_050_505_118_9,
    0.417_959_183_673_469_4,
];

/// Result of a length computation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArcLength {
    pub value: f64,
    /// `false` when the bisection cap was hit somewhere.
    pub converged: bool,
}

impl ArcLength {
    const ZERO: Self = Self {
        value: 0.0,
        converged: true,
    };
}

#[derive(Debug, Clone, Copy)]
struct CachedLength {
    tolerance: f64,
    length: ArcLength,
}

/// Memoized whole-domain length.
///
/// Set at most once per shape; mutators replace it with an empty cache.
/// Two caches always compare equal so curve equality stays structural.
#[derive(Debug, Default)]
pub struct LengthCache(OnceLock<CachedLength>);

impl LengthCache {
    pub fn invalidate(&mut self) {
        self.0.take();
    }

    /// Cached value when it was computed at least as tightly as
    /// `tolerance`, otherwise `compute()`. Only converged results are kept.
    fn get_or_compute(&self, tolerance: f64, compute: impl FnOnce() -> ArcLength) -> ArcLength {
        if let Some(cached) = self.0.get() {
            if cached.tolerance <= tolerance {
                return cached.length;
            }
        }
        let length = compute();
        if length.converged {
            let _ = self.0.set(CachedLength { tolerance, length });
        }
        length
    }
}

impl Clone for LengthCache {
    fn clone(&self) -> Self {
        match self.0.get() {
            Some(&cached) => Self(OnceLock::from(cached)),
            None => Self::default(),
        }
    }
}

impl PartialEq for LengthCache {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

/// Length over `subdomain`, or the whole domain when `None`.
///
/// The subdomain is made increasing and clipped to the domain; a subdomain
/// missing the domain entirely has length zero.
pub fn length<C: Curve + ?Sized>(
    curve: &C,
    subdomain: Option<Interval>,
    fractional_tolerance: f64,
) -> ArcLength {
    let tol = fractional(fractional_tolerance);
    let domain = curve.domain();
    match resolve(domain, subdomain) {
        None => ArcLength::ZERO,
        Some(sub) if sub == domain => curve
            .length_cache()
            .get_or_compute(tol, || total(&Spans::measure(curve, sub, tol))),
        Some(sub) => total(&Spans::measure(curve, sub, tol)),
    }
}

/// Parameter `t` with `length(t0..t) = s * length(subdomain)`.
///
/// `None` when `s` is outside `[0, 1]`, the length is zero or did not
/// converge, or the iteration fails.
pub fn normalized_length_parameter<C: Curve + ?Sized>(
    curve: &C,
    s: f64,
    fractional_tolerance: f64,
    subdomain: Option<Interval>,
) -> Option<f64> {
    let inverter = Inverter::new(curve, fractional_tolerance, subdomain)?;
    inverter.solve(s, inverter.spans.sub.t0())
}

/// Parameters for several normalized lengths, in order.
///
/// The `s` values must be non-decreasing; each inversion starts from the
/// previous result.
pub fn normalized_length_parameters<C: Curve + ?Sized>(
    curve: &C,
    s: &[f64],
    fractional_tolerance: f64,
    subdomain: Option<Interval>,
) -> Result<Option<Vec<f64>>> {
    if let Some(i) = s.windows(2).position(|w| w[1] < w[0]) {
        return Err(KernelError::NonIncreasing { index: i + 1 });
    }
    let Some(inverter) = Inverter::new(curve, fractional_tolerance, subdomain) else {
        return Ok(None);
    };
    let mut lower = inverter.spans.sub.t0();
    let mut params = Vec::with_capacity(s.len());
    for &si in s {
        let Some(t) = inverter.solve(si, lower) else {
            return Ok(None);
        };
        params.push(t);
        lower = t;
    }
    Ok(Some(params))
}

/// Parameter at absolute arc length `len` from the start of the domain.
pub fn length_parameter<C: Curve + ?Sized>(
    curve: &C,
    len: f64,
    fractional_tolerance: f64,
) -> Option<f64> {
    let total = length(curve, None, fractional_tolerance);
    if !total.converged || total.value <= 0.0 {
        return None;
    }
    normalized_length_parameter(curve, len / total.value, fractional_tolerance, None)
}

/// `count + 1` parameters splitting the curve into `count` pieces of equal
/// length, or the `count - 1` interior ones without the ends.
pub fn divide_by_count<C: Curve + ?Sized>(
    curve: &C,
    count: usize,
    include_ends: bool,
    fractional_tolerance: f64,
) -> Result<Option<Vec<f64>>> {
    if count == 0 {
        return Err(KernelError::InvalidOperation(
            "cannot divide a curve into zero pieces".into(),
        ));
    }
    let range = if include_ends { 0..=count } else { 1..=count - 1 };
    let s: Vec<f64> = range.map(|i| i as f64 / count as f64).collect();
    divide(curve, &s, fractional_tolerance)
}

/// Parameters spaced `segment_length` apart along the curve.
///
/// With `include_ends` the domain start and end are added; the end is not
/// repeated when the last division lands on it.
pub fn divide_by_length<C: Curve + ?Sized>(
    curve: &C,
    segment_length: f64,
    include_ends: bool,
    fractional_tolerance: f64,
) -> Result<Option<Vec<f64>>> {
    if !(segment_length > 0.0 && segment_length.is_finite()) {
        return Err(KernelError::InvalidOperation(format!(
            "segment length {segment_length} must be positive"
        )));
    }
    let tol = fractional(fractional_tolerance);
    let total = length(curve, None, tol);
    if !total.converged || total.value <= 0.0 {
        return Ok(None);
    }

    let step = segment_length / total.value;
    let mut s: Vec<f64> = Vec::new();
    if include_ends {
        s.push(0.0);
    }
    let mut k = 1usize;
    while (k as f64) * step < 1.0 - tol {
        s.push(k as f64 * step);
        k += 1;
    }
    if include_ends {
        s.push(1.0);
    }
    divide(curve, &s, tol)
}

fn divide<C: Curve + ?Sized>(curve: &C, s: &[f64], tol: f64) -> Result<Option<Vec<f64>>> {
    let Some(params) = normalized_length_parameters(curve, s, tol, None)? else {
        return Ok(None);
    };
    if params.windows(2).any(|w| w[1] <= w[0]) {
        debug!("division collapsed on a zero-speed stretch");
        return Ok(None);
    }
    Ok(Some(params))
}

fn fractional(tolerance: f64) -> f64 {
    if tolerance > 0.0 && is_valid_double(tolerance) {
        tolerance
    } else {
        DEFAULT_FRACTIONAL_TOLERANCE
    }
}

fn resolve(domain: Interval, subdomain: Option<Interval>) -> Option<Interval> {
    match subdomain {
        None => Some(domain),
        Some(sub) => {
            let sub = sub.make_increasing();
            if sub.is_singleton() {
                return None;
            }
            domain.intersection(sub).filter(|i| !i.is_singleton())
        }
    }
}

fn total(spans: &Spans) -> ArcLength {
    ArcLength {
        value: spans.lengths.iter().sum(),
        converged: spans.converged,
    }
}

/// Smooth pieces of a subdomain with their lengths.
struct Spans {
    sub: Interval,
    breaks: Vec<f64>,
    lengths: Vec<f64>,
    converged: bool,
}

impl Spans {
    fn measure<C: Curve + ?Sized>(curve: &C, sub: Interval, tol: f64) -> Self {
        let mut breaks = vec![sub.t0()];
        breaks.extend(
            curve
                .span_vector()
                .into_iter()
                .filter(|&t| t > sub.t0() && t < sub.t1()),
        );
        breaks.push(sub.t1());

        let mut converged = true;
        let lengths = breaks
            .windows(2)
            .map(|w| {
                let (value, ok) = integrate(curve, w[0], w[1], tol);
                converged &= ok;
                value
            })
            .collect();
        if !converged {
            warn!(t0 = sub.t0(), t1 = sub.t1(), "arc length did not converge");
        }
        Self {
            sub,
            breaks,
            lengths,
            converged,
        }
    }
}

struct Inverter<'a, C: ?Sized> {
    curve: &'a C,
    tol: f64,
    spans: Spans,
    total: f64,
}

impl<'a, C: Curve + ?Sized> Inverter<'a, C> {
    fn new(curve: &'a C, fractional_tolerance: f64, subdomain: Option<Interval>) -> Option<Self> {
        let tol = fractional(fractional_tolerance);
        let sub = resolve(curve.domain(), subdomain)?;
        let spans = Spans::measure(curve, sub, tol);
        let total: f64 = spans.lengths.iter().sum();
        if !spans.converged || total <= 0.0 {
            debug!(total, "length inversion on a degenerate curve");
            return None;
        }
        Some(Self {
            curve,
            tol,
            spans,
            total,
        })
    }

    /// Solve for `s` without going below the parameter `lower`.
    fn solve(&self, s: f64, lower: f64) -> Option<f64> {
        if !(0.0..=1.0).contains(&s) {
            return None;
        }
        let sub = self.spans.sub;
        if s == 0.0 {
            return Some(sub.t0().max(lower));
        }
        if s == 1.0 {
            return Some(sub.t1());
        }

        let target = s * self.total;
        let mut acc = 0.0;
        for (i, &len) in self.spans.lengths.iter().enumerate() {
            let (a, b) = (self.spans.breaks[i], self.spans.breaks[i + 1]);
            if acc + len >= target || i + 1 == self.spans.lengths.len() {
                if b < lower {
                    acc += len;
                    continue;
                }
                return self.newton(a, b, len, acc, target, lower);
            }
            acc += len;
        }
        None
    }

    /// Newton on the span `[a, b]` of length `len`, whose start lies at arc
    /// length `acc`, with a bisection fallback.
    fn newton(&self, a: f64, b: f64, len: f64, acc: f64, target: f64, lower: f64) -> Option<f64> {
        let (mut lo, mut hi) = (a.max(lower), b);
        let mut t = if len > 0.0 {
            a + (target - acc) / len * (b - a)
        } else {
            0.5 * (a + b)
        };
        t = t.clamp(lo, hi);
        let (mut t_known, mut s_known) = (a, acc);
        let threshold = self.tol * self.total;

        for _ in 0..MAX_INVERSION_ITERATIONS {
            let (piece, _) = integrate(self.curve, t_known.min(t), t_known.max(t), self.tol);
            let s_t = if t >= t_known { s_known + piece } else { s_known - piece };
            (t_known, s_known) = (t, s_t);

            let f = s_t - target;
            if f.abs() <= threshold {
                return Some(t);
            }
            if f > 0.0 {
                hi = t;
            } else {
                lo = t;
            }
            if hi - lo <= ZERO_TOLERANCE * (b - a) {
                return Some(t);
            }

            let speed = self.curve.derivatives_at(t, 1)[1].length();
            let step = t - f / speed;
            t = if speed > ZERO_TOLERANCE && step > lo && step < hi {
                step
            } else {
                0.5 * (lo + hi)
            };
        }
        debug!(target, "length inversion did not converge");
        None
    }
}

/// Length of `[a, b]` and whether the bisection cap was respected.
fn integrate<C: Curve + ?Sized>(curve: &C, a: f64, b: f64, tol: f64) -> (f64, bool) {
    if b <= a {
        return (0.0, true);
    }
    let (kronrod, gauss) = gauss_kronrod(curve, a, b);
    let eps = tol * kronrod.abs();
    adapt(curve, a, b, kronrod, gauss, eps, 0)
}

fn adapt<C: Curve + ?Sized>(
    curve: &C,
    a: f64,
    b: f64,
    kronrod: f64,
    gauss: f64,
    eps: f64,
    depth: u32,
) -> (f64, bool) {
    if (kronrod - gauss).abs() <= eps {
        return (kronrod, true);
    }
    if depth >= MAX_DEPTH {
        return (kronrod, false);
    }
    let mid = 0.5 * (a + b);
    let (kl, gl) = gauss_kronrod(curve, a, mid);
    let (kr, gr) = gauss_kronrod(curve, mid, b);
    let (left, lok) = adapt(curve, a, mid, kl, gl, 0.5 * eps, depth + 1);
    let (right, rok) = adapt(curve, mid, b, kr, gr, 0.5 * eps, depth + 1);
    (left + right, lok && rok)
}

/// Kronrod-15 and embedded Gauss-7 estimates of the speed integral.
fn gauss_kronrod<C: Curve + ?Sized>(curve: &C, a: f64, b: f64) -> (f64, f64) {
    let center = 0.5 * (a + b);
    let half = 0.5 * (b - a);
    let speed = |x: f64| curve.derivatives_at(center + half * x, 1)[1].length();

    let fc = speed(0.0);
    let mut kronrod = WGK[7] * fc;
    let mut gauss = WG[3] * fc;
    for (j, (&x, &w)) in XGK.iter().zip(&WGK).take(7).enumerate() {
        let pair = speed(-x) + speed(x);
        kronrod += w * pair;
        if j % 2 == 1 {
            gauss += WG[j / 2] * pair;
        }
    }
    (kronrod * half, gauss * half)
}
