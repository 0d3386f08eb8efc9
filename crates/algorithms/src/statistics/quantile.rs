//! Quantile estimation and quartile breakpoints
//!
//! Quantiles use linear interpolation between closest ranks: for `n` sorted
//! values and probability `p`, the estimate sits at fractional rank
//! `h = (n - 1) * p`, interpolated between `x[floor(h)]` and `x[floor(h) + 1]`.

use std::cmp::Ordering;
use std::fmt;

use geoproc_core::{Error, Result};

/// Percentiles of the four quartile breakpoints
pub const QUARTILE_PERCENTILES: [f64; 4] = [0.0, 25.0, 50.0, 75.0];

/// Which side of a breakpoint a value equal to it falls on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntervalClosure {
    /// Buckets are `[b_i, b_{i+1})`: a value equal to a breakpoint moves up.
    #[default]
    Left,
    /// Buckets are `(b_i, b_{i+1}]`: a value equal to a breakpoint stays below.
    Right,
}

/// Estimate quantile `p` (in `[0, 1]`) of an ascending, non-empty slice.
///
/// Returns `None` for an empty slice.
pub fn quantile(sorted: &[f64], p: f64) -> Option<f64> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    let h = (n - 1) as f64 * p.clamp(0.0, 1.0);
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    let frac = h - lo as f64;
    Some(sorted[lo] + frac * (sorted[hi] - sorted[lo]))
}

/// Quartile thresholds at the 0th, 25th, 50th and 75th percentiles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Breakpoints(pub [f64; 4]);

impl Breakpoints {
    pub fn values(&self) -> &[f64; 4] {
        &self.0
    }

    /// Bucket index in `0..=4`: the number of breakpoints the value lies
    /// at or above (`Left`), or strictly above (`Right`).
    pub fn bucket(&self, value: f64, closure: IntervalClosure) -> u8 {
        let count = match closure {
            IntervalClosure::Left => self.0.iter().filter(|&&b| value >= b).count(),
            IntervalClosure::Right => self.0.iter().filter(|&&b| value > b).count(),
        };
        count as u8
    }

    pub fn is_monotonic(&self) -> bool {
        self.0.windows(2).all(|w| w[0] <= w[1])
    }
}

impl fmt::Display for Breakpoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.0;
        write!(f, "[{}, {}, {}, {}]", a, b, c, d)
    }
}

/// Compute quartile breakpoints from unsorted values. NaN values are ignored.
pub fn quartile_breakpoints(values: impl IntoIterator<Item = f64>) -> Result<Breakpoints> {
    let mut sorted: Vec<f64> = values.into_iter().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return Err(Error::Data(
            "cannot compute quantiles of an empty sample".into(),
        ));
    }
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let mut out = [0.0; 4];
    for (slot, pct) in out.iter_mut().zip(QUARTILE_PERCENTILES) {
        // sorted is non-empty, so quantile always yields a value
        *slot = quantile(&sorted, pct / 100.0).unwrap_or(f64::NAN);
    }
    Ok(Breakpoints(out))
}
