//! Incremental indicators.
//!
//! Recursive variants (EMA, RSI, ATR, MACD) keep a copy of their accumulator
//! state from just before the most recent `add`; `update_last` re-applies the
//! same step to that copy with the amended bar. Window variants (SMA, StdDev,
//! BOLL, VRI) recompute from the raw inputs still in the window. Either way,
//! amending back to the original bar reproduces the original output bit for
//! bit, no matter how many amendments came in between.

mod atr;
mod boll;
mod ema;
mod macd;
mod rsi;
mod sma;
mod stddev;
mod vri;

pub use atr::Atr;
pub use boll::{Band, Boll};
pub use ema::Ema;
pub use macd::{Macd, MacdLine};
pub use rsi::Rsi;
pub use sma::Sma;
pub use stddev::StdDev;
pub use vri::Vri;

use crate::circular::CircularColumn;
use crate::error::{HqError, Result};
use crate::{Bar, Field};
use serde::{Deserialize, Serialize};

/// Value at one logical index plus its availability flag.
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct IndicatorValue {
    pub value: f64,
    pub available: bool,
}

impl IndicatorValue {
    pub fn ready(value: f64) -> Self {
        Self {
            value,
            available: true,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            value: f64::NAN,
            available: false,
        }
    }

    pub fn get(&self) -> Option<f64> {
        self.available.then_some(self.value)
    }
}

/// 指标接口
pub trait Indicator: Send + Sync {
    fn name(&self) -> &str;

    /// Observations needed before the first value is available.
    fn warmup(&self) -> usize;

    /// Sizes the output history; called once before the first `add`.
    fn set_max_history_length(&mut self, n: usize);

    /// Adds a new, final observation.
    fn add(&mut self, bar: &Bar);

    /// Replaces the effect of the most recent `add` with `bar`.
    fn update_last(&mut self, bar: &Bar);

    /// Value by logical index (0 = oldest retained).
    fn get_value(&self, index: usize) -> Result<IndicatorValue>;

    /// Number of retained output values.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn last_value(&self) -> Option<IndicatorValue> {
        let n = self.len().checked_sub(1)?;
        self.get_value(n).ok()
    }
}

/// Serializable description of an indicator variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IndicatorSpec {
    Sma {
        period: usize,
        #[serde(default)]
        field: Field,
    },
    Ema {
        period: usize,
        #[serde(default)]
        field: Field,
    },
    StdDev {
        period: usize,
        #[serde(default)]
        field: Field,
    },
    Rsi {
        period: usize,
    },
    Atr {
        period: usize,
    },
    Vri {
        period: usize,
    },
    Boll {
        period: usize,
        #[serde(default = "default_band_width")]
        k: f64,
        #[serde(default)]
        band: Band,
        #[serde(default)]
        field: Field,
    },
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
        #[serde(default)]
        line: MacdLine,
        #[serde(default)]
        field: Field,
    },
}

fn default_band_width() -> f64 {
    2.0
}

impl IndicatorSpec {
    pub fn build(&self) -> Result<Box<dyn Indicator>> {
        Ok(match *self {
            IndicatorSpec::Sma { period, field } => Box::new(Sma::new(field, period)?),
            IndicatorSpec::Ema { period, field } => Box::new(Ema::new(field, period)?),
            IndicatorSpec::StdDev { period, field } => Box::new(StdDev::new(field, period)?),
            IndicatorSpec::Rsi { period } => Box::new(Rsi::new(period)?),
            IndicatorSpec::Atr { period } => Box::new(Atr::new(period)?),
            IndicatorSpec::Vri { period } => Box::new(Vri::new(period)?),
            IndicatorSpec::Boll {
                period,
                k,
                band,
                field,
            } => Box::new(Boll::new(field, period, k, band)?),
            IndicatorSpec::Macd {
                fast,
                slow,
                signal,
                line,
                field,
            } => Box::new(Macd::new(field, fast, slow, signal, line)?),
        })
    }
}

pub(crate) fn check_period(period: usize, min: usize) -> Result<()> {
    if period < min {
        return Err(HqError::InvalidParameter(format!(
            "period must be >= {min}, got {period}"
        )));
    }
    Ok(())
}

/// Output history shared by all variants.
///
/// Tracks how many observations were ever added so availability can be derived
/// per logical index after old values have been evicted.
#[derive(Debug, Clone)]
pub(crate) struct Series {
    values: CircularColumn<f64>,
    warmup: usize,
    observed: u64,
}

impl Series {
    pub(crate) fn new(capacity: usize, warmup: usize) -> Self {
        Self {
            values: CircularColumn::new(capacity.max(1)),
            warmup,
            observed: 0,
        }
    }

    /// Drops any history and reallocates for `capacity` values.
    pub(crate) fn resize(&mut self, capacity: usize) {
        self.values = CircularColumn::new(capacity.max(1));
        self.observed = 0;
    }

    #[inline]
    pub(crate) fn push(&mut self, v: f64) {
        self.observed += 1;
        self.values.push(v);
    }

    #[inline]
    pub(crate) fn update_last(&mut self, v: f64) {
        self.values.update_last(v);
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn get(&self, i: usize) -> Result<IndicatorValue> {
        let v = self
            .values
            .get(i)
            .ok_or_else(|| HqError::out_of_range(i, self.len()))?;
        // 1-based ordinal of the observation behind logical index `i`.
        let ordinal = self.observed - self.len() as u64 + i as u64 + 1;
        if ordinal >= self.warmup as u64 {
            Ok(IndicatorValue::ready(v))
        } else {
            Ok(IndicatorValue::unavailable())
        }
    }
}

/// Fixed window of raw inputs.
///
/// Aggregates are recomputed from the retained values in chronological order,
/// so a large value leaving the window leaves no rounding residue behind and
/// the result depends only on the current window contents.
#[derive(Debug, Clone)]
pub(crate) struct Window {
    values: CircularColumn<f64>,
}

impl Window {
    pub(crate) fn new(period: usize) -> Self {
        Self {
            values: CircularColumn::new(period),
        }
    }

    #[inline]
    pub(crate) fn push(&mut self, v: f64) {
        self.values.push(v);
    }

    #[inline]
    pub(crate) fn replace_last(&mut self, v: f64) {
        self.values.update_last(v);
    }

    #[inline]
    pub(crate) fn is_full(&self) -> bool {
        self.values.is_full()
    }

    pub(crate) fn len(&self) -> usize {
        self.values.len()
    }

    pub(crate) fn last(&self) -> Option<f64> {
        self.values.last()
    }

    pub(crate) fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Sum of every value except the newest.
    pub(crate) fn sum_before_last(&self) -> f64 {
        self.values.iter().take(self.len().saturating_sub(1)).sum()
    }

    /// Mean and population standard deviation (two passes).
    pub(crate) fn mean_std(&self) -> (f64, f64) {
        let n = self.len() as f64;
        let mean = self.sum() / n;
        let var = self.values.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / n;
        (mean, var.sqrt())
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    use crate::Bar;

    pub fn closes(prices: &[f64]) -> Vec<Bar> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &p)| Bar::new(i as i64 * 1000, p, p + 1.0, p - 1.0, p, 100.0, 40.0))
            .collect()
    }

    pub fn values(ind: &dyn super::Indicator) -> Vec<super::IndicatorValue> {
        (0..ind.len()).map(|i| ind.get_value(i).unwrap()).collect()
    }

    /// Bitwise comparison that treats NaN == NaN.
    pub fn same_bits(a: &[super::IndicatorValue], b: &[super::IndicatorValue]) -> bool {
        a.len() == b.len()
            && a.iter()
                .zip(b)
                .all(|(x, y)| x.available == y.available && x.value.to_bits() == y.value.to_bits())
    }
}
