//! 周期聚合
//!
//! Folds lower-period bars (or tick-like snapshots) into fixed-length period
//! bars. A bar's `timestamp` is its open time in milliseconds. The aggregate of
//! a bucket is stamped with the bucket's open time and merges as
//! high = max, low = min, close = latest, volume / buy_volume = sum.
//!
//! [`BarAggregator::feed`] drives a [`BarEngine`]: the first input of a bucket
//! pushes a new bar, every further input amends it.

use crate::engine::BarEngine;
use crate::error::{HqError, Result};
use crate::Bar;
use core::fmt;
use core::str::FromStr;
use tracing::trace;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Period {
    ms: i64,
}

impl fmt::Debug for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Period({}ms)", self.ms)
    }
}

impl Period {
    pub fn from_ms(ms: i64) -> Result<Self> {
        if ms <= 0 {
            return Err(HqError::InvalidParameter(format!(
                "period must be > 0 ms, got {ms}"
            )));
        }
        Ok(Self { ms })
    }

    pub fn as_ms(&self) -> i64 {
        self.ms
    }

    /// `<n><unit>` with unit one of `ms`, `s`, `m`, `h`, `d` (e.g. `15m`, `4h`).
    pub fn parse(s: &str) -> Result<Self> {
        let invalid = |why: &str| HqError::InvalidParameter(format!("period {s:?}: {why}"));
        let s = s.trim();
        let digits_end = s
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(s.len());
        if digits_end == 0 {
            return Err(invalid("missing number"));
        }
        let n: i64 = s[..digits_end].parse().map_err(|_| invalid("invalid number"))?;
        let unit_ms: i64 = match s[digits_end..].trim().to_ascii_lowercase().as_str() {
            "ms" => 1,
            "s" => 1_000,
            "m" => 60_000,
            "h" => 3_600_000,
            "d" => 86_400_000,
            _ => return Err(invalid("unsupported unit (use ms/s/m/h/d)")),
        };
        let ms = n.checked_mul(unit_ms).ok_or_else(|| invalid("too long"))?;
        Self::from_ms(ms)
    }

    /// Open time of the bucket containing `ts_ms` (floor, also for negative
    /// timestamps).
    #[inline]
    pub fn bucket_start(&self, ts_ms: i64) -> i64 {
        ts_ms.div_euclid(self.ms).saturating_mul(self.ms)
    }
}

impl FromStr for Period {
    type Err = HqError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Outcome of folding one input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregateStep {
    /// The previous bucket, if this input opened a new one.
    pub closed: Option<Bar>,
    /// The in-progress aggregate after this input.
    pub current: Bar,
}

#[derive(Debug, Clone)]
pub struct BarAggregator {
    period: Period,
    current: Option<Bar>,
    last_ts: Option<i64>,
}

impl BarAggregator {
    pub fn new(period: Period) -> Self {
        Self {
            period,
            current: None,
            last_ts: None,
        }
    }

    pub fn period(&self) -> Period {
        self.period
    }

    /// The in-progress aggregate, if any.
    pub fn current(&self) -> Option<&Bar> {
        self.current.as_ref()
    }

    /// Computes the step for `bar` without changing any state.
    /// Returns the step and whether a new aggregate starts with it.
    fn plan(&self, bar: &Bar) -> Result<(AggregateStep, bool)> {
        if let Some(field) = bar.first_non_finite() {
            return Err(HqError::NonFinite { field });
        }
        if let Some(last) = self.last_ts {
            if bar.timestamp < last {
                return Err(HqError::OutOfOrder {
                    last,
                    got: bar.timestamp,
                });
            }
        }
        let open_time = self.period.bucket_start(bar.timestamp);
        let opened = Bar {
            timestamp: open_time,
            ..*bar
        };
        Ok(match self.current {
            None => (
                AggregateStep {
                    closed: None,
                    current: opened,
                },
                true,
            ),
            Some(cur) if cur.timestamp == open_time => (
                AggregateStep {
                    closed: None,
                    current: Bar {
                        high: cur.high.max(bar.high),
                        low: cur.low.min(bar.low),
                        close: bar.close,
                        volume: cur.volume + bar.volume,
                        buy_volume: cur.buy_volume + bar.buy_volume,
                        ..cur
                    },
                },
                false,
            ),
            Some(cur) => (
                AggregateStep {
                    closed: Some(cur),
                    current: opened,
                },
                true,
            ),
        })
    }

    fn commit(&mut self, ts: i64, step: &AggregateStep) {
        if let Some(closed) = step.closed {
            trace!(open_time = closed.timestamp, period_ms = self.period.ms, "period bar closed");
        }
        self.current = Some(step.current);
        self.last_ts = Some(ts);
    }

    /// Folds `bar` in. Rejected inputs leave the aggregator unchanged.
    pub fn fold(&mut self, bar: Bar) -> Result<AggregateStep> {
        let (step, _) = self.plan(&bar)?;
        self.commit(bar.timestamp, &step);
        Ok(step)
    }

    /// Folds `bar` in and mirrors the aggregate into `engine`: a new bucket is
    /// pushed, an update of the current one amends the last engine bar. If the
    /// engine rejects the bar neither side changes.
    pub fn feed(&mut self, engine: &mut BarEngine, bar: Bar) -> Result<AggregateStep> {
        let (step, new_bucket) = self.plan(&bar)?;
        if new_bucket {
            engine.push(step.current)?;
        } else {
            engine.amend_last(step.current)?;
        }
        self.commit(bar.timestamp, &step);
        Ok(step)
    }

    /// Closes the in-progress aggregate. The next input starts a new one even
    /// if it falls into the same bucket.
    pub fn flush(&mut self) -> Option<Bar> {
        self.current.take()
    }
}
