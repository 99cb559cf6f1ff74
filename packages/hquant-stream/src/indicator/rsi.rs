//! 相对强弱指数 (RSI)
//!
//! RSI = 100 - 100 / (1 + RS), RS = avg gain / avg loss, Wilder smoothing.
//! The first average is the plain mean of the first `period` close-to-close
//! changes, so the first value needs `period + 1` bars.

use super::{check_period, Indicator, IndicatorValue, Series};
use crate::error::Result;
use crate::Bar;

#[derive(Debug, Clone, Copy, Default)]
struct RsiState {
    count: usize,
    prev_close: f64,
    // Only needed during initialization (first `period` diffs).
    sum_gain: f64,
    sum_loss: f64,
    avg_gain: f64,
    avg_loss: f64,
}

#[derive(Debug, Clone)]
pub struct Rsi {
    name: String,
    period: usize,
    state: RsiState,
    prev: RsiState,
    series: Series,
}

impl Rsi {
    pub fn new(period: usize) -> Result<Self> {
        check_period(period, 1)?;
        Ok(Self {
            name: format!("RSI_{period}"),
            period,
            state: RsiState::default(),
            prev: RsiState::default(),
            series: Series::new(period * 2, period + 1),
        })
    }

    fn rsi_from(avg_gain: f64, avg_loss: f64) -> f64 {
        if avg_gain == 0.0 && avg_loss == 0.0 {
            return 50.0;
        }
        if avg_loss == 0.0 {
            return 100.0;
        }
        let rs = avg_gain / avg_loss;
        100.0 - (100.0 / (1.0 + rs))
    }

    fn step(&self, close: f64) -> RsiState {
        let prev = self.prev;
        let mut next = RsiState {
            count: prev.count + 1,
            prev_close: close,
            ..prev
        };
        if next.count == 1 {
            return next;
        }

        let change = close - prev.prev_close;
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);
        let p = self.period as f64;

        // n bars => n-1 diffs. We initialize at diff_count == period.
        let diff_count = next.count - 1;
        if diff_count <= self.period {
            next.sum_gain = prev.sum_gain + gain;
            next.sum_loss = prev.sum_loss + loss;
            if diff_count == self.period {
                next.avg_gain = next.sum_gain / p;
                next.avg_loss = next.sum_loss / p;
            }
        } else {
            next.avg_gain = (prev.avg_gain * (p - 1.0) + gain) / p;
            next.avg_loss = (prev.avg_loss * (p - 1.0) + loss) / p;
        }
        next
    }

    fn output(&self) -> f64 {
        if self.state.count > self.period {
            Self::rsi_from(self.state.avg_gain, self.state.avg_loss)
        } else {
            f64::NAN
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn warmup(&self) -> usize {
        self.period + 1
    }

    fn set_max_history_length(&mut self, n: usize) {
        self.series.resize(n);
    }

    fn add(&mut self, bar: &Bar) {
        self.prev = self.state;
        self.state = self.step(bar.close);
        self.series.push(self.output());
    }

    fn update_last(&mut self, bar: &Bar) {
        if self.series.is_empty() {
            return;
        }
        self.state = self.step(bar.close);
        self.series.update_last(self.output());
    }

    fn get_value(&self, index: usize) -> Result<IndicatorValue> {
        self.series.get(index)
    }

    fn len(&self) -> usize {
        self.series.len()
    }
}
