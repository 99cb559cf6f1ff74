//! 平均真实波幅 (ATR), Wilder smoothing.
//!
//! TR = max(high - low, |high - prev_close|, |low - prev_close|); the first bar
//! has no previous close and uses `high - low`.

use super::{check_period, Indicator, IndicatorValue, Series};
use crate::error::Result;
use crate::Bar;

#[derive(Debug, Clone, Copy, Default)]
struct AtrState {
    count: usize,
    prev_close: f64,
    tr_sum: f64,
    atr: f64,
}

#[derive(Debug, Clone)]
pub struct Atr {
    name: String,
    period: usize,
    state: AtrState,
    prev: AtrState,
    series: Series,
}

impl Atr {
    pub fn new(period: usize) -> Result<Self> {
        check_period(period, 1)?;
        Ok(Self {
            name: format!("ATR_{period}"),
            period,
            state: AtrState::default(),
            prev: AtrState::default(),
            series: Series::new(period * 2, period),
        })
    }

    fn true_range(bar: &Bar, prev_close: Option<f64>) -> f64 {
        let hl = bar.high - bar.low;
        match prev_close {
            None => hl,
            Some(pc) => hl.max((bar.high - pc).abs()).max((bar.low - pc).abs()),
        }
    }

    fn step(&self, bar: &Bar) -> AtrState {
        let prev = self.prev;
        let tr = Self::true_range(bar, (prev.count > 0).then_some(prev.prev_close));
        let count = prev.count + 1;
        let p = self.period as f64;
        let (tr_sum, atr) = if count < self.period {
            (prev.tr_sum + tr, f64::NAN)
        } else if count == self.period {
            let s = prev.tr_sum + tr;
            (s, s / p)
        } else {
            (prev.tr_sum, (prev.atr * (p - 1.0) + tr) / p)
        };
        AtrState {
            count,
            prev_close: bar.close,
            tr_sum,
            atr,
        }
    }
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn warmup(&self) -> usize {
        self.period
    }

    fn set_max_history_length(&mut self, n: usize) {
        self.series.resize(n);
    }

    fn add(&mut self, bar: &Bar) {
        self.prev = self.state;
        self.state = self.step(bar);
        self.series.push(self.state.atr);
    }

    fn update_last(&mut self, bar: &Bar) {
        if self.series.is_empty() {
            return;
        }
        self.state = self.step(bar);
        self.series.update_last(self.state.atr);
    }

    fn get_value(&self, index: usize) -> Result<IndicatorValue> {
        self.series.get(index)
    }

    fn len(&self) -> usize {
        self.series.len()
    }
}
