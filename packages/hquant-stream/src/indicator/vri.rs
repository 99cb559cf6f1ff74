//! VRI (成交量比率指标)
//!
//! VRI = latest volume / mean of the other `period - 1` volumes in the window.

use super::{check_period, Indicator, IndicatorValue, Series, Window};
use crate::error::Result;
use crate::Bar;

#[derive(Debug, Clone)]
pub struct Vri {
    name: String,
    period: usize,
    window: Window,
    series: Series,
}

impl Vri {
    /// `period` counts the latest bar, so it must be at least 2.
    pub fn new(period: usize) -> Result<Self> {
        check_period(period, 2)?;
        Ok(Self {
            name: format!("VRI_{period}"),
            period,
            window: Window::new(period),
            series: Series::new(period * 2, period),
        })
    }

    fn output(&self) -> f64 {
        if !self.window.is_full() {
            return f64::NAN;
        }
        let latest = self.window.last().unwrap_or(0.0);
        let avg = self.window.sum_before_last() / (self.period - 1) as f64;
        if avg > 0.0 {
            latest / avg
        } else {
            0.0
        }
    }
}

impl Indicator for Vri {
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
        self.window.push(bar.volume);
        self.series.push(self.output());
    }

    fn update_last(&mut self, bar: &Bar) {
        if self.series.is_empty() {
            return;
        }
        self.window.replace_last(bar.volume);
        self.series.update_last(self.output());
    }

    fn get_value(&self, index: usize) -> Result<IndicatorValue> {
        self.series.get(index)
    }

    fn len(&self) -> usize {
        self.series.len()
    }
}
