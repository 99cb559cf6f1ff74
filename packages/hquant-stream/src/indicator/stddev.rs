//! Population standard deviation over a rolling window.

use super::{check_period, Indicator, IndicatorValue, Series, Window};
use crate::error::Result;
use crate::{Bar, Field};

#[derive(Debug, Clone)]
pub struct StdDev {
    name: String,
    field: Field,
    period: usize,
    window: Window,
    series: Series,
}

impl StdDev {
    pub fn new(field: Field, period: usize) -> Result<Self> {
        check_period(period, 1)?;
        Ok(Self {
            name: format!("STDDEV_{period}"),
            field,
            period,
            window: Window::new(period),
            series: Series::new(period * 2, period),
        })
    }

    fn output(&self) -> f64 {
        if !self.window.is_full() {
            return f64::NAN;
        }
        self.window.mean_std().1
    }
}

impl Indicator for StdDev {
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
        self.window.push(bar.field(self.field));
        self.series.push(self.output());
    }

    fn update_last(&mut self, bar: &Bar) {
        if self.series.is_empty() {
            return;
        }
        self.window.replace_last(bar.field(self.field));
        self.series.update_last(self.output());
    }

    fn get_value(&self, index: usize) -> Result<IndicatorValue> {
        self.series.get(index)
    }

    fn len(&self) -> usize {
        self.series.len()
    }
}
