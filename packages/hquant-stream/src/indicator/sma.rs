//! 移动平均线 (SMA)
//!
//! Mean of the raw inputs held in the window.

use super::{check_period, Indicator, IndicatorValue, Series, Window};
use crate::error::Result;
use crate::{Bar, Field};

#[derive(Debug, Clone)]
pub struct Sma {
    name: String,
    field: Field,
    period: usize,
    window: Window,
    series: Series,
}

impl Sma {
    pub fn new(field: Field, period: usize) -> Result<Self> {
        check_period(period, 1)?;
        Ok(Self {
            name: format!("SMA_{period}"),
            field,
            period,
            window: Window::new(period),
            series: Series::new(period * 2, period),
        })
    }

    /// SMA over close prices.
    pub fn close(period: usize) -> Result<Self> {
        Self::new(Field::Close, period)
    }

    fn output(&self) -> f64 {
        if self.window.is_full() {
            self.window.sum() / self.period as f64
        } else {
            f64::NAN
        }
    }
}

impl Indicator for Sma {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicator::test_util::closes;

    #[test]
    fn two_period_average() {
        let mut ma = Sma::close(2).unwrap();
        for bar in closes(&[10.0, 20.0, 30.0]) {
            ma.add(&bar);
        }
        assert!(!ma.get_value(0).unwrap().available);
        assert_eq!(ma.get_value(1).unwrap(), IndicatorValue::ready(15.0));
        assert_eq!(ma.get_value(2).unwrap(), IndicatorValue::ready(25.0));
    }

    #[test]
    fn window_slides() {
        let mut ma = Sma::close(3).unwrap();
        for bar in closes(&[1.0, 2.0, 3.0, 4.0, 5.0]) {
            ma.add(&bar);
        }
        // SMA(3) of [3, 4, 5] = 4.0
        assert!((ma.last_value().unwrap().value - 4.0).abs() < 1e-10);
    }

    #[test]
    fn huge_value_leaving_the_window_leaves_no_residue() {
        let mut ma = Sma::close(2).unwrap();
        for bar in closes(&[1e16, 1.0, 1.0, 1.0]) {
            ma.add(&bar);
        }
        assert_eq!(ma.get_value(2).unwrap(), IndicatorValue::ready(1.0));
        assert_eq!(ma.get_value(3).unwrap(), IndicatorValue::ready(1.0));
    }

    #[test]
    fn update_last_replaces_newest_input() {
        let mut ma = Sma::close(3).unwrap();
        for bar in closes(&[10.0, 20.0, 30.0]) {
            ma.add(&bar);
        }
        assert_eq!(ma.last_value().unwrap().value, 20.0);

        let mut bar = closes(&[60.0])[0];
        bar.timestamp = 2000;
        ma.update_last(&bar); // 30 -> 60
        assert_eq!(ma.last_value().unwrap().value, 30.0); // (10+20+60)/3

        // The amended value, not the original, leaves the window later.
        for bar in closes(&[0.0, 0.0, 0.0]).iter().take(2) {
            ma.add(bar);
        }
        assert_eq!(ma.last_value().unwrap().value, 20.0); // (60+0+0)/3
    }

    #[test]
    fn other_fields() {
        let mut ma = Sma::new(Field::Volume, 2).unwrap();
        for bar in closes(&[1.0, 2.0]) {
            ma.add(&bar);
        }
        assert_eq!(ma.last_value().unwrap().value, 100.0);
    }
}
