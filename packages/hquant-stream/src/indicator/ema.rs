//! 指数移动平均 (EMA)
//!
//! Seeded with the SMA of the first `period` inputs, then
//! `ema = prev + alpha * (x - prev)` with `alpha = 2 / (period + 1)`.

use super::{check_period, Indicator, IndicatorValue, Series};
use crate::error::Result;
use crate::{Bar, Field};

#[derive(Debug, Clone, Copy)]
pub(crate) struct EmaState {
    count: usize,
    seed_sum: f64,
    pub(crate) value: f64,
}

impl Default for EmaState {
    fn default() -> Self {
        Self {
            count: 0,
            seed_sum: 0.0,
            value: f64::NAN,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Ema {
    name: String,
    field: Field,
    period: usize,
    alpha: f64,
    state: EmaState,
    prev: EmaState,
    series: Series,
}

impl Ema {
    pub fn new(field: Field, period: usize) -> Result<Self> {
        check_period(period, 1)?;
        Ok(Self {
            name: format!("EMA_{period}"),
            field,
            period,
            alpha: 2.0 / (period as f64 + 1.0),
            state: EmaState::default(),
            prev: EmaState::default(),
            series: Series::new(period * 2, period),
        })
    }

    pub fn close(period: usize) -> Result<Self> {
        Self::new(Field::Close, period)
    }

    fn step(&self, x: f64) -> EmaState {
        self.prev.step(x, self.period, self.alpha)
    }
}

impl EmaState {
    /// Folds `x` in: NaN while seeding, the seed SMA at `period`, then smoothing.
    pub(crate) fn step(self, x: f64, period: usize, alpha: f64) -> EmaState {
        let count = self.count + 1;
        if count < period {
            EmaState {
                count,
                seed_sum: self.seed_sum + x,
                value: f64::NAN,
            }
        } else if count == period {
            let seed_sum = self.seed_sum + x;
            EmaState {
                count,
                seed_sum,
                value: seed_sum / period as f64,
            }
        } else {
            EmaState {
                count,
                seed_sum: self.seed_sum,
                value: self.value + alpha * (x - self.value),
            }
        }
    }
}

impl Indicator for Ema {
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
        self.state = self.step(bar.field(self.field));
        self.series.push(self.state.value);
    }

    fn update_last(&mut self, bar: &Bar) {
        if self.series.is_empty() {
            return;
        }
        self.state = self.step(bar.field(self.field));
        self.series.update_last(self.state.value);
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
    fn seeded_with_sma() {
        let mut ema = Ema::close(3).unwrap();
        for bar in closes(&[1.0, 2.0, 3.0, 4.0, 5.0]) {
            ema.add(&bar);
        }
        // seed = SMA(3) = 2.0, alpha = 0.5
        // EMA[3] = 2 + 0.5 * (4 - 2) = 3.0
        // EMA[4] = 3 + 0.5 * (5 - 3) = 4.0
        assert!(!ema.get_value(1).unwrap().available);
        assert_eq!(ema.get_value(2).unwrap().value, 2.0);
        assert_eq!(ema.get_value(3).unwrap().value, 3.0);
        assert_eq!(ema.get_value(4).unwrap().value, 4.0);
    }

    #[test]
    fn update_last_uses_previous_ema_not_the_amended_one() {
        let mut ema = Ema::close(3).unwrap();
        for bar in closes(&[1.0, 2.0, 3.0, 4.0]) {
            ema.add(&bar);
        }
        let mut bar = closes(&[8.0])[0];
        bar.timestamp = 3000;
        ema.update_last(&bar);
        // 2 + 0.5 * (8 - 2)
        assert_eq!(ema.last_value().unwrap().value, 5.0);
        ema.update_last(&bar);
        assert_eq!(ema.last_value().unwrap().value, 5.0);
    }

    #[test]
    fn period_one_tracks_input() {
        let mut ema = Ema::close(1).unwrap();
        for bar in closes(&[3.0, 7.0]) {
            ema.add(&bar);
        }
        assert_eq!(ema.get_value(0).unwrap(), IndicatorValue::ready(3.0));
        assert_eq!(ema.get_value(1).unwrap(), IndicatorValue::ready(7.0));
    }
}
