//! 布林带 (BOLL)
//!
//! Middle = SMA(period), upper / lower = middle ± k * population std of the same
//! window. One indicator tracks one band; register three to get all of them.

use super::{check_period, Indicator, IndicatorValue, Series, Window};
use crate::error::{HqError, Result};
use crate::{Bar, Field};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Band {
    Upper = 0,
    #[default]
    Middle = 1,
    Lower = 2,
}

impl Band {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Band::Upper),
            1 => Some(Band::Middle),
            2 => Some(Band::Lower),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Band::Upper => "upper",
            Band::Middle => "middle",
            Band::Lower => "lower",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Boll {
    name: String,
    field: Field,
    period: usize,
    k: f64,
    band: Band,
    window: Window,
    series: Series,
}

impl Boll {
    pub fn new(field: Field, period: usize, k: f64, band: Band) -> Result<Self> {
        check_period(period, 1)?;
        if !k.is_finite() || k < 0.0 {
            return Err(HqError::InvalidParameter(format!(
                "band width k must be a finite non-negative number, got {k}"
            )));
        }
        Ok(Self {
            name: format!("BOLL_{period}_{}", band.as_str()),
            field,
            period,
            k,
            band,
            window: Window::new(period),
            series: Series::new(period * 2, period),
        })
    }

    fn output(&self) -> f64 {
        if !self.window.is_full() {
            return f64::NAN;
        }
        let (mid, std) = self.window.mean_std();
        match self.band {
            Band::Upper => mid + self.k * std,
            Band::Middle => mid,
            Band::Lower => mid - self.k * std,
        }
    }
}

impl Indicator for Boll {
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

    fn bands(period: usize, k: f64) -> [Boll; 3] {
        [Band::Upper, Band::Middle, Band::Lower]
            .map(|b| Boll::new(Field::Close, period, k, b).unwrap())
    }

    fn last_values(bs: &[Boll; 3]) -> [f64; 3] {
        let v = |i: usize| bs[i].last_value().unwrap().value;
        [v(0), v(1), v(2)]
    }

    #[test]
    fn boll_matches_sma_and_stddev() {
        let mut bs = bands(3, 2.0);
        let bars = closes(&[1.0, 2.0, 3.0]);
        for bar in &bars[..2] {
            bs.iter_mut().for_each(|b| b.add(bar));
        }
        assert!(bs.iter().all(|b| !b.last_value().unwrap().available));

        bs.iter_mut().for_each(|b| b.add(&bars[2]));
        let mid = 2.0;
        let std = (2.0f64 / 3.0).sqrt();
        let [up, m, lo] = last_values(&bs);
        assert!((m - mid).abs() < 1e-12);
        assert!((up - (mid + 2.0 * std)).abs() < 1e-12);
        assert!((lo - (mid - 2.0 * std)).abs() < 1e-12);

        // update_last recomputes every band from the amended close.
        let mut amended = closes(&[6.0])[0];
        amended.timestamp = bars[2].timestamp;
        bs.iter_mut().for_each(|b| b.update_last(&amended));
        let mid2: f64 = (1.0 + 2.0 + 6.0) / 3.0;
        let mean_sq: f64 = (1.0 + 4.0 + 36.0) / 3.0;
        let std2: f64 = (mean_sq - mid2 * mid2).sqrt();
        let [up, m, lo] = last_values(&bs);
        assert!((m - mid2).abs() < 1e-12);
        assert!((up - (mid2 + 2.0 * std2)).abs() < 1e-12);
        assert!((lo - (mid2 - 2.0 * std2)).abs() < 1e-12);
    }

    #[test]
    fn invalid_width_is_rejected() {
        for k in [-1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                Boll::new(Field::Close, 3, k, Band::Upper),
                Err(HqError::InvalidParameter(_))
            ));
        }
    }

    #[test]
    fn band_codes() {
        assert_eq!(Band::from_u8(2), Some(Band::Lower));
        assert_eq!(Band::from_u8(3), None);
        assert_eq!(Boll::new(Field::Close, 20, 2.0, Band::Upper).unwrap().name(), "BOLL_20_upper");
    }
}
