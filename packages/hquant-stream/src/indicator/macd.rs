//! MACD
//!
//! MACD line = EMA(fast) - EMA(slow); signal = EMA(signal) of the MACD line,
//! seeded once the line itself is available; histogram = line - signal.
//! One indicator tracks one of the three lines.

use super::ema::EmaState;
use super::{check_period, Indicator, IndicatorValue, Series};
use crate::error::Result;
use crate::{Bar, Field};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum MacdLine {
    #[default]
    Macd = 0,
    Signal = 1,
    Histogram = 2,
}

impl MacdLine {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(MacdLine::Macd),
            1 => Some(MacdLine::Signal),
            2 => Some(MacdLine::Histogram),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MacdLine::Macd => "macd",
            MacdLine::Signal => "signal",
            MacdLine::Histogram => "histogram",
        }
    }
}

fn warmup_of(fast: usize, slow: usize, signal: usize, line: MacdLine) -> usize {
    let macd = fast.max(slow);
    match line {
        MacdLine::Macd => macd,
        MacdLine::Signal | MacdLine::Histogram => macd + signal - 1,
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct MacdState {
    fast: EmaState,
    slow: EmaState,
    signal: EmaState,
}

impl MacdState {
    fn line(&self) -> f64 {
        self.fast.value - self.slow.value
    }
}

#[derive(Debug, Clone)]
pub struct Macd {
    name: String,
    field: Field,
    periods: [usize; 3],
    alphas: [f64; 3],
    line: MacdLine,
    state: MacdState,
    prev: MacdState,
    series: Series,
}

impl Macd {
    pub fn new(field: Field, fast: usize, slow: usize, signal: usize, line: MacdLine) -> Result<Self> {
        check_period(fast, 1)?;
        check_period(slow, 1)?;
        check_period(signal, 1)?;
        let alpha = |p: usize| 2.0 / (p as f64 + 1.0);
        let warmup = warmup_of(fast, slow, signal, line);
        Ok(Self {
            name: format!("MACD_{fast}_{slow}_{signal}_{}", line.as_str()),
            field,
            periods: [fast, slow, signal],
            alphas: [alpha(fast), alpha(slow), alpha(signal)],
            line,
            state: MacdState::default(),
            prev: MacdState::default(),
            series: Series::new(warmup * 2, warmup),
        })
    }

    fn step(&self, x: f64) -> MacdState {
        let [fast_p, slow_p, signal_p] = self.periods;
        let [fast_a, slow_a, signal_a] = self.alphas;
        let mut next = MacdState {
            fast: self.prev.fast.step(x, fast_p, fast_a),
            slow: self.prev.slow.step(x, slow_p, slow_a),
            signal: self.prev.signal,
        };
        let line = next.line();
        if !line.is_nan() {
            next.signal = self.prev.signal.step(line, signal_p, signal_a);
        }
        next
    }

    fn output(&self) -> f64 {
        let line = self.state.line();
        match self.line {
            MacdLine::Macd => line,
            MacdLine::Signal => self.state.signal.value,
            MacdLine::Histogram => line - self.state.signal.value,
        }
    }
}

impl Indicator for Macd {
    fn name(&self) -> &str {
        &self.name
    }

    fn warmup(&self) -> usize {
        let [fast, slow, signal] = self.periods;
        warmup_of(fast, slow, signal, self.line)
    }

    fn set_max_history_length(&mut self, n: usize) {
        self.series.resize(n);
    }

    fn add(&mut self, bar: &Bar) {
        self.prev = self.state;
        self.state = self.step(bar.field(self.field));
        self.series.push(self.output());
    }

    fn update_last(&mut self, bar: &Bar) {
        if self.series.is_empty() {
            return;
        }
        self.state = self.step(bar.field(self.field));
        self.series.update_last(self.output());
    }

    fn get_value(&self, index: usize) -> Result<IndicatorValue> {
        self.series.get(index)
    }

    fn len(&self) -> usize {
        self.series.len()
    }
}
