//! Engine configuration (JSON / environment).

use crate::error::{HqError, Result};
use crate::indicator::IndicatorSpec;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CAPACITY: usize = 1024;

/// Environment variable overriding [`EngineConfig::capacity`].
pub const CAPACITY_ENV: &str = "HQUANT_STREAM_CAPACITY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorConfig {
    pub name: String,
    #[serde(flatten)]
    pub spec: IndicatorSpec,
}

/// ```
/// use hquant_stream::config::EngineConfig;
///
/// let cfg = EngineConfig::from_json(r#"{
///     "capacity": 512,
///     "indicators": [
///         {"name": "ma20", "kind": "sma", "period": 20},
///         {"name": "rsi14", "kind": "rsi", "period": 14}
///     ]
/// }"#).unwrap();
/// assert_eq!(cfg.capacity, 512);
/// assert_eq!(cfg.indicators.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub capacity: usize,
    pub indicators: Vec<IndicatorConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            indicators: Vec::new(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Defaults, with the capacity taken from `HQUANT_STREAM_CAPACITY` if set.
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();
        if let Ok(raw) = std::env::var(CAPACITY_ENV) {
            cfg.capacity = parse_capacity(&raw)?;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(HqError::CapacityInvalid);
        }
        Ok(())
    }

    pub fn with_indicator(mut self, name: impl Into<String>, spec: IndicatorSpec) -> Self {
        self.indicators.push(IndicatorConfig {
            name: name.into(),
            spec,
        });
        self
    }
}

/// Negative and zero values are `CapacityInvalid`; anything that is not an
/// integer is a `Config` error.
fn parse_capacity(raw: &str) -> Result<usize> {
    let n: i64 = raw
        .trim()
        .parse()
        .map_err(|_| HqError::Config(format!("{CAPACITY_ENV}={raw:?} is not an integer")))?;
    usize::try_from(n)
        .ok()
        .filter(|&n| n > 0)
        .ok_or(HqError::CapacityInvalid)
}
