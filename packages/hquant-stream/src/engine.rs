use crate::config::EngineConfig;
use crate::error::Result;
use crate::export::ZeroCopyExporter;
use crate::host::{IndicatorHost, IndicatorId};
use crate::indicator::{Indicator, IndicatorSpec, IndicatorValue};
use crate::store::{ColumnStore, StoreMeta};
use crate::Bar;
use tracing::{debug, info};

/// Core runtime: columnar bars + indicators, driven by a single writer.
///
/// Every bar event is one step: the store is mutated first and indicators are
/// only notified if the store accepted the bar, so a rejected bar leaves both
/// untouched.
#[derive(Debug)]
pub struct BarEngine {
    store: ColumnStore,
    indicators: IndicatorHost,
}

impl BarEngine {
    pub fn new(capacity: usize) -> Result<Self> {
        let store = ColumnStore::new(capacity)?;
        Ok(Self {
            store,
            indicators: IndicatorHost::new(capacity),
        })
    }

    pub fn from_config(cfg: &EngineConfig) -> Result<Self> {
        cfg.validate()?;
        let mut engine = Self::new(cfg.capacity)?;
        for ic in &cfg.indicators {
            engine.add_indicator(ic.name.as_str(), &ic.spec)?;
        }
        info!(
            capacity = cfg.capacity,
            indicators = cfg.indicators.len(),
            "engine configured"
        );
        Ok(engine)
    }

    pub fn capacity(&self) -> usize {
        self.store.capacity()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn store(&self) -> &ColumnStore {
        &self.store
    }

    pub fn indicators(&self) -> &IndicatorHost {
        &self.indicators
    }

    pub fn add_indicator(&mut self, name: &str, spec: &IndicatorSpec) -> Result<IndicatorId> {
        let indicator = spec.build()?;
        self.register(name, indicator)
    }

    /// Registers an indicator. Bars already in the store are replayed into it
    /// so its logical indices line up with the store's.
    pub fn register(
        &mut self,
        name: &str,
        mut indicator: Box<dyn Indicator>,
    ) -> Result<IndicatorId> {
        self.indicators.check_name(name)?;
        indicator.set_max_history_length(self.indicators.max_history());
        if !self.store.is_empty() {
            debug!(name, bars = self.store.len(), "replaying history into new indicator");
            for bar in self.store.iter() {
                indicator.add(&bar);
            }
        }
        self.indicators.attach(name.to_string(), indicator)
    }

    pub fn push(&mut self, bar: Bar) -> Result<()> {
        self.store.push(bar)?;
        self.indicators.on_push(&bar);
        Ok(())
    }

    /// Replaces the newest bar (the still-forming one) and returns the old bar.
    pub fn amend_last(&mut self, bar: Bar) -> Result<Bar> {
        let old = self.store.amend_last(bar)?;
        self.indicators.on_amend(&bar);
        Ok(old)
    }

    /// Pushes `bars` in order and stops at the first rejected bar. Returns the
    /// number of bars accepted.
    pub fn load_history(&mut self, bars: &[Bar]) -> Result<usize> {
        for (n, bar) in bars.iter().enumerate() {
            if let Err(e) = self.push(*bar) {
                debug!(accepted = n, error = %e, "history load stopped");
                return Err(e);
            }
        }
        Ok(bars.len())
    }

    /// Parses a JSON array of bars (see [`crate::parse_bars_json`]) and loads it.
    pub fn load_json(&mut self, json: &str) -> Result<usize> {
        let bars = crate::parse_bars_json(json)?;
        self.load_history(&bars)
    }

    pub fn get(&self, index: usize) -> Result<Bar> {
        self.store.get(index)
    }

    pub fn last(&self) -> Option<Bar> {
        self.store.last()
    }

    pub fn get_value(&self, id: IndicatorId, index: usize) -> Result<IndicatorValue> {
        self.indicators.get_value(id, index)
    }

    pub fn last_value(&self, id: IndicatorId) -> Result<Option<IndicatorValue>> {
        Ok(self.indicators.indicator(id)?.last_value())
    }

    pub fn meta(&self) -> StoreMeta {
        self.store.meta()
    }

    pub fn generation(&self) -> u64 {
        self.store.generation()
    }

    pub fn exporter(&self) -> ZeroCopyExporter<'_> {
        ZeroCopyExporter::new(&self.store)
    }
}
