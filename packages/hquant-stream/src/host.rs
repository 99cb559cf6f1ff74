//! Named collection of indicators fed by store events.

use crate::error::{HqError, Result};
use crate::indicator::{Indicator, IndicatorValue};
use crate::Bar;
use std::collections::HashMap;
use tracing::debug;

/// Stable handle of a registered indicator (1-based, registration order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct IndicatorId(pub u32);

struct Entry {
    name: String,
    indicator: Box<dyn Indicator>,
}

/// Owns registered indicators and fans out push / amend events in registration
/// order.
pub struct IndicatorHost {
    max_history: usize,
    entries: Vec<Entry>,
    by_name: HashMap<String, IndicatorId>,
}

impl core::fmt::Debug for IndicatorHost {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IndicatorHost")
            .field("max_history", &self.max_history)
            .field("indicators", &self.entries.len())
            .finish()
    }
}

impl IndicatorHost {
    pub fn new(max_history: usize) -> Self {
        Self {
            max_history: max_history.max(1),
            entries: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    /// Registers `indicator` under `name` and returns its id.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        mut indicator: Box<dyn Indicator>,
    ) -> Result<IndicatorId> {
        let name = name.into();
        self.check_name(&name)?;
        indicator.set_max_history_length(self.max_history);
        self.attach(name, indicator)
    }

    pub(crate) fn check_name(&self, name: &str) -> Result<()> {
        if self.by_name.contains_key(name) {
            return Err(HqError::DuplicateIndicator(name.to_string()));
        }
        Ok(())
    }

    /// Adds an indicator whose history is already sized (and possibly fed).
    pub(crate) fn attach(
        &mut self,
        name: String,
        indicator: Box<dyn Indicator>,
    ) -> Result<IndicatorId> {
        self.check_name(&name)?;
        let id = IndicatorId(self.entries.len() as u32 + 1);
        debug!(id = id.0, %name, kind = indicator.name(), "indicator registered");
        self.by_name.insert(name.clone(), id);
        self.entries.push(Entry { name, indicator });
        Ok(id)
    }

    pub fn id_of(&self, name: &str) -> Option<IndicatorId> {
        self.by_name.get(name).copied()
    }

    pub fn name_of(&self, id: IndicatorId) -> Option<&str> {
        self.entry(id).map(|e| e.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = IndicatorId> + '_ {
        (1..=self.entries.len() as u32).map(IndicatorId)
    }

    pub fn indicator(&self, id: IndicatorId) -> Result<&dyn Indicator> {
        self.entry(id)
            .map(|e| e.indicator.as_ref())
            .ok_or(HqError::UnknownIndicatorId(id.0))
    }

    pub fn on_push(&mut self, bar: &Bar) {
        for e in &mut self.entries {
            e.indicator.add(bar);
        }
    }

    pub fn on_amend(&mut self, bar: &Bar) {
        for e in &mut self.entries {
            e.indicator.update_last(bar);
        }
    }

    pub fn get_value(&self, id: IndicatorId, index: usize) -> Result<IndicatorValue> {
        self.indicator(id)?.get_value(index)
    }

    pub fn get_value_by_name(&self, name: &str, index: usize) -> Result<IndicatorValue> {
        let id = self
            .id_of(name)
            .ok_or_else(|| HqError::UnknownIndicatorName(name.to_string()))?;
        self.get_value(id, index)
    }

    /// Last value of every indicator, keyed by name.
    pub fn snapshot(&self) -> Vec<(&str, Option<IndicatorValue>)> {
        self.entries
            .iter()
            .map(|e| (e.name.as_str(), e.indicator.last_value()))
            .collect()
    }

    fn entry(&self, id: IndicatorId) -> Option<&Entry> {
        let idx = (id.0 as usize).checked_sub(1)?;
        self.entries.get(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicator::{Ema, Sma};
    use crate::Field;

    fn bar(ts: i64, close: f64) -> Bar {
        Bar::flat(ts, close, 1.0)
    }

    #[test]
    fn ids_follow_registration_order() {
        let mut host = IndicatorHost::new(8);
        let a = host
            .register("fast", Box::new(Sma::close(2).unwrap()))
            .unwrap();
        let b = host
            .register("slow", Box::new(Ema::new(Field::Close, 3).unwrap()))
            .unwrap();
        assert_eq!((a, b), (IndicatorId(1), IndicatorId(2)));
        assert_eq!(host.id_of("slow"), Some(b));
        assert_eq!(host.name_of(a), Some("fast"));
        assert_eq!(host.ids().collect::<Vec<_>>(), vec![a, b]);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut host = IndicatorHost::new(8);
        host.register("ma", Box::new(Sma::close(2).unwrap()))
            .unwrap();
        let err = host
            .register("ma", Box::new(Sma::close(3).unwrap()))
            .unwrap_err();
        assert_eq!(err, HqError::DuplicateIndicator("ma".into()));
        assert_eq!(host.len(), 1);
    }

    #[test]
    fn fans_out_push_and_amend() {
        let mut host = IndicatorHost::new(4);
        let id = host
            .register("ma", Box::new(Sma::close(2).unwrap()))
            .unwrap();
        host.on_push(&bar(1, 10.0));
        host.on_push(&bar(2, 20.0));
        assert_eq!(host.get_value(id, 1).unwrap(), IndicatorValue::ready(15.0));
        host.on_amend(&bar(2, 30.0));
        assert_eq!(
            host.get_value_by_name("ma", 1).unwrap(),
            IndicatorValue::ready(20.0)
        );
        assert!(!host.get_value(id, 0).unwrap().available);
    }

    #[test]
    fn unknown_lookups_fail() {
        let host = IndicatorHost::new(4);
        assert_eq!(
            host.get_value(IndicatorId(0), 0).unwrap_err(),
            HqError::UnknownIndicatorId(0)
        );
        assert_eq!(
            host.get_value(IndicatorId(3), 0).unwrap_err(),
            HqError::UnknownIndicatorId(3)
        );
        assert_eq!(
            host.get_value_by_name("nope", 0).unwrap_err(),
            HqError::UnknownIndicatorName("nope".into())
        );
    }
}
