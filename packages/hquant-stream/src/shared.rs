//! Thread-shareable engine handle.
//!
//! One writer at a time holds the exclusive lock for a whole push/amend step;
//! readers share the lock. The generation is also mirrored into an atomic that
//! is published before the write lock is released, so a reader holding an
//! exported view can check for an intervening mutation without locking.

use crate::engine::BarEngine;
use crate::error::Result;
use crate::host::IndicatorId;
use crate::indicator::{IndicatorSpec, IndicatorValue};
use crate::store::StoreMeta;
use crate::Bar;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

struct Inner {
    engine: RwLock<BarEngine>,
    generation: AtomicU64,
}

#[derive(Clone)]
pub struct SharedEngine {
    inner: Arc<Inner>,
}

impl core::fmt::Debug for SharedEngine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SharedEngine")
            .field("generation", &self.generation())
            .finish_non_exhaustive()
    }
}

impl SharedEngine {
    pub fn new(engine: BarEngine) -> Self {
        let generation = AtomicU64::new(engine.generation());
        Self {
            inner: Arc::new(Inner {
                engine: RwLock::new(engine),
                generation,
            }),
        }
    }

    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Ok(Self::new(BarEngine::new(capacity)?))
    }

    fn write<R>(&self, f: impl FnOnce(&mut BarEngine) -> Result<R>) -> Result<R> {
        let mut engine = self.inner.engine.write();
        let out = f(&mut engine);
        self.inner
            .generation
            .store(engine.generation(), Ordering::Release);
        out
    }

    pub fn push(&self, bar: Bar) -> Result<()> {
        self.write(|e| e.push(bar))
    }

    pub fn amend_last(&self, bar: Bar) -> Result<Bar> {
        self.write(|e| e.amend_last(bar))
    }

    pub fn add_indicator(&self, name: &str, spec: &IndicatorSpec) -> Result<IndicatorId> {
        self.write(|e| e.add_indicator(name, spec))
    }

    /// Runs `f` under the shared lock.
    pub fn read<R>(&self, f: impl FnOnce(&BarEngine) -> R) -> R {
        f(&self.inner.engine.read())
    }

    pub fn get(&self, index: usize) -> Result<Bar> {
        self.read(|e| e.get(index))
    }

    pub fn get_value(&self, id: IndicatorId, index: usize) -> Result<IndicatorValue> {
        self.read(|e| e.get_value(id, index))
    }

    pub fn meta(&self) -> StoreMeta {
        self.read(|e| e.meta())
    }

    /// Lock-free view of the store generation.
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::Acquire)
    }

    /// True when nothing was mutated since `generation` was observed.
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation() == generation
    }
}
