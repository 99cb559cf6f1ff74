use crate::circular::{Ring, SlicePair};
use crate::error::{HqError, Result};
use crate::{Bar, Field};
use tracing::{trace, warn};

/// Ring metadata, enough for a consumer to rebuild slice boundaries itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(C)]
pub struct StoreMeta {
    pub capacity: usize,
    pub head: usize,
    pub count: usize,
    pub generation: u64,
}

/// Columnar (SoA) ring-buffer of OHLCV(+buy_volume) bars.
///
/// Every column is a boxed slice allocated once at construction, so column base
/// addresses never move for the lifetime of the store. Logical index 0 is the
/// oldest retained bar, `len() - 1` the newest.
#[derive(Debug, Clone)]
pub struct ColumnStore {
    ring: Ring,
    ts: Box<[i64]>,
    fields: [Box<[f64]>; 6],
    generation: u64,
}

impl ColumnStore {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(HqError::CapacityInvalid);
        }
        let column = || vec![0.0f64; capacity].into_boxed_slice();
        Ok(Self {
            ring: Ring::new(capacity),
            ts: vec![0i64; capacity].into_boxed_slice(),
            fields: [column(), column(), column(), column(), column(), column()],
            generation: 0,
        })
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.ring.is_full()
    }

    /// Next physical write position.
    #[inline]
    pub fn head(&self) -> usize {
        self.ring.head()
    }

    /// Number of successful mutations so far.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn meta(&self) -> StoreMeta {
        StoreMeta {
            capacity: self.capacity(),
            head: self.head(),
            count: self.len(),
            generation: self.generation,
        }
    }

    /// Appends a bar, evicting the oldest one when full.
    ///
    /// All columns are written at `head` before the ring advances, so the new bar
    /// only becomes part of the logical window once it is complete.
    pub fn push(&mut self, bar: Bar) -> Result<()> {
        self.validate(&bar, self.last().map(|b| b.timestamp))?;
        let idx = self.ring.head();
        self.write_at(idx, &bar);
        self.ring.advance();
        self.generation += 1;
        trace!(ts = bar.timestamp, len = self.len(), "bar pushed");
        Ok(())
    }

    /// Overwrites the newest bar in place and returns the bar it replaced.
    pub fn amend_last(&mut self, bar: Bar) -> Result<Bar> {
        let idx = self.ring.last_physical().ok_or(HqError::EmptyBufferAmend)?;
        let prev_ts = self
            .len()
            .checked_sub(2)
            .map(|i| self.ts[self.ring.physical(i)]);
        self.validate(&bar, prev_ts)?;
        let old = self.bar_at(idx);
        self.write_at(idx, &bar);
        self.generation += 1;
        trace!(ts = bar.timestamp, "last bar amended");
        Ok(old)
    }

    fn validate(&self, bar: &Bar, min_ts: Option<i64>) -> Result<()> {
        if let Some(field) = bar.first_non_finite() {
            warn!(ts = bar.timestamp, %field, "rejecting bar with non-finite field");
            return Err(HqError::NonFinite { field });
        }
        if let Some(last) = min_ts {
            if bar.timestamp < last {
                warn!(last, got = bar.timestamp, "rejecting out-of-order bar");
                return Err(HqError::OutOfOrder {
                    last,
                    got: bar.timestamp,
                });
            }
        }
        Ok(())
    }

    #[inline]
    fn write_at(&mut self, idx: usize, bar: &Bar) {
        self.ts[idx] = bar.timestamp;
        for field in Field::ALL {
            self.fields[field as usize][idx] = bar.field(field);
        }
    }

    #[inline]
    fn bar_at(&self, idx: usize) -> Bar {
        let col = |f: Field| self.fields[f as usize][idx];
        Bar {
            timestamp: self.ts[idx],
            open: col(Field::Open),
            high: col(Field::High),
            low: col(Field::Low),
            close: col(Field::Close),
            volume: col(Field::Volume),
            buy_volume: col(Field::BuyVolume),
        }
    }

    pub fn get(&self, i: usize) -> Result<Bar> {
        if i >= self.len() {
            return Err(HqError::out_of_range(i, self.len()));
        }
        Ok(self.bar_at(self.ring.physical(i)))
    }

    #[inline]
    pub fn last(&self) -> Option<Bar> {
        self.ring.last_physical().map(|idx| self.bar_at(idx))
    }

    pub fn value(&self, field: Field, i: usize) -> Result<f64> {
        if i >= self.len() {
            return Err(HqError::out_of_range(i, self.len()));
        }
        Ok(self.fields[field as usize][self.ring.physical(i)])
    }

    /// Chronological close prices as at most two borrowed regions.
    pub fn close_ordered_slices(&self) -> SlicePair<'_, f64> {
        self.ordered_slices(Field::Close)
    }

    pub fn ordered_slices(&self, field: Field) -> SlicePair<'_, f64> {
        SlicePair::new(&self.fields[field as usize], &self.ring)
    }

    pub fn timestamp_slices(&self) -> SlicePair<'_, i64> {
        SlicePair::new(&self.ts, &self.ring)
    }

    pub fn iter(&self) -> impl Iterator<Item = Bar> + '_ {
        (0..self.len()).map(move |i| self.bar_at(self.ring.physical(i)))
    }

    /// Copies one column out in chronological order.
    pub fn to_vec_ordered(&self, field: Field) -> Vec<f64> {
        self.ordered_slices(field).to_vec()
    }

    pub(crate) fn ring(&self) -> &Ring {
        &self.ring
    }

    /// Whole backing array of one column, in physical order.
    pub(crate) fn raw_field(&self, field: Field) -> &[f64] {
        &self.fields[field as usize]
    }

    pub(crate) fn raw_timestamps(&self) -> &[i64] {
        &self.ts
    }
}
