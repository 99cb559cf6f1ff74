//! Zero-copy export of the store's columns.
//!
//! Each column is described by at most two contiguous regions of its backing
//! array; reading `first` then `second` gives the chronological sequence.
//! Descriptors point straight into the store and stay valid only until the
//! next mutating call (`push`, `amend_last`) on that store.

use crate::circular::SlicePair;
use crate::store::{ColumnStore, StoreMeta};
use crate::{Column, Field};
use core::mem::size_of;
use core::ops::Range;

/// One contiguous region of a column's backing array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct Segment {
    /// First element of the region. Not meaningful when `len == 0`.
    pub ptr: *const u8,
    /// Element offset of the region inside the column array.
    pub offset: usize,
    /// Number of elements.
    pub len: usize,
    /// Element size in bytes.
    pub stride: usize,
}

impl Segment {
    pub const EMPTY: Segment = Segment {
        ptr: core::ptr::null(),
        offset: 0,
        len: 0,
        stride: 0,
    };

    fn of<T>(data: &[T], range: Range<usize>) -> Self {
        let region = &data[range.clone()];
        Self {
            ptr: region.as_ptr().cast(),
            offset: range.start,
            len: region.len(),
            stride: size_of::<T>(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// # Safety
    /// The descriptor must come from a live store of `T` elements that has not
    /// been mutated since it was taken.
    unsafe fn as_slice<'a, T>(&self) -> &'a [T] {
        if self.len == 0 || self.ptr.is_null() {
            return &[];
        }
        debug_assert_eq!(self.stride, size_of::<T>());
        core::slice::from_raw_parts(self.ptr.cast::<T>(), self.len)
    }
}

/// Both segments of one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct ColumnExport {
    pub column: Column,
    pub first: Segment,
    pub second: Segment,
}

impl ColumnExport {
    pub fn len(&self) -> usize {
        self.first.len + self.second.len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rebuilds the slices of a numeric column.
    ///
    /// # Safety
    /// `self.column` must not be `Column::Timestamp`, and the store the
    /// descriptor came from must be alive and unmutated for `'a`.
    pub unsafe fn as_f64_slices<'a>(&self) -> SlicePair<'a, f64> {
        debug_assert!(self.column != Column::Timestamp);
        SlicePair {
            first: self.first.as_slice(),
            second: self.second.as_slice(),
        }
    }

    /// Rebuilds the slices of the timestamp column.
    ///
    /// # Safety
    /// `self.column` must be `Column::Timestamp`, and the store the descriptor
    /// came from must be alive and unmutated for `'a`.
    pub unsafe fn as_i64_slices<'a>(&self) -> SlicePair<'a, i64> {
        debug_assert!(self.column == Column::Timestamp);
        SlicePair {
            first: self.first.as_slice(),
            second: self.second.as_slice(),
        }
    }
}

/// Everything a foreign reader needs: ring metadata plus every column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct ExportLayout {
    pub meta: StoreMeta,
    pub columns: [ColumnExport; Column::COUNT],
}

impl Default for ExportLayout {
    fn default() -> Self {
        let empty = |column| ColumnExport {
            column,
            first: Segment::EMPTY,
            second: Segment::EMPTY,
        };
        Self {
            meta: StoreMeta::default(),
            columns: Column::ALL.map(empty),
        }
    }
}

impl ExportLayout {
    pub fn column(&self, column: Column) -> &ColumnExport {
        &self.columns[column as usize]
    }
}

/// Borrowing view over a [`ColumnStore`]. The borrow keeps writers out for as
/// long as Rust code holds it.
#[derive(Debug, Clone, Copy)]
pub struct ZeroCopyExporter<'a> {
    store: &'a ColumnStore,
}

impl<'a> ZeroCopyExporter<'a> {
    pub fn new(store: &'a ColumnStore) -> Self {
        Self { store }
    }

    pub fn meta(&self) -> StoreMeta {
        self.store.meta()
    }

    pub fn slices_f64(&self, field: Field) -> SlicePair<'a, f64> {
        self.store.ordered_slices(field)
    }

    pub fn timestamps(&self) -> SlicePair<'a, i64> {
        self.store.timestamp_slices()
    }

    pub fn column(&self, column: Column) -> ColumnExport {
        let (a, b) = self.store.ring().segments();
        let (first, second) = match column.field() {
            None => {
                let ts = self.store.raw_timestamps();
                (Segment::of(ts, a), Segment::of(ts, b))
            }
            Some(field) => {
                let data = self.store.raw_field(field);
                (Segment::of(data, a), Segment::of(data, b))
            }
        };
        ColumnExport {
            column,
            first,
            second,
        }
    }

    pub fn export(&self) -> ExportLayout {
        ExportLayout {
            meta: self.meta(),
            columns: Column::ALL.map(|c| self.column(c)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Bar;

    fn filled(cap: usize, closes: &[f64]) -> ColumnStore {
        let mut s = ColumnStore::new(cap).unwrap();
        for (i, &c) in closes.iter().enumerate() {
            s.push(Bar::new(i as i64 * 60, c, c + 1.0, c - 1.0, c, 5.0, 2.0))
                .unwrap();
        }
        s
    }

    #[test]
    fn wrapped_column_has_two_segments() {
        let s = filled(3, &[10.0, 20.0, 30.0, 40.0]);
        let close = ZeroCopyExporter::new(&s).column(Column::Close);
        assert_eq!(close.first.offset, 1);
        assert_eq!(close.first.len, 2);
        assert_eq!(close.second.offset, 0);
        assert_eq!(close.second.len, 1);
        assert_eq!(close.first.stride, 8);
        let pair = unsafe { close.as_f64_slices() };
        assert_eq!(pair.to_vec(), vec![20.0, 30.0, 40.0]);
    }

    #[test]
    fn descriptors_point_into_the_store() {
        let s = filled(4, &[1.0, 2.0]);
        let exp = ZeroCopyExporter::new(&s);
        let layout = exp.export();
        assert_eq!(layout.meta, s.meta());
        let high = layout.column(Column::High);
        assert_eq!(high.first.ptr, s.raw_field(Field::High).as_ptr().cast::<u8>());
        assert!(high.second.is_empty());

        let ts = unsafe { layout.column(Column::Timestamp).as_i64_slices() };
        assert_eq!(ts.to_vec(), vec![0, 60]);
        assert_eq!(exp.slices_f64(Field::High).to_vec(), vec![2.0, 3.0]);
    }

    #[test]
    fn empty_store_exports_empty_segments() {
        let s = ColumnStore::new(2).unwrap();
        let layout = ZeroCopyExporter::new(&s).export();
        for col in layout.columns {
            assert!(col.is_empty());
        }
        let pair = unsafe { layout.column(Column::Open).as_f64_slices() };
        assert!(pair.is_empty());
    }

    #[test]
    fn every_column_shares_the_same_boundaries() {
        let s = filled(5, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        let layout = ZeroCopyExporter::new(&s).export();
        let (a, b) = (layout.columns[0].first, layout.columns[0].second);
        for col in &layout.columns[1..] {
            assert_eq!((col.first.offset, col.first.len), (a.offset, a.len));
            assert_eq!((col.second.offset, col.second.len), (b.offset, b.len));
        }
    }
}
