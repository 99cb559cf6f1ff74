use core::fmt;
use core::ops::Range;

/// Ring cursor: fixed capacity, current length and next write position.
///
/// Holds no data. A set of parallel arrays that share one cursor share one
/// physical indexing, which is what lets the store hand out per-column slices
/// with identical boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ring {
    capacity: usize,
    len: usize,
    head: usize, // next write index
}

impl Ring {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be > 0");
        Self {
            capacity,
            len: 0,
            head: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn head(&self) -> usize {
        self.head
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len == self.capacity
    }

    /// Physical index of the oldest element.
    #[inline]
    pub fn start(&self) -> usize {
        // Works for both partially-filled and full rings.
        (self.head + self.capacity - self.len) % self.capacity
    }

    /// Physical index of logical index `i` (0 = oldest). Caller checks `i < len`.
    #[inline]
    pub fn physical(&self, i: usize) -> usize {
        debug_assert!(i < self.len);
        (self.start() + i) % self.capacity
    }

    /// Physical index of the newest element.
    #[inline]
    pub fn last_physical(&self) -> Option<usize> {
        if self.len == 0 {
            return None;
        }
        Some((self.head + self.capacity - 1) % self.capacity)
    }

    /// Publishes the element just written at `head`.
    #[inline]
    pub fn advance(&mut self) {
        self.head = (self.head + 1) % self.capacity;
        if self.len < self.capacity {
            self.len += 1;
        }
    }

    /// Physical ranges whose concatenation is the chronological order.
    ///
    /// The second range is empty unless the retained window wraps past the end
    /// of the backing arrays.
    pub fn segments(&self) -> (Range<usize>, Range<usize>) {
        let oldest = self.start();
        if oldest + self.len <= self.capacity {
            (oldest..oldest + self.len, 0..0)
        } else {
            let first = self.capacity - oldest;
            (oldest..self.capacity, 0..self.len - first)
        }
    }
}

/// Two borrowed regions whose concatenation (`first` then `second`) is the
/// chronological sequence. Either region may be empty.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlicePair<'a, T> {
    pub first: &'a [T],
    pub second: &'a [T],
}

impl<'a, T: Copy> SlicePair<'a, T> {
    pub fn new(data: &'a [T], ring: &Ring) -> Self {
        let (a, b) = ring.segments();
        Self {
            first: &data[a],
            second: &data[b],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.first.len() + self.second.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_contiguous(&self) -> bool {
        self.second.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = T> + 'a {
        let (first, second) = (self.first, self.second);
        first.iter().chain(second.iter()).copied()
    }

    pub fn to_vec(&self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.len());
        out.extend_from_slice(self.first);
        out.extend_from_slice(self.second);
        out
    }
}

/// Fixed-capacity ring buffer (append-only, overwrite-oldest when full).
#[derive(Clone)]
pub struct CircularColumn<T: Copy + Default> {
    ring: Ring,
    data: Vec<T>,
}

impl<T: Copy + Default> fmt::Debug for CircularColumn<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircularColumn")
            .field("capacity", &self.ring.capacity())
            .field("len", &self.ring.len())
            .field("head", &self.ring.head())
            .finish_non_exhaustive()
    }
}

impl<T: Copy + Default> CircularColumn<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: Ring::new(capacity),
            data: vec![T::default(); capacity],
        }
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

    /// Pushes a new element (overwriting the oldest when full) and returns the
    /// evicted element, if any.
    #[inline]
    pub fn push(&mut self, v: T) -> Option<T> {
        let head = self.ring.head();
        let evicted = self.ring.is_full().then(|| self.data[head]);
        self.data[head] = v;
        self.ring.advance();
        evicted
    }

    /// Updates the last (most recent) element.
    #[inline]
    pub fn update_last(&mut self, v: T) {
        if let Some(idx) = self.ring.last_physical() {
            self.data[idx] = v;
        }
    }

    /// Gets element by index from oldest (0 = oldest).
    #[inline]
    pub fn get(&self, i: usize) -> Option<T> {
        if i >= self.ring.len() {
            return None;
        }
        Some(self.data[self.ring.physical(i)])
    }

    /// Gets element by index from newest (0 = newest).
    #[inline]
    pub fn get_from_end(&self, i: usize) -> Option<T> {
        let len = self.ring.len();
        if i >= len {
            return None;
        }
        self.get(len - 1 - i)
    }

    #[inline]
    pub fn last(&self) -> Option<T> {
        self.get_from_end(0)
    }

    pub fn as_slices(&self) -> SlicePair<'_, T> {
        SlicePair::new(&self.data, &self.ring)
    }

    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.as_slices().iter()
    }

    pub fn to_vec_ordered(&self) -> Vec<T> {
        self.as_slices().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::{CircularColumn, Ring};

    #[test]
    fn ring_overwrite_ordered_iter() {
        let mut c = CircularColumn::<i32>::new(3);
        assert_eq!(c.push(1), None);
        c.push(2);
        c.push(3);
        assert_eq!(c.to_vec_ordered(), vec![1, 2, 3]);
        assert_eq!(c.push(4), Some(1));
        assert_eq!(c.to_vec_ordered(), vec![2, 3, 4]);
        c.push(5);
        assert_eq!(c.to_vec_ordered(), vec![3, 4, 5]);
        assert_eq!(c.iter().collect::<Vec<_>>(), vec![3, 4, 5]);
    }

    #[test]
    fn update_last_updates_most_recent() {
        let mut c = CircularColumn::<i32>::new(2);
        c.update_last(99);
        assert!(c.is_empty());
        c.push(10);
        c.push(20);
        c.update_last(21);
        assert_eq!(c.to_vec_ordered(), vec![10, 21]);
        c.push(30);
        assert_eq!(c.to_vec_ordered(), vec![21, 30]);
        c.update_last(31);
        assert_eq!(c.to_vec_ordered(), vec![21, 31]);
        assert_eq!(c.get_from_end(1), Some(21));
        assert_eq!(c.get(2), None);
    }

    #[test]
    fn segments_split_only_when_wrapped() {
        let mut r = Ring::new(4);
        assert_eq!(r.segments(), (0..0, 0..0));
        for _ in 0..3 {
            r.advance();
        }
        assert_eq!(r.segments(), (0..3, 0..0));
        r.advance();
        assert_eq!(r.segments(), (0..4, 0..0));
        r.advance(); // head = 1, oldest = 1
        assert_eq!(r.segments(), (1..4, 0..1));
        r.advance();
        r.advance();
        r.advance(); // head = 0 again
        assert_eq!(r.segments(), (0..4, 0..0));
    }

    #[test]
    fn physical_mapping_follows_head() {
        let mut r = Ring::new(3);
        for _ in 0..5 {
            r.advance();
        }
        // head = 2, len = 3: logical 0 sits at physical 2.
        assert_eq!(r.head(), 2);
        assert_eq!(r.physical(0), 2);
        assert_eq!(r.physical(1), 0);
        assert_eq!(r.physical(2), 1);
        assert_eq!(r.last_physical(), Some(1));
    }
}
