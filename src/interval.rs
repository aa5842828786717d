use alloc::vec::Vec;
use core::slice::Iter;

use num::bigint::BigUint;

/// Closed range of candidate plaintexts, inclusive on both ends
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Interval {
    pub lo: BigUint,
    pub hi: BigUint,
}

impl Interval {
    /// Create a new interval [lo, hi]
    pub fn new(lo: BigUint, hi: BigUint) -> Self {
        Self { lo, hi }
    }

    /// Whether the interval has collapsed to a single value
    pub fn is_point(&self) -> bool {
        self.lo == self.hi
    }

    pub fn contains(&self, x: &BigUint) -> bool {
        &self.lo <= x && x <= &self.hi
    }

    // order-compatible overlap, ranges share at least one value
    fn overlaps(&self, lo: &BigUint, hi: &BigUint) -> bool {
        &self.lo <= hi && lo <= &self.hi
    }
}

/// Set of candidate plaintext intervals
///
/// Insertion merges a new interval into the first stored interval it overlaps,
/// and only that one. A new interval bridging two stored intervals leaves the
/// second untouched; narrowing in later rounds re-merges the residue, so the
/// set is not normalized on insert.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IntervalSet {
    intervals: Vec<Interval>,
}

impl IntervalSet {
    /// Create an empty interval set
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an interval set holding only [lo, hi]
    pub fn singleton(lo: BigUint, hi: BigUint) -> Self {
        let mut intervals = Vec::with_capacity(1);
        intervals.push(Interval::new(lo, hi));
        Self { intervals }
    }

    /// Insert [lo, hi], merging into the first overlapping interval
    ///
    /// An inverted range (lo > hi) is empty and leaves the set unchanged.
    pub fn insert(&mut self, lo: BigUint, hi: BigUint) {
        if lo > hi {
            return;
        }

        for current in self.intervals.iter_mut() {
            if current.overlaps(&lo, &hi) {
                if lo < current.lo {
                    current.lo = lo;
                }
                if hi > current.hi {
                    current.hi = hi;
                }
                return;
            }
        }

        self.intervals.push(Interval::new(lo, hi));
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn iter(&self) -> Iter<'_, Interval> {
        self.intervals.iter()
    }

    pub fn as_slice(&self) -> &[Interval] {
        &self.intervals
    }

    /// The only interval, if exactly one remains
    pub fn single(&self) -> Option<&Interval> {
        match self.intervals.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }

    /// Whether any stored interval contains x
    pub fn contains(&self, x: &BigUint) -> bool {
        self.intervals.iter().any(|i| i.contains(x))
    }
}

impl<'a> IntoIterator for &'a IntervalSet {
    type Item = &'a Interval;
    type IntoIter = Iter<'a, Interval>;

    fn into_iter(self) -> Self::IntoIter {
        self.intervals.iter()
    }
}
