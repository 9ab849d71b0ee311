//! A vector which can be reset to a default value in amortized constant time.

use std::ops::{Index, IndexMut};

/// Each entry carries the stamp of the round it was last written in.
/// Entries with an outdated stamp read as the default.
/// Search data which is reused across many queries but only sparsely touched per query lives in here.
#[derive(Debug, Clone)]
pub struct TimestampedVector<T> {
    data: Vec<T>,
    stamps: Vec<u32>,
    round: u32,
    default: T,
}

impl<T: Clone> TimestampedVector<T> {
    pub fn new(size: usize, default: T) -> TimestampedVector<T> {
        TimestampedVector {
            data: vec![default.clone(); size],
            stamps: vec![0; size],
            round: 0,
            default,
        }
    }

    /// Invalidate all entries.
    pub fn reset(&mut self) {
        self.round = self.round.wrapping_add(1);

        // after wrapping around, stale stamps could become valid again
        if self.round == 0 {
            self.data.iter_mut().for_each(|element| *element = self.default.clone());
            self.stamps.iter_mut().for_each(|stamp| *stamp = 0);
        }
    }

    pub fn set(&mut self, index: usize, value: T) {
        self.data[index] = value;
        self.stamps[index] = self.round;
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl<T: Clone> Index<usize> for TimestampedVector<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        if self.stamps[index] == self.round {
            &self.data[index]
        } else {
            &self.default
        }
    }
}

impl<T: Clone> IndexMut<usize> for TimestampedVector<T> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        if self.stamps[index] != self.round {
            self.set(index, self.default.clone());
        }
        &mut self.data[index]
    }
}
