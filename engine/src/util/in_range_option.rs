//! Optional values without space overhead for types with a sentinel.

use std::fmt;

/// Values of a type which can not occur as real data and may be used to mark absence.
pub trait Sentinel: PartialEq + Copy {
    const SENTINEL: Self;
}

impl Sentinel for u32 {
    const SENTINEL: u32 = u32::MAX;
}

impl Sentinel for u64 {
    const SENTINEL: u64 = u64::MAX;
}

impl Sentinel for usize {
    const SENTINEL: usize = usize::MAX;
}

/// Like `Option<T>` but stores `None` as `T::SENTINEL`, so it occupies exactly as much memory as `T`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct InRangeOption<T: Sentinel>(T);

impl<T: Sentinel> InRangeOption<T> {
    pub const NONE: Self = InRangeOption(T::SENTINEL);

    /// Panics when `value` is the sentinel.
    pub fn some(value: T) -> Self {
        assert!(value != T::SENTINEL, "sentinel value can not be wrapped");
        InRangeOption(value)
    }

    pub fn new(value: Option<T>) -> Self {
        value.map_or(Self::NONE, Self::some)
    }

    pub fn value(self) -> Option<T> {
        if self.0 == T::SENTINEL {
            None
        } else {
            Some(self.0)
        }
    }

    pub fn is_some(self) -> bool {
        self.0 != T::SENTINEL
    }
}

impl<T: Sentinel> Default for InRangeOption<T> {
    fn default() -> Self {
        Self::NONE
    }
}

impl<T: Sentinel + fmt::Debug> fmt::Debug for InRangeOption<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.value().fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_maps_to_none() {
        assert_eq!(InRangeOption::<u32>::NONE.value(), None);
        assert_eq!(InRangeOption::new(Some(7u64)).value(), Some(7));
        assert_eq!(InRangeOption::<usize>::default().value(), None);
        assert!(InRangeOption::some(0u32).is_some());
    }

    #[test]
    #[should_panic]
    fn sentinel_can_not_be_wrapped() {
        InRangeOption::some(u32::MAX);
    }
}
