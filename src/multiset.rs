//! Packed multisets of counts over a fixed number of size classes.
//!
//! A [`Multiset`] stores one counter per class. The same value type
//! describes both sides of a packing question: the *items* that need room
//! (class `i` = an item of size class `i`) and the *slots* that offer it
//! (class `j` = a slot of capacity class `j`). How an item may use a slot
//! is fixed by the [`PackingMode`].
//!
//! # Dominance
//!
//! [`Multiset::dominates`] is a cheap necessary condition for feasibility.
//! For [`PackingMode::Exact`] and [`PackingMode::Nested`] it is also
//! sufficient (in the nested case it is Hall's condition on suffix sums);
//! for [`PackingMode::Volume`] it only compares suffix volumes.

use std::mem;

use crate::error::{PackingError, Result};

/// Rule deciding which slots an item may occupy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PackingMode {
    /// An item of class `i` consumes one slot of any class `j >= i`.
    #[default]
    Nested,
    /// An item of class `i` consumes one slot of class `i` exactly.
    Exact,
    /// Class index is the size. A slot of class `j` is a bin of capacity `j`
    /// holding any items whose sizes sum to at most `j`.
    Volume,
}

/// Fixed-length vector of non-negative counts, one per size class.
///
/// Immutable once constructed. The class count is validated against the
/// store on every query.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Multiset {
    counts: Box<[u32]>,
}

impl Multiset {
    /// Create a multiset from per-class counts.
    pub fn new(counts: impl Into<Vec<u32>>) -> Self {
        Self {
            counts: counts.into().into_boxed_slice(),
        }
    }

    /// All-zero multiset with `class_count` classes.
    pub fn zeros(class_count: usize) -> Self {
        Self::new(vec![0u32; class_count])
    }

    /// Create a multiset from signed counts, rejecting negatives.
    pub fn try_from_signed(counts: &[i64]) -> Result<Self> {
        let mut out = Vec::with_capacity(counts.len());
        for (class, &value) in counts.iter().enumerate() {
            if value < 0 {
                return Err(PackingError::NegativeCount { class, value });
            }
            let count =
                u32::try_from(value).map_err(|_| PackingError::CountOverflow { class, value })?;
            out.push(count);
        }
        Ok(Self::new(out))
    }

    /// Build a count vector from a list of item sizes.
    ///
    /// Every size must be a valid class index (`size < class_count`).
    pub fn from_sizes(sizes: &[usize], class_count: usize) -> Result<Self> {
        let mut counts = vec![0u32; class_count];
        for &size in sizes {
            let slot = counts
                .get_mut(size)
                .ok_or(PackingError::SizeOutOfRange { size, class_count })?;
            *slot = slot.saturating_add(1);
        }
        Ok(Self::new(counts))
    }

    /// Expand the counts into a list of item sizes, largest first.
    pub fn to_sizes(&self) -> Vec<usize> {
        let mut sizes = Vec::with_capacity(self.total_items() as usize);
        for (class, &count) in self.counts.iter().enumerate().rev() {
            sizes.extend(std::iter::repeat(class).take(count as usize));
        }
        sizes
    }

    /// Number of size classes `K`.
    #[inline]
    pub fn class_count(&self) -> usize {
        self.counts.len()
    }

    /// Per-class counts.
    #[inline]
    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    /// Count of class `class`, if the class exists.
    #[inline]
    pub fn get(&self, class: usize) -> Option<u32> {
        self.counts.get(class).copied()
    }

    /// Total number of items (or slots).
    pub fn total_items(&self) -> u64 {
        self.counts.iter().map(|&c| c as u64).sum()
    }

    /// Sum of `class * count`, the total size under [`PackingMode::Volume`].
    pub fn total_volume(&self) -> u64 {
        self.counts
            .iter()
            .enumerate()
            .map(|(class, &c)| class as u64 * c as u64)
            .sum()
    }

    /// True when every count is zero.
    pub fn is_empty(&self) -> bool {
        self.counts.iter().all(|&c| c == 0)
    }

    /// Fail with a contract violation unless this multiset has `expected` classes.
    pub fn check_class_count(&self, expected: usize) -> Result<()> {
        if self.class_count() != expected {
            return Err(PackingError::mismatch(expected, self.class_count()));
        }
        Ok(())
    }

    /// Necessary condition for `self` (as items) fitting into `target` (as slots).
    ///
    /// Fails with a contract violation if the class counts differ.
    pub fn dominates(&self, target: &Multiset, mode: PackingMode) -> Result<bool> {
        self.check_class_count(target.class_count())?;
        Ok(dominated(&self.counts, &target.counts, mode))
    }

    /// Estimated bytes held by this multiset, header included.
    pub fn memory_footprint(&self) -> usize {
        mem::size_of::<Self>() + self.counts.len() * mem::size_of::<u32>()
    }
}

impl From<Vec<u32>> for Multiset {
    fn from(counts: Vec<u32>) -> Self {
        Self::new(counts)
    }
}

impl TryFrom<&[i64]> for Multiset {
    type Error = PackingError;

    fn try_from(counts: &[i64]) -> Result<Self> {
        Self::try_from_signed(counts)
    }
}

impl AsRef<[u32]> for Multiset {
    fn as_ref(&self) -> &[u32] {
        &self.counts
    }
}

/// Dominance over raw counters, shared with the solver's working state.
pub(crate) fn dominated<A, B>(items: &[A], slots: &[B], mode: PackingMode) -> bool
where
    A: Copy + Into<u64>,
    B: Copy + Into<u64>,
{
    match mode {
        PackingMode::Exact => items
            .iter()
            .zip(slots)
            .all(|(&a, &b)| a.into() <= b.into()),
        PackingMode::Nested => {
            let (mut need, mut have) = (0u64, 0u64);
            for (&a, &b) in items.iter().zip(slots).rev() {
                need += a.into();
                have += b.into();
                if need > have {
                    return false;
                }
            }
            true
        }
        PackingMode::Volume => {
            let (mut need, mut have) = (0u64, 0u64);
            for (class, (&a, &b)) in items.iter().zip(slots).enumerate().skip(1).rev() {
                need += class as u64 * a.into();
                have += class as u64 * b.into();
                if need > have {
                    return false;
                }
            }
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes_conversion() {
        assert!(Multiset::zeros(0).to_sizes().is_empty());
        assert_eq!(Multiset::new(vec![0, 2, 1]).to_sizes(), vec![2, 1, 1]);
        assert_eq!(
            Multiset::from_sizes(&[5, 1, 1, 2], 6).unwrap(),
            Multiset::new(vec![0, 2, 1, 0, 0, 1])
        );
    }

    #[test]
    fn test_from_sizes_out_of_range() {
        let err = Multiset::from_sizes(&[1, 6], 6).unwrap_err();
        assert_eq!(
            err,
            PackingError::SizeOutOfRange {
                size: 6,
                class_count: 6
            }
        );
    }

    #[test]
    fn test_totals() {
        let m = Multiset::new(vec![0, 3, 1, 0, 0, 1]);
        assert_eq!(m.total_items(), 5);
        assert_eq!(m.total_volume(), 10);
        assert!(!m.is_empty());
        assert!(Multiset::zeros(4).is_empty());
    }

    #[test]
    fn test_signed_counts_rejected() {
        let err = Multiset::try_from_signed(&[1, -2, 0]).unwrap_err();
        assert_eq!(err, PackingError::NegativeCount { class: 1, value: -2 });

        let err = Multiset::try_from_signed(&[0, i64::from(u32::MAX) + 1]).unwrap_err();
        assert!(matches!(err, PackingError::CountOverflow { class: 1, .. }));

        let ok = Multiset::try_from(&[1i64, 0, 4][..]).unwrap();
        assert_eq!(ok.counts(), &[1, 0, 4]);
    }

    #[test]
    fn test_check_class_count() {
        let m = Multiset::zeros(3);
        assert!(m.check_class_count(3).is_ok());
        assert_eq!(
            m.check_class_count(4).unwrap_err(),
            PackingError::mismatch(4, 3)
        );
    }

    #[test]
    fn test_dominates_exact() {
        let a = Multiset::new(vec![2, 0, 0]);
        let b = Multiset::new(vec![1, 1, 0]);
        assert!(!a.dominates(&b, PackingMode::Exact).unwrap());
        assert!(b.dominates(&Multiset::new(vec![1, 1, 3]), PackingMode::Exact).unwrap());
    }

    #[test]
    fn test_dominates_nested() {
        // Two class-0 items may use the class-0 and the class-1 slot.
        let a = Multiset::new(vec![2, 0, 0]);
        let b = Multiset::new(vec![1, 1, 0]);
        assert!(a.dominates(&b, PackingMode::Nested).unwrap());
        // A class-1 item cannot move down into a class-0 slot.
        assert!(!Multiset::new(vec![0, 2, 0]).dominates(&b, PackingMode::Nested).unwrap());
    }

    #[test]
    fn test_dominates_volume() {
        let items = Multiset::from_sizes(&[3, 3, 2, 5], 10).unwrap();
        let bins = Multiset::from_sizes(&[6, 7], 10).unwrap();
        assert!(items.dominates(&bins, PackingMode::Volume).unwrap());
        let small = Multiset::from_sizes(&[6, 6], 10).unwrap();
        assert!(!items.dominates(&small, PackingMode::Volume).unwrap());
        // Largest item larger than every bin.
        let big = Multiset::from_sizes(&[9], 10).unwrap();
        assert!(!big.dominates(&bins, PackingMode::Volume).unwrap());
    }

    #[test]
    fn test_dominates_rejects_mismatched_classes() {
        // Five class-1 items and no class-1 slot: truncating to one class
        // would wrongly accept.
        let items = Multiset::new(vec![0, 5]);
        let slots = Multiset::new(vec![9]);
        for mode in [PackingMode::Nested, PackingMode::Exact, PackingMode::Volume] {
            assert_eq!(
                items.dominates(&slots, mode).unwrap_err(),
                PackingError::mismatch(1, 2)
            );
            assert!(slots.dominates(&items, mode).is_err());
        }
    }

    #[test]
    fn test_memory_footprint() {
        let m = Multiset::zeros(40);
        assert_eq!(
            m.memory_footprint(),
            mem::size_of::<Multiset>() + 40 * mem::size_of::<u32>()
        );
    }
}
