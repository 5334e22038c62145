//! Trait definitions for packing feasibility oracles.

use crate::error::Result;
use crate::multiset::{Multiset, PackingMode};

/// Decides whether a candidate multiset packs into a target multiset.
///
/// Implementations must be pure: the same inputs always give the same
/// answer, so results are identical whether the collection is evaluated on
/// one thread or many.
pub trait PackingSolver: Send + Sync {
    /// Packing rule this solver implements.
    fn mode(&self) -> PackingMode;

    /// Decide whether `query` (as candidate) packs into `target`.
    ///
    /// Fails with a contract violation if the class counts differ.
    fn feasible(&self, query: &Multiset, target: &Multiset) -> Result<bool>;

    /// Decide feasibility for every target, stopping at the first
    /// contract violation.
    fn feasible_all<'a, I>(&self, query: &Multiset, targets: I) -> Result<Vec<bool>>
    where
        I: IntoIterator<Item = &'a Multiset>,
    {
        targets
            .into_iter()
            .map(|target| self.feasible(query, target))
            .collect()
    }
}
