//! Bounded backtracking search for multiset packing feasibility.
//!
//! # Algorithm
//!
//! Items are placed one at a time, largest class first. At each level the
//! solver lists the slot classes that can currently hold the item, ranked
//! best-fit (tightest slot first), and tries at most `branching_limit` of
//! them before backtracking:
//!
//! ```text
//! items:  . . 1 . 2        (two size-4 items, one size-2 item)
//! slots:  . . . 1 . 1 1    (slots of class 3, 5 and 6)
//!                  ^ ^
//!                  candidates for the next size-4 item, tightest first
//! ```
//!
//! A limit of `1` is deterministic best-fit and may miss packings that
//! exist. Raising the limit only adds branches after the ones already
//! tried, so the answer is monotone in the limit; once the limit reaches
//! the number of classes every candidate is tried and the answer is exact.
//!
//! The search runs on an explicit frame stack with in-place undo, so the
//! depth (one level per item) is not bounded by the call stack.
//!
//! # Upper trimming
//!
//! With `trim_upper` every placement is followed by a dominance check of
//! the remaining items against the remaining slots. The check is a
//! necessary condition, so a trimmed branch could never have succeeded.

use tracing::trace;

use crate::config::QueryOptions;
use crate::error::{PackingError, Result};
use crate::multiset::{dominated, Multiset, PackingMode};
use crate::traits::PackingSolver;

/// Counters collected during one search.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Placements tried.
    pub nodes: u64,
    /// Levels abandoned after exhausting their candidates.
    pub backtracks: u64,
    /// Placements discarded by upper trimming.
    pub pruned: u64,
}

/// Best-fit search with a per-level branching limit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BranchingSolver {
    mode: PackingMode,
    branching_limit: usize,
    trim_upper: bool,
}

impl BranchingSolver {
    /// Create a solver.
    ///
    /// # Arguments
    ///
    /// * `mode` - packing rule
    /// * `branching_limit` - candidates explored per level (at least 1)
    /// * `trim_upper` - discard branches failing the dominance bound
    pub fn new(mode: PackingMode, branching_limit: usize, trim_upper: bool) -> Result<Self> {
        if branching_limit == 0 {
            return Err(PackingError::invalid_config(
                "branching_limit must be at least 1",
            ));
        }
        Ok(Self {
            mode,
            branching_limit,
            trim_upper,
        })
    }

    /// Create a solver from query options.
    pub fn from_options(mode: PackingMode, options: &QueryOptions) -> Result<Self> {
        Self::new(mode, options.branching_limit, options.trim_upper)
    }

    /// Per-level branching limit.
    pub fn branching_limit(&self) -> usize {
        self.branching_limit
    }

    /// Whether upper trimming is enabled.
    pub fn trim_upper(&self) -> bool {
        self.trim_upper
    }

    /// Decide feasibility and report search counters.
    pub fn feasible_with_stats(
        &self,
        query: &Multiset,
        target: &Multiset,
    ) -> Result<(bool, SearchStats)> {
        query.check_class_count(target.class_count())?;
        Ok(self.search(query.counts(), target.counts()))
    }

    /// Search over raw counters the caller has already checked for equal length.
    pub(crate) fn fits(&self, items: &[u32], slots: &[u32]) -> bool {
        debug_assert_eq!(items.len(), slots.len());
        let (answer, stats) = self.search(items, slots);
        trace!(
            answer,
            nodes = stats.nodes,
            backtracks = stats.backtracks,
            pruned = stats.pruned,
            "packing search finished"
        );
        answer
    }

    fn search(&self, items: &[u32], slots: &[u32]) -> (bool, SearchStats) {
        let mut stats = SearchStats::default();
        if let Some(answer) = self.precheck(items, slots) {
            return (answer, stats);
        }

        let mut state = State::new(items, slots, self.mode);
        let Some(first) = state.largest_item() else {
            return (true, stats);
        };
        let mut stack = vec![Frame::new(first, state.candidates(first, first, self.branching_limit))];

        while let Some(frame) = stack.last_mut() {
            if let Some(slot) = frame.placed.take() {
                state.undo(frame.item, slot);
            }
            let Some(&slot) = frame.candidates.get(frame.next) else {
                stack.pop();
                stats.backtracks += 1;
                continue;
            };
            frame.next += 1;
            frame.placed = Some(slot);
            let item = frame.item;
            state.place(item, slot);
            stats.nodes += 1;

            if self.trim_upper && !dominated(&state.items, &state.slots, self.mode) {
                stats.pruned += 1;
                continue;
            }

            let Some(next) = state.largest_item() else {
                return (true, stats);
            };
            // Identical nested items take slots in non-decreasing class order.
            let floor = if self.mode == PackingMode::Nested && next == item {
                slot
            } else {
                next
            };
            let candidates = state.candidates(next, floor, self.branching_limit);
            stack.push(Frame::new(next, candidates));
        }
        (false, stats)
    }

    /// Answers that need no search.
    fn precheck(&self, items: &[u32], slots: &[u32]) -> Option<bool> {
        let needs_room = match self.mode {
            PackingMode::Volume => items.iter().skip(1).any(|&c| c > 0),
            _ => items.iter().any(|&c| c > 0),
        };
        if !needs_room {
            return Some(true);
        }
        match self.mode {
            PackingMode::Exact => Some(dominated(items, slots, PackingMode::Exact)),
            PackingMode::Nested => (total(slots) < total(items)).then_some(false),
            PackingMode::Volume => (volume(slots) < volume(items)).then_some(false),
        }
    }
}

impl PackingSolver for BranchingSolver {
    fn mode(&self) -> PackingMode {
        self.mode
    }

    fn feasible(&self, query: &Multiset, target: &Multiset) -> Result<bool> {
        query.check_class_count(target.class_count())?;
        Ok(self.fits(query.counts(), target.counts()))
    }
}

/// Decide whether `query` packs into `target` under `mode`.
///
/// Convenience wrapper around [`BranchingSolver`].
pub fn feasible(
    query: &Multiset,
    target: &Multiset,
    mode: PackingMode,
    branching_limit: usize,
    trim_upper: bool,
) -> Result<bool> {
    BranchingSolver::new(mode, branching_limit, trim_upper)?.feasible(query, target)
}

fn total(counts: &[u32]) -> u64 {
    counts.iter().map(|&c| c as u64).sum()
}

fn volume(counts: &[u32]) -> u64 {
    counts
        .iter()
        .enumerate()
        .map(|(class, &c)| class as u64 * c as u64)
        .sum()
}

/// One search level: the item class being placed and its ranked slots.
struct Frame {
    item: usize,
    candidates: Vec<usize>,
    next: usize,
    placed: Option<usize>,
}

impl Frame {
    fn new(item: usize, candidates: Vec<usize>) -> Self {
        Self {
            item,
            candidates,
            next: 0,
            placed: None,
        }
    }
}

/// Remaining items and slots, mutated in place and undone on backtrack.
struct State {
    items: Vec<u64>,
    slots: Vec<u64>,
    mode: PackingMode,
}

impl State {
    fn new(items: &[u32], slots: &[u32], mode: PackingMode) -> Self {
        Self {
            items: items.iter().map(|&c| c as u64).collect(),
            slots: slots.iter().map(|&c| c as u64).collect(),
            mode,
        }
    }

    /// Largest item class still unplaced. Size-0 items need no room in volume mode.
    fn largest_item(&self) -> Option<usize> {
        let lowest = usize::from(self.mode == PackingMode::Volume);
        self.items
            .iter()
            .rposition(|&c| c > 0)
            .filter(|&class| class >= lowest)
    }

    /// Up to `limit` slot classes for an item of class `item`, tightest first.
    fn candidates(&self, item: usize, floor: usize, limit: usize) -> Vec<usize> {
        match self.mode {
            PackingMode::Exact => (self.slots[item] > 0)
                .then_some(item)
                .into_iter()
                .collect(),
            PackingMode::Nested | PackingMode::Volume => (floor.max(item)..self.slots.len())
                .filter(|&class| self.slots[class] > 0)
                .take(limit)
                .collect(),
        }
    }

    fn place(&mut self, item: usize, slot: usize) {
        self.items[item] -= 1;
        self.slots[slot] -= 1;
        if self.mode == PackingMode::Volume && slot > item {
            self.slots[slot - item] += 1;
        }
    }

    fn undo(&mut self, item: usize, slot: usize) {
        if self.mode == PackingMode::Volume && slot > item {
            self.slots[slot - item] -= 1;
        }
        self.slots[slot] += 1;
        self.items[item] += 1;
    }
}
