//! Read-only collection of multisets answering quantified packing queries.
//!
//! Every query runs the same pipeline:
//!
//! 1. validate the query's class count and options;
//! 2. consult the [`PreFilter`] (when `use_filter` is set) and stop early
//!    if no stored item can satisfy the relation;
//! 3. per item, reject by [`Multiset::dominates`] (when `use_filter` is set),
//!    otherwise run the [`BranchingSolver`];
//! 4. combine per-item answers with or / and / sum, sequentially or on the
//!    [`BatchEvaluator`].
//!
//! A filter "maybe" never replaces step 3, so answers are identical with
//! the filter on or off.

use std::mem;

use tracing::{debug, debug_span};

use crate::config::{QueryOptions, StoreConfig};
use crate::error::{PackingError, Result};
use crate::filter::{Direction, PreFilter};
use crate::multiset::{dominated, Multiset, PackingMode};
use crate::parallel::{BatchEvaluator, Reduction};
use crate::solver::BranchingSolver;

/// Stored multisets plus the pre-filter built from them.
///
/// Built once from a non-empty batch; queries never mutate it, so one
/// store can serve any number of threads.
///
/// # Example
///
/// ```
/// use packfit::{ItemStore, Multiset, QueryOptions};
///
/// let store = ItemStore::new(vec![
///     Multiset::new(vec![2, 0, 0]),
///     Multiset::new(vec![0, 1, 1]),
/// ]).unwrap();
///
/// let opts = QueryOptions::default();
/// let query = Multiset::new(vec![0, 2, 0]);
/// assert!(store.any_item_fits_into(&query, &opts).unwrap());
/// assert!(!store.all_items_fit_into(&query, &opts).unwrap());
/// assert_eq!(store.count_items_fit_into(&query, &opts).unwrap(), 1);
/// ```
#[derive(Debug)]
pub struct ItemStore {
    items: Vec<Multiset>,
    filter: PreFilter,
    class_count: usize,
    config: StoreConfig,
    evaluator: BatchEvaluator,
}

impl ItemStore {
    /// Build a store with the default configuration.
    pub fn new(items: Vec<Multiset>) -> Result<Self> {
        Self::with_config(items, StoreConfig::default())
    }

    /// Build a store.
    ///
    /// Fails if `items` is empty, if the class counts differ, or if the
    /// configuration is invalid.
    pub fn with_config(items: Vec<Multiset>, config: StoreConfig) -> Result<Self> {
        config.validate()?;
        let class_count = items
            .first()
            .map(Multiset::class_count)
            .ok_or(PackingError::EmptyCollection)?;
        for item in &items {
            item.check_class_count(class_count)?;
        }

        let span = debug_span!("item_store_build", items = items.len(), classes = class_count);
        let _guard = span.enter();

        let filter = PreFilter::build(&items, config.mode, &config.filter)?;
        let evaluator = BatchEvaluator::new(config.threads)?;
        debug!(
            mode = ?config.mode,
            workers = evaluator.workers(),
            filter_bytes = filter.memory_footprint(),
            "item store ready"
        );

        Ok(Self {
            items,
            filter,
            class_count,
            config,
            evaluator,
        })
    }

    /// Build a store from raw count vectors.
    pub fn from_counts<I, C>(counts: I, config: StoreConfig) -> Result<Self>
    where
        I: IntoIterator<Item = C>,
        C: Into<Vec<u32>>,
    {
        Self::with_config(counts.into_iter().map(Multiset::new).collect(), config)
    }

    /// Does some stored item pack into `query`?
    pub fn any_item_fits_into(&self, query: &Multiset, options: &QueryOptions) -> Result<bool> {
        self.dispatch(query, options, Direction::ItemsIntoQuery, Reduction::Any)
            .map(|n| n != 0)
    }

    /// Does every stored item pack into `query`?
    pub fn all_items_fit_into(&self, query: &Multiset, options: &QueryOptions) -> Result<bool> {
        self.dispatch(query, options, Direction::ItemsIntoQuery, Reduction::All)
            .map(|n| n != 0)
    }

    /// Does `query` pack into some stored item?
    pub fn query_fits_into_any_item(
        &self,
        query: &Multiset,
        options: &QueryOptions,
    ) -> Result<bool> {
        self.dispatch(query, options, Direction::QueryIntoItems, Reduction::Any)
            .map(|n| n != 0)
    }

    /// Does `query` pack into every stored item?
    pub fn query_fits_into_all_items(
        &self,
        query: &Multiset,
        options: &QueryOptions,
    ) -> Result<bool> {
        self.dispatch(query, options, Direction::QueryIntoItems, Reduction::All)
            .map(|n| n != 0)
    }

    /// Number of stored items that `query` packs into.
    pub fn count_query_fits_into(&self, query: &Multiset, options: &QueryOptions) -> Result<usize> {
        self.dispatch(query, options, Direction::QueryIntoItems, Reduction::Count)
    }

    /// Number of stored items that pack into `query`.
    pub fn count_items_fit_into(&self, query: &Multiset, options: &QueryOptions) -> Result<usize> {
        self.dispatch(query, options, Direction::ItemsIntoQuery, Reduction::Count)
    }

    fn dispatch(
        &self,
        query: &Multiset,
        options: &QueryOptions,
        direction: Direction,
        reduction: Reduction,
    ) -> Result<usize> {
        query.check_class_count(self.class_count)?;
        let solver = BranchingSolver::from_options(self.config.mode, options)?;

        // An empty store is impossible, so "none can" also refutes "all".
        if options.use_filter && !self.filter.could_satisfy(query, direction)? {
            debug!(?direction, ?reduction, "pre-filter excluded every stored item");
            return Ok(0);
        }

        let mode = self.config.mode;
        let use_filter = options.use_filter;
        let pred = |item: &Multiset| {
            let (candidate, target) = match direction {
                Direction::ItemsIntoQuery => (item, query),
                Direction::QueryIntoItems => (query, item),
            };
            if use_filter && !dominated(candidate.counts(), target.counts(), mode) {
                return false;
            }
            solver.fits(candidate.counts(), target.counts())
        };
        Ok(self
            .evaluator
            .evaluate(&self.items, reduction, options.parallel, pred))
    }

    /// Number of stored items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Always false: construction rejects empty batches.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Stored item at `index`.
    pub fn get(&self, index: usize) -> Option<&Multiset> {
        self.items.get(index)
    }

    /// Stored items in insertion order.
    pub fn items(&self) -> &[Multiset] {
        &self.items
    }

    /// Iterate stored items in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Multiset> {
        self.items.iter()
    }

    /// Number of classes `K` shared by every stored item and query.
    pub fn class_count(&self) -> usize {
        self.class_count
    }

    /// Packing rule of this store.
    pub fn mode(&self) -> PackingMode {
        self.config.mode
    }

    /// The pre-filter built at construction.
    pub fn filter(&self) -> &PreFilter {
        &self.filter
    }

    /// Construction configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Estimated bytes held by the store: item counters, vector headers,
    /// unused capacity and the filter.
    pub fn memory_footprint(&self) -> usize {
        let counters: usize = self
            .items
            .iter()
            .map(|item| item.class_count() * mem::size_of::<u32>())
            .sum();
        mem::size_of::<Self>()
            + self.items.capacity() * mem::size_of::<Multiset>()
            + counters
            + self.filter.memory_footprint()
            - mem::size_of::<PreFilter>()
    }
}

impl<'a> IntoIterator for &'a ItemStore {
    type Item = &'a Multiset;
    type IntoIter = std::slice::Iter<'a, Multiset>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
