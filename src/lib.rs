//! Multiset packing feasibility over stored collections.
//!
//! `packfit` answers questions of the form "can multiset A be packed into
//! multiset B" where each multiset counts items (or slots) over a fixed
//! number of size classes. A store holds many multisets and answers
//! quantified queries against one query multiset:
//!
//! - does any / every stored item pack into the query?
//! - does the query pack into any / every stored item?
//! - how many stored items pack into the query, or take the query?
//!
//! # Components
//!
//! - [`Multiset`]: validated fixed-length count vector, with the cheap
//!   [`Multiset::dominates`] necessary condition
//! - [`BranchingSolver`]: best-fit backtracking search bounded by a
//!   per-level branching limit, with optional upper trimming
//! - [`PreFilter`]: Bloom-style summary of the store with no false
//!   negatives, used to skip queries that cannot match
//! - [`ItemStore`]: read-only collection and query dispatch
//! - [`BatchEvaluator`]: contiguous-chunk parallel evaluation with
//!   deterministic or / and / sum reductions
//!
//! # Packing rules
//!
//! The direction of "fits" is always candidate into target. How an item
//! of class `i` may use the target's slots is chosen per store with
//! [`PackingMode`]:
//!
//! - `Nested` (default): one slot of any class `j >= i`
//! - `Exact`: one slot of class `i`
//! - `Volume`: bin packing, class index is size, a class-`j` slot is a bin
//!   of capacity `j` shared by several items
//!
//! The mode and the query direction together decide the answer. Two small
//! class-0 items against one class-0 and one class-1 slot are rejected only
//! under `Exact`; `Nested` lets the second item move up into the class-1
//! slot. Five small items against ten large slots are counted by
//! [`ItemStore::count_items_fit_into`] (stored items as candidates);
//! [`ItemStore::count_query_fits_into`] asks the reverse question and gives
//! the same count only when the store holds the slots:
//!
//! ```rust
//! use packfit::{ItemStore, Multiset, PackingMode, QueryOptions, StoreConfig};
//!
//! let opts = QueryOptions::default();
//! let mixed = Multiset::new(vec![1, 1, 0]);
//! let exact = StoreConfig::default().with_mode(PackingMode::Exact);
//! let store = ItemStore::from_counts(vec![vec![2u32, 0, 0]], exact).unwrap();
//! assert!(!store.any_item_fits_into(&mixed, &opts).unwrap());
//! let nested = ItemStore::from_counts(vec![vec![2u32, 0, 0]], StoreConfig::default()).unwrap();
//! assert!(nested.any_item_fits_into(&mixed, &opts).unwrap());
//!
//! let mut small = vec![0u32; 40];
//! small[0] = 5;
//! let mut large = vec![0u32; 40];
//! large[39] = 10;
//! let items = ItemStore::from_counts(vec![small.clone(); 100], StoreConfig::default()).unwrap();
//! assert_eq!(items.count_items_fit_into(&Multiset::new(large.clone()), &opts).unwrap(), 100);
//! let slots = ItemStore::from_counts(vec![large; 100], StoreConfig::default()).unwrap();
//! assert_eq!(slots.count_query_fits_into(&Multiset::new(small), &opts).unwrap(), 100);
//! ```
//!
//! # Example
//!
//! ```rust
//! use packfit::{ItemStore, Multiset, PackingMode, QueryOptions, StoreConfig};
//!
//! let config = StoreConfig::default().with_mode(PackingMode::Volume);
//! let store = ItemStore::with_config(
//!     vec![
//!         Multiset::from_sizes(&[3, 3, 2, 5], 8).unwrap(),
//!         Multiset::from_sizes(&[7, 7], 8).unwrap(),
//!     ],
//!     config,
//! )
//! .unwrap();
//!
//! let bins = Multiset::from_sizes(&[6, 7], 8).unwrap();
//!
//! // Best-fit alone misses 3+3 / 2+5.
//! let greedy = QueryOptions::default();
//! assert!(!store.any_item_fits_into(&bins, &greedy).unwrap());
//!
//! // One more branch per level finds it.
//! let wider = QueryOptions::default().with_branching_limit(2);
//! assert!(store.any_item_fits_into(&bins, &wider).unwrap());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod error;
mod filter;
mod multiset;
mod parallel;
mod solver;
mod store;
mod traits;

pub use config::{FilterConfig, QueryOptions, StoreConfig, DEFAULT_BRANCHING_LIMIT};
pub use error::{PackingError, Result};
pub use filter::{Direction, PreFilter};
pub use multiset::{Multiset, PackingMode};
pub use parallel::BatchEvaluator;
pub use solver::{feasible, BranchingSolver, SearchStats};
pub use store::ItemStore;
pub use traits::PackingSolver;
