//! Conservative pre-filter over a stored collection.
//!
//! # Theory
//!
//! Dominance is a componentwise order on *profiles*: suffix counts for
//! [`PackingMode::Nested`], suffix volumes for [`PackingMode::Volume`] and
//! range sums for [`PackingMode::Exact`]. If an item fits into a query then
//! every profile value of the item is at most the query's.
//!
//! Each stored item is reduced to a *signature*: its profile at `D` class
//! thresholds, each value mapped to a log2 bucket. Bucketing is monotone,
//! so the componentwise order survives. Signatures go into a Bloom bit
//! array, and a per-dimension envelope (min and max) is kept beside it.
//!
//! A query enumerates every signature between its own and the envelope
//! bound and probes the Bloom array. A stored item that could satisfy the
//! query has its signature inside that box and was inserted, so a probe
//! hits: the filter has no false negatives. Hash collisions and coarse
//! buckets only cause false positives.
//!
//! # Sizing
//!
//! With `n` distinct signatures and target rate `p`:
//! `m = ceil(-n ln p / ln² 2)` bits and `k = round(m / n · ln 2)` hashes.

use std::mem;

use ahash::{AHashSet, RandomState};
use tracing::debug;

use crate::config::FilterConfig;
use crate::error::Result;
use crate::multiset::{Multiset, PackingMode};

/// Which side of the relation the stored items play.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Stored item is the candidate, the query is the target.
    ItemsIntoQuery,
    /// The query is the candidate, the stored item is the target.
    QueryIntoItems,
}

/// Bloom bit array of dominance signatures plus their envelope.
#[derive(Clone, Debug)]
pub struct PreFilter {
    mode: PackingMode,
    class_count: usize,
    thresholds: Vec<usize>,
    buckets: usize,
    max_probes: usize,
    bits: Vec<u64>,
    bit_count: u64,
    hash_count: u32,
    signature_count: usize,
    lower: Vec<u8>,
    upper: Vec<u8>,
}

impl PreFilter {
    /// Build the filter for `items`, which must share one class count.
    pub fn build(items: &[Multiset], mode: PackingMode, config: &FilterConfig) -> Result<Self> {
        config.validate()?;
        let class_count = items.first().map_or(0, Multiset::class_count);
        for item in items {
            item.check_class_count(class_count)?;
        }

        let dimensions = config.dimensions.min(class_count.max(1));
        let thresholds: Vec<usize> = (0..dimensions)
            .map(|d| d * class_count / dimensions)
            .collect();

        let mut filter = Self {
            mode,
            class_count,
            thresholds,
            buckets: config.buckets,
            max_probes: config.max_probes,
            bits: Vec::new(),
            bit_count: 0,
            hash_count: 1,
            signature_count: 0,
            lower: Vec::new(),
            upper: Vec::new(),
        };

        let signatures: AHashSet<Vec<u8>> =
            items.iter().map(|item| filter.signature(item)).collect();
        filter.size_for(signatures.len(), config.false_positive_rate);
        for sig in &signatures {
            filter.insert(sig);
        }

        debug!(
            items = items.len(),
            signatures = filter.signature_count,
            bits = filter.bit_count,
            hashes = filter.hash_count,
            ?mode,
            "pre-filter built"
        );
        Ok(filter)
    }

    /// Could any stored item satisfy the relation with `query`?
    ///
    /// `false` is exact: no stored item passes [`Multiset::dominates`] in
    /// the requested direction. `true` may be spurious.
    pub fn could_satisfy(&self, query: &Multiset, direction: Direction) -> Result<bool> {
        query.check_class_count(self.class_count)?;
        if self.signature_count == 0 {
            return Ok(false);
        }

        let sig = self.signature(query);
        let (lo, hi): (Vec<u8>, Vec<u8>) = match direction {
            Direction::ItemsIntoQuery => (self.lower.clone(), sig),
            Direction::QueryIntoItems => (sig, self.upper.clone()),
        };
        if lo.iter().zip(&hi).any(|(l, h)| l > h) {
            return Ok(false);
        }

        let probes = lo
            .iter()
            .zip(&hi)
            .try_fold(1usize, |acc, (&l, &h)| acc.checked_mul((h - l) as usize + 1));
        match probes {
            Some(n) if n <= self.max_probes => Ok(self.any_in_box(&lo, &hi)),
            _ => Ok(true),
        }
    }

    /// Packing mode the signatures were built for.
    pub fn mode(&self) -> PackingMode {
        self.mode
    }

    /// Number of bits in the Bloom array.
    pub fn bit_count(&self) -> u64 {
        self.bit_count
    }

    /// Number of hash functions per key.
    pub fn hash_count(&self) -> u32 {
        self.hash_count
    }

    /// Number of distinct signatures inserted.
    pub fn signature_count(&self) -> usize {
        self.signature_count
    }

    /// Estimated bytes held by the filter.
    pub fn memory_footprint(&self) -> usize {
        mem::size_of::<Self>()
            + self.bits.capacity() * mem::size_of::<u64>()
            + self.thresholds.capacity() * mem::size_of::<usize>()
            + self.lower.capacity()
            + self.upper.capacity()
    }

    fn size_for(&mut self, n: usize, rate: f64) {
        self.signature_count = n;
        if n == 0 {
            return;
        }
        let ln2 = std::f64::consts::LN_2;
        let m = (-(n as f64) * rate.ln() / (ln2 * ln2)).ceil().max(64.0) as u64;
        let k = ((m as f64 / n as f64) * ln2).round().clamp(1.0, 16.0) as u32;
        self.bit_count = m;
        self.hash_count = k;
        self.bits = vec![0u64; m.div_ceil(64) as usize];
    }

    fn insert(&mut self, sig: &[u8]) {
        if self.lower.is_empty() && self.upper.is_empty() {
            self.lower = sig.to_vec();
            self.upper = sig.to_vec();
        } else {
            for (d, &b) in sig.iter().enumerate() {
                self.lower[d] = self.lower[d].min(b);
                self.upper[d] = self.upper[d].max(b);
            }
        }
        for bit in self.bit_positions(sig) {
            self.bits[(bit / 64) as usize] |= 1u64 << (bit % 64);
        }
    }

    fn contains(&self, sig: &[u8]) -> bool {
        self.bit_positions(sig)
            .all(|bit| self.bits[(bit / 64) as usize] & (1u64 << (bit % 64)) != 0)
    }

    /// Double hashing: `h1 + i·h2 mod m`.
    fn bit_positions(&self, sig: &[u8]) -> impl Iterator<Item = u64> {
        let h1 = hasher(0).hash_one(sig);
        let h2 = hasher(1).hash_one(sig) | 1;
        let m = self.bit_count;
        (0..self.hash_count as u64).map(move |i| h1.wrapping_add(i.wrapping_mul(h2)) % m)
    }

    /// Probe every signature in the box `lo..=hi`.
    fn any_in_box(&self, lo: &[u8], hi: &[u8]) -> bool {
        let mut cur = lo.to_vec();
        loop {
            if self.contains(&cur) {
                return true;
            }
            let mut d = cur.len();
            loop {
                if d == 0 {
                    return false;
                }
                d -= 1;
                if cur[d] < hi[d] {
                    cur[d] += 1;
                    cur[d + 1..].copy_from_slice(&lo[d + 1..]);
                    break;
                }
            }
        }
    }

    fn signature(&self, m: &Multiset) -> Vec<u8> {
        let counts = m.counts();
        let weight = |class: usize, c: u32| match self.mode {
            PackingMode::Volume => class as u64 * c as u64,
            PackingMode::Nested | PackingMode::Exact => c as u64,
        };
        self.thresholds
            .iter()
            .enumerate()
            .map(|(d, &start)| {
                let end = match self.mode {
                    PackingMode::Exact => self
                        .thresholds
                        .get(d + 1)
                        .copied()
                        .unwrap_or(self.class_count),
                    PackingMode::Nested | PackingMode::Volume => self.class_count,
                };
                let value: u64 = counts[start..end]
                    .iter()
                    .enumerate()
                    .map(|(offset, &c)| weight(start + offset, c))
                    .sum();
                self.bucket(value)
            })
            .collect()
    }

    /// `0 ↦ 0`, `x ↦ min(B - 1, 1 + floor(log2 x))`.
    fn bucket(&self, value: u64) -> u8 {
        if value == 0 {
            return 0;
        }
        let log = 64 - value.leading_zeros() as usize;
        log.min(self.buckets - 1) as u8
    }
}

/// Fixed seeds keep signatures stable across filters and runs.
fn hasher(index: u64) -> RandomState {
    RandomState::with_seeds(
        0x243f_6a88_85a3_08d3 ^ index,
        0x1319_8a2e_0370_7344,
        0xa409_3822_299f_31d0,
        0x082e_fa98_ec4e_6c89 ^ index.rotate_left(17),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(counts: &[u32]) -> Multiset {
        Multiset::new(counts.to_vec())
    }

    fn build(items: &[Multiset], mode: PackingMode) -> PreFilter {
        PreFilter::build(items, mode, &FilterConfig::default()).unwrap()
    }

    #[test]
    fn test_sizing() {
        let items: Vec<Multiset> = (0..500u32).map(|i| ms(&[i, i % 7, i % 3, 1])).collect();
        let f = build(&items, PackingMode::Nested);
        assert!(f.signature_count() > 0);
        assert!(f.signature_count() <= items.len());
        assert!(f.bit_count() >= 64);
        assert!((1..=16).contains(&f.hash_count()));
        assert!(f.memory_footprint() >= f.bits.len() * 8);
    }

    #[test]
    fn test_bucket_monotone() {
        let f = build(&[ms(&[1])], PackingMode::Nested);
        let mut prev = 0;
        for v in 0..5000u64 {
            let b = f.bucket(v);
            assert!(b >= prev);
            prev = b;
        }
        assert_eq!(f.bucket(0), 0);
        assert_eq!(f.bucket(1), 1);
        assert_eq!(f.bucket(u64::MAX), 23);
    }

    #[test]
    fn test_rejects_too_small_query() {
        let items = vec![ms(&[0, 0, 5]), ms(&[0, 3, 3])];
        let f = build(&items, PackingMode::Nested);
        // Nothing fits into an empty query.
        assert!(!f
            .could_satisfy(&ms(&[0, 0, 0]), Direction::ItemsIntoQuery)
            .unwrap());
        // A large query may take them.
        assert!(f
            .could_satisfy(&ms(&[0, 0, 10]), Direction::ItemsIntoQuery)
            .unwrap());
    }

    #[test]
    fn test_query_into_items_direction() {
        let items = vec![ms(&[1, 0, 0]), ms(&[0, 2, 0])];
        let f = build(&items, PackingMode::Nested);
        assert!(!f
            .could_satisfy(&ms(&[0, 0, 64]), Direction::QueryIntoItems)
            .unwrap());
        assert!(f
            .could_satisfy(&ms(&[1, 0, 0]), Direction::QueryIntoItems)
            .unwrap());
        // The empty query fits into every item.
        assert!(f
            .could_satisfy(&ms(&[0, 0, 0]), Direction::QueryIntoItems)
            .unwrap());
    }

    #[test]
    fn test_no_false_negatives_on_members() {
        for mode in [PackingMode::Nested, PackingMode::Exact, PackingMode::Volume] {
            let items: Vec<Multiset> = (0..200u32)
                .map(|i| ms(&[i % 5, i % 11, (i * 7) % 13, i % 2, i % 3, 0, i % 4]))
                .collect();
            let f = build(&items, mode);
            for item in &items {
                assert!(f.could_satisfy(item, Direction::ItemsIntoQuery).unwrap());
                assert!(f.could_satisfy(item, Direction::QueryIntoItems).unwrap());
            }
        }
    }

    #[test]
    fn test_probe_budget_is_conservative() {
        let items = vec![ms(&[0, 0, 0, 1])];
        let cfg = FilterConfig::default().with_max_probes(1);
        let f = PreFilter::build(&items, PackingMode::Nested, &cfg).unwrap();
        // Box larger than the budget: answer "maybe" without probing.
        assert!(f
            .could_satisfy(&ms(&[900, 900, 900, 900]), Direction::ItemsIntoQuery)
            .unwrap());
    }

    #[test]
    fn test_class_count_checked() {
        let f = build(&[ms(&[1, 2])], PackingMode::Nested);
        assert!(f
            .could_satisfy(&ms(&[1, 2, 3]), Direction::ItemsIntoQuery)
            .is_err());
        assert!(PreFilter::build(
            &[ms(&[1, 2]), ms(&[1])],
            PackingMode::Nested,
            &FilterConfig::default()
        )
        .is_err());
    }

    #[test]
    fn test_volume_signature_ignores_zero_sizes() {
        let f = build(&[ms(&[9, 0, 0, 0])], PackingMode::Volume);
        // Only size-0 items stored: they fit into anything.
        assert!(f
            .could_satisfy(&ms(&[0, 0, 0, 0]), Direction::ItemsIntoQuery)
            .unwrap());
    }
}
