//! Store, filter and per-query configuration.
//!
//! Every recognized option is a named field with a documented default.

use crate::error::{PackingError, Result};
use crate::multiset::PackingMode;

/// Default per-level branching limit: plain best-fit.
pub const DEFAULT_BRANCHING_LIMIT: usize = 1;

/// Options for a single query.
///
/// # Example
///
/// ```
/// use packfit::QueryOptions;
///
/// let opts = QueryOptions::default()
///     .with_branching_limit(8)
///     .with_parallel(true);
/// assert!(opts.trim_upper);
/// assert!(opts.use_filter);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueryOptions {
    /// Candidate slot classes explored per search level. `1` is best-fit.
    pub branching_limit: usize,
    /// Discard branches whose remaining slots cannot cover the remaining items.
    pub trim_upper: bool,
    /// Evaluate the stored collection on the worker pool.
    pub parallel: bool,
    /// Consult the pre-filter and per-item dominance before the solver.
    ///
    /// Disabling this runs the exact solver on every item.
    pub use_filter: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            branching_limit: DEFAULT_BRANCHING_LIMIT,
            trim_upper: true,
            parallel: false,
            use_filter: true,
        }
    }
}

impl QueryOptions {
    /// Set the per-level branching limit.
    pub fn with_branching_limit(mut self, branching_limit: usize) -> Self {
        self.branching_limit = branching_limit;
        self
    }

    /// Enable or disable upper-bound trimming.
    pub fn with_trim_upper(mut self, trim_upper: bool) -> Self {
        self.trim_upper = trim_upper;
        self
    }

    /// Enable or disable parallel evaluation.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Enable or disable the pre-filter stage.
    pub fn with_filter(mut self, use_filter: bool) -> Self {
        self.use_filter = use_filter;
        self
    }

    /// Reject a zero branching limit.
    pub fn validate(&self) -> Result<()> {
        if self.branching_limit == 0 {
            return Err(PackingError::invalid_config(
                "branching_limit must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Sizing of the conservative pre-filter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FilterConfig {
    /// Target false-positive rate of the Bloom bit array, in `(0, 1)`.
    pub false_positive_rate: f64,
    /// Number of profile thresholds per signature.
    pub dimensions: usize,
    /// Number of log2 buckets per signature coordinate (at most 256).
    pub buckets: usize,
    /// Upper bound on Bloom probes per query before answering "maybe".
    pub max_probes: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            false_positive_rate: 0.01,
            dimensions: 4,
            buckets: 24,
            max_probes: 4096,
        }
    }
}

impl FilterConfig {
    /// Set the target false-positive rate.
    pub fn with_false_positive_rate(mut self, rate: f64) -> Self {
        self.false_positive_rate = rate;
        self
    }

    /// Set the number of signature dimensions.
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// Set the number of buckets per coordinate.
    pub fn with_buckets(mut self, buckets: usize) -> Self {
        self.buckets = buckets;
        self
    }

    /// Set the probe budget per query.
    pub fn with_max_probes(mut self, max_probes: usize) -> Self {
        self.max_probes = max_probes;
        self
    }

    /// Check ranges of all fields.
    pub fn validate(&self) -> Result<()> {
        let rate = self.false_positive_rate;
        if !(rate > 0.0 && rate < 1.0) {
            return Err(PackingError::invalid_config(format!(
                "false_positive_rate must be in (0, 1), got {}",
                rate
            )));
        }
        if self.dimensions == 0 {
            return Err(PackingError::invalid_config(
                "filter needs at least one dimension",
            ));
        }
        if !(2..=256).contains(&self.buckets) {
            return Err(PackingError::invalid_config(format!(
                "buckets must be in 2..=256, got {}",
                self.buckets
            )));
        }
        if self.max_probes == 0 {
            return Err(PackingError::invalid_config("max_probes must be positive"));
        }
        Ok(())
    }
}

/// Construction-time configuration of an [`ItemStore`](crate::ItemStore).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StoreConfig {
    /// Packing rule used by the filter, dominance checks and the solver.
    pub mode: PackingMode,
    /// Pre-filter sizing.
    pub filter: FilterConfig,
    /// Size of a dedicated worker pool; `None` uses the global pool.
    pub threads: Option<usize>,
}

impl StoreConfig {
    /// Set the packing mode.
    pub fn with_mode(mut self, mode: PackingMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the pre-filter configuration.
    pub fn with_filter(mut self, filter: FilterConfig) -> Self {
        self.filter = filter;
        self
    }

    /// Use a dedicated pool with `threads` workers.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    /// Validate the filter and thread settings.
    pub fn validate(&self) -> Result<()> {
        self.filter.validate()?;
        if self.threads == Some(0) {
            return Err(PackingError::invalid_config("threads must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(QueryOptions::default().validate().is_ok());
        assert!(StoreConfig::default().validate().is_ok());
        assert_eq!(QueryOptions::default().branching_limit, 1);
    }

    #[test]
    fn test_zero_branching_rejected() {
        let opts = QueryOptions::default().with_branching_limit(0);
        assert!(matches!(
            opts.validate(),
            Err(PackingError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_filter_ranges() {
        let base = FilterConfig::default();
        assert!(base.with_false_positive_rate(0.0).validate().is_err());
        assert!(base.with_false_positive_rate(1.0).validate().is_err());
        assert!(base.with_dimensions(0).validate().is_err());
        assert!(base.with_buckets(1).validate().is_err());
        assert!(base.with_buckets(257).validate().is_err());
        assert!(base.with_max_probes(0).validate().is_err());
        assert!(base.with_buckets(256).validate().is_ok());
    }

    #[test]
    fn test_zero_threads_rejected() {
        let cfg = StoreConfig::default().with_threads(0);
        assert!(cfg.validate().is_err());
        assert!(StoreConfig::default().with_threads(2).validate().is_ok());
    }
}
