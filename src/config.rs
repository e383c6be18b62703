//! # Stream configuration.
//!
//! Provides [`Config`], the knobs shared by publishers and the async bridge.
//!
//! Config is used in two ways:
//! 1. **Production passes**: `SequencePublisher::new(source).with_config(config)` caps how
//!    many elements a single `produce` call may be asked for.
//! 2. **Async bridge**: `SubscriberStream::subscribe(&publisher, &config)` sizes the
//!    demand window.
//!
//! ## Sentinel values
//! - `batch = 0` → unlimited (one pass may cover all outstanding demand)
//! - `prefetch = 0` → treated as 1
//!
//! # Example
//! ```
//! use demandflow::Config;
//!
//! let mut cfg = Config::default();
//! cfg.prefetch = 16;
//! cfg.batch = 4;
//!
//! assert_eq!(cfg.replenish_threshold(), 8);
//! assert_eq!(cfg.batch_limit(), Some(4));
//! ```

/// Configuration for subscriptions and the stream bridge.
///
/// ## Field semantics
/// - `prefetch`: Demand window of [`SubscriberStream`](crate::SubscriberStream) (min 1)
/// - `batch`: Max elements per production hook call (`0` = unlimited)
///
/// ## Notes
/// All fields are public for flexibility. Prefer the helper accessors to avoid
/// sprinkling sentinel checks (`0`) across the codebase.
#[derive(Clone, Debug)]
pub struct Config {
    /// Number of elements the stream bridge keeps requested ahead of the reader.
    ///
    /// The bridge requests `prefetch` up front and tops the window back up once
    /// [`Config::replenish_threshold`] elements have been read, so outstanding
    /// demand never exceeds this value.
    pub prefetch: usize,

    /// Upper bound on the `n` passed to a single `Producer::produce` call.
    ///
    /// - `0` = unlimited
    /// - `n > 0` = the production loop splits outstanding demand into passes of at most `n`
    pub batch: u64,
}

impl Config {
    /// Returns the prefetch window clamped to a minimum of 1.
    #[inline]
    pub fn prefetch_clamped(&self) -> usize {
        self.prefetch.max(1)
    }

    /// Number of consumed elements after which the bridge requests more.
    ///
    /// Half of the prefetch window, at least 1.
    #[inline]
    pub fn replenish_threshold(&self) -> usize {
        (self.prefetch_clamped() / 2).max(1)
    }

    /// Returns the per-pass batch limit as an `Option`.
    ///
    /// - `None` → unlimited
    /// - `Some(n)` → at most `n` elements per pass
    #[inline]
    pub fn batch_limit(&self) -> Option<u64> {
        if self.batch == 0 {
            None
        } else {
            Some(self.batch)
        }
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `prefetch = 64`
    /// - `batch = 0` (unlimited)
    fn default() -> Self {
        Self {
            prefetch: 64,
            batch: 0,
        }
    }
}
