//! Limits for the bounded worker pool used to fan out per-source reads.
//!
//! Opening a raster and reading its header is dominated by waiting on storage or the network,
//! so the fan-out runs at a multiple of the CPU count. Tile bodies are computed sequentially
//! within a request and are not governed by these limits.
//!
//! ```
//! use cogtiler_core::ConcurrencyLimits;
//!
//! let limits = ConcurrencyLimits::default();
//! assert!(limits.source_fanout >= limits.blocking_reads);
//!
//! let pinned = ConcurrencyLimits::with_max_threads(Some(4));
//! assert_eq!(pinned.source_fanout, 4);
//! ```

/// How many sources may be opened at once, and how many blocking raster reads may run at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConcurrencyLimits {
	/// Parallel metadata reads when computing bounds and zoom ranges of many sources.
	pub source_fanout: usize,

	/// Parallel blocking pixel reads.
	pub blocking_reads: usize,
}

impl ConcurrencyLimits {
	pub fn new(source_fanout: usize, blocking_reads: usize) -> Self {
		Self {
			source_fanout: source_fanout.max(1),
			blocking_reads: blocking_reads.max(1),
		}
	}

	/// Uses `max_threads` for both limits when given, otherwise the CPU-based defaults.
	pub fn with_max_threads(max_threads: Option<usize>) -> Self {
		match max_threads {
			Some(threads) => Self::new(threads, threads),
			None => Self::default(),
		}
	}

	pub fn cpu_count() -> usize {
		num_cpus::get()
	}
}

impl Default for ConcurrencyLimits {
	/// Source fan-out at 3x the CPU count, blocking reads at 1x.
	fn default() -> Self {
		let cpus = num_cpus::get();
		Self {
			source_fanout: cpus * 3,
			blocking_reads: cpus,
		}
	}
}
