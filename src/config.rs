//! Reader configuration.
//!
//! Limits protect a reader from hostile or corrupt peers. Defaults match
//! what a typical client needs; tighten them for untrusted sources.

/// Default ceiling for a single length-prefixed or line read (32 MiB).
///
/// Used when the configured limit is zero.
pub const DEFAULT_SINGLE_READ_SIZE_LIMIT: i64 = 1 << 25;

/// Default maximum nesting depth for [`Reader::discard`](crate::Reader::discard)
/// and [`Reader::read_value`](crate::Reader::read_value).
///
/// Each level of nesting costs one stack frame, so this bounds stack use
/// against inputs like `*1\r\n*1\r\n*1\r\n...`.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Default number of bytes requested from the source on each fill.
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Configuration for a [`Reader`](crate::Reader).
///
/// # Example
///
/// ```
/// use resp3::ReaderOptions;
///
/// let options = ReaderOptions::new()
///     .single_read_size_limit(64 * 1024)
///     .max_depth(16);
/// assert_eq!(options.effective_size_limit(), Some(64 * 1024));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderOptions {
    /// Maximum size of a single blob, chunk or line, excluding framing.
    ///
    /// Zero selects [`DEFAULT_SINGLE_READ_SIZE_LIMIT`]; a negative value
    /// disables the limit.
    pub single_read_size_limit: i64,
    /// Maximum nesting depth of aggregates and streams.
    pub max_depth: usize,
    /// Bytes requested from the source per fill.
    pub buffer_size: usize,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ReaderOptions {
    /// Create options with default limits.
    pub const fn new() -> Self {
        Self {
            single_read_size_limit: 0,
            max_depth: DEFAULT_MAX_DEPTH,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    /// Set the single read size limit.
    pub const fn single_read_size_limit(mut self, limit: i64) -> Self {
        self.single_read_size_limit = limit;
        self
    }

    /// Set the maximum nesting depth.
    pub const fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set the fill size of the lookahead buffer. Zero is treated as one.
    pub const fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// The limit actually enforced, or `None` when unlimited.
    pub const fn effective_size_limit(&self) -> Option<u64> {
        match self.single_read_size_limit {
            0 => Some(DEFAULT_SINGLE_READ_SIZE_LIMIT as u64),
            l if l < 0 => None,
            l => Some(l as u64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ReaderOptions::default();
        assert_eq!(options.single_read_size_limit, 0);
        assert_eq!(options.max_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(options.buffer_size, DEFAULT_BUFFER_SIZE);
        assert_eq!(options, ReaderOptions::new());
    }

    #[test]
    fn test_effective_size_limit() {
        assert_eq!(
            ReaderOptions::new().effective_size_limit(),
            Some(32 * 1024 * 1024)
        );
        assert_eq!(
            ReaderOptions::new().single_read_size_limit(5).effective_size_limit(),
            Some(5)
        );
        assert_eq!(
            ReaderOptions::new().single_read_size_limit(-1).effective_size_limit(),
            None
        );
    }

    #[test]
    fn test_builder_chain() {
        const OPTIONS: ReaderOptions = ReaderOptions::new()
            .single_read_size_limit(1024)
            .max_depth(4)
            .buffer_size(16);
        assert_eq!(OPTIONS.single_read_size_limit, 1024);
        assert_eq!(OPTIONS.max_depth, 4);
        assert_eq!(OPTIONS.buffer_size, 16);
    }
}
