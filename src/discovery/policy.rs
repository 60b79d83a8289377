//! Discovery policy
//!
//! Pure configuration bounding the cost of discovery. No mutable state;
//! one instance can serve concurrent discovery calls for different
//! streams.

/// Cost bounds for schema discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryPolicy {
    max_concurrent_file_reads: usize,
    max_n_files_for_schema_inference: usize,
    max_files_to_enumerate: usize,
}

impl Default for DiscoveryPolicy {
    fn default() -> Self {
        Self {
            max_concurrent_file_reads: 10,
            max_n_files_for_schema_inference: 10,
            max_files_to_enumerate: 10_000,
        }
    }
}

impl DiscoveryPolicy {
    /// Create a policy with the default bounds
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of files read concurrently during discovery
    #[must_use]
    pub fn with_max_concurrent_file_reads(mut self, n: usize) -> Self {
        self.max_concurrent_file_reads = n.max(1);
        self
    }

    /// Set the maximum number of files sampled for schema inference
    #[must_use]
    pub fn with_max_n_files_for_schema_inference(mut self, n: usize) -> Self {
        self.max_n_files_for_schema_inference = n.max(1);
        self
    }

    /// Set the cap on files enumerated before discovery gives up
    #[must_use]
    pub fn with_max_files_to_enumerate(mut self, n: usize) -> Self {
        self.max_files_to_enumerate = n.max(1);
        self
    }

    /// Maximum number of files read concurrently during discovery
    pub fn max_concurrent_file_reads(&self) -> usize {
        self.max_concurrent_file_reads
    }

    /// Sampling bound for a parser advertising its own limit
    ///
    /// The policy may lower a parser's default, never raise it.
    pub fn n_files_to_sample(&self, parser_max: usize) -> usize {
        self.max_n_files_for_schema_inference.min(parser_max).max(1)
    }

    /// Cap on files enumerated before discovery errors out
    pub fn max_files_to_enumerate(&self) -> usize {
        self.max_files_to_enumerate
    }
}
