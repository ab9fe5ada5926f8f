use std::time::Duration;

/// What happens when the transformer rejects a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SkipPolicy {
    /// Drop the record, count it as skipped and keep going.
    Skip,
    /// Fail the chunk and the step.
    #[default]
    Abort,
}

/// Tuning of one chunk-oriented step.
#[derive(Debug, Clone)]
pub struct StepConfig {
    /// Number of records read per chunk
    pub chunk_size: usize,

    pub skip_policy: SkipPolicy,

    /// Maximum number of skipped records over the whole step. Only consulted
    /// under [`SkipPolicy::Skip`].
    pub skip_limit: Option<u64>,

    /// Deadline for reading, transforming and staging a chunk. The sink
    /// commit is not covered: once it starts it runs to completion.
    pub chunk_timeout: Option<Duration>,
}

impl Default for StepConfig {
    fn default() -> Self {
        Self {
            chunk_size: 10,
            skip_policy: SkipPolicy::Abort,
            skip_limit: None,
            chunk_timeout: None,
        }
    }
}

impl StepConfig {
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    pub fn with_skip_policy(mut self, policy: SkipPolicy) -> Self {
        self.skip_policy = policy;
        self
    }

    pub fn with_skip_limit(mut self, limit: u64) -> Self {
        self.skip_limit = Some(limit);
        self
    }

    pub fn with_chunk_timeout(mut self, timeout: Duration) -> Self {
        self.chunk_timeout = Some(timeout);
        self
    }
}
