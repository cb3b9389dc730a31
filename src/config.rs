//! Configuration for kvjobs
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{KvsError, Result};

/// Main configuration for a kvjobs run
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Job Configuration
    // -------------------------------------------------------------------------
    /// Directory scanned for `*.job` files.
    /// `None` runs a single interactive session on stdin instead.
    pub jobs_dir: Option<PathBuf>,

    /// Max pairs (WRITE) or keys (READ/DELETE) accepted in one command
    pub max_write_size: usize,

    /// Max length of a key or value, in bytes
    pub max_string_size: usize,

    // -------------------------------------------------------------------------
    // Concurrency Configuration
    // -------------------------------------------------------------------------
    /// Number of worker threads draining the job queue
    pub max_threads: usize,

    /// How jobs are handed to workers
    pub dispatch: DispatchPolicy,

    /// Max snapshot threads in flight before BACKUP blocks
    pub max_backups: usize,

    // -------------------------------------------------------------------------
    // Table Configuration
    // -------------------------------------------------------------------------
    /// How keys are mapped to buckets
    pub bucket_strategy: BucketStrategy,

    // -------------------------------------------------------------------------
    // Output Configuration
    // -------------------------------------------------------------------------
    /// Echo READ/DELETE/SHOW results to stdout as well as the job's output file
    pub echo_console: bool,
}

/// Job dispatch policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchPolicy {
    /// N workers each pop jobs from a shared queue until it is empty
    PullQueue,

    /// Jobs are split into rounds of at most N; each round is joined before the next
    BatchedRounds,
}

/// Bucket index strategy for the hash table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketStrategy {
    /// First character: `a-z` → 0..=25, `0-9` → 26..=35, anything else is rejected
    FirstChar,

    /// FNV-1a over the whole key, modulo the table size (every key is accepted)
    Fnv1a,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            jobs_dir: None,
            max_write_size: 256,
            max_string_size: 39,
            max_threads: 1,
            dispatch: DispatchPolicy::PullQueue,
            max_backups: 1,
            bucket_strategy: BucketStrategy::FirstChar,
            echo_console: true,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject configurations that could never make progress
    pub fn validate(&self) -> Result<()> {
        if self.max_threads == 0 {
            return Err(KvsError::Config("max_threads must be at least 1".to_string()));
        }
        if self.max_backups == 0 {
            return Err(KvsError::Config("max_backups must be at least 1".to_string()));
        }
        if self.max_write_size == 0 || self.max_string_size == 0 {
            return Err(KvsError::Config(
                "command size limits must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the directory scanned for job files
    pub fn jobs_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.jobs_dir = Some(path.into());
        self
    }

    /// Set the number of worker threads
    pub fn max_threads(mut self, count: usize) -> Self {
        self.config.max_threads = count;
        self
    }

    /// Set the dispatch policy
    pub fn dispatch(mut self, policy: DispatchPolicy) -> Self {
        self.config.dispatch = policy;
        self
    }

    /// Set the maximum number of concurrent backups
    pub fn max_backups(mut self, count: usize) -> Self {
        self.config.max_backups = count;
        self
    }

    /// Set the bucket index strategy
    pub fn bucket_strategy(mut self, strategy: BucketStrategy) -> Self {
        self.config.bucket_strategy = strategy;
        self
    }

    /// Enable or disable echoing results to stdout
    pub fn echo_console(mut self, echo: bool) -> Self {
        self.config.echo_console = echo;
        self
    }

    /// Set the per-command item limit
    pub fn max_write_size(mut self, size: usize) -> Self {
        self.config.max_write_size = size;
        self
    }

    /// Set the key/value length limit
    pub fn max_string_size(mut self, size: usize) -> Self {
        self.config.max_string_size = size;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
