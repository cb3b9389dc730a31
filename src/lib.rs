//! # kvjobs
//!
//! A concurrent in-memory key-value store driven by job files, with:
//! - A fixed 36-bucket chained hash table
//! - One coarse lock making every store operation atomic
//! - A worker pool draining a queue of job files in parallel
//! - Admission-controlled background backups
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Dispatcher                                │
//! │          (N workers, pull queue or batched rounds)           │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  one job per worker, commands in order
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      Engine                                  │
//! │        WRITE / READ / DELETE / SHOW / BACKUP / WAIT          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌──────────────────┐
//!   │  HashTable  │          │ BackupController │
//!   │   (Mutex)   │ ◄─copy── │ (≤ max in flight)│
//!   └─────────────┘          └────────┬─────────┘
//!                                     │ snapshot threads
//!                                     ▼
//!                              <job>-<n>.bck files
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod table;
pub mod backup;
pub mod job;
pub mod dispatch;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{KvsError, Result};
pub use config::{BucketStrategy, Config, DispatchPolicy};
pub use engine::Engine;
pub use dispatch::{Dispatcher, JobRunner};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of kvjobs
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
