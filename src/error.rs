//! Error types for kvjobs
//!
//! Provides a unified error type for all operations.
//!
//! A key that is absent on READ or DELETE is not an error: those misses are
//! reported inline through the `KVSERROR` / `KVSMISSING` markers.

use thiserror::Error;

/// Result type alias using KvsError
pub type Result<T> = std::result::Result<T, KvsError>;

/// Unified error type for kvjobs operations
#[derive(Debug, Error)]
pub enum KvsError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Lifecycle Errors
    // -------------------------------------------------------------------------
    #[error("KVS state has already been initialized")]
    AlreadyInitialized,

    #[error("KVS state must be initialized")]
    NotInitialized,

    // -------------------------------------------------------------------------
    // Backup Errors
    // -------------------------------------------------------------------------
    #[error("Failed to start backup: {0}")]
    BackupSpawn(std::io::Error),

    // -------------------------------------------------------------------------
    // Job Errors
    // -------------------------------------------------------------------------
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Worker error: {0}")]
    Worker(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
