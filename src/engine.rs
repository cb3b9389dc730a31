//! Engine Module
//!
//! The store engine that owns the hash table and coordinates backups.
//!
//! ## Responsibilities
//! - Lifecycle of the table (`init` / `terminate`)
//! - Serialize every table operation behind one mutex
//! - Format READ/DELETE/SHOW results and write them to the output sinks
//! - Hand consistent table snapshots to the backup controller

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::backup::BackupController;
use crate::config::Config;
use crate::error::{KvsError, Result};
use crate::job::{format_delete, format_pair, format_read};
use crate::table::HashTable;

/// The store engine
///
/// ## Concurrency Model: one coarse lock
///
/// - **Table**: every operation holds `table` from start to end, so a WRITE
///   batch is atomic with respect to every other operation. SHOW writes its
///   output while holding the lock; READ and DELETE format under the lock and
///   write after releasing it.
///
/// - **Backups**: admission state lives in [`BackupController`] behind its own
///   lock. The only nesting is admission → table (while copying a snapshot);
///   the table lock is never held while waiting for admission.
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// The table; `None` while uninitialized
    table: Mutex<Option<HashTable>>,

    /// In-flight snapshot threads
    backups: BackupController,
}

impl Engine {
    /// Create an engine in the uninitialized state
    pub fn new(config: Config) -> Self {
        let backups = BackupController::new(config.max_backups);
        Self {
            config,
            table: Mutex::new(None),
            backups,
        }
    }

    /// Create and initialize an engine in one step
    pub fn open(config: Config) -> Result<Self> {
        let engine = Self::new(config);
        engine.init()?;
        Ok(engine)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Create the table. Fails if one already exists.
    pub fn init(&self) -> Result<()> {
        let mut table = self.table.lock();
        if table.is_some() {
            return Err(KvsError::AlreadyInitialized);
        }
        let created = table.insert(HashTable::new(self.config.bucket_strategy));
        tracing::debug!("KVS initialized ({:?} buckets)", created.strategy());
        Ok(())
    }

    /// Drain pending backups, then destroy the table.
    ///
    /// The table is detached first, so no backup can be admitted while the
    /// drain runs; it is dropped only once every snapshot has been reaped.
    /// Afterwards every operation fails with `NotInitialized` until `init`
    /// is called again.
    pub fn terminate(&self) -> Result<()> {
        let table = self.table.lock().take().ok_or(KvsError::NotInitialized)?;

        self.backups.wait_all();

        tracing::debug!("KVS terminated with {} pair(s)", table.len());
        drop(table);
        Ok(())
    }

    /// Check whether a table currently exists
    pub fn is_initialized(&self) -> bool {
        self.table.lock().is_some()
    }

    // =========================================================================
    // Store Operations
    // =========================================================================

    /// Store every pair under one lock acquisition.
    ///
    /// Returns how many pairs were stored; keys without a bucket are dropped.
    pub fn write(&self, pairs: &[(String, String)]) -> Result<usize> {
        let mut guard = self.table.lock();
        let table = guard.as_mut().ok_or(KvsError::NotInitialized)?;

        let mut stored = 0;
        for (key, value) in pairs {
            if table.put(key, value) {
                stored += 1;
            } else {
                tracing::warn!("Failed to write keypair ({},{})", key, value);
            }
        }
        Ok(stored)
    }

    /// Look up `keys` and return `[(k,v)(k,KVSERROR)...]` in sorted key order.
    ///
    /// The result is written as one line to `sink` (if any) and echoed to
    /// stdout when `echo_console` is set.
    pub fn read(&self, keys: &[String], sink: Option<&mut dyn Write>) -> Result<String> {
        let mut sorted = keys.to_vec();
        sorted.sort();

        let output = {
            let guard = self.table.lock();
            let table = guard.as_ref().ok_or(KvsError::NotInitialized)?;
            let results: Vec<(&String, Option<String>)> =
                sorted.iter().map(|key| (key, table.get(key))).collect();
            format_read(&results)
        };

        self.emit_line(&output, sink)?;
        Ok(output)
    }

    /// Remove `keys`; return `[(k,KVSMISSING)...]` for absent ones, or `""`.
    ///
    /// Nothing is written when every key existed.
    pub fn delete(&self, keys: &[String], sink: Option<&mut dyn Write>) -> Result<String> {
        let output = {
            let mut guard = self.table.lock();
            let table = guard.as_mut().ok_or(KvsError::NotInitialized)?;
            let missing: Vec<&String> = keys.iter().filter(|key| !table.delete(key)).collect();
            format_delete(&missing)
        };

        if !output.is_empty() {
            self.emit_line(&output, sink)?;
        }
        Ok(output)
    }

    /// Write every pair as `(key, value)` lines, bucket by bucket.
    ///
    /// The lock is held for the whole scan, so concurrent writers wait.
    pub fn show(&self, mut sink: Option<&mut dyn Write>) -> Result<()> {
        let guard = self.table.lock();
        let table = guard.as_ref().ok_or(KvsError::NotInitialized)?;

        let stdout = io::stdout();
        let mut console = self.config.echo_console.then(|| stdout.lock());

        for (key, value) in table.iter() {
            let line = format_pair(key, value);
            if let Some(out) = sink.as_deref_mut() {
                writeln!(out, "{}", line)?;
            }
            if let Some(out) = console.as_mut() {
                writeln!(out, "{}", line)?;
            }
        }

        if let Some(out) = sink {
            out.flush()?;
        }
        Ok(())
    }

    /// Snapshot the table into `target` on a background thread.
    ///
    /// Blocks while `max_backups` snapshots are already in flight. The table
    /// is copied under its lock; the file is written after the lock is
    /// released, and this call returns without waiting for it.
    pub fn backup(&self, target: &Path) -> Result<u64> {
        if !self.is_initialized() {
            return Err(KvsError::NotInitialized);
        }

        let reaped = self.backups.reap_finished();
        if reaped > 0 {
            tracing::trace!("Reaped {} finished backup(s)", reaped);
        }

        let slot = self.backups.acquire();

        let pairs = {
            let guard = self.table.lock();
            guard.as_ref().ok_or(KvsError::NotInitialized)?.snapshot()
        };

        let target = target.to_path_buf();
        let id = slot.spawn(move || write_backup(&target, &pairs))?;
        tracing::debug!("Backup {} scheduled", id);
        Ok(id)
    }

    /// Suspend the calling thread
    pub fn wait(&self, delay: Duration) {
        thread::sleep(delay);
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Number of pairs in the table (0 when uninitialized)
    pub fn len(&self) -> usize {
        self.table.lock().as_ref().map_or(0, HashTable::len)
    }

    /// Check if the table is empty or missing
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Owned copy of every pair, in SHOW order
    pub fn snapshot(&self) -> Result<Vec<(String, String)>> {
        let guard = self.table.lock();
        Ok(guard.as_ref().ok_or(KvsError::NotInitialized)?.snapshot())
    }

    /// The backup admission controller
    pub fn backups(&self) -> &BackupController {
        &self.backups
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn emit_line(&self, line: &str, sink: Option<&mut dyn Write>) -> Result<()> {
        if let Some(out) = sink {
            writeln!(out, "{}", line)?;
            out.flush()?;
        }
        if self.config.echo_console {
            println!("{}", line);
        }
        Ok(())
    }
}

/// Write a snapshot to `target`, one `(key, value)` line per pair
fn write_backup(target: &Path, pairs: &[(String, String)]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(target)?);
    for (key, value) in pairs {
        writeln!(writer, "{}", format_pair(key, value))?;
    }
    writer.flush()?;
    tracing::debug!("Wrote {} pair(s) to {}", pairs.len(), target.display());
    Ok(())
}
