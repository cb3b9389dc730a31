//! Backup admission controller
//!
//! Tracks snapshot threads in flight and blocks new requests once
//! `max_backups` are running.

use std::collections::HashMap;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::{Mutex, MutexGuard};

use crate::error::{KvsError, Result};

/// Snapshot threads not yet reaped, keyed by backup id
struct BackupState {
    next_id: u64,
    running: HashMap<u64, JoinHandle<Result<()>>>,
}

/// Bounded registry of background snapshot threads
///
/// ## Concurrency
/// - `state`: held while admitting, so at most one caller reaps/spawns at a time
/// - finished threads report their id on `done_rx`; reaping blocks on it
/// - snapshot threads never touch `state`, so a blocked admitter cannot
///   deadlock with them
pub struct BackupController {
    max_backups: usize,
    state: Mutex<BackupState>,
    done_tx: Sender<u64>,
    done_rx: Receiver<u64>,
}

impl BackupController {
    /// Create a controller admitting at most `max_backups` concurrent snapshots
    pub fn new(max_backups: usize) -> Self {
        let (done_tx, done_rx) = channel::unbounded();
        Self {
            max_backups: max_backups.max(1),
            state: Mutex::new(BackupState {
                next_id: 1,
                running: HashMap::new(),
            }),
            done_tx,
            done_rx,
        }
    }

    /// Configured limit
    pub fn max_backups(&self) -> usize {
        self.max_backups
    }

    /// Snapshots spawned but not yet reaped
    pub fn in_flight(&self) -> usize {
        self.state.lock().running.len()
    }

    /// Wait until a slot is available and reserve it.
    ///
    /// The returned slot holds the admission lock until it is spawned or
    /// dropped; dropping it without spawning leaves the state unchanged.
    pub fn acquire(&self) -> BackupSlot<'_> {
        let mut state = self.state.lock();
        while state.running.len() >= self.max_backups {
            tracing::debug!(
                "Backups saturated ({}/{}), waiting for one to finish",
                state.running.len(),
                self.max_backups
            );
            self.reap_one(&mut state);
        }
        BackupSlot {
            controller: self,
            state,
        }
    }

    /// Convenience: acquire a slot and spawn `task` in it
    pub fn admit<F>(&self, task: F) -> Result<u64>
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        self.acquire().spawn(task)
    }

    /// Join every snapshot that has already finished, without blocking
    pub fn reap_finished(&self) -> usize {
        let mut state = self.state.lock();
        let mut reaped = 0;
        while let Ok(id) = self.done_rx.try_recv() {
            if Self::join(&mut state, id) {
                reaped += 1;
            }
        }
        reaped
    }

    /// Block until every in-flight snapshot has finished
    pub fn wait_all(&self) {
        let mut state = self.state.lock();
        if !state.running.is_empty() {
            tracing::debug!("Waiting for {} pending backup(s)", state.running.len());
        }
        while !state.running.is_empty() {
            self.reap_one(&mut state);
        }
    }

    /// Block for the next finished snapshot and join it
    fn reap_one(&self, state: &mut BackupState) {
        // `done_tx` lives in `self`, so the channel never disconnects
        if let Ok(id) = self.done_rx.recv() {
            Self::join(state, id);
        }
    }

    fn join(state: &mut BackupState, id: u64) -> bool {
        // Ids of threads that never started are skipped
        let Some(handle) = state.running.remove(&id) else {
            return false;
        };
        match handle.join() {
            Ok(Ok(())) => tracing::debug!("Backup {} finished", id),
            Ok(Err(e)) => tracing::error!("Backup {} failed: {}", id, e),
            Err(_) => tracing::error!("Backup {} panicked", id),
        }
        true
    }
}

impl Drop for BackupController {
    fn drop(&mut self) {
        self.wait_all();
    }
}

/// A reserved backup slot (admission lock held)
pub struct BackupSlot<'a> {
    controller: &'a BackupController,
    state: MutexGuard<'a, BackupState>,
}

impl BackupSlot<'_> {
    /// Run `task` on a new snapshot thread and count it as in flight.
    ///
    /// If the thread cannot be started the slot is released unused and
    /// `KvsError::BackupSpawn` is returned.
    pub fn spawn<F>(mut self, task: F) -> Result<u64>
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        let id = self.state.next_id;
        self.state.next_id += 1;
        let completion = Completion {
            id,
            done_tx: self.controller.done_tx.clone(),
        };

        let handle = thread::Builder::new()
            .name(format!("backup-{}", id))
            .spawn(move || {
                let _completion = completion;
                task()
            })
            .map_err(KvsError::BackupSpawn)?;

        self.state.running.insert(id, handle);
        tracing::debug!(
            "Backup {} started ({}/{} in flight)",
            id,
            self.state.running.len(),
            self.controller.max_backups
        );
        Ok(id)
    }
}

/// Reports a snapshot thread's id when it ends, including by panic
struct Completion {
    id: u64,
    done_tx: Sender<u64>,
}

impl Drop for Completion {
    fn drop(&mut self) {
        let _ = self.done_tx.send(self.id);
    }
}
