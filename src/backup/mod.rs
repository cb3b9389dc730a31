//! Backup Module
//!
//! Admission control for background snapshots.
//!
//! ## State Machine
//! ```text
//!            admit (spawn snapshot thread)
//!   ┌───────────┐  in_flight == max   ┌───────────┐
//!   │ Available │ ──────────────────► │ Saturated │
//!   └───────────┘ ◄────────────────── └───────────┘
//!                  reap one finished
//!                  snapshot thread
//! ```
//!
//! A request arriving while Saturated blocks the caller until one snapshot
//! finishes. Slots are reserved as soon as a snapshot is spawned, not when it
//! completes.

mod controller;

pub use controller::{BackupController, BackupSlot};
