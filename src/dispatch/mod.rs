//! Dispatch Module
//!
//! Runs job files against the engine on a fixed pool of worker threads.
//!
//! ## Architecture
//! - [`Dispatcher`] owns the ordered job list and the worker threads
//! - [`JobRunner`] executes one job's commands serially against the engine
//! - Policies ([`DispatchPolicy`]):
//!   - `PullQueue`: N workers pop jobs from a shared queue until it is empty
//!   - `BatchedRounds`: jobs run N at a time, each round joined before the next
//!
//! Every job runs on exactly one worker, start to finish. A failing job is
//! logged and counted; it never stops other workers.
//!
//! [`DispatchPolicy`]: crate::config::DispatchPolicy

mod dispatcher;
mod worker;

pub use dispatcher::{DispatchReport, Dispatcher};
pub use worker::{JobReport, JobRunner};
