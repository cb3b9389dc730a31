//! Job Dispatcher
//!
//! Hands queued job files to worker threads under the configured policy.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use crossbeam::channel;

use crate::config::DispatchPolicy;
use crate::engine::Engine;
use crate::error::{KvsError, Result};

use super::worker::{JobReport, JobRunner};

/// Totals over every dispatched job
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    /// Jobs that ran to the end of their stream
    pub jobs_completed: usize,

    /// Jobs that could not be opened or read
    pub jobs_failed: usize,

    /// Sum of the per-job counters
    pub commands: usize,
    pub invalid: usize,
    pub failed: usize,
}

impl DispatchReport {
    fn record(&mut self, outcome: &Result<JobReport>) {
        match outcome {
            Ok(report) => {
                self.jobs_completed += 1;
                self.commands += report.commands;
                self.invalid += report.invalid;
                self.failed += report.failed;
            }
            Err(_) => self.jobs_failed += 1,
        }
    }

    fn merge(&mut self, other: DispatchReport) {
        self.jobs_completed += other.jobs_completed;
        self.jobs_failed += other.jobs_failed;
        self.commands += other.commands;
        self.invalid += other.invalid;
        self.failed += other.failed;
    }
}

/// Runs queued jobs on a fixed number of worker threads
///
/// Each job is claimed by exactly one worker and run start to finish on it;
/// no ordering across jobs is promised.
pub struct Dispatcher {
    /// Executes a single job
    runner: JobRunner,

    /// Jobs not yet dispatched, in enqueue order
    queue: Vec<PathBuf>,

    /// Worker count
    max_threads: usize,

    /// Pull queue or batched rounds
    policy: DispatchPolicy,
}

impl Dispatcher {
    /// Create a dispatcher using the engine's configured thread count and policy
    pub fn new(engine: Arc<Engine>) -> Self {
        let max_threads = engine.config().max_threads.max(1);
        let policy = engine.config().dispatch;
        Self {
            runner: JobRunner::new(engine),
            queue: Vec::new(),
            max_threads,
            policy,
        }
    }

    /// Override the dispatch policy
    pub fn with_policy(mut self, policy: DispatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Override the worker count
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.max_threads = threads.max(1);
        self
    }

    /// Append a job to the queue
    pub fn enqueue(&mut self, job: impl Into<PathBuf>) {
        self.queue.push(job.into());
    }

    /// Append several jobs, keeping their order
    pub fn enqueue_all<I, P>(&mut self, jobs: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.queue.extend(jobs.into_iter().map(Into::into));
    }

    /// Jobs waiting to be dispatched
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Drain the queue and block until every job has been processed
    pub fn run(&mut self) -> Result<DispatchReport> {
        let jobs = std::mem::take(&mut self.queue);
        if jobs.is_empty() {
            tracing::info!("No jobs to process");
            return Ok(DispatchReport::default());
        }

        tracing::info!(
            "Dispatching {} job(s) on {} worker(s) ({:?})",
            jobs.len(),
            self.max_threads,
            self.policy
        );

        match self.policy {
            DispatchPolicy::PullQueue => self.run_pull_queue(jobs),
            DispatchPolicy::BatchedRounds => self.run_batched_rounds(jobs),
        }
    }

    /// N long-lived workers pop from a shared queue until it is empty
    fn run_pull_queue(&self, jobs: Vec<PathBuf>) -> Result<DispatchReport> {
        let (tx, rx) = channel::unbounded::<PathBuf>();
        let workers = self.max_threads.min(jobs.len());
        for job in jobs {
            // Receiver is alive, so sending cannot fail
            let _ = tx.send(job);
        }
        drop(tx);

        let mut handles = Vec::with_capacity(workers);
        for id in 0..workers {
            let rx = rx.clone();
            let runner = self.runner.clone();
            let spawned = thread::Builder::new()
                .name(format!("worker-{}", id))
                .spawn(move || {
                    let mut report = DispatchReport::default();
                    // Queue empty and closed: worker exits
                    while let Ok(job) = rx.recv() {
                        let outcome = runner.run_file(&job);
                        if let Err(e) = &outcome {
                            tracing::error!("Failed to process {}: {}", job.display(), e);
                        }
                        report.record(&outcome);
                    }
                    report
                });

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => tracing::error!("Failed to create worker {}: {}", id, e),
            }
        }

        if handles.is_empty() {
            return Err(KvsError::Worker("no worker thread could be started".to_string()));
        }

        let mut total = DispatchReport::default();
        for handle in handles {
            match handle.join() {
                Ok(report) => total.merge(report),
                Err(_) => tracing::error!("A worker thread panicked"),
            }
        }

        // Jobs left behind by a panicked worker
        let orphaned = rx.try_iter().count();
        total.jobs_failed += orphaned;
        Ok(total)
    }

    /// Rounds of at most N jobs, one thread per job, each round joined
    /// before the next starts
    fn run_batched_rounds(&self, jobs: Vec<PathBuf>) -> Result<DispatchReport> {
        let mut total = DispatchReport::default();

        for (round, batch) in jobs.chunks(self.max_threads).enumerate() {
            tracing::debug!("Starting round {} with {} job(s)", round + 1, batch.len());

            let round_report = crossbeam::thread::scope(|scope| {
                let handles: Vec<_> = batch
                    .iter()
                    .map(|job| {
                        let runner = &self.runner;
                        scope.spawn(move |_| {
                            let outcome = runner.run_file(job);
                            if let Err(e) = &outcome {
                                tracing::error!("Failed to process {}: {}", job.display(), e);
                            }
                            outcome
                        })
                    })
                    .collect();

                let mut report = DispatchReport::default();
                for handle in handles {
                    match handle.join() {
                        Ok(outcome) => report.record(&outcome),
                        Err(_) => {
                            tracing::error!("A worker thread panicked");
                            report.jobs_failed += 1;
                        }
                    }
                }
                report
            })
            .map_err(|_| KvsError::Worker(format!("round {} panicked", round + 1)))?;

            total.merge(round_report);
        }

        Ok(total)
    }
}
