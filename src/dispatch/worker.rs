//! Job Runner
//!
//! Executes the commands of a single job, in order, against the engine.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::sync::Arc;

use crate::engine::Engine;
use crate::error::{KvsError, Result};
use crate::job::{output_path, reserve_backup_path, Command, CommandReader, Limits, HELP_TEXT};

/// Per-job command counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct JobReport {
    /// Non-empty commands seen
    pub commands: usize,

    /// Commands rejected by the parser
    pub invalid: usize,

    /// Commands the engine failed to execute
    pub failed: usize,
}

/// Runs jobs against a shared engine
#[derive(Clone)]
pub struct JobRunner {
    /// Reference to the storage engine
    engine: Arc<Engine>,

    /// Parser limits taken from the engine's config
    limits: Limits,
}

impl JobRunner {
    /// Create a runner for `engine`
    pub fn new(engine: Arc<Engine>) -> Self {
        let limits = Limits::from_config(engine.config());
        Self { engine, limits }
    }

    /// Run a job file.
    ///
    /// Results go to `<job>.out` (created or truncated); backups go to
    /// `<job>-<n>.bck` next to the job.
    pub fn run_file(&self, job: &Path) -> Result<JobReport> {
        tracing::info!("Processing job file: {}", job.display());

        let input = BufReader::new(File::open(job)?);
        let mut output = File::create(output_path(job))?;

        let report = self.run_commands(input, Some(&mut output), job)?;
        tracing::info!(
            "Finished {}: {} command(s), {} invalid, {} failed",
            job.display(),
            report.commands,
            report.invalid,
            report.failed
        );
        Ok(report)
    }

    /// Run every command of `reader` in order.
    ///
    /// `backup_base` names the backups: `<dir>/<stem>-<n>.bck`.
    /// Only an I/O error on `reader` aborts the job; undecodable lines and
    /// command failures are logged, counted, and skipped.
    pub fn run_commands<R: BufRead>(
        &self,
        reader: R,
        mut sink: Option<&mut dyn Write>,
        backup_base: &Path,
    ) -> Result<JobReport> {
        let mut report = JobReport::default();
        let mut commands = CommandReader::new(reader, self.limits);

        while let Some(command) = commands.next() {
            let command = match command {
                Ok(command) => command,
                Err(KvsError::Parse(reason)) => Command::Invalid(reason),
                Err(e) => return Err(e),
            };
            if command == Command::Empty {
                continue;
            }
            report.commands += 1;

            let line = commands.line_number();
            tracing::trace!("{}:{} {:?}", backup_base.display(), line, command);

            let name = command.name();
            let outcome = match command {
                Command::Write(pairs) => self.engine.write(&pairs).map(|_| ()),
                Command::Read(keys) => self.engine.read(&keys, reborrow(&mut sink)).map(|_| ()),
                Command::Delete(keys) => self.engine.delete(&keys, reborrow(&mut sink)).map(|_| ()),
                Command::Show => self.engine.show(reborrow(&mut sink)),
                Command::Wait(delay) => {
                    tracing::info!("Waiting for {} ms", delay.as_millis());
                    self.engine.wait(delay);
                    Ok(())
                }
                Command::Backup => reserve_backup_path(backup_base)
                    .and_then(|target| self.engine.backup(&target))
                    .map(|_| ()),
                Command::Help => {
                    print!("{}", HELP_TEXT);
                    Ok(())
                }
                Command::Invalid(reason) => {
                    tracing::warn!(
                        "Invalid command in {} line {}: {}",
                        backup_base.display(),
                        line,
                        reason
                    );
                    report.invalid += 1;
                    Ok(())
                }
                Command::Empty => Ok(()),
            };

            if let Err(e) = outcome {
                tracing::error!(
                    "{} failed in {} line {}: {}",
                    name,
                    backup_base.display(),
                    line,
                    e
                );
                report.failed += 1;
            }
        }

        Ok(report)
    }

    /// The engine this runner drives
    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }
}

/// Reborrow the job's sink for one engine call
fn reborrow<'a>(sink: &'a mut Option<&mut dyn Write>) -> Option<&'a mut dyn Write> {
    match sink {
        Some(out) => {
            let out: &'a mut dyn Write = &mut **out;
            Some(out)
        }
        None => None,
    }
}
