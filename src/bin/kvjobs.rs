//! kvjobs Binary
//!
//! Runs every `*.job` file of a directory on a worker pool, or reads
//! commands interactively from stdin when no directory is given.

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use kvjobs::job::collect_jobs;
use kvjobs::{BucketStrategy, Config, DispatchPolicy, Dispatcher, Engine, JobRunner};
use tracing_subscriber::{fmt, EnvFilter};

/// kvjobs
#[derive(Parser, Debug)]
#[command(name = "kvjobs")]
#[command(about = "Concurrent in-memory key-value store driven by job files")]
#[command(version)]
struct Args {
    /// Directory containing .job files (omit for an interactive session)
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Maximum concurrent backups
    #[arg(short = 'b', long, default_value = "1")]
    max_backups: usize,

    /// Number of worker threads
    #[arg(short = 't', long, default_value = "1")]
    max_threads: usize,

    /// How jobs are handed to workers
    #[arg(long, value_enum, default_value = "queue")]
    dispatch: DispatchArg,

    /// Bucket index strategy
    #[arg(long, value_enum, default_value = "first-char")]
    hash: HashArg,

    /// Do not echo READ/DELETE/SHOW results to stdout
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DispatchArg {
    Queue,
    Rounds,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum HashArg {
    FirstChar,
    Fnv1a,
}

fn main() -> ExitCode {
    // Logs go to stderr; stdout carries command output
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,kvjobs=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    tracing::info!("kvjobs v{}", kvjobs::VERSION);

    let mut builder = Config::builder()
        .max_backups(args.max_backups)
        .max_threads(args.max_threads)
        .dispatch(match args.dispatch {
            DispatchArg::Queue => DispatchPolicy::PullQueue,
            DispatchArg::Rounds => DispatchPolicy::BatchedRounds,
        })
        .bucket_strategy(match args.hash {
            HashArg::FirstChar => BucketStrategy::FirstChar,
            HashArg::Fnv1a => BucketStrategy::Fnv1a,
        })
        .echo_console(!args.quiet);
    if let Some(dir) = &args.dir {
        builder = builder.jobs_dir(dir);
    }
    let config = builder.build();

    if let Err(e) = config.validate() {
        tracing::error!("{}", e);
        return ExitCode::FAILURE;
    }

    // Collect jobs before touching the store: an unreadable directory is fatal
    let jobs = match &config.jobs_dir {
        Some(dir) => match collect_jobs(dir) {
            Ok(jobs) => Some(jobs),
            Err(e) => {
                tracing::error!("Error opening directory {}: {}", dir.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => None,
    };

    let engine = match Engine::open(config) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("Failed to initialize KVS: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match jobs {
        Some(jobs) => {
            let mut dispatcher = Dispatcher::new(Arc::clone(&engine));
            dispatcher.enqueue_all(jobs);
            match dispatcher.run() {
                Ok(report) => tracing::info!(
                    "Processed {} job(s) ({} failed): {} command(s), {} invalid, {} failed",
                    report.jobs_completed,
                    report.jobs_failed,
                    report.commands,
                    report.invalid,
                    report.failed
                ),
                Err(e) => {
                    tracing::error!("Dispatch failed: {}", e);
                    let _ = engine.terminate();
                    return ExitCode::FAILURE;
                }
            }
        }
        None => {
            tracing::info!("Interactive session: reading commands from stdin");
            let runner = JobRunner::new(Arc::clone(&engine));
            let stdin = io::stdin();
            if let Err(e) = runner.run_commands(stdin.lock(), None, Path::new("session")) {
                tracing::error!("Session aborted: {}", e);
            }
        }
    }

    // Waits for in-flight backups before releasing the table
    if let Err(e) = engine.terminate() {
        tracing::error!("Failed to terminate KVS: {}", e);
        return ExitCode::FAILURE;
    }

    tracing::info!("Done");
    ExitCode::SUCCESS
}
