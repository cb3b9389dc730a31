//! Job discovery and path derivation
//!
//! - `collect_jobs`: every `*.job` file of a directory, sorted
//! - `output_path`: `name.job` → `name.out`
//! - `reserve_backup_path`: first free `name-N.bck` next to the job

use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Extension of job files
pub const JOB_EXTENSION: &str = "job";

/// Extension of per-job output files
pub const OUTPUT_EXTENSION: &str = "out";

/// Extension of backup files
pub const BACKUP_EXTENSION: &str = "bck";

/// Find every job file directly inside `dir`, sorted by path
pub fn collect_jobs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut jobs = Vec::new();

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_job = path.extension().map_or(false, |ext| ext == JOB_EXTENSION);
        if is_job && path.is_file() {
            jobs.push(path);
        }
    }

    jobs.sort();
    Ok(jobs)
}

/// Output file for a job: same directory and stem, `.out` extension
pub fn output_path(job: &Path) -> PathBuf {
    job.with_extension(OUTPUT_EXTENSION)
}

/// Create and return the first `<stem>-<n>.bck` (n ≥ 1) that does not exist yet.
///
/// The file is created with `create_new`, so concurrent callers for the same
/// job always end up with distinct files and existing backups are never
/// overwritten.
pub fn reserve_backup_path(job: &Path) -> Result<PathBuf> {
    let stem = job
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "backup".to_string());
    let dir = job.parent().unwrap_or_else(|| Path::new(""));

    let mut n: u64 = 1;
    loop {
        let candidate = dir.join(format!("{}-{}.{}", stem, n, BACKUP_EXTENSION));
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(_) => return Ok(candidate),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => n += 1,
            Err(e) => return Err(e.into()),
        }
    }
}
