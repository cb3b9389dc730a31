//! Job Module
//!
//! Everything a worker needs to turn a job file into engine calls.
//!
//! ## Job File Format
//! One command per line:
//! ```text
//! # comment
//! WRITE [(key,value)(key2,value2)]
//! READ [key,key2]
//! DELETE [key]
//! SHOW
//! WAIT 250
//! BACKUP
//! HELP
//! ```
//!
//! ## Output Format
//! - READ:   `[(a,1)(b,KVSERROR)]`
//! - DELETE: `[(c,KVSMISSING)]`, or nothing when every key existed
//! - SHOW / backup files: one `(key, value)` line per pair

mod command;
mod parser;
mod format;
mod paths;

pub use command::{Command, HELP_TEXT};
pub use parser::{parse_line, CommandReader, Limits};
pub use format::{format_delete, format_pair, format_read, parse_pair_line, ERROR_MARKER, MISSING_MARKER};
pub use paths::{collect_jobs, output_path, reserve_backup_path, BACKUP_EXTENSION, JOB_EXTENSION, OUTPUT_EXTENSION};
