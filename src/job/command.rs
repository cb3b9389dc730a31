//! Command definitions
//!
//! Represents one parsed line of a job.

use std::time::Duration;

/// Text printed for the HELP command
pub const HELP_TEXT: &str = "Available commands:\n  \
    WRITE [(key,value)(key2,value2),...]\n  \
    READ [key,key2,...]\n  \
    DELETE [key,key2,...]\n  \
    SHOW\n  \
    WAIT <delay_ms>\n  \
    BACKUP\n  \
    HELP\n";

/// A parsed job command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Store one or more pairs atomically
    Write(Vec<(String, String)>),

    /// Look up one or more keys
    Read(Vec<String>),

    /// Remove one or more keys
    Delete(Vec<String>),

    /// Dump the whole table
    Show,

    /// Suspend the issuing worker
    Wait(Duration),

    /// Snapshot the table to a new backup file
    Backup,

    /// Print the command summary
    Help,

    /// Line that does not follow the grammar (reason attached)
    Invalid(String),

    /// Blank line or comment
    Empty,
}

impl Command {
    /// Upper-case command name, for logging
    pub fn name(&self) -> &'static str {
        match self {
            Command::Write(_) => "WRITE",
            Command::Read(_) => "READ",
            Command::Delete(_) => "DELETE",
            Command::Show => "SHOW",
            Command::Wait(_) => "WAIT",
            Command::Backup => "BACKUP",
            Command::Help => "HELP",
            Command::Invalid(_) => "INVALID",
            Command::Empty => "EMPTY",
        }
    }
}
