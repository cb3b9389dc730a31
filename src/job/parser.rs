//! Job command parser
//!
//! Turns lines of a job stream into [`Command`]s. Grammar errors never fail
//! the stream: they come back as `Command::Invalid` so the worker can report
//! the line and move on.

use std::io::{BufRead, ErrorKind};
use std::time::Duration;

use crate::config::Config;
use crate::error::{KvsError, Result};

use super::Command;

/// Size limits applied while parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Max pairs or keys per command
    pub max_items: usize,

    /// Max key/value length in bytes
    pub max_string: usize,
}

impl Limits {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_items: config.max_write_size,
            max_string: config.max_string_size,
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Reads commands from a buffered stream, one per line
pub struct CommandReader<R> {
    reader: R,
    limits: Limits,
    line: String,
    line_number: usize,
}

impl<R: BufRead> CommandReader<R> {
    pub fn new(reader: R, limits: Limits) -> Self {
        Self {
            reader,
            limits,
            line: String::new(),
            line_number: 0,
        }
    }

    /// 1-based number of the last line returned
    pub fn line_number(&self) -> usize {
        self.line_number
    }
}

impl<R: BufRead> Iterator for CommandReader<R> {
    type Item = Result<Command>;

    fn next(&mut self) -> Option<Self::Item> {
        self.line.clear();
        match self.reader.read_line(&mut self.line) {
            Ok(0) => None,
            Ok(_) => {
                self.line_number += 1;
                Some(Ok(parse_line(&self.line, self.limits)))
            }
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                // `read_line` has consumed the bad line; the stream can go on
                self.line_number += 1;
                Some(Err(KvsError::Parse(format!(
                    "line {} is not valid UTF-8",
                    self.line_number
                ))))
            }
            Err(e) => Some(Err(e.into())),
        }
    }
}

/// Parse a single line
pub fn parse_line(line: &str, limits: Limits) -> Command {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Command::Empty;
    }

    let (keyword, rest) = match line.split_once(char::is_whitespace) {
        Some((keyword, rest)) => (keyword, rest.trim()),
        None => (line, ""),
    };

    let parsed = match keyword {
        "WRITE" => parse_pairs(rest, limits).map(Command::Write),
        "READ" => parse_keys(rest, limits).map(Command::Read),
        "DELETE" => parse_keys(rest, limits).map(Command::Delete),
        "SHOW" => no_arguments(rest).map(|_| Command::Show),
        "BACKUP" => no_arguments(rest).map(|_| Command::Backup),
        "HELP" => no_arguments(rest).map(|_| Command::Help),
        "WAIT" => parse_delay(rest).map(Command::Wait),
        other => Err(format!("unknown command '{}'", other)),
    };

    parsed.unwrap_or_else(Command::Invalid)
}

// =============================================================================
// Argument Parsers
// =============================================================================

type Parsed<T> = std::result::Result<T, String>;

fn no_arguments(rest: &str) -> Parsed<()> {
    if rest.is_empty() {
        Ok(())
    } else {
        Err(format!("unexpected arguments '{}'", rest))
    }
}

fn parse_delay(rest: &str) -> Parsed<Duration> {
    rest.parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| format!("invalid delay '{}'", rest))
}

fn bracketed(rest: &str) -> Parsed<&str> {
    rest.strip_prefix('[')
        .and_then(|inner| inner.strip_suffix(']'))
        .ok_or_else(|| format!("expected [...] but found '{}'", rest))
}

fn checked_token(token: &str, limits: Limits) -> Parsed<String> {
    let token = token.trim();
    if token.is_empty() {
        return Err("empty key or value".to_string());
    }
    if token.len() > limits.max_string {
        return Err(format!(
            "'{}' exceeds {} characters",
            token, limits.max_string
        ));
    }
    if token.contains(&['[', ']', '(', ')', ','][..]) {
        return Err(format!("'{}' contains a reserved character", token));
    }
    Ok(token.to_string())
}

fn check_count(count: usize, limits: Limits) -> Parsed<()> {
    if count > limits.max_items {
        return Err(format!("{} items exceed the limit of {}", count, limits.max_items));
    }
    Ok(())
}

/// `[k1,k2,...]`
fn parse_keys(rest: &str, limits: Limits) -> Parsed<Vec<String>> {
    let inner = bracketed(rest)?;
    let keys = inner
        .split(',')
        .map(|token| checked_token(token, limits))
        .collect::<Parsed<Vec<_>>>()?;
    check_count(keys.len(), limits)?;
    Ok(keys)
}

/// `[(k1,v1)(k2,v2)...]`, pairs optionally separated by commas or spaces
fn parse_pairs(rest: &str, limits: Limits) -> Parsed<Vec<(String, String)>> {
    let mut inner = bracketed(rest)?;
    let mut pairs = Vec::new();

    loop {
        inner = inner.trim_start_matches(|c: char| c == ',' || c.is_whitespace());
        if inner.is_empty() {
            break;
        }

        let body = inner
            .strip_prefix('(')
            .ok_or_else(|| format!("expected '(' at '{}'", inner))?;
        let (pair, remainder) = body
            .split_once(')')
            .ok_or_else(|| "unterminated pair".to_string())?;
        let (key, value) = pair
            .split_once(',')
            .ok_or_else(|| format!("pair '({})' has no value", pair))?;

        pairs.push((checked_token(key, limits)?, checked_token(value, limits)?));
        inner = remainder;
    }

    if pairs.is_empty() {
        return Err("no pairs given".to_string());
    }
    check_count(pairs.len(), limits)?;
    Ok(pairs)
}
