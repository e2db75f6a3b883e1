//! Backup progress reporting.
//!
//! Progress goes to **stderr** so stdout stays clean for scripts. The
//! human reporter is on by default when stderr is a terminal.

use std::io::Write;

/// A single progress event during `redem backup`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BackupProgressEvent {
    /// Listing is being fetched for `user`.
    Fetching { user: String, subset: &'static str },
    /// Fetch finished with `count` records.
    Fetched {
        user: String,
        subset: &'static str,
        count: usize,
    },
    /// URIs extracted from `n` of `total` records.
    Indexing { user: String, n: usize, total: usize },
}

/// Receives progress events from the assembler.
pub trait BackupProgressReporter: Send + Sync {
    fn report(&self, event: BackupProgressEvent);
}

/// Human-friendly progress: "backup someone  indexing  1,200 / 2,000 records".
pub struct StderrProgress;

impl BackupProgressReporter for StderrProgress {
    fn report(&self, event: BackupProgressEvent) {
        let line = match &event {
            BackupProgressEvent::Fetching { user, subset } => {
                format!("backup {}  fetching {}...\n", user, subset)
            }
            BackupProgressEvent::Fetched {
                user,
                subset,
                count,
            } => format!(
                "backup {}  fetched {} {}\n",
                user,
                format_number(*count as u64),
                subset
            ),
            BackupProgressEvent::Indexing { user, n, total } => format!(
                "backup {}  indexing  {} / {} records\n",
                user,
                format_number(*n as u64),
                format_number(*total as u64)
            ),
        };
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl BackupProgressReporter for NoProgress {
    fn report(&self, _event: BackupProgressEvent) {}
}

/// Pick a reporter: human progress when stderr is a TTY and not quiet.
pub fn reporter(quiet: bool) -> Box<dyn BackupProgressReporter> {
    if !quiet && atty::is(atty::Stream::Stderr) {
        Box::new(StderrProgress)
    } else {
        Box::new(NoProgress)
    }
}

pub(crate) fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}
