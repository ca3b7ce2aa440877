//! In-memory snapshot of a single log call.

use std::fmt;

use chrono::{DateTime, FixedOffset, Local};

use crate::level::Level;

/// Source location of the log call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub file: String,
    pub line: u32,
}

impl Caller {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }

    /// `dir/file.rs:42`, keeping only the last directory component.
    pub fn trimmed(&self) -> String {
        let file = self.file.replace('\\', "/");
        let mut parts = file.rsplitn(3, '/');
        let name = parts.next().unwrap_or_default();
        match parts.next() {
            Some(dir) => format!("{dir}/{name}:{}", self.line),
            None => format!("{name}:{}", self.line),
        }
    }
}

impl fmt::Display for Caller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

#[derive(Debug, Clone)]
pub struct LogEvent {
    /// Rendered in its own offset, so a local-time event stays local in the output.
    pub timestamp: DateTime<FixedOffset>,
    pub level: Level,
    pub message: String,
    pub logger_name: String,
    pub caller: Option<Caller>,
    /// Empty when the event carries no stack trace.
    pub stack: String,
}

impl LogEvent {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now().fixed_offset(),
            level,
            message: message.into(),
            logger_name: String::new(),
            caller: None,
            stack: String::new(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<FixedOffset>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_logger_name(mut self, name: impl Into<String>) -> Self {
        self.logger_name = name.into();
        self
    }

    pub fn with_caller(mut self, caller: Caller) -> Self {
        self.caller = Some(caller);
        self
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = stack.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caller_trimmed() {
        assert_eq!(
            Caller::new("/home/ci/src/encoder/syslog.rs", 42).trimmed(),
            "encoder/syslog.rs:42"
        );
        assert_eq!(Caller::new("main.rs", 7).trimmed(), "main.rs:7");
        assert_eq!(Caller::new("src\\lib.rs", 3).trimmed(), "src/lib.rs:3");
    }

    #[test]
    fn test_caller_display_is_full_path() {
        assert_eq!(
            Caller::new("/srv/app/src/main.rs", 10).to_string(),
            "/srv/app/src/main.rs:10"
        );
    }
}
