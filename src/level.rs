//! Severity levels and the shared minimum-level holder.
//!
//! The level set mirrors what operators already write in config files:
//! `debug`, `info`, `warn`, `error`, `dpanic`, `panic` and `fatal`. Parsing is
//! case-insensitive and an empty string means `info`.

use std::{
    fmt,
    str::FromStr,
    sync::{
        Arc,
        atomic::{AtomicI8, Ordering},
    },
};

use crate::error::Error;

/// Log severity, ordered from most to least verbose.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(i8)]
pub enum Level {
    Debug = -1,
    #[default]
    Info = 0,
    Warn = 1,
    Error = 2,
    /// Panics in development builds of the calling application, logs as error otherwise.
    DPanic = 3,
    Panic = 4,
    Fatal = 5,
}

impl Level {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::DPanic => "dpanic",
            Level::Panic => "panic",
            Level::Fatal => "fatal",
        }
    }

    pub const fn as_capital_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::DPanic => "DPANIC",
            Level::Panic => "PANIC",
            Level::Fatal => "FATAL",
        }
    }

    fn from_i8(value: i8) -> Self {
        match value {
            i8::MIN..=-1 => Level::Debug,
            0 => Level::Info,
            1 => Level::Warn,
            2 => Level::Error,
            3 => Level::DPanic,
            4 => Level::Panic,
            _ => Level::Fatal,
        }
    }

    /// Map a `tracing` level onto this level set. `TRACE` folds into `debug`.
    pub fn from_tracing(level: &tracing::Level) -> Self {
        match *level {
            tracing::Level::TRACE | tracing::Level::DEBUG => Level::Debug,
            tracing::Level::INFO => Level::Info,
            tracing::Level::WARN => Level::Warn,
            tracing::Level::ERROR => Level::Error,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(Level::Debug),
            "info" | "" => Ok(Level::Info),
            "warn" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            "dpanic" => Ok(Level::DPanic),
            "panic" => Ok(Level::Panic),
            "fatal" => Ok(Level::Fatal),
            _ => Err(Error::InvalidLevel(s.to_string())),
        }
    }
}

/// Minimum level gate that can be changed while loggers are running.
///
/// Cloning shares the underlying value, so every clone observes
/// [`set_level`](Self::set_level) calls made through any other clone. Build a
/// fresh holder with [`AtomicLevel::new`] when independent gates are wanted.
#[derive(Debug, Clone)]
pub struct AtomicLevel {
    inner: Arc<AtomicI8>,
}

impl AtomicLevel {
    pub fn new(level: Level) -> Self {
        Self {
            inner: Arc::new(AtomicI8::new(level as i8)),
        }
    }

    pub fn level(&self) -> Level {
        Level::from_i8(self.inner.load(Ordering::Relaxed))
    }

    pub fn set_level(&self, level: Level) {
        self.inner.store(level as i8, Ordering::Relaxed);
    }

    /// Whether an event at `level` passes this gate.
    pub fn enabled(&self, level: Level) -> bool {
        level >= self.level()
    }
}

impl Default for AtomicLevel {
    fn default() -> Self {
        Self::new(Level::Info)
    }
}

/// How a level is rendered into an encoded line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelEncoder {
    /// `INFO`, `WARN`, ...
    Capital,
    /// `info`, `warn`, ...
    Lowercase,
}

impl LevelEncoder {
    pub fn render(&self, level: Level) -> &'static str {
        match self {
            LevelEncoder::Capital => level.as_capital_str(),
            LevelEncoder::Lowercase => level.as_str(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("debug", Level::Debug)]
    #[case("INFO", Level::Info)]
    #[case("", Level::Info)]
    #[case("Warn", Level::Warn)]
    #[case("error", Level::Error)]
    #[case("DPanic", Level::DPanic)]
    #[case("panic", Level::Panic)]
    #[case("FATAL", Level::Fatal)]
    fn test_level_parsing(#[case] input: &str, #[case] expected: Level) {
        assert_eq!(input.parse::<Level>().unwrap(), expected);
    }

    #[test]
    fn test_level_parsing_rejects_unknown() {
        let err = "verbose".parse::<Level>().unwrap_err();
        assert!(matches!(err, Error::InvalidLevel(ref s) if s == "verbose"));
    }

    #[test]
    fn test_level_ordering() {
        assert!(Level::Debug < Level::Info);
        assert!(Level::Error < Level::DPanic);
        assert!(Level::Panic < Level::Fatal);
    }

    #[test]
    fn test_atomic_level_gate() {
        let level = AtomicLevel::new(Level::Warn);
        assert!(!level.enabled(Level::Info));
        assert!(level.enabled(Level::Warn));
        assert!(level.enabled(Level::Fatal));

        level.set_level(Level::Debug);
        assert!(level.enabled(Level::Debug));
    }

    #[test]
    fn test_atomic_level_clones_share_state() {
        let level = AtomicLevel::new(Level::Info);
        let shared = level.clone();
        shared.set_level(Level::Error);
        assert_eq!(level.level(), Level::Error);

        let independent = AtomicLevel::new(level.level());
        independent.set_level(Level::Debug);
        assert_eq!(level.level(), Level::Error);
    }

    #[test]
    fn test_atomic_level_concurrent_updates() {
        let level = AtomicLevel::new(Level::Info);
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let level = level.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        if i % 2 == 0 {
                            level.set_level(Level::Debug);
                        } else {
                            let seen = level.level();
                            assert!(seen == Level::Debug || seen == Level::Info);
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(level.level(), Level::Debug);
    }

    #[test]
    fn test_level_encoder() {
        assert_eq!(LevelEncoder::Capital.render(Level::DPanic), "DPANIC");
        assert_eq!(LevelEncoder::Lowercase.render(Level::Warn), "warn");
    }

    #[test]
    fn test_from_tracing_level() {
        assert_eq!(Level::from_tracing(&tracing::Level::TRACE), Level::Debug);
        assert_eq!(Level::from_tracing(&tracing::Level::ERROR), Level::Error);
    }
}
