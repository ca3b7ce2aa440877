//! Logger assembly: an encoder, a sink and a level holder.

use std::io;

use crate::{
    encoder::Encoder,
    event::LogEvent,
    field::Field,
    level::{AtomicLevel, Level},
    sink::Sink,
};

/// Encodes enabled events and writes them to a sink.
#[derive(Debug, Clone)]
pub struct Core {
    encoder: Encoder,
    sink: Sink,
    level: AtomicLevel,
}

impl Core {
    pub fn new(encoder: Encoder, sink: Sink, level: AtomicLevel) -> Self {
        Self {
            encoder,
            sink,
            level,
        }
    }

    pub fn enabled(&self, level: Level) -> bool {
        self.level.enabled(level)
    }

    pub fn write(&self, event: &LogEvent, fields: &[Field]) -> io::Result<()> {
        let line = self.encoder.encode_entry(event, fields);
        self.sink.write_line(&line)
    }

    pub fn with(&self, fields: &[Field]) -> Self {
        Self {
            encoder: self.encoder.with_fields(fields),
            sink: self.sink.clone(),
            level: self.level.clone(),
        }
    }

    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    pub fn sink(&self) -> &Sink {
        &self.sink
    }
}

/// Handle returned by [`Config::build_logger`](crate::Config::build_logger).
///
/// Cloning is cheap and clones share the sink and the level holder, so
/// [`AtomicLevel::set_level`] on one affects all of them.
#[derive(Debug, Clone)]
pub struct Logger {
    core: Option<Core>,
    level: AtomicLevel,
    name: String,
}

impl Logger {
    pub fn new(core: Core) -> Self {
        Self {
            level: core.level.clone(),
            core: Some(core),
            name: String::new(),
        }
    }

    /// A logger that discards everything and reports every level as disabled.
    pub fn nop() -> Self {
        Self {
            core: None,
            level: AtomicLevel::default(),
            name: String::new(),
        }
    }

    pub fn is_nop(&self) -> bool {
        self.core.is_none()
    }

    pub fn enabled(&self, level: Level) -> bool {
        self.core.as_ref().is_some_and(|core| core.enabled(level))
    }

    /// Encode and write `event` if its level is enabled.
    pub fn write(&self, event: &LogEvent, fields: &[Field]) -> io::Result<()> {
        match &self.core {
            Some(core) if core.enabled(event.level) => core.write(event, fields),
            _ => Ok(()),
        }
    }

    /// Shorthand for [`Logger::event`] followed by [`Logger::write`].
    pub fn log(&self, level: Level, message: &str, fields: &[Field]) -> io::Result<()> {
        if !self.enabled(level) {
            return Ok(());
        }
        self.write(&self.event(level, message), fields)
    }

    /// A child logger whose every line also carries `fields`.
    pub fn with(&self, fields: &[Field]) -> Self {
        Self {
            core: self.core.as_ref().map(|core| core.with(fields)),
            level: self.level.clone(),
            name: self.name.clone(),
        }
    }

    /// A child logger with `name` appended to this logger's name, dot-separated.
    pub fn named(&self, name: &str) -> Self {
        let name = match (self.name.is_empty(), name.is_empty()) {
            (_, true) => self.name.clone(),
            (true, false) => name.to_string(),
            (false, false) => format!("{}.{name}", self.name),
        };
        Self {
            core: self.core.clone(),
            level: self.level.clone(),
            name,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> &AtomicLevel {
        &self.level
    }

    pub fn encoder(&self) -> Option<&Encoder> {
        self.core.as_ref().map(Core::encoder)
    }

    pub fn sync(&self) -> io::Result<()> {
        match &self.core {
            Some(core) => core.sink().sync(),
            None => Ok(()),
        }
    }

    /// An event stamped now and carrying this logger's name.
    pub fn event(&self, level: Level, message: impl Into<String>) -> LogEvent {
        LogEvent::new(level, message).with_logger_name(self.name.clone())
    }
}
