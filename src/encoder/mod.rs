//! Line encoders.
//!
//! One [`Encoder`] is selected when a logger is built and is never switched
//! afterwards:
//!
//! | Variant | Selected by | Output |
//! |---------|-------------|--------|
//! | [`Encoder::Mixed`] | `encoding=mixed` (default) | `[time] LEVEL [logger] message {fields}` |
//! | [`Encoder::Json`] | `encoding=json` | one JSON object per line |
//! | [`Encoder::Console`] | `encoding=console` | tab-separated header, JSON fields |
//! | [`Encoder::SyslogError`] | `rsyslog://` target, `type=err` | syslog header + fixed-schema JSON body |
//! | [`Encoder::SyslogAccess`] | `rsyslog://` target, `type=access` | syslog header + access-log JSON body |
//!
//! Every variant is built on a [`JsonEncoder`] that carries the persistent
//! context fields added through [`Encoder::with_fields`]. Encoding takes
//! `&self` and writes into fresh buffers, so one encoder can serve concurrent
//! callers.

pub mod access;
pub mod console;
pub mod json;
pub mod syslog;

use std::{fmt, str::FromStr};

pub use access::SyslogAccessEncoder;
use chrono::{DateTime, FixedOffset};
pub use console::{ConsoleEncoder, MixedEncoder};
pub use json::{ArrayEncoder, JsonEncoder};
pub use syslog::{SyslogBase, SyslogErrorEncoder};

use crate::{
    error::Error,
    event::{Caller, LogEvent},
    field::Field,
    level::LevelEncoder,
};

/// Key names and value policies shared by all encoders.
///
/// An empty key disables the corresponding element.
#[derive(Debug, Clone)]
pub struct EncoderConfig {
    pub message_key: &'static str,
    pub level_key: &'static str,
    pub time_key: &'static str,
    pub name_key: &'static str,
    pub caller_key: &'static str,
    pub stacktrace_key: &'static str,
    pub encode_level: LevelEncoder,
    pub encode_time: TimeEncoding,
    pub encode_duration: DurationEncoding,
    pub encode_caller: CallerEncoder,
}

impl EncoderConfig {
    /// Schema for local (file/stdout/stderr) targets.
    pub fn local(time: TimeEncoding, duration: DurationEncoding) -> Self {
        Self {
            message_key: "message",
            level_key: "level",
            time_key: "timestamp",
            name_key: "logger",
            caller_key: "caller",
            stacktrace_key: "stacktrace",
            encode_level: LevelEncoder::Capital,
            encode_time: time,
            encode_duration: duration,
            encode_caller: CallerEncoder::Short,
        }
    }

    /// Schema for `rsyslog://` targets.
    pub fn rsyslog(time: TimeEncoding, duration: DurationEncoding) -> Self {
        Self {
            message_key: "msg",
            encode_level: LevelEncoder::Lowercase,
            ..Self::local(time, duration)
        }
    }
}

/// A rendered value that is either text or a number.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Text(String),
    Int(i64),
    Float(f64),
}

impl Scalar {
    pub fn append_json(&self, buf: &mut Vec<u8>) {
        match self {
            Scalar::Text(text) => json::append_quoted(buf, text),
            Scalar::Int(value) => buf.extend_from_slice(value.to_string().as_bytes()),
            Scalar::Float(value) => json::append_float(buf, *value),
        }
    }

    /// Unquoted form for human-oriented layouts.
    pub fn append_plain(&self, buf: &mut Vec<u8>) {
        match self {
            Scalar::Text(text) => buf.extend_from_slice(text.as_bytes()),
            Scalar::Int(value) => buf.extend_from_slice(value.to_string().as_bytes()),
            Scalar::Float(value) => {
                let mut tmp = Vec::new();
                json::append_float(&mut tmp, *value);
                buf.extend(tmp.into_iter().filter(|b| *b != b'"'));
            }
        }
    }
}

/// How event timestamps are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimeEncoding {
    /// Float milliseconds since the Unix epoch.
    Millis,
    /// Integer nanoseconds since the Unix epoch.
    Nanos,
    /// Float seconds since the Unix epoch.
    Epoch,
    /// `2006-01-02T15:04:05.000Z0700`
    #[default]
    Iso8601,
}

impl TimeEncoding {
    pub fn render(&self, ts: &DateTime<FixedOffset>) -> Scalar {
        let nanos = ts
            .timestamp_nanos_opt()
            .unwrap_or_else(|| ts.timestamp().saturating_mul(1_000_000_000));
        match self {
            TimeEncoding::Millis => Scalar::Float(nanos as f64 / 1e6),
            TimeEncoding::Nanos => Scalar::Int(nanos),
            TimeEncoding::Epoch => Scalar::Float(nanos as f64 / 1e9),
            TimeEncoding::Iso8601 => {
                let zone = if ts.offset().local_minus_utc() == 0 {
                    "Z".to_string()
                } else {
                    ts.format("%z").to_string()
                };
                Scalar::Text(format!("{}{zone}", ts.format("%Y-%m-%dT%H:%M:%S%.3f")))
            }
        }
    }
}

impl FromStr for TimeEncoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "millis" => Ok(TimeEncoding::Millis),
            "nanos" => Ok(TimeEncoding::Nanos),
            "epoch" => Ok(TimeEncoding::Epoch),
            "iso8601" | "" => Ok(TimeEncoding::Iso8601),
            _ => Err(Error::UnknownTimeEncoding(s.to_string())),
        }
    }
}

/// How duration fields are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DurationEncoding {
    /// Float seconds.
    #[default]
    Seconds,
    /// Integer nanoseconds.
    Nanos,
    /// Human-readable, e.g. `1m30s`, `1.5s` or `250ms`.
    String,
}

impl DurationEncoding {
    pub fn render(&self, nanos: i64) -> Scalar {
        match self {
            DurationEncoding::Seconds => Scalar::Float(nanos as f64 / 1e9),
            DurationEncoding::Nanos => Scalar::Int(nanos),
            DurationEncoding::String => Scalar::Text(human_duration(nanos)),
        }
    }
}

/// Hours, minutes and fractional seconds with zero leading units left out.
/// Durations under a second use the largest unit that keeps the integer
/// part non-zero.
fn human_duration(nanos: i64) -> String {
    const SECOND: u64 = 1_000_000_000;

    let sign = if nanos < 0 { "-" } else { "" };
    let n = nanos.unsigned_abs();
    match n {
        0 => "0s".to_string(),
        1..1_000 => format!("{sign}{n}ns"),
        1_000..1_000_000 => format!("{sign}{}\u{b5}s", decimal(n, 1_000)),
        1_000_000..SECOND => format!("{sign}{}ms", decimal(n, 1_000_000)),
        _ => {
            let total_secs = n / SECOND;
            let (hours, minutes) = (total_secs / 3600, total_secs / 60 % 60);
            let seconds = decimal(n % (60 * SECOND), SECOND);
            match (hours, minutes) {
                (0, 0) => format!("{sign}{seconds}s"),
                (0, m) => format!("{sign}{m}m{seconds}s"),
                (h, m) => format!("{sign}{h}h{m}m{seconds}s"),
            }
        }
    }
}

/// `value / unit` as a decimal without trailing zeros.
fn decimal(value: u64, unit: u64) -> String {
    let (whole, rem) = (value / unit, value % unit);
    if rem == 0 {
        return whole.to_string();
    }
    let width = unit.ilog10() as usize;
    let frac = format!("{rem:0width$}");
    format!("{whole}.{}", frac.trim_end_matches('0'))
}

impl FromStr for DurationEncoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "seconds" | "" => Ok(DurationEncoding::Seconds),
            "nanos" => Ok(DurationEncoding::Nanos),
            "string" => Ok(DurationEncoding::String),
            _ => Err(Error::UnknownDurationEncoding(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CallerEncoder {
    /// `dir/file.rs:42`
    #[default]
    Short,
    /// Full path as recorded by the call site.
    Full,
}

impl CallerEncoder {
    pub fn render(&self, caller: &Caller) -> String {
        match self {
            CallerEncoder::Short => caller.trimmed(),
            CallerEncoder::Full => caller.to_string(),
        }
    }
}

/// The encoder chosen for a logger.
#[derive(Debug, Clone)]
pub enum Encoder {
    Json(JsonEncoder),
    Console(ConsoleEncoder),
    Mixed(MixedEncoder),
    SyslogError(SyslogErrorEncoder),
    SyslogAccess(SyslogAccessEncoder),
}

impl Encoder {
    /// Encode one event into a newline-terminated line owned by the caller.
    pub fn encode_entry(&self, event: &LogEvent, fields: &[Field]) -> Vec<u8> {
        match self {
            Encoder::Json(enc) => enc.encode_entry(event, fields),
            Encoder::Console(enc) => enc.encode_entry(event, fields),
            Encoder::Mixed(enc) => enc.encode_entry(event, fields),
            Encoder::SyslogError(enc) => enc.encode_entry(event, fields),
            Encoder::SyslogAccess(enc) => enc.encode_entry(event, fields),
        }
    }

    /// A copy of this encoder whose persistent context also holds `fields`.
    pub fn with_fields(&self, fields: &[Field]) -> Self {
        let mut enc = self.clone();
        enc.context_mut().add_fields(fields);
        enc
    }

    pub fn config(&self) -> &EncoderConfig {
        self.context().config()
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Encoder::Json(_) => "json",
            Encoder::Console(_) => "console",
            Encoder::Mixed(_) => "mixed",
            Encoder::SyslogError(_) => "rsyslog-err",
            Encoder::SyslogAccess(_) => "rsyslog-access",
        }
    }

    fn context(&self) -> &JsonEncoder {
        match self {
            Encoder::Json(enc) => enc,
            Encoder::Console(enc) => enc.context(),
            Encoder::Mixed(enc) => enc.context(),
            Encoder::SyslogError(enc) => enc.base().context(),
            Encoder::SyslogAccess(enc) => enc.base().context(),
        }
    }

    fn context_mut(&mut self) -> &mut JsonEncoder {
        match self {
            Encoder::Json(enc) => enc,
            Encoder::Console(enc) => enc.context_mut(),
            Encoder::Mixed(enc) => enc.context_mut(),
            Encoder::SyslogError(enc) => enc.base_mut().context_mut(),
            Encoder::SyslogAccess(enc) => enc.base_mut().context_mut(),
        }
    }
}

impl fmt::Display for Encoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}
