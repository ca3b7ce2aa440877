//! rsyslog carriage format for error/application logs.
//!
//! # Format
//!
//! ```text
//! <Mon DD HH:MM:SS> <hostname> <app-name>: {<json body>}
//! ```
//!
//! The body has a fixed set of top-level keys. Everything else the call site
//! attached is folded into a catch-all object that is embedded as a JSON
//! *string* under `extra`:
//!
//! ```text
//! May 04 10:20:30 web-1 graphite: {"component":"svc","context_id":7,"event_datetime":"2021-05-04T10:20:30.123456","event_date":"2021-05-04","msg":"hello","level":"info","extra":"{\"peer\":\"10.0.0.1\"}"}
//! ```
//!
//! The string embedding is part of the wire contract expected by the rsyslog
//! pipeline: consumers un-escape `extra` to get the structured data back.
//!
//! The header and the `extra` sealing step are shared with
//! [`SyslogAccessEncoder`](super::SyslogAccessEncoder).

use chrono::{DateTime, FixedOffset};

use crate::{
    buffer::BufferPool,
    encoder::{EncoderConfig, JsonEncoder, json::append_escaped},
    error::Error,
    event::LogEvent,
    field::Field,
    level::Level,
};

static HEADER_POOL: BufferPool = BufferPool::new();

/// Timestamps derived once per event.
pub(crate) struct EventTimes {
    /// `2021-05-04T10:20:30.123456`, in the event's own offset.
    pub iso: String,
    /// `May 04 10:20:30`
    pub syslog: String,
}

impl EventTimes {
    pub fn of(ts: &DateTime<FixedOffset>) -> Self {
        Self {
            iso: ts.format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            syslog: ts.format("%b %d %H:%M:%S").to_string(),
        }
    }

    pub fn date(&self) -> &str {
        self.iso.get(..10).unwrap_or(&self.iso)
    }
}

pub(crate) fn local_hostname() -> Result<String, Error> {
    let name = hostname::get().map_err(Error::HostnameUnavailable)?;
    Ok(name.to_string_lossy().into_owned())
}

/// Writes `<ts> <hostname> <app-name>: ` unquoted. JSON metacharacters are
/// backslash-escaped so a stray newline cannot split the line.
pub(crate) fn write_header(out: &mut Vec<u8>, syslog_ts: &str, hostname: &str, app_name: &str) {
    let mut scratch = HEADER_POOL.get();
    append_escaped(&mut scratch, syslog_ts);
    scratch.push(b' ');
    append_escaped(&mut scratch, hostname);
    scratch.push(b' ');
    append_escaped(&mut scratch, app_name);
    scratch.extend_from_slice(b": ");
    out.extend_from_slice(&scratch);
}

pub(crate) fn add_level(line: &mut JsonEncoder, level: Level) {
    let (key, rendered) = {
        let cfg = line.config();
        (cfg.level_key, cfg.encode_level.render(level))
    };
    if !key.is_empty() {
        line.add_string(key, rendered);
    }
}

/// State shared by the rsyslog encoders: the persistent context fields and
/// the header identity.
#[derive(Debug, Clone)]
pub struct SyslogBase {
    context: JsonEncoder,
    app_name: String,
    hostname: String,
}

impl SyslogBase {
    /// Resolves the local hostname now, so a host without one fails at build
    /// time rather than on the first log call.
    pub fn new(config: EncoderConfig, app_name: impl Into<String>) -> Result<Self, Error> {
        let hostname = local_hostname()?;
        Ok(Self::with_hostname(config, app_name, hostname))
    }

    pub fn with_hostname(
        config: EncoderConfig,
        app_name: impl Into<String>,
        hostname: impl Into<String>,
    ) -> Self {
        Self {
            context: JsonEncoder::new(config.into(), false),
            app_name: app_name.into(),
            hostname: hostname.into(),
        }
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub(crate) fn context(&self) -> &JsonEncoder {
        &self.context
    }

    pub(crate) fn context_mut(&mut self) -> &mut JsonEncoder {
        &mut self.context
    }

    /// Starts a body: header, then the opening brace.
    pub(crate) fn open_line(&self, times: &EventTimes) -> JsonEncoder {
        let mut line = self.context.fresh();
        write_header(line.buf_mut(), &times.syslog, &self.hostname, &self.app_name);
        line.buf_mut().push(b'{');
        line
    }

    /// Fills `extra` with the context fields, caller, stack and pass-through
    /// fields, embeds it as a string under `"extra"`, and terminates the line.
    pub(crate) fn seal(
        &self,
        mut line: JsonEncoder,
        event: &LogEvent,
        passthrough: &[&Field],
    ) -> Vec<u8> {
        let mut extra = self.context.clone();
        let cfg: &EncoderConfig = extra.config();
        let (caller_key, stacktrace_key, encode_caller) =
            (cfg.caller_key, cfg.stacktrace_key, cfg.encode_caller);

        if let Some(caller) = &event.caller
            && !caller_key.is_empty()
        {
            extra.add_string(caller_key, &encode_caller.render(caller));
        }
        if !event.stack.is_empty() && !stacktrace_key.is_empty() {
            extra.add_string(stacktrace_key, &event.stack);
        }
        for field in passthrough {
            extra.add_field(field);
        }
        extra.close_open_namespaces();

        let mut nested = String::with_capacity(extra.bytes().len() + 2);
        nested.push('{');
        nested.push_str(&String::from_utf8_lossy(extra.bytes()));
        nested.push('}');
        line.add_string("extra", &nested);

        line.close_open_namespaces();
        line.buf_mut().extend_from_slice(b"}\n");
        line.into_bytes()
    }
}

/// Encoder for `rsyslog://...` targets with `type = "err"` (the default).
#[derive(Debug, Clone)]
pub struct SyslogErrorEncoder {
    base: SyslogBase,
}

impl SyslogErrorEncoder {
    pub fn new(config: EncoderConfig, app_name: impl Into<String>) -> Result<Self, Error> {
        Ok(Self {
            base: SyslogBase::new(config, app_name)?,
        })
    }

    pub fn with_hostname(
        config: EncoderConfig,
        app_name: impl Into<String>,
        hostname: impl Into<String>,
    ) -> Self {
        Self {
            base: SyslogBase::with_hostname(config, app_name, hostname),
        }
    }

    pub fn base(&self) -> &SyslogBase {
        &self.base
    }

    pub(crate) fn base_mut(&mut self) -> &mut SyslogBase {
        &mut self.base
    }

    pub fn encode_entry(&self, event: &LogEvent, fields: &[Field]) -> Vec<u8> {
        let mut component = event.logger_name.as_str();
        let mut context_id = 0i64;
        let mut passthrough = Vec::with_capacity(fields.len());
        for field in fields {
            match field.key.as_str() {
                "component" => component = &field.string,
                "contextID" | "context_id" => context_id = field.integer,
                _ => passthrough.push(field),
            }
        }

        let times = EventTimes::of(&event.timestamp);
        let mut line = self.base.open_line(&times);
        line.add_string("component", component);
        line.add_i64("context_id", context_id);
        line.add_string("event_datetime", &times.iso);
        line.add_string("event_date", times.date());
        line.add_string("msg", &event.message);
        add_level(&mut line, event.level);

        self.base.seal(line, event, &passthrough)
    }
}
