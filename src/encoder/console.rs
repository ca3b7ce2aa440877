//! Human-oriented encoders for local targets.
//!
//! Both print a plain-text header followed by the structured fields as a
//! spaced JSON object:
//!
//! ```text
//! mixed:   [2021-05-04T10:20:30.000Z] INFO [http] started {"port": 8080}
//! console: 2021-05-04T10:20:30.000Z	INFO	http	server/main.rs:12	started	{"port": 8080}
//! ```
//!
//! The field object is omitted when there is nothing to put in it. A stack
//! trace, when present, goes on the line after the header.

use crate::{
    encoder::{EncoderConfig, JsonEncoder},
    event::LogEvent,
    field::Field,
};

/// Context fields, then event fields, with every namespace closed.
/// `None` when the result would be `{}`.
fn fields_object(context: &JsonEncoder, fields: &[Field], caller: Option<&str>) -> Option<Vec<u8>> {
    let mut tail = context.clone();
    tail.add_fields(fields);
    tail.close_open_namespaces();
    if let Some(caller) = caller {
        let key = tail.config().caller_key;
        tail.add_string(key, caller);
    }
    if tail.bytes().is_empty() {
        return None;
    }
    let mut object = Vec::with_capacity(tail.bytes().len() + 2);
    object.push(b'{');
    object.extend_from_slice(tail.bytes());
    object.push(b'}');
    Some(object)
}

fn push_time(line: &mut Vec<u8>, cfg: &EncoderConfig, event: &LogEvent) {
    cfg.encode_time.render(&event.timestamp).append_plain(line);
}

fn push_stack(line: &mut Vec<u8>, cfg: &EncoderConfig, event: &LogEvent) {
    if !event.stack.is_empty() && !cfg.stacktrace_key.is_empty() {
        line.push(b'\n');
        line.extend_from_slice(event.stack.as_bytes());
    }
}

/// `[<time>] <LEVEL> [<logger>] <message> {<fields>}`
#[derive(Debug, Clone)]
pub struct MixedEncoder {
    context: JsonEncoder,
}

impl MixedEncoder {
    pub fn new(config: EncoderConfig) -> Self {
        Self {
            context: JsonEncoder::new(config.into(), true),
        }
    }

    pub(crate) fn context(&self) -> &JsonEncoder {
        &self.context
    }

    pub(crate) fn context_mut(&mut self) -> &mut JsonEncoder {
        &mut self.context
    }

    /// The caller is not part of the header, so it is appended to the field
    /// object.
    pub fn encode_entry(&self, event: &LogEvent, fields: &[Field]) -> Vec<u8> {
        let cfg = self.context.config();
        let mut line = Vec::with_capacity(128);

        if !cfg.time_key.is_empty() {
            line.push(b'[');
            push_time(&mut line, cfg, event);
            line.extend_from_slice(b"] ");
        }
        if !cfg.level_key.is_empty() {
            line.extend_from_slice(cfg.encode_level.render(event.level).as_bytes());
            line.push(b' ');
        }
        if !cfg.name_key.is_empty() && !event.logger_name.is_empty() {
            line.push(b'[');
            line.extend_from_slice(event.logger_name.as_bytes());
            line.extend_from_slice(b"] ");
        }
        line.extend_from_slice(event.message.as_bytes());

        let caller = event
            .caller
            .as_ref()
            .filter(|_| !cfg.caller_key.is_empty())
            .map(|caller| cfg.encode_caller.render(caller));
        if let Some(object) = fields_object(&self.context, fields, caller.as_deref()) {
            line.push(b' ');
            line.extend_from_slice(&object);
        }

        push_stack(&mut line, cfg, event);
        line.push(b'\n');
        line
    }
}

/// Tab-separated `time, LEVEL, logger, caller, message`, then the field object.
#[derive(Debug, Clone)]
pub struct ConsoleEncoder {
    context: JsonEncoder,
}

impl ConsoleEncoder {
    pub fn new(config: EncoderConfig) -> Self {
        Self {
            context: JsonEncoder::new(config.into(), true),
        }
    }

    pub(crate) fn context(&self) -> &JsonEncoder {
        &self.context
    }

    pub(crate) fn context_mut(&mut self) -> &mut JsonEncoder {
        &mut self.context
    }

    pub fn encode_entry(&self, event: &LogEvent, fields: &[Field]) -> Vec<u8> {
        let cfg = self.context.config();
        let mut columns: Vec<Vec<u8>> = Vec::with_capacity(6);

        if !cfg.time_key.is_empty() {
            let mut time = Vec::new();
            push_time(&mut time, cfg, event);
            columns.push(time);
        }
        if !cfg.level_key.is_empty() {
            columns.push(cfg.encode_level.render(event.level).as_bytes().to_vec());
        }
        if !cfg.name_key.is_empty() && !event.logger_name.is_empty() {
            columns.push(event.logger_name.as_bytes().to_vec());
        }
        if let Some(caller) = &event.caller
            && !cfg.caller_key.is_empty()
        {
            columns.push(cfg.encode_caller.render(caller).into_bytes());
        }
        if !cfg.message_key.is_empty() {
            columns.push(event.message.as_bytes().to_vec());
        }
        if let Some(object) = fields_object(&self.context, fields, None) {
            columns.push(object);
        }

        let mut line = columns.join(&b'\t');
        push_stack(&mut line, cfg, event);
        line.push(b'\n');
        line
    }
}
