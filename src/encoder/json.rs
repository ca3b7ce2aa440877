//! Append-only JSON object buffer.
//!
//! [`JsonEncoder`] is the primitive every line encoder is built from: it
//! appends `"key":value` pairs to a byte buffer, tracks nested namespaces, and
//! can be cloned with or without its accumulated content. Separators are
//! derived from the last byte written, so a buffer can be spliced after a
//! `{` written by someone else without emitting a stray comma.

use std::{io::Write as _, sync::Arc};

use crate::{
    encoder::{EncoderConfig, Scalar},
    event::LogEvent,
    field::{ArrayMarshaler, Field, FieldType, MarshalError, Payload},
};

#[derive(Debug, Clone)]
pub struct JsonEncoder {
    config: Arc<EncoderConfig>,
    buf: Vec<u8>,
    spaced: bool,
    open_namespaces: usize,
}

impl JsonEncoder {
    /// `spaced` emits `"k": v, "k2": v2` instead of `"k":v,"k2":v2`.
    pub fn new(config: Arc<EncoderConfig>, spaced: bool) -> Self {
        Self {
            config,
            buf: Vec::with_capacity(256),
            spaced,
            open_namespaces: 0,
        }
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub(crate) fn buf_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buf
    }

    pub fn open_namespaces(&self) -> usize {
        self.open_namespaces
    }

    /// Same configuration, empty buffer, no open namespaces.
    pub fn fresh(&self) -> Self {
        Self::new(Arc::clone(&self.config), self.spaced)
    }

    /// Same configuration and namespace depth, empty buffer.
    pub fn clone_empty(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            buf: Vec::with_capacity(256),
            spaced: self.spaced,
            open_namespaces: self.open_namespaces,
        }
    }

    pub fn add_key(&mut self, key: &str) {
        self.add_element_separator();
        append_quoted(&mut self.buf, key);
        self.buf.push(b':');
        if self.spaced {
            self.buf.push(b' ');
        }
    }

    pub fn add_string(&mut self, key: &str, value: &str) {
        self.add_key(key);
        append_quoted(&mut self.buf, value);
    }

    pub fn add_i64(&mut self, key: &str, value: i64) {
        self.add_key(key);
        self.buf.extend_from_slice(value.to_string().as_bytes());
    }

    pub fn add_i32(&mut self, key: &str, value: i32) {
        self.add_i64(key, i64::from(value));
    }

    pub fn add_u64(&mut self, key: &str, value: u64) {
        self.add_key(key);
        self.buf.extend_from_slice(value.to_string().as_bytes());
    }

    pub fn add_f64(&mut self, key: &str, value: f64) {
        self.add_key(key);
        append_float(&mut self.buf, value);
    }

    pub fn add_bool(&mut self, key: &str, value: bool) {
        self.add_key(key);
        append_bool(&mut self.buf, value);
    }

    pub fn add_scalar(&mut self, key: &str, value: &Scalar) {
        self.add_key(key);
        value.append_json(&mut self.buf);
    }

    pub fn add_value(&mut self, key: &str, value: &serde_json::Value) {
        self.add_key(key);
        // Serializing into a Vec cannot fail.
        let _ = serde_json::to_writer(&mut self.buf, value);
    }

    /// Writes `"key":[...]`. The closing bracket is written even when the
    /// marshaler fails part-way, so the surrounding object stays well-formed.
    pub fn add_array(&mut self, key: &str, array: &dyn ArrayMarshaler) -> Result<(), MarshalError> {
        self.add_key(key);
        self.buf.push(b'[');
        let result = array.marshal_array(&mut ArrayEncoder { enc: self });
        self.buf.push(b']');
        result
    }

    pub fn open_namespace(&mut self, key: &str) {
        self.add_key(key);
        self.buf.push(b'{');
        self.open_namespaces += 1;
    }

    pub fn close_open_namespaces(&mut self) {
        for _ in 0..self.open_namespaces {
            self.buf.push(b'}');
        }
        self.open_namespaces = 0;
    }

    /// Generic field appending, dispatching on the field type.
    pub fn add_field(&mut self, field: &Field) {
        let key = field.key.as_str();
        match field.kind {
            FieldType::Skip => {}
            FieldType::Namespace => self.open_namespace(key),
            FieldType::String | FieldType::Error => self.add_string(key, &field.string),
            FieldType::Int64 => self.add_i64(key, field.integer),
            FieldType::Int32 => self.add_i32(key, field.int32_bits()),
            FieldType::Uint64 => self.add_u64(key, field.integer as u64),
            FieldType::Float64 => self.add_f64(key, field.float64_bits()),
            FieldType::Bool => self.add_bool(key, field.integer == 1),
            FieldType::Duration => {
                let rendered = self.config.encode_duration.render(field.integer);
                self.add_scalar(key, &rendered);
            }
            FieldType::Array => match &field.payload {
                Payload::Array(array) => {
                    if let Err(err) = self.add_array(key, array.as_ref()) {
                        self.record_array_error(key, &err);
                    }
                }
                _ => self.add_value(key, &serde_json::Value::Null),
            },
            FieldType::Any => match &field.payload {
                Payload::Value(value) => self.add_value(key, value),
                _ => self.add_value(key, &serde_json::Value::Null),
            },
        }
    }

    pub fn add_fields(&mut self, fields: &[Field]) {
        for field in fields {
            self.add_field(field);
        }
    }

    pub(crate) fn record_array_error(&mut self, key: &str, err: &MarshalError) {
        tracing::warn!(field = key, error = %err, "Failed to encode array field");
        self.add_string(&format!("{key}Error"), &err.0);
    }

    fn add_element_separator(&mut self) {
        match self.buf.last() {
            None | Some(b'{' | b'[' | b':' | b',' | b' ') => {}
            Some(_) => {
                self.buf.push(b',');
                if self.spaced {
                    self.buf.push(b' ');
                }
            }
        }
    }

    /// Full JSON line: level, time, logger, caller, message, then context and
    /// event fields, then the stack trace.
    pub fn encode_entry(&self, event: &LogEvent, fields: &[Field]) -> Vec<u8> {
        let cfg = Arc::clone(&self.config);
        let mut line = self.clone_empty();
        line.buf.push(b'{');

        if !cfg.level_key.is_empty() {
            line.add_string(cfg.level_key, cfg.encode_level.render(event.level));
        }
        if !cfg.time_key.is_empty() {
            line.add_scalar(cfg.time_key, &cfg.encode_time.render(&event.timestamp));
        }
        if !cfg.name_key.is_empty() && !event.logger_name.is_empty() {
            line.add_string(cfg.name_key, &event.logger_name);
        }
        if let Some(caller) = &event.caller
            && !cfg.caller_key.is_empty()
        {
            line.add_string(cfg.caller_key, &cfg.encode_caller.render(caller));
        }
        if !cfg.message_key.is_empty() {
            line.add_string(cfg.message_key, &event.message);
        }
        if !self.buf.is_empty() {
            line.add_element_separator();
            line.buf.extend_from_slice(&self.buf);
        }
        line.add_fields(fields);
        line.close_open_namespaces();
        if !event.stack.is_empty() && !cfg.stacktrace_key.is_empty() {
            line.add_string(cfg.stacktrace_key, &event.stack);
        }
        line.buf.extend_from_slice(b"}\n");
        line.buf
    }
}

/// Writes array elements into the buffer of the [`JsonEncoder`] it borrows.
pub struct ArrayEncoder<'a> {
    enc: &'a mut JsonEncoder,
}

impl ArrayEncoder<'_> {
    pub fn append_string(&mut self, value: &str) {
        self.enc.add_element_separator();
        append_quoted(&mut self.enc.buf, value);
    }

    pub fn append_i64(&mut self, value: i64) {
        self.enc.add_element_separator();
        self.enc
            .buf
            .extend_from_slice(value.to_string().as_bytes());
    }

    pub fn append_f64(&mut self, value: f64) {
        self.enc.add_element_separator();
        append_float(&mut self.enc.buf, value);
    }

    pub fn append_bool(&mut self, value: bool) {
        self.enc.add_element_separator();
        append_bool(&mut self.enc.buf, value);
    }
}

/// Appends `value` as a quoted, escaped JSON string.
pub(crate) fn append_quoted(buf: &mut Vec<u8>, value: &str) {
    // Serializing into a Vec cannot fail.
    let _ = serde_json::to_writer(&mut *buf, value);
}

/// Appends `value` JSON-escaped but without the surrounding quotes.
pub(crate) fn append_escaped(buf: &mut Vec<u8>, value: &str) {
    let start = buf.len();
    append_quoted(buf, value);
    // Drop the closing quote, then the opening one.
    buf.pop();
    buf.remove(start);
}

fn append_bool(buf: &mut Vec<u8>, value: bool) {
    let literal: &[u8] = if value { b"true" } else { b"false" };
    buf.extend_from_slice(literal);
}

/// Shortest round-trip decimal form; non-finite values become strings.
pub(crate) fn append_float(buf: &mut Vec<u8>, value: f64) {
    if value.is_nan() {
        buf.extend_from_slice(b"\"NaN\"");
    } else if value.is_infinite() {
        buf.extend_from_slice(if value > 0.0 { b"\"+Inf\"" } else { b"\"-Inf\"" });
    } else {
        let _ = write!(buf, "{value}");
    }
}
