//! rsyslog carriage format for access logs.
//!
//! Uses the header and `extra` embedding of [`super::syslog`], but with a
//! wider fixed schema. Well-known request fields are lifted to the top level
//! with a fixed JSON type regardless of how the call site attached them:
//!
//! | key | JSON type |
//! |-----|-----------|
//! | `handler`, `carbonapi_uuid`, `peer_ip` | string |
//! | `targets`, `metrics` | array |
//! | `runtime` | float |
//! | `http_code`, `from`, `until` | 32-bit integer |
//!
//! Anything else is folded into `extra`.

use crate::{
    encoder::{
        EncoderConfig,
        syslog::{EventTimes, SyslogBase, add_level},
    },
    error::Error,
    event::LogEvent,
    field::Field,
};

/// Encoder for `rsyslog://...` targets with `type = "access"`.
#[derive(Debug, Clone)]
pub struct SyslogAccessEncoder {
    base: SyslogBase,
}

impl SyslogAccessEncoder {
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
        let times = EventTimes::of(&event.timestamp);
        let mut line = self.base.open_line(&times);
        line.add_string("event_datetime", &times.iso);
        line.add_string("event_date", times.date());
        line.add_string("msg", &event.message);
        line.add_string("hostname", self.base.hostname());
        line.add_string("component", &event.logger_name);
        add_level(&mut line, event.level);

        let mut passthrough = Vec::with_capacity(fields.len());
        for field in fields {
            let key = field.key.as_str();
            match key {
                "handler" | "carbonapi_uuid" | "peer_ip" => line.add_string(key, &field.string),
                "targets" | "metrics" => match field.as_array() {
                    Some(array) => {
                        if let Err(err) = line.add_array(key, array) {
                            line.record_array_error(key, &err);
                        }
                    }
                    None => passthrough.push(field),
                },
                "runtime" => line.add_f64(key, field.float64_bits()),
                "http_code" | "from" | "until" => line.add_i32(key, field.int32_bits()),
                _ => passthrough.push(field),
            }
        }

        self.base.seal(line, event, &passthrough)
    }
}
