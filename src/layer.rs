//! `tracing` integration.
//!
//! [`EncodingLayer`] feeds `tracing` events into a [`Logger`], so applications
//! instrumented with `tracing` macros get the configured line format:
//!
//! ```no_run
//! use logwire::{Config, EncodingLayer};
//! use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
//!
//! let config = Config::from_file("logging.toml")?;
//! tracing_subscriber::registry()
//!     .with(EncodingLayer::new(config.build_logger()?))
//!     .init();
//! # Ok::<(), logwire::Error>(())
//! ```

use tracing::{
    Event, Subscriber,
    field::{Field as TracingField, Visit},
};
use tracing_subscriber::{Layer, layer::Context};

use crate::{
    event::{Caller, LogEvent},
    field::Field,
    level::Level,
    logger::Logger,
};

/// A tracing layer that encodes events with a built [`Logger`].
///
/// The logger's own level decides what gets written. `TRACE` events are
/// treated as `debug`.
pub struct EncodingLayer {
    logger: Logger,
}

impl EncodingLayer {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }
}

impl<S> Layer<S> for EncodingLayer
where
    S: Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let level = Level::from_tracing(metadata.level());
        if !self.logger.enabled(level) {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let name = match self.logger.name() {
            "" => metadata.target(),
            name => name,
        };
        let mut log_event = LogEvent::new(level, visitor.message).with_logger_name(name);
        if let (Some(file), Some(line)) = (metadata.file(), metadata.line()) {
            log_event = log_event.with_caller(Caller::new(file, line));
        }

        let _ = self.logger.write(&log_event, &visitor.fields);
    }
}

/// Visitor that turns event fields into typed [`Field`]s.
#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: Vec<Field>,
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &TracingField, value: &dyn std::fmt::Debug) {
        let value = format!("{value:?}");
        if field.name() == "message" {
            self.message = value;
        } else {
            self.fields.push(Field::string(field.name(), value));
        }
    }

    fn record_str(&mut self, field: &TracingField, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push(Field::string(field.name(), value));
        }
    }

    fn record_i64(&mut self, field: &TracingField, value: i64) {
        self.fields.push(Field::int64(field.name(), value));
    }

    fn record_u64(&mut self, field: &TracingField, value: u64) {
        self.fields.push(Field::uint64(field.name(), value));
    }

    fn record_i128(&mut self, field: &TracingField, value: i128) {
        self.fields.push(match i64::try_from(value) {
            Ok(value) => Field::int64(field.name(), value),
            Err(_) => Field::string(field.name(), value.to_string()),
        });
    }

    fn record_u128(&mut self, field: &TracingField, value: u128) {
        self.fields.push(match u64::try_from(value) {
            Ok(value) => Field::uint64(field.name(), value),
            Err(_) => Field::string(field.name(), value.to_string()),
        });
    }

    fn record_bool(&mut self, field: &TracingField, value: bool) {
        self.fields.push(Field::bool(field.name(), value));
    }

    fn record_f64(&mut self, field: &TracingField, value: f64) {
        self.fields.push(Field::float64(field.name(), value));
    }

    fn record_error(&mut self, field: &TracingField, value: &(dyn std::error::Error + 'static)) {
        self.fields.push(Field::error(field.name(), value));
    }
}
