//! Log target resolution and structured line encoders.
//!
//! A [`Config`] names a target such as `stderr`, `/var/log/app.log?level=debug`
//! or `rsyslog:///var/log/rsyslog.log?app-name=carbonapi`, plus default
//! encoding options. [`Config::build_logger`] resolves it into a [`Logger`]
//! that encodes [`LogEvent`]s with one of the [`Encoder`] formats and writes
//! them to a [`Sink`]. [`Config::check`] runs the same validation without
//! opening anything.
//!
//! [`EncodingLayer`] plugs a built logger into a `tracing` subscriber.

pub mod buffer;
pub mod config;
pub mod encoder;
pub mod error;
pub mod event;
pub mod field;
pub mod layer;
pub mod level;
pub mod logger;
pub mod sink;

pub use config::{Config, Encoding, RsyslogType, TargetDescriptor};
pub use encoder::{Encoder, EncoderConfig};
pub use error::{Error, Result};
pub use event::{Caller, LogEvent};
pub use field::{ArrayMarshaler, Field, FieldType, MarshalError};
pub use layer::EncodingLayer;
pub use level::{AtomicLevel, Level};
pub use logger::{Core, Logger};
pub use sink::Sink;
