//! Typed key/value fields attached to a log event.
//!
//! A [`Field`] is a compact tagged value: numeric payloads live in a single
//! `i64` slot, strings in a string slot, and arrays or arbitrary JSON values in
//! a payload slot. Floating point values are stored as their IEEE-754 bit
//! pattern in the integer slot and 32-bit integers are stored widened, so the
//! readers below reinterpret the slot rather than convert it.

use std::{fmt, sync::Arc, time::Duration};

use crate::encoder::ArrayEncoder;

/// Discriminates how a [`Field`]'s slots are to be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Ignored by every encoder.
    Skip,
    /// Opens a nested object named after the key; later fields land inside it.
    Namespace,
    String,
    Int64,
    Int32,
    Uint64,
    /// Bit pattern of an `f64` in the integer slot.
    Float64,
    Bool,
    /// Nanoseconds in the integer slot.
    Duration,
    /// Error message in the string slot.
    Error,
    Array,
    /// Arbitrary JSON value in the payload slot.
    Any,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct MarshalError(pub String);

/// Something that can write itself as the elements of a JSON array.
pub trait ArrayMarshaler: fmt::Debug + Send + Sync {
    fn marshal_array(&self, enc: &mut ArrayEncoder<'_>) -> Result<(), MarshalError>;
}

impl ArrayMarshaler for Vec<String> {
    fn marshal_array(&self, enc: &mut ArrayEncoder<'_>) -> Result<(), MarshalError> {
        for value in self {
            enc.append_string(value);
        }
        Ok(())
    }
}

impl ArrayMarshaler for Vec<i64> {
    fn marshal_array(&self, enc: &mut ArrayEncoder<'_>) -> Result<(), MarshalError> {
        for value in self {
            enc.append_i64(*value);
        }
        Ok(())
    }
}

/// Non-scalar field content.
#[derive(Debug, Clone, Default)]
pub enum Payload {
    #[default]
    None,
    Array(Arc<dyn ArrayMarshaler>),
    Value(serde_json::Value),
}

#[derive(Debug, Clone)]
pub struct Field {
    pub key: String,
    pub kind: FieldType,
    pub integer: i64,
    pub string: String,
    pub payload: Payload,
}

impl Field {
    fn new(key: impl Into<String>, kind: FieldType) -> Self {
        Self {
            key: key.into(),
            kind,
            integer: 0,
            string: String::new(),
            payload: Payload::None,
        }
    }

    pub fn string(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            string: value.into(),
            ..Self::new(key, FieldType::String)
        }
    }

    pub fn int64(key: impl Into<String>, value: i64) -> Self {
        Self {
            integer: value,
            ..Self::new(key, FieldType::Int64)
        }
    }

    pub fn int32(key: impl Into<String>, value: i32) -> Self {
        Self {
            integer: i64::from(value),
            ..Self::new(key, FieldType::Int32)
        }
    }

    pub fn uint64(key: impl Into<String>, value: u64) -> Self {
        Self {
            integer: value as i64,
            ..Self::new(key, FieldType::Uint64)
        }
    }

    pub fn float64(key: impl Into<String>, value: f64) -> Self {
        Self {
            integer: value.to_bits() as i64,
            ..Self::new(key, FieldType::Float64)
        }
    }

    pub fn bool(key: impl Into<String>, value: bool) -> Self {
        Self {
            integer: i64::from(value),
            ..Self::new(key, FieldType::Bool)
        }
    }

    /// Durations longer than `i64::MAX` nanoseconds saturate.
    pub fn duration(key: impl Into<String>, value: Duration) -> Self {
        Self {
            integer: i64::try_from(value.as_nanos()).unwrap_or(i64::MAX),
            ..Self::new(key, FieldType::Duration)
        }
    }

    pub fn error(key: impl Into<String>, err: &dyn std::error::Error) -> Self {
        Self {
            string: err.to_string(),
            ..Self::new(key, FieldType::Error)
        }
    }

    pub fn array(key: impl Into<String>, value: impl ArrayMarshaler + 'static) -> Self {
        Self {
            payload: Payload::Array(Arc::new(value)),
            ..Self::new(key, FieldType::Array)
        }
    }

    pub fn strings<I, S>(key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::array(key, values.into_iter().map(Into::into).collect::<Vec<String>>())
    }

    pub fn any(key: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            payload: Payload::Value(value),
            ..Self::new(key, FieldType::Any)
        }
    }

    pub fn namespace(key: impl Into<String>) -> Self {
        Self::new(key, FieldType::Namespace)
    }

    pub fn skip() -> Self {
        Self::new("", FieldType::Skip)
    }

    /// Reinterpret the integer slot as the bits of an `f64`.
    pub fn float64_bits(&self) -> f64 {
        f64::from_bits(self.integer as u64)
    }

    /// Narrow the integer slot to its low 32 bits.
    pub fn int32_bits(&self) -> i32 {
        self.integer as i32
    }

    pub fn as_array(&self) -> Option<&dyn ArrayMarshaler> {
        match &self.payload {
            Payload::Array(array) => Some(array.as_ref()),
            _ => None,
        }
    }
}
