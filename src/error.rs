//! Error types for target resolution, encoder construction and sink setup.
//!
//! Every configuration problem maps to its own variant so callers can match on
//! the failure kind instead of parsing messages. Nothing in this crate aborts
//! the process on a bad configuration; all of these are returned from
//! [`Config::check`](crate::Config::check) and
//! [`Config::build_logger`](crate::Config::build_logger).

use std::{io, path::PathBuf};

/// Errors produced while resolving a log target or building a logger.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid log target {target:?}: {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("Unrecognized level: {0:?}")]
    InvalidLevel(String),

    #[error("Unknown encoding {0:?}")]
    UnknownEncoding(String),

    #[error("Unknown time encoding {0:?}")]
    UnknownTimeEncoding(String),

    #[error("Unknown duration encoding {0:?}")]
    UnknownDurationEncoding(String),

    #[error("Unknown rsyslog type encoding {0:?}")]
    UnknownRsyslogType(String),

    /// An `rsyslog://` target was given without the `app-name` query parameter.
    #[error("app-name is required for rsyslog target {target:?}")]
    MissingAppName { target: String },

    #[error("Could not get hostname: {0}")]
    HostnameUnavailable(#[source] io::Error),

    #[error("Failed to open log sink {target:?}: {source}")]
    SinkConstruction {
        target: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read config file {1}: {0}")]
    ConfigRead(#[source] io::Error, PathBuf),

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),
}

impl Error {
    pub(crate) fn invalid_target(target: &str, reason: impl Into<String>) -> Self {
        Error::InvalidTarget {
            target: target.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_value() {
        let err = Error::UnknownEncoding("yaml".into());
        assert_eq!(err.to_string(), "Unknown encoding \"yaml\"");

        let err = Error::MissingAppName {
            target: "rsyslog:///var/log/app.log".into(),
        };
        assert!(err.to_string().contains("app-name is required"));

        let err = Error::invalid_target(":bad", "missing protocol scheme");
        assert_eq!(
            err.to_string(),
            "Invalid log target \":bad\": missing protocol scheme"
        );
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
