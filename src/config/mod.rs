//! Logger configuration and target resolution.
//!
//! A [`Config`] names a target and default encoding options. Query parameters
//! on the target override the defaults, so one config file field can carry
//! everything:
//!
//! ```toml
//! logger = "carbonserver"
//! file = "/var/log/carbon/carbonserver.log?encoding=json&level=debug"
//! level = "info"
//! encoding = "mixed"
//! encoding-time = "iso8601"
//! encoding-duration = "seconds"
//! ```
//!
//! An `rsyslog://` target switches to the rsyslog line formats and requires an
//! `app-name` query parameter:
//!
//! ```toml
//! file = "rsyslog:///var/log/carbon/rsyslog.log?app-name=carbonapi"
//! type = "access"
//! ```
//!
//! `${VAR_NAME}` references are expanded from the environment when loading a
//! file, except inside `#` comments.

mod target;

use std::{
    fmt,
    path::Path,
    str::FromStr,
    sync::{Arc, LazyLock},
};

use regex::Regex;
use serde::{Deserialize, Serialize};
pub use target::*;

use crate::{
    encoder::{
        ConsoleEncoder, DurationEncoding, Encoder, EncoderConfig, JsonEncoder, MixedEncoder,
        SyslogAccessEncoder, SyslogErrorEncoder, TimeEncoding,
    },
    error::Error,
    level::{AtomicLevel, Level},
    logger::{Core, Logger},
    sink,
};

/// Line format for local targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Encoding {
    #[default]
    Mixed,
    Json,
    Console,
}

impl FromStr for Encoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mixed" | "" => Ok(Encoding::Mixed),
            "json" => Ok(Encoding::Json),
            "console" => Ok(Encoding::Console),
            _ => Err(Error::UnknownEncoding(s.to_string())),
        }
    }
}

/// Line format for `rsyslog://` targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RsyslogType {
    /// Application and error logs.
    #[default]
    Err,
    /// Request access logs.
    Access,
}

impl FromStr for RsyslogType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s.to_lowercase().as_str() {
            "err" | "" => Ok(RsyslogType::Err),
            "access" => Ok(RsyslogType::Access),
            _ => Err(Error::UnknownRsyslogType(s.to_string())),
        }
    }
}

impl fmt::Display for RsyslogType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RsyslogType::Err => f.write_str("err"),
            RsyslogType::Access => f.write_str("access"),
        }
    }
}

/// Logger configuration. All options are kept as strings and only
/// interpreted by [`Config::resolve`], so a bad value surfaces with the
/// target it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct Config {
    /// Name given to the built logger. Empty for an unnamed logger.
    pub logger: String,

    /// `stderr`, `stdout`, `none`, a file path or a `file://` / `rsyslog://`
    /// URL, with optional query overrides.
    #[serde(rename = "file", alias = "target")]
    pub target: String,

    /// `debug`, `info`, `warn`, `error`, `dpanic`, `panic` or `fatal`.
    pub level: String,

    /// `mixed`, `json` or `console`. Ignored for rsyslog targets.
    pub encoding: String,

    /// `millis`, `nanos`, `epoch` or `iso8601`.
    pub encoding_time: String,

    /// `seconds`, `nanos` or `string`.
    pub encoding_duration: String,

    /// rsyslog line format: `err` (default) or `access`.
    #[serde(rename = "type")]
    pub rsyslog_type: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logger: String::new(),
            target: "stderr".to_string(),
            level: "info".to_string(),
            encoding: "mixed".to_string(),
            encoding_time: "iso8601".to_string(),
            encoding_duration: "seconds".to_string(),
            rsyslog_type: String::new(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::ConfigRead(e, path.as_ref().to_path_buf()))?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(contents: &str) -> Result<Self, Error> {
        let expanded = expand_env_vars(contents)?;
        Ok(toml::from_str(&expanded)?)
    }

    /// Resolve the encoder and level this config describes, without touching
    /// the sink.
    pub fn resolve(&self) -> Result<(Encoder, AtomicLevel), Error> {
        let target = TargetDescriptor::parse(&self.target)?;
        self.resolve_target(&target)
    }

    /// Validate the config: everything [`Config::build_logger`] checks except
    /// opening the sink.
    pub fn check(&self) -> Result<(), Error> {
        self.build(true).map(|_| ())
    }

    pub fn build_logger(&self) -> Result<Logger, Error> {
        Ok(self.build(false)?.unwrap_or_else(Logger::nop))
    }

    /// Resolve and, unless `check_only`, open the sink and assemble a logger.
    /// `check_only` always yields `Ok(None)` on success.
    pub fn build(&self, check_only: bool) -> Result<Option<Logger>, Error> {
        let target = TargetDescriptor::parse(&self.target)?;
        let (encoder, level) = self.resolve_target(&target)?;

        if check_only {
            return Ok(None);
        }

        let logger = if target.is_none_path() {
            Logger::nop()
        } else {
            let sink = sink::open(&self.target)?;
            Logger::new(Core::new(encoder, sink, level))
        };
        Ok(Some(logger.named(&self.logger)))
    }

    fn resolve_target(&self, target: &TargetDescriptor) -> Result<(Encoder, AtomicLevel), Error> {
        let level: Level = target.query_or(QUERY_LEVEL, &self.level).parse()?;

        let encoder = if target.is_rsyslog() {
            self.rsyslog_encoder(target)?
        } else {
            self.local_encoder(target)?
        };

        tracing::debug!(
            log_target = %self.target,
            encoder = %encoder,
            level = %level,
            "Resolved log target"
        );

        Ok((encoder, AtomicLevel::new(level)))
    }

    fn time_and_duration(
        &self,
        target: &TargetDescriptor,
    ) -> Result<(TimeEncoding, DurationEncoding), Error> {
        let time = target
            .query_or(QUERY_ENCODING_TIME, &self.encoding_time)
            .parse()?;
        let duration = target
            .query_or(QUERY_ENCODING_DURATION, &self.encoding_duration)
            .parse()?;
        Ok((time, duration))
    }

    fn local_encoder(&self, target: &TargetDescriptor) -> Result<Encoder, Error> {
        let (time, duration) = self.time_and_duration(target)?;
        let encoding: Encoding = target.query_or(QUERY_ENCODING, &self.encoding).parse()?;

        let config = EncoderConfig::local(time, duration);
        Ok(match encoding {
            Encoding::Mixed => Encoder::Mixed(MixedEncoder::new(config)),
            Encoding::Json => Encoder::Json(JsonEncoder::new(Arc::new(config), false)),
            Encoding::Console => Encoder::Console(ConsoleEncoder::new(config)),
        })
    }

    fn rsyslog_encoder(&self, target: &TargetDescriptor) -> Result<Encoder, Error> {
        let (time, duration) = self.time_and_duration(target)?;
        let app_name = target
            .query_value(QUERY_APP_NAME)
            .ok_or_else(|| Error::MissingAppName {
                target: self.target.clone(),
            })?;

        let config = EncoderConfig::rsyslog(time, duration);
        Ok(match self.rsyslog_type.parse()? {
            RsyslogType::Err => Encoder::SyslogError(SyslogErrorEncoder::new(config, app_name)?),
            RsyslogType::Access => {
                Encoder::SyslogAccess(SyslogAccessEncoder::new(config, app_name)?)
            }
        })
    }
}

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("Invalid regex"));

/// Expand `${VAR_NAME}` references, leaving anything after a `#` untouched.
fn expand_env_vars(input: &str) -> Result<String, Error> {
    let mut result = String::with_capacity(input.len());

    for line in input.split_inclusive('\n') {
        let (code, comment) = match line.find('#') {
            Some(pos) => line.split_at(pos),
            None => (line, ""),
        };

        let mut last_end = 0;
        for cap in ENV_VAR.captures_iter(code) {
            let whole = cap.get_match();
            result.push_str(&code[last_end..whole.start()]);
            let name = &cap[1];
            let value = std::env::var(name).map_err(|_| Error::EnvVarNotFound(name.to_string()))?;
            result.push_str(&value);
            last_end = whole.end();
        }

        result.push_str(&code[last_end..]);
        result.push_str(comment);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn config(target: &str) -> Config {
        Config {
            target: target.to_string(),
            ..Config::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.target, "stderr");
        assert_eq!(config.level, "info");
        assert_eq!(config.encoding, "mixed");
        assert_eq!(config.encoding_time, "iso8601");
        assert_eq!(config.encoding_duration, "seconds");
        assert_eq!(config.rsyslog_type, "");

        let (encoder, level) = config.resolve().unwrap();
        assert_eq!(encoder.kind(), "mixed");
        assert_eq!(level.level(), Level::Info);
    }

    #[test]
    fn test_from_str_kebab_case_keys() {
        let config = Config::from_str(
            r#"
            logger = "carbonserver"
            file = "/var/log/carbon/carbonserver.log"
            level = "debug"
            encoding = "json"
            encoding-time = "epoch"
            encoding-duration = "string"
            type = "access"
        "#,
        )
        .unwrap();

        assert_eq!(config.logger, "carbonserver");
        assert_eq!(config.target, "/var/log/carbon/carbonserver.log");
        assert_eq!(config.level, "debug");
        assert_eq!(config.encoding, "json");
        assert_eq!(config.encoding_time, "epoch");
        assert_eq!(config.encoding_duration, "string");
        assert_eq!(config.rsyslog_type, "access");
    }

    #[test]
    fn test_from_str_target_alias_and_defaults() {
        let config = Config::from_str(r#"target = "stdout""#).unwrap();
        assert_eq!(config.target, "stdout");
        assert_eq!(config.level, "info");
        assert_eq!(config.encoding, "mixed");
    }

    #[test]
    fn test_from_str_rejects_unknown_keys() {
        let err = Config::from_str(r#"filename = "x.log""#).unwrap_err();
        assert!(matches!(err, Error::ConfigParse(_)), "{err:?}");
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logging.toml");
        std::fs::write(&path, "file = \"none\"\nlevel = \"warn\"\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.target, "none");
        assert_eq!(config.level, "warn");

        let err = Config::from_file(dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, Error::ConfigRead(..)), "{err:?}");
    }

    #[test]
    fn test_env_var_expansion() {
        temp_env::with_var("LOGWIRE_TEST_LOG_DIR", Some("/var/log/carbon"), || {
            let config = Config::from_str(
                "file = \"${LOGWIRE_TEST_LOG_DIR}/app.log\" # ${LOGWIRE_NOT_SET}\n",
            )
            .unwrap();
            assert_eq!(config.target, "/var/log/carbon/app.log");
        });
    }

    #[test]
    fn test_env_var_missing() {
        temp_env::with_var_unset("LOGWIRE_TEST_MISSING", || {
            let err = Config::from_str("file = \"${LOGWIRE_TEST_MISSING}\"").unwrap_err();
            assert!(matches!(err, Error::EnvVarNotFound(ref name) if name == "LOGWIRE_TEST_MISSING"));
        });
    }

    #[test]
    fn test_expand_env_vars_keeps_comments_and_lines() {
        let input = "# ${NOT_EXPANDED}\nlevel = \"info\"\nempty = \"${}\"";
        assert_eq!(expand_env_vars(input).unwrap(), input);
    }

    #[rstest]
    #[case("/tmp/app.log?encoding=console&level=warn")]
    #[case("/tmp/app.log?encoding=json&encoding-duration=string")]
    #[case("rsyslog:///tmp/rs.log?app-name=carbonapi")]
    fn test_resolve_is_idempotent(#[case] target: &str) {
        let config = config(target);
        let (first, first_level) = config.resolve().unwrap();
        let (second, second_level) = config.resolve().unwrap();
        assert_eq!(first.kind(), second.kind());
        assert_eq!(first_level.level(), second_level.level());

        let ts = chrono::DateTime::parse_from_rfc3339("2021-05-04T10:20:30.5+00:00").unwrap();
        let event = crate::LogEvent::new(Level::Error, "render failed")
            .with_timestamp(ts)
            .with_logger_name("render");
        let fields = [
            crate::Field::string("peer", "10.0.0.1"),
            crate::Field::int64("points", 17),
            crate::Field::duration("runtime", std::time::Duration::from_millis(1500)),
        ];
        assert_eq!(
            first.encode_entry(&event, &fields),
            second.encode_entry(&event, &fields)
        );
    }

    #[test]
    fn test_env_var_expansion_several_per_line() {
        temp_env::with_vars(
            [
                ("LOGWIRE_TEST_DIR", Some("/var/log")),
                ("LOGWIRE_TEST_APP", Some("carbonapi")),
            ],
            || {
                let config =
                    Config::from_str("file = \"${LOGWIRE_TEST_DIR}/${LOGWIRE_TEST_APP}.log\"\n")
                        .unwrap();
                assert_eq!(config.target, "/var/log/carbonapi.log");
            },
        );
    }

    #[rstest]
    #[case("/tmp/a.log?level=debug", "error", Level::Debug)]
    #[case("/tmp/a.log?level=", "error", Level::Error)]
    #[case("/tmp/a.log", "", Level::Info)]
    #[case("/tmp/a.log?level=DPANIC", "info", Level::DPanic)]
    fn test_query_level_beats_config(
        #[case] target: &str,
        #[case] level: &str,
        #[case] expected: Level,
    ) {
        let config = Config {
            level: level.to_string(),
            ..config(target)
        };
        assert_eq!(config.resolve().unwrap().1.level(), expected);
    }

    #[rstest]
    #[case("/tmp/a.log?encoding=json", "mixed", "json")]
    #[case("/tmp/a.log?encoding=Console", "json", "console")]
    #[case("/tmp/a.log", "json", "json")]
    #[case("/tmp/a.log", "", "mixed")]
    fn test_query_encoding_beats_config(
        #[case] target: &str,
        #[case] encoding: &str,
        #[case] expected: &str,
    ) {
        let config = Config {
            encoding: encoding.to_string(),
            ..config(target)
        };
        assert_eq!(config.resolve().unwrap().0.kind(), expected);
    }

    #[test]
    fn test_query_time_and_duration_beat_config() {
        let config = Config {
            encoding_time: "bogus".to_string(),
            encoding_duration: "bogus".to_string(),
            ..config("/tmp/a.log?encoding-time=nanos&encoding-duration=string")
        };
        let (encoder, _) = config.resolve().unwrap();
        assert_eq!(encoder.config().encode_time, TimeEncoding::Nanos);
        assert_eq!(encoder.config().encode_duration, DurationEncoding::String);
    }

    #[test]
    fn test_local_schema() {
        let (encoder, _) = config("stdout").resolve().unwrap();
        let schema = encoder.config();
        assert_eq!(schema.message_key, "message");
        assert_eq!(schema.time_key, "timestamp");
        assert_eq!(schema.name_key, "logger");
    }

    #[test]
    fn test_rsyslog_resolution() {
        let (encoder, _) = config("rsyslog:///tmp/rs.log?app-name=carbonapi")
            .resolve()
            .unwrap();
        assert_eq!(encoder.kind(), "rsyslog-err");
        assert_eq!(encoder.config().message_key, "msg");

        let access = Config {
            rsyslog_type: "ACCESS".to_string(),
            // Local-only options are ignored for rsyslog targets.
            encoding: "bogus".to_string(),
            ..config("rsyslog:///tmp/rs.log?app-name=carbonapi")
        };
        assert_eq!(access.resolve().unwrap().0.kind(), "rsyslog-access");
    }

    #[rstest]
    #[case("rsyslog:///tmp/rs.log")]
    #[case("rsyslog:///tmp/rs.log?app-name=")]
    fn test_rsyslog_missing_app_name(#[case] target: &str) {
        let err = config(target).resolve().unwrap_err();
        assert!(matches!(err, Error::MissingAppName { .. }), "{err:?}");
    }

    /// Each failure kind is reported as its own variant.
    #[rstest]
    #[case(config(":bad"), "InvalidTarget")]
    #[case(Config { level: "verbose".into(), ..config("stderr") }, "InvalidLevel")]
    #[case(Config { encoding: "yaml".into(), ..config("stderr") }, "UnknownEncoding")]
    #[case(Config { encoding_time: "rfc".into(), ..config("stderr") }, "UnknownTimeEncoding")]
    #[case(Config { encoding_duration: "ms".into(), ..config("stderr") }, "UnknownDurationEncoding")]
    #[case(Config { rsyslog_type: "audit".into(), ..config("rsyslog://stderr?app-name=a") }, "UnknownRsyslogType")]
    #[case(config("rsyslog://stderr"), "MissingAppName")]
    fn test_distinct_error_kinds(#[case] config: Config, #[case] expected: &str) {
        let err = config.resolve().unwrap_err();
        let kind = format!("{err:?}");
        assert!(kind.starts_with(expected), "{kind}");
    }

    #[test]
    fn test_local_resolution_order() {
        // time is checked before duration, duration before encoding
        let config = Config {
            encoding: "yaml".into(),
            encoding_time: "rfc".into(),
            encoding_duration: "ms".into(),
            ..config("stderr")
        };
        assert!(matches!(config.resolve(), Err(Error::UnknownTimeEncoding(_))));

        let config = Config {
            encoding_time: "iso8601".into(),
            ..config
        };
        assert!(matches!(config.resolve(), Err(Error::UnknownDurationEncoding(_))));
    }

    #[test]
    fn test_rsyslog_app_name_checked_before_type() {
        let config = Config {
            rsyslog_type: "audit".into(),
            ..config("rsyslog://stderr")
        };
        assert!(matches!(config.resolve(), Err(Error::MissingAppName { .. })));
    }

    #[rstest]
    #[case(config(":bad"))]
    #[case(Config { level: "verbose".into(), ..config("stderr") })]
    #[case(Config { encoding: "yaml".into(), ..config("/tmp/x.log") })]
    #[case(config("rsyslog://stderr"))]
    fn test_check_and_build_agree_on_resolution_errors(#[case] config: Config) {
        let checked = config.check().unwrap_err();
        let built = config.build_logger().unwrap_err();
        assert_eq!(checked.to_string(), built.to_string());
    }

    #[test]
    fn test_check_does_not_open_the_sink() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("never.log");
        let config = config(path.to_str().unwrap());

        config.check().unwrap();
        assert!(config.build(true).unwrap().is_none());
        assert!(!path.exists());

        let logger = config.build_logger().unwrap();
        assert!(!logger.is_nop());
        assert!(path.exists());
    }

    #[test]
    fn test_check_passes_where_sink_would_fail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("app.log");
        let config = config(path.to_str().unwrap());

        config.check().unwrap();
        let err = config.build_logger().unwrap_err();
        assert!(matches!(err, Error::SinkConstruction { .. }), "{err:?}");
    }

    #[rstest]
    #[case("none")]
    #[case("NONE")]
    #[case("file://none?level=debug")]
    fn test_none_target_builds_nop_logger(#[case] target: &str) {
        let logger = config(target).build_logger().unwrap();
        assert!(logger.is_nop());
        assert!(!logger.enabled(Level::Fatal));
    }

    #[test]
    fn test_none_target_still_validates() {
        let config = Config {
            encoding: "yaml".into(),
            ..config("none")
        };
        assert!(matches!(config.build_logger(), Err(Error::UnknownEncoding(_))));
    }

    #[test]
    fn test_built_logger_is_named_and_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        let config = Config {
            logger: "carbonserver".into(),
            ..config(&format!("{}?encoding=json", path.display()))
        };

        let logger = config.build_logger().unwrap();
        assert_eq!(logger.name(), "carbonserver");
        logger
            .log(Level::Info, "started", &[crate::Field::int64("port", 2003)])
            .unwrap();
        logger.sync().unwrap();

        let line: serde_json::Value =
            serde_json::from_str(std::fs::read_to_string(&path).unwrap().trim_end()).unwrap();
        assert_eq!(line["logger"], "carbonserver");
        assert_eq!(line["message"], "started");
        assert_eq!(line["port"], 2003);
    }

    #[test]
    fn test_clone_is_independent() {
        let base = config("stderr");
        let mut variant = base.clone();
        variant.level = "error".into();
        assert_eq!(base.level, "info");
        assert_eq!(variant.resolve().unwrap().1.level(), Level::Error);
    }

    #[rstest]
    #[case("err", RsyslogType::Err)]
    #[case("", RsyslogType::Err)]
    #[case("Access", RsyslogType::Access)]
    fn test_rsyslog_type_from_str(#[case] input: &str, #[case] expected: RsyslogType) {
        assert_eq!(input.parse::<RsyslogType>().unwrap(), expected);
    }
}
