//! Parsing of log target strings.
//!
//! A target is a path or URL-like string with optional query parameters that
//! override the config file:
//!
//! ```text
//! stderr
//! /var/log/app.log?level=debug&encoding=json
//! file:///var/log/app.log
//! rsyslog:///var/log/app/rsyslog.log?app-name=carbonapi&encoding-time=epoch
//! ```

use std::{borrow::Cow, collections::HashMap, str::FromStr};

use percent_encoding::percent_decode_str;
use url::{ParseError, Url};

use crate::error::Error;

/// Query keys that override the matching config fields.
pub const QUERY_LEVEL: &str = "level";
pub const QUERY_ENCODING: &str = "encoding";
pub const QUERY_ENCODING_TIME: &str = "encoding-time";
pub const QUERY_ENCODING_DURATION: &str = "encoding-duration";
pub const QUERY_APP_NAME: &str = "app-name";

/// A parsed log target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetDescriptor {
    /// Lowercased; empty for plain paths.
    pub scheme: String,
    /// Percent-decoded. For `scheme://host/path` this is `host` followed by
    /// `/path`. Plain paths are kept as written, leading slashes included.
    pub path: String,
    /// First value seen for each key.
    query: HashMap<String, String>,
}

impl TargetDescriptor {
    pub fn parse(target: &str) -> Result<Self, Error> {
        if target.bytes().any(|b| b < 0x20 || b == 0x7f) {
            return Err(Error::invalid_target(target, "invalid control character in URL"));
        }

        match Url::parse(target) {
            Ok(url) => Self::from_url(target, &url),
            Err(ParseError::RelativeUrlWithoutBase) => Self::from_path(target),
            Err(err) => Err(Error::invalid_target(target, err.to_string())),
        }
    }

    fn from_url(target: &str, url: &Url) -> Result<Self, Error> {
        let host = url.host_str().unwrap_or_default();
        let mut path = url.path();
        // `file://host` comes back with a `/` path the target never had.
        if !host.is_empty() && path == "/" && !authority_has_path(target) {
            path = "";
        }

        let mut decoded = decode(target, host)?;
        decoded.push_str(&decode(target, path)?);

        Ok(Self {
            scheme: url.scheme().to_string(),
            path: decoded,
            query: first_values(url.query_pairs()),
        })
    }

    fn from_path(target: &str) -> Result<Self, Error> {
        let rest = target.split_once('#').map_or(target, |(before, _)| before);
        let (path, raw_query) = match rest.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (rest, None),
        };

        if path.starts_with(':') {
            return Err(Error::invalid_target(target, "missing protocol scheme"));
        }
        if path.split('/').next().is_some_and(|first| first.contains(':')) {
            return Err(Error::invalid_target(
                target,
                "first path segment in URL cannot contain colon",
            ));
        }

        let query = raw_query
            .map(|raw| first_values(url::form_urlencoded::parse(raw.as_bytes())))
            .unwrap_or_default();

        Ok(Self {
            scheme: String::new(),
            path: decode(target, path)?,
            query,
        })
    }

    /// The query value for `key`. An empty value counts as absent.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// `query_value(key)`, else `fallback`.
    pub fn query_or<'a>(&'a self, key: &str, fallback: &'a str) -> &'a str {
        self.query_value(key).unwrap_or(fallback)
    }

    pub fn is_rsyslog(&self) -> bool {
        self.scheme == "rsyslog"
    }

    /// `none` (any case) discards all output.
    pub fn is_none_path(&self) -> bool {
        self.path.eq_ignore_ascii_case("none")
    }
}

impl FromStr for TargetDescriptor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Whether anything follows the authority in `scheme://authority/path`.
fn authority_has_path(target: &str) -> bool {
    let after_scheme = target.split_once("//").map_or(target, |(_, rest)| rest);
    after_scheme
        .split(['?', '#'])
        .next()
        .is_some_and(|authority_and_path| authority_and_path.contains('/'))
}

fn first_values<'a>(
    pairs: impl Iterator<Item = (Cow<'a, str>, Cow<'a, str>)>,
) -> HashMap<String, String> {
    let mut query = HashMap::new();
    for (key, value) in pairs {
        query
            .entry(key.into_owned())
            .or_insert_with(|| value.into_owned());
    }
    query
}

/// Percent-decode `input`, rejecting malformed escapes and non-UTF-8 results.
fn decode(target: &str, input: &str) -> Result<String, Error> {
    for (i, _) in input.match_indices('%') {
        let escape = input.get(i + 1..i + 3).unwrap_or_default();
        if escape.len() != 2 || !escape.bytes().all(|b| b.is_ascii_hexdigit()) {
            let shown: String = input[i..].chars().take(3).collect();
            return Err(Error::invalid_target(
                target,
                format!("invalid URL escape {shown:?}"),
            ));
        }
    }

    percent_decode_str(input)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| Error::invalid_target(target, "escaped path is not valid UTF-8"))
}
