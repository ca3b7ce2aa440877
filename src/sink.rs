//! Byte sinks that encoded lines are written to.

use std::{
    fmt,
    fs::{File, OpenOptions},
    io::{self, Write},
    sync::Arc,
};

use parking_lot::Mutex;

use crate::{config::TargetDescriptor, error::Error};

enum Output {
    Stderr(io::Stderr),
    Stdout(io::Stdout),
    File(File),
    Writer(Box<dyn Write + Send>),
    Discard,
}

impl Output {
    fn write_all(&mut self, line: &[u8]) -> io::Result<()> {
        match self {
            Output::Stderr(w) => w.write_all(line),
            Output::Stdout(w) => w.write_all(line),
            Output::File(w) => w.write_all(line),
            Output::Writer(w) => w.write_all(line),
            Output::Discard => Ok(()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Output::Stderr(w) => w.flush(),
            Output::Stdout(w) => w.flush(),
            Output::File(w) => w.sync_data(),
            Output::Writer(w) => w.flush(),
            Output::Discard => Ok(()),
        }
    }
}

/// A shared, line-oriented writer. Clones write to the same destination and
/// each line is written under a lock, so concurrent lines never interleave.
#[derive(Clone)]
pub struct Sink {
    output: Arc<Mutex<Output>>,
    description: Arc<str>,
}

impl Sink {
    fn new(output: Output, description: impl Into<Arc<str>>) -> Self {
        Self {
            output: Arc::new(Mutex::new(output)),
            description: description.into(),
        }
    }

    pub fn stderr() -> Self {
        Self::new(Output::Stderr(io::stderr()), "stderr")
    }

    pub fn stdout() -> Self {
        Self::new(Output::Stdout(io::stdout()), "stdout")
    }

    pub fn discard() -> Self {
        Self::new(Output::Discard, "none")
    }

    /// Wrap an arbitrary writer, e.g. a socket or an in-memory buffer.
    pub fn from_writer(writer: impl Write + Send + 'static, description: &str) -> Self {
        Self::new(Output::Writer(Box::new(writer)), description)
    }

    pub fn write_line(&self, line: &[u8]) -> io::Result<()> {
        self.output.lock().write_all(line)
    }

    /// Flush buffered output. Files are synced to disk.
    pub fn sync(&self) -> io::Result<()> {
        self.output.lock().flush()
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sink")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Open the sink named by a raw target string.
///
/// | path | sink |
/// |------|------|
/// | `""`, `stderr` | standard error |
/// | `stdout` | standard output |
/// | `none` | discards everything |
/// | anything else | file, created if missing, opened for append |
///
/// Query parameters do not affect the sink. `rsyslog` targets write to the
/// same destinations; the scheme only selects the line format.
pub fn open(target: &str) -> Result<Sink, Error> {
    let desc = TargetDescriptor::parse(target)?;
    match desc.scheme.as_str() {
        "" | "file" | "rsyslog" => {}
        other => {
            return Err(Error::SinkConstruction {
                target: target.to_string(),
                source: io::Error::new(
                    io::ErrorKind::Unsupported,
                    format!("unsupported scheme {other:?}"),
                ),
            });
        }
    }

    let path = desc.path.as_str();
    let sink = match path.to_ascii_lowercase().as_str() {
        "" | "stderr" => Sink::stderr(),
        "stdout" => Sink::stdout(),
        "none" => Sink::discard(),
        _ => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| Error::SinkConstruction {
                    target: target.to_string(),
                    source,
                })?;
            Sink::new(Output::File(file), path)
        }
    };
    Ok(sink)
}
