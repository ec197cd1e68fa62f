//! Output side of the parser: staging key/value pairs and flushing records.
//!
//! A [`RecordSink`] accumulates pairs for the record under construction and
//! persists them on [`RecordSink::flush`]. Sinks are opened per file by a
//! [`SinkProvider`] once the file's dataformat is known.

mod delimited;
mod memory;

use std::{collections::BTreeMap, io};

pub use delimited::{DelimitedTableProvider, DelimitedTableSink};
pub use memory::{CapturedRecord, MemorySink, MemorySinkProvider};
use once_cell::sync::Lazy;
use thiserror::Error;

use crate::schema::Dataformat;

/// Key of the system field carrying the source file name.
pub const FILENAME_KEY: &str = "filename";
/// Key of the always-empty suspect flag system field.
pub const SUSPECT_FLAG_KEY: &str = "DC_SUSPECTFLAG";
/// Key of the system field carrying the source directory.
pub const DIRNAME_KEY: &str = "DIRNAME";
/// Key of the system field carrying the local UTC offset.
pub const TIMEZONE_KEY: &str = "JVM_TIMEZONE";
/// Key of the datetime system field.
pub const DATETIME_KEY: &str = "DATETIME_ID";

/// Local UTC offset of the process, e.g. `+0200`, computed once.
pub static LOCAL_TIMEZONE: Lazy<String> =
    Lazy::new(|| chrono::Local::now().format("%z").to_string());

/// One flat output record.
pub type OutputRecord = BTreeMap<String, String>;

/// Errors raised by sinks.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Writing to the underlying storage failed.
    #[error("sink io error: {0}")]
    Io(#[from] io::Error),
    /// The sink was already closed.
    #[error("sink is closed")]
    Closed,
    /// The sink refused the record.
    #[error("sink rejected record: {0}")]
    Rejected(String),
}

/// Destination for the records of one file.
pub trait RecordSink {
    /// Stage one pair into the record under construction.
    fn stage(&mut self, key: &str, value: &str);

    /// Stage every pair of `pairs`.
    fn stage_all(&mut self, pairs: &OutputRecord) {
        for (key, value) in pairs {
            self.stage(key, value);
        }
    }

    /// Whether staged data will be accepted.
    fn is_writable(&self) -> bool;

    /// Persist the staged record and start a new one.
    fn flush(&mut self) -> Result<(), SinkError>;

    /// Release the sink. Further flushes fail.
    fn close(&mut self) -> Result<(), SinkError>;
}

/// What a sink is being opened for.
#[derive(Clone, Copy, Debug)]
pub struct SinkTarget<'a> {
    /// Source file name.
    pub filename: &'a str,
    /// Source directory.
    pub dir: &'a str,
    /// Resolved tag id.
    pub tag_id: &'a str,
    /// Dataformat registered for the tag id.
    pub dataformat: &'a Dataformat,
}

/// Opens one sink per parsed file.
pub trait SinkProvider {
    /// Sink type handed out per file.
    type Sink: RecordSink;

    /// Open a sink for one file. A failure is file-fatal.
    fn open(&self, target: &SinkTarget<'_>) -> Result<Self::Sink, SinkError>;
}

/// The fixed fields appended to every record of a file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SystemFields {
    filename: String,
    dir: String,
    timezone: String,
}

impl SystemFields {
    /// System fields for a file, with the process timezone.
    pub fn new(filename: impl Into<String>, dir: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            dir: dir.into(),
            timezone: LOCAL_TIMEZONE.clone(),
        }
    }

    /// Override the timezone offset string.
    pub fn with_timezone(self, timezone: impl Into<String>) -> Self {
        SystemFields {
            timezone: timezone.into(),
            ..self
        }
    }

    /// Add the system fields to `record`, replacing same-named keys.
    pub fn apply(&self, record: &mut OutputRecord) {
        record.insert(FILENAME_KEY.to_string(), self.filename.clone());
        record.insert(SUSPECT_FLAG_KEY.to_string(), String::new());
        record.insert(DIRNAME_KEY.to_string(), self.dir.clone());
        record.insert(TIMEZONE_KEY.to_string(), self.timezone.clone());
    }
}
