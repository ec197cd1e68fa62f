//! Incremental, configuration-driven decoder for delimited ASCII files.
//!
//! Each file is streamed through a [`reader::BlockReader`], its rows are
//! labelled by a [`columns::ColumnIndex`] and turned into flat key/value
//! records that are staged into a [`sink::RecordSink`]. How a file is read
//! (delimiters, header discovery, tag id and datetime extraction, row-wise or
//! tag/value traversal) is driven entirely by the file's properties; see
//! [`option::ParserOptions`].
//!
//! ```no_run
//! use ascii_parser::{
//!     schema::{Dataformat, StaticSchemaLookup},
//!     sink::DelimitedTableProvider,
//!     source::FileSource,
//!     AsciiParser,
//! };
//! use std::collections::HashMap;
//!
//! let schemas = StaticSchemaLookup::new()
//!     .with("DIM_E_SGEH_SGSN", Dataformat::new("df", ["SGSN_NAME", "IP_ADDRESS"]));
//! let parser = AsciiParser::new(schemas, DelimitedTableProvider::new("/tmp/out"));
//!
//! let mut props = HashMap::new();
//! props.insert("column_delimiter".to_string(), "|".to_string());
//! props.insert("data_id_mode".to_string(), "0".to_string());
//! props.insert("tag_id".to_string(), "^(\\w+)\\.".to_string());
//! let outcome = parser
//!     .parse(&FileSource::new("/in/DIM_E_SGEH_SGSN.txt", props))
//!     .expect("parse");
//! println!("{} records", outcome.records());
//! ```

#![deny(missing_docs)]

mod error;
mod observability;
mod traverse;

/// Sequential parsing of a queue of files.
pub mod batch;
/// Column labelling and field splitting.
pub mod columns;
/// Node announcements for external bookkeeping.
pub mod notify;
/// Parser configuration.
pub mod option;
/// Per-file parse driver.
pub mod parser;
/// Delimiter-driven stream tokenizer.
pub mod reader;
/// Tag id, datetime and entity-name extraction from filenames.
pub mod resolve;
/// Dataformat lookup.
pub mod schema;
/// Record sinks.
pub mod sink;
/// Input files and their properties.
pub mod source;

pub use crate::{
    batch::{BatchHooks, BatchReport, BatchRunner, NoHooks, SourceQueue, WorkerStatus},
    error::ParseError,
    observability::LogContext,
    option::{ConfigError, ParserOptions},
    parser::{AsciiParser, FileSummary, ParseOutcome},
    traverse::TraversalStats,
};
