use std::io;

use thiserror::Error;

use crate::{option::ConfigError, sink::SinkError};

/// File-fatal parse failures. The failing file produces no further records;
/// sibling files in a batch are unaffected.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The file's properties are unusable.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    /// No dataformat is registered for the resolved tag id.
    #[error("no dataformat found for tag id {tag_id:?}")]
    SchemaNotFound {
        /// The tag id resolved for the file.
        tag_id: String,
    },
    /// The source stream could not be opened or read.
    #[error("stream error: {0}")]
    Stream(#[from] io::Error),
    /// The sink could not be opened.
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),
}
