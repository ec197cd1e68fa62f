use std::{
    fs::{self, File, OpenOptions},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use super::{OutputRecord, RecordSink, SinkError, SinkProvider, SinkTarget};
use crate::observability::log_debug;

/// Writes each tag's records to `<dir>/<tag_id>`, one line per record.
#[derive(Clone, Debug)]
pub struct DelimitedTableProvider {
    dir: PathBuf,
    separator: String,
}

impl DelimitedTableProvider {
    /// Tab-separated tables under `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            separator: "\t".to_string(),
        }
    }

    /// Field separator written between columns. Tab by default.
    pub fn separator(self, separator: impl Into<String>) -> Self {
        DelimitedTableProvider {
            separator: separator.into(),
            ..self
        }
    }

    /// Path of the table written for `tag_id`.
    pub fn table_path(&self, tag_id: &str) -> PathBuf {
        self.dir.join(tag_id)
    }
}

impl SinkProvider for DelimitedTableProvider {
    type Sink = DelimitedTableSink;

    fn open(&self, target: &SinkTarget<'_>) -> Result<DelimitedTableSink, SinkError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.table_path(target.tag_id);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        log_debug!(
            component = "sink",
            event = "table_opened",
            path = %path.display(),
            columns = target.dataformat.columns().len(),
        );
        Ok(DelimitedTableSink::new(
            file,
            &path,
            target.dataformat.columns().to_vec(),
            self.separator.clone(),
        ))
    }
}

/// Sink writing records as delimited lines in dataformat column order.
///
/// Keys outside the dataformat are dropped; columns without a staged value
/// are written empty.
#[derive(Debug)]
pub struct DelimitedTableSink {
    writer: Option<BufWriter<File>>,
    path: PathBuf,
    columns: Vec<String>,
    separator: String,
    staged: OutputRecord,
}

impl DelimitedTableSink {
    fn new(file: File, path: &Path, columns: Vec<String>, separator: String) -> Self {
        Self {
            writer: Some(BufWriter::new(file)),
            path: path.to_path_buf(),
            columns,
            separator,
            staged: OutputRecord::new(),
        }
    }

    /// File this sink appends to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn render(&self) -> String {
        let mut line = self
            .columns
            .iter()
            .map(|column| self.staged.get(column).map(String::as_str).unwrap_or(""))
            .collect::<Vec<_>>()
            .join(&self.separator);
        line.push('\n');
        line
    }
}

impl RecordSink for DelimitedTableSink {
    fn stage(&mut self, key: &str, value: &str) {
        self.staged.insert(key.to_string(), value.to_string());
    }

    fn is_writable(&self) -> bool {
        self.writer.is_some()
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        let line = self.render();
        self.staged.clear();
        let writer = self.writer.as_mut().ok_or(SinkError::Closed)?;
        writer.write_all(line.as_bytes())?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        self.staged.clear();
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }
}
