use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex, PoisonError,
};

use super::{OutputRecord, RecordSink, SinkError, SinkProvider, SinkTarget};

/// A flushed record together with the file it came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapturedRecord {
    /// Tag id of the sink that flushed the record.
    pub tag_id: String,
    /// Source file the record came from.
    pub filename: String,
    /// The flushed pairs.
    pub fields: OutputRecord,
}

#[derive(Debug, Default)]
struct Shared {
    records: Mutex<Vec<CapturedRecord>>,
    opened: AtomicUsize,
    closed: AtomicUsize,
}

/// Provider of [`MemorySink`]s that all append to one shared record list.
#[derive(Clone, Debug, Default)]
pub struct MemorySinkProvider {
    shared: Arc<Shared>,
    flush_limit: Option<usize>,
}

impl MemorySinkProvider {
    /// Provider with no flush limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every sink reject flushes once `limit` records were stored in total.
    pub fn with_flush_limit(self, limit: usize) -> Self {
        MemorySinkProvider {
            flush_limit: Some(limit),
            ..self
        }
    }

    /// Snapshot of all records flushed so far.
    pub fn records(&self) -> Vec<CapturedRecord> {
        self.shared
            .records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of sinks opened.
    pub fn opened(&self) -> usize {
        self.shared.opened.load(Ordering::SeqCst)
    }

    /// Number of sinks closed.
    pub fn closed(&self) -> usize {
        self.shared.closed.load(Ordering::SeqCst)
    }
}

impl SinkProvider for MemorySinkProvider {
    type Sink = MemorySink;

    fn open(&self, target: &SinkTarget<'_>) -> Result<MemorySink, SinkError> {
        self.shared.opened.fetch_add(1, Ordering::SeqCst);
        Ok(MemorySink {
            shared: Arc::clone(&self.shared),
            flush_limit: self.flush_limit,
            tag_id: target.tag_id.to_string(),
            filename: target.filename.to_string(),
            staged: OutputRecord::new(),
            open: true,
        })
    }
}

/// Sink that keeps flushed records in memory.
#[derive(Debug)]
pub struct MemorySink {
    shared: Arc<Shared>,
    flush_limit: Option<usize>,
    tag_id: String,
    filename: String,
    staged: OutputRecord,
    open: bool,
}

impl RecordSink for MemorySink {
    fn stage(&mut self, key: &str, value: &str) {
        self.staged.insert(key.to_string(), value.to_string());
    }

    fn is_writable(&self) -> bool {
        self.open
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        if !self.open {
            return Err(SinkError::Closed);
        }
        let fields = std::mem::take(&mut self.staged);
        let mut records = self
            .shared
            .records
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if self.flush_limit.is_some_and(|limit| records.len() >= limit) {
            return Err(SinkError::Rejected(format!(
                "flush limit of {} records reached",
                records.len()
            )));
        }
        records.push(CapturedRecord {
            tag_id: self.tag_id.clone(),
            filename: self.filename.clone(),
            fields,
        });
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        if self.open {
            self.open = false;
            self.staged.clear();
            self.shared.closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}
