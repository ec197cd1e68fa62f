use super::{FileScope, TraversalStats};
use crate::{
    columns::{split_fields, ColumnIndex, RowError},
    notify::{announce_tracked, NodeTracker},
    observability::{log_debug, log_warn},
    resolve::DatetimeRule,
    sink::{OutputRecord, RecordSink, DATETIME_KEY},
};

/// Row-wise traversal: every non-blank row is one record.
pub(crate) struct RowTraversal {
    columns: ColumnIndex,
    datetime: DatetimeRule,
    tracker: NodeTracker,
    stats: TraversalStats,
    line_number: usize,
}

impl RowTraversal {
    pub(crate) fn new(columns: ColumnIndex, datetime: DatetimeRule) -> Self {
        Self {
            columns,
            datetime,
            tracker: NodeTracker::default(),
            stats: TraversalStats::default(),
            line_number: 0,
        }
    }

    /// Map, stage and flush one row. A row that cannot be mapped is dropped
    /// without staging anything; a row the sink refuses is dropped too. Both
    /// count as rejected and parsing goes on with the next row.
    pub(crate) fn accept_line<S: RecordSink>(
        &mut self,
        scope: &FileScope<'_>,
        line: &str,
        sink: &mut S,
    ) {
        self.line_number += 1;
        if line.trim().is_empty() {
            return;
        }

        let mut record = match self.map_row(line, scope.column_delimiter, sink.is_writable()) {
            Ok(record) => record,
            Err(err) => {
                self.stats.rejected_rows += 1;
                log_warn!(
                    component = "traverse",
                    event = "row_rejected",
                    line_number = self.line_number,
                    error = %err,
                    "skipping data line"
                );
                log_debug!(component = "traverse", event = "row_rejected_content", line);
                return;
            }
        };
        scope.system.apply(&mut record);
        sink.stage_all(&record);
        if let Err(err) = sink.flush() {
            self.stats.rejected_rows += 1;
            log_warn!(
                component = "traverse",
                event = "row_flush_failed",
                line_number = self.line_number,
                error = %err,
                "skipping data line"
            );
            return;
        }
        self.stats.records += 1;
        announce_tracked(scope.notifier, &self.tracker, scope.in_dir);
    }

    /// Field pairs are only kept while the sink accepts data; the datetime
    /// field is kept either way.
    fn map_row(
        &mut self,
        line: &str,
        delimiter: &str,
        writable: bool,
    ) -> Result<OutputRecord, RowError> {
        let mut record = OutputRecord::new();
        for (index, field) in split_fields(line, delimiter).enumerate() {
            let key = self.columns.key(index)?;
            if let Some(datetime) = self.datetime.value_for(&key, field) {
                record.insert(DATETIME_KEY.to_string(), datetime.to_string());
            }
            if writable {
                let value = field.trim();
                self.tracker.observe(&key, value);
                record.insert(key, value.to_string());
            }
        }
        Ok(record)
    }

    pub(crate) fn finish(self) -> TraversalStats {
        self.stats
    }
}
