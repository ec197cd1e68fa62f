//! Record assembly from row tokens.
//!
//! A file is traversed in exactly one [`Traversal`] mode, chosen when the
//! file is opened. [`Traverser::drive`] pulls rows from the [`BlockReader`]
//! until the stream is exhausted, then lets the active mode emit whatever it
//! still holds.

mod row;
mod vertical;

use std::{collections::BTreeSet, io::Read};

pub(crate) use row::RowTraversal;
pub(crate) use vertical::VerticalTraversal;

use crate::{
    columns::ColumnIndex,
    error::ParseError,
    notify::NodeNotifier,
    option::Traversal,
    reader::BlockReader,
    resolve::DatetimeRule,
    sink::{RecordSink, SystemFields},
};

/// Counters for one traversed file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TraversalStats {
    /// Records flushed to the sink.
    pub records: usize,
    /// Rows discarded because their fields could not be mapped or the sink
    /// refused to flush them.
    pub rejected_rows: usize,
}

/// Per-file values shared by both traversal modes.
pub(crate) struct FileScope<'a> {
    pub(crate) column_delimiter: &'a str,
    pub(crate) system: &'a SystemFields,
    pub(crate) notifier: Option<&'a dyn NodeNotifier>,
    pub(crate) in_dir: Option<&'a str>,
}

/// The active traversal mode and its per-file state.
pub(crate) enum Traverser {
    Rows(RowTraversal),
    Vertical(VerticalTraversal),
}

impl Traverser {
    pub(crate) fn new(
        traversal: Traversal,
        columns: ColumnIndex,
        datetime: DatetimeRule,
        write_for_each: BTreeSet<String>,
        entity_token: Option<String>,
    ) -> Self {
        match traversal {
            Traversal::RowWise => Traverser::Rows(RowTraversal::new(columns, datetime)),
            Traversal::Vertical => {
                Traverser::Vertical(VerticalTraversal::new(write_for_each, entity_token))
            }
        }
    }

    /// Feed every remaining row of `reader` through the active mode.
    pub(crate) fn drive<R, S>(
        mut self,
        reader: &mut BlockReader<R>,
        row_delimiter: &str,
        scope: &FileScope<'_>,
        sink: &mut S,
    ) -> Result<TraversalStats, ParseError>
    where
        R: Read,
        S: RecordSink,
    {
        while let Some(line) = reader.next_token(row_delimiter)? {
            match &mut self {
                Traverser::Rows(rows) => rows.accept_line(scope, &line, sink),
                Traverser::Vertical(vertical) => vertical.accept_line(scope, &line),
            }
        }
        Ok(match self {
            Traverser::Rows(rows) => rows.finish(),
            Traverser::Vertical(vertical) => vertical.finish(scope, sink),
        })
    }
}
