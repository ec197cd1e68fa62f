use std::collections::{BTreeMap, BTreeSet};

use super::{FileScope, TraversalStats};
use crate::{
    columns::split_pair,
    notify::{announce_tracked, NodeTracker},
    observability::{log_debug, log_warn},
    sink::{OutputRecord, RecordSink},
};

/// Scalar key holding a write-for-each value that names the file's entity.
pub(crate) const ENTITY_ALIAS_KEY: &str = "enodeBFDN";
/// Key that falls back to the entity alias when it was never accumulated.
pub(crate) const FDN_KEY: &str = "FDN";

/// Tag/value traversal: every row is one `key<delim>value` pair and records
/// are only assembled once the whole file has been read.
pub(crate) struct VerticalTraversal {
    write_for_each: BTreeSet<String>,
    entity_token: Option<String>,
    scalars: OutputRecord,
    accumulated: BTreeMap<String, Vec<String>>,
    tracker: NodeTracker,
}

impl VerticalTraversal {
    pub(crate) fn new(write_for_each: BTreeSet<String>, entity_token: Option<String>) -> Self {
        Self {
            write_for_each,
            entity_token,
            scalars: OutputRecord::new(),
            accumulated: BTreeMap::new(),
            tracker: NodeTracker::default(),
        }
    }

    pub(crate) fn accept_line(&mut self, scope: &FileScope<'_>, line: &str) {
        let Some((key, value)) = split_pair(line, scope.column_delimiter) else {
            return;
        };

        if !self.write_for_each.contains(key) {
            self.tracker.observe(key, value);
            self.scalars.insert(key.to_string(), value.to_string());
            return;
        }

        match self.entity_token.as_deref() {
            Some(token) if value.contains(token) => {
                log_debug!(
                    component = "traverse",
                    event = "entity_alias_set",
                    key,
                    value,
                );
                self.scalars
                    .insert(ENTITY_ALIAS_KEY.to_string(), value.to_string());
            }
            _ => self
                .accumulated
                .entry(key.to_string())
                .or_default()
                .push(value.to_string()),
        }
    }

    /// Emit one record per accumulated value. A sink failure stops emission
    /// and is logged; the records flushed before it are kept.
    pub(crate) fn finish<S: RecordSink>(
        mut self,
        scope: &FileScope<'_>,
        sink: &mut S,
    ) -> TraversalStats {
        if !self.accumulated.contains_key(FDN_KEY) {
            if let Some(alias) = self.scalars.get(ENTITY_ALIAS_KEY) {
                self.accumulated
                    .insert(FDN_KEY.to_string(), vec![alias.clone()]);
            }
        }

        let mut stats = TraversalStats::default();
        'emit: for (key, values) in &self.accumulated {
            for value in values {
                // Scalars override the pair when they share a key.
                let mut record = OutputRecord::from([(key.clone(), value.clone())]);
                record.extend(self.scalars.iter().map(|(k, v)| (k.clone(), v.clone())));
                scope.system.apply(&mut record);
                sink.stage_all(&record);
                if let Err(err) = sink.flush() {
                    log_warn!(
                        component = "traverse",
                        event = "vertical_flush_failed",
                        key = %key,
                        flushed = stats.records,
                        error = %err,
                    );
                    break 'emit;
                }
                stats.records += 1;
            }
        }
        self.scalars.clear();

        announce_tracked(scope.notifier, &self.tracker, scope.in_dir);
        stats
    }
}
