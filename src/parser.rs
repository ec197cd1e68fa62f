//! Per-file parse driver.
//!
//! [`AsciiParser::parse`] resolves the file's configuration, tag id, entity
//! name and datetime rule, opens a sink for the tag's dataformat and feeds the
//! file through the configured traversal. The sink is closed on every path
//! once it has been opened.

use std::{io::Read, sync::Arc, time::Instant};

use crate::{
    columns::ColumnIndex,
    error::ParseError,
    notify::NodeNotifier,
    observability::{log_debug, log_info, log_warn, LogContext},
    option::{DataIdMode, ParserOptions, Traversal},
    reader::{BlockReader, Charset},
    resolve::{resolve_datetime, resolve_entity_name, resolve_tag_id, DatetimeRule, EntityName},
    schema::{Dataformat, SchemaLookup},
    sink::{RecordSink, SinkProvider, SinkTarget, SystemFields},
    source::SourceFile,
    traverse::{FileScope, TraversalStats, Traverser},
};

/// Totals for one fully parsed file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileSummary {
    /// Tag id the file was parsed under.
    pub tag_id: String,
    /// Records flushed to the sink.
    pub records: usize,
    /// Rows dropped because they could not be mapped or flushed.
    pub rejected_rows: usize,
}

/// How a file's parse ended when it did not fail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParseOutcome {
    /// The whole file was read.
    Completed(FileSummary),
    /// The filename did not match the entity-name pattern; nothing was read.
    Skipped {
        /// Name of the skipped file.
        filename: String,
    },
}

impl ParseOutcome {
    /// Records flushed for the file; zero when skipped.
    pub fn records(&self) -> usize {
        match self {
            ParseOutcome::Completed(summary) => summary.records,
            ParseOutcome::Skipped { .. } => 0,
        }
    }
}

/// Decoder for delimited ASCII files.
pub struct AsciiParser<L, P> {
    schemas: L,
    sinks: P,
    notifier: Option<Arc<dyn NodeNotifier>>,
    context: LogContext,
    charset: Charset,
}

impl<L, P> AsciiParser<L, P>
where
    L: SchemaLookup,
    P: SinkProvider,
{
    /// Parser resolving dataformats through `schemas` and writing through
    /// sinks opened by `sinks`.
    pub fn new(schemas: L, sinks: P) -> Self {
        Self {
            schemas,
            sinks,
            notifier: None,
            context: LogContext::default(),
            charset: Charset::default(),
        }
    }

    /// Announce nodes seen in parsed records to `notifier`.
    pub fn with_notifier(self, notifier: Arc<dyn NodeNotifier>) -> Self {
        AsciiParser {
            notifier: Some(notifier),
            ..self
        }
    }

    /// Worker identity attached to every parser event.
    pub fn with_log_context(self, context: LogContext) -> Self {
        AsciiParser { context, ..self }
    }

    /// Character encoding of every parsed file. UTF-8 by default.
    pub fn with_charset(self, charset: Charset) -> Self {
        AsciiParser { charset, ..self }
    }

    /// The worker identity in use.
    pub fn log_context(&self) -> &LogContext {
        &self.context
    }

    /// The sink provider files are written through.
    pub fn sinks(&self) -> &P {
        &self.sinks
    }

    /// Parse `source` with the options found in its own properties.
    pub fn parse(&self, source: &dyn SourceFile) -> Result<ParseOutcome, ParseError> {
        let options = ParserOptions::from_properties(source)?;
        self.parse_with_options(source, &options)
    }

    /// Parse `source` with explicit `options`, ignoring its properties.
    pub fn parse_with_options(
        &self,
        source: &dyn SourceFile,
        options: &ParserOptions,
    ) -> Result<ParseOutcome, ParseError> {
        options.validate()?;
        let started = Instant::now();
        let filename = source.name();

        let tag = resolve_tag_id(options, filename);
        let entity = resolve_entity_name(options, filename)?;
        if entity == EntityName::Mismatch {
            log_info!(
                component = "parser",
                event = "file_skipped",
                context = %self.context,
                filename,
                "filename does not match the entity name pattern"
            );
            return Ok(ParseOutcome::Skipped {
                filename: filename.to_string(),
            });
        }
        let datetime = resolve_datetime(options, filename);

        let dataformat =
            self.schemas
                .lookup(&tag.value)
                .ok_or_else(|| ParseError::SchemaNotFound {
                    tag_id: tag.value.clone(),
                })?;

        let mut sink = self.sinks.open(&SinkTarget {
            filename,
            dir: source.dir(),
            tag_id: &tag.value,
            dataformat: &dataformat,
        })?;

        let decoded = self.decode(source, options, &dataformat, datetime, entity, &mut sink);
        if let Err(err) = sink.close() {
            log_warn!(
                component = "parser",
                event = "sink_close_failed",
                context = %self.context,
                filename,
                error = %err,
            );
        }
        let stats = decoded?;

        log_info!(
            component = "parser",
            event = "file_parsed",
            context = %self.context,
            filename,
            tag_id = %tag.value,
            records = stats.records,
            rejected_rows = stats.rejected_rows,
            elapsed_ms = started.elapsed().as_millis() as u64,
        );
        Ok(ParseOutcome::Completed(FileSummary {
            tag_id: tag.value,
            records: stats.records,
            rejected_rows: stats.rejected_rows,
        }))
    }

    fn decode<S: RecordSink>(
        &self,
        source: &dyn SourceFile,
        options: &ParserOptions,
        dataformat: &Dataformat,
        datetime: DatetimeRule,
        entity: EntityName,
        sink: &mut S,
    ) -> Result<TraversalStats, ParseError> {
        let stream = source.open()?;
        let mut reader = BlockReader::new(
            stream,
            self.charset,
            options.buffer_size,
            options.row_delimiter_size,
        );
        log_debug!(
            component = "parser",
            event = "decode_started",
            filename = source.name(),
            dataformat = dataformat.id(),
            traversal = ?options.traversal,
        );

        let columns = match options.traversal {
            Traversal::RowWise => read_columns(&mut reader, options)?,
            Traversal::Vertical => ColumnIndex::Ordinal,
        };

        let system = SystemFields::new(source.name(), source.dir());
        let scope = FileScope {
            column_delimiter: &options.column_delimiter,
            system: &system,
            notifier: self.notifier.as_deref(),
            in_dir: options.in_dir.as_deref(),
        };
        Traverser::new(
            options.traversal,
            columns,
            datetime,
            options.write_for_each.clone(),
            entity.token().map(str::to_string),
        )
        .drive(&mut reader, &options.row_delimiter, &scope, sink)
    }
}

/// Consume the leading `header_skip` lines and build the file's column index.
fn read_columns<R: Read>(
    reader: &mut BlockReader<R>,
    options: &ParserOptions,
) -> Result<ColumnIndex, ParseError> {
    let mut header = String::new();
    for position in 0..options.header_skip {
        let Some(line) = reader.next_token(&options.row_delimiter)? else {
            break;
        };
        if position == options.header_in_row {
            header = line;
        }
    }

    Ok(match options.data_id_mode {
        DataIdMode::FromHeader => ColumnIndex::from_header(&header, &options.column_delimiter),
        DataIdMode::FromConfig => {
            ColumnIndex::from_header(&options.header_row, &options.column_delimiter)
        }
        DataIdMode::FromColumns => ColumnIndex::Ordinal,
    })
}
