//! Sequential worker that parses a queue of files.
//!
//! Every file is parsed on its own: a failing file is reported to the hooks
//! and in the [`BatchReport`], and the runner moves on to the next one.

use std::{
    fmt,
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use crate::{
    error::ParseError,
    observability::{log_info, log_warn},
    parser::{AsciiParser, ParseOutcome},
    schema::SchemaLookup,
    sink::SinkProvider,
    source::SourceFile,
};

/// Supplier of the files a worker parses.
pub trait SourceQueue {
    /// File type handed out by the queue.
    type Source: SourceFile;

    /// The next file, or `None` when the queue is drained.
    fn next_source(&mut self) -> Option<Self::Source>;
}

impl<I> SourceQueue for I
where
    I: Iterator,
    I::Item: SourceFile,
{
    type Source = I::Item;

    fn next_source(&mut self) -> Option<I::Item> {
        self.next()
    }
}

/// Callbacks around each file. All default to doing nothing.
pub trait BatchHooks {
    /// Runs before the file is opened.
    fn pre_parse(&mut self, _source: &dyn SourceFile) {}

    /// Runs after a parse that completed or skipped the file.
    fn post_parse(&mut self, _source: &dyn SourceFile, _outcome: &ParseOutcome) {}

    /// Runs after a file-fatal failure.
    fn error_parse(&mut self, _source: &dyn SourceFile, _error: &ParseError) {}

    /// Runs after `post_parse` or `error_parse`, for every file.
    fn finally_parse(&mut self, _source: &dyn SourceFile) {}
}

/// Hooks that do nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoHooks;

impl BatchHooks for NoHooks {}

/// Lifecycle of a [`BatchRunner`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerStatus {
    /// Ready to run.
    Initialized = 1,
    /// Working through the queue.
    Running = 2,
    /// The queue is drained.
    Finished = 3,
}

impl WorkerStatus {
    fn from_u8(raw: u8) -> Self {
        match raw {
            2 => WorkerStatus::Running,
            3 => WorkerStatus::Finished,
            _ => WorkerStatus::Initialized,
        }
    }
}

/// Shared, read-only view of a runner's status.
#[derive(Clone, Debug)]
pub struct StatusHandle(Arc<AtomicU8>);

impl StatusHandle {
    /// Current status of the runner.
    pub fn get(&self) -> WorkerStatus {
        WorkerStatus::from_u8(self.0.load(Ordering::Acquire))
    }
}

/// Result of one file in a batch.
#[derive(Debug)]
pub struct FileReport {
    /// Name of the source file.
    pub filename: String,
    /// Size reported by the source.
    pub size: u64,
    /// How the parse ended.
    pub result: Result<ParseOutcome, ParseError>,
}

/// Everything a batch run did.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// One entry per file, in queue order.
    pub files: Vec<FileReport>,
    /// Sum of the sizes of all files handed to the runner.
    pub bytes: u64,
    /// Wall time of the whole run.
    pub elapsed: Duration,
}

impl BatchReport {
    /// Number of files handed to the runner.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Records flushed over all files.
    pub fn records(&self) -> usize {
        self.files
            .iter()
            .filter_map(|file| file.result.as_ref().ok())
            .map(ParseOutcome::records)
            .sum()
    }

    /// Files whose parse failed.
    pub fn failures(&self) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter(|file| file.result.is_err())
    }

    /// Bytes per millisecond; `None` when the run took under a millisecond.
    pub fn throughput(&self) -> Option<u64> {
        let millis = self.elapsed.as_millis() as u64;
        (millis != 0).then(|| self.bytes / millis)
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} files parsed in {} milliseconds, filesize is {} bytes",
            self.file_count(),
            self.elapsed.as_millis(),
            self.bytes
        )?;
        if let Some(throughput) = self.throughput() {
            write!(f, " and throughput : {throughput} bytes/ms")?;
        }
        Ok(())
    }
}

/// Parses every file of a [`SourceQueue`] in turn with one [`AsciiParser`].
pub struct BatchRunner<L, P> {
    parser: AsciiParser<L, P>,
    status: Arc<AtomicU8>,
}

impl<L, P> BatchRunner<L, P>
where
    L: SchemaLookup,
    P: SinkProvider,
{
    /// Wrap `parser` in an idle runner.
    pub fn new(parser: AsciiParser<L, P>) -> Self {
        Self {
            parser,
            status: Arc::new(AtomicU8::new(WorkerStatus::Initialized as u8)),
        }
    }

    /// Current lifecycle status.
    pub fn status(&self) -> WorkerStatus {
        WorkerStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    /// Handle for watching the status from elsewhere.
    pub fn status_handle(&self) -> StatusHandle {
        StatusHandle(Arc::clone(&self.status))
    }

    /// The parser every file goes through.
    pub fn parser(&self) -> &AsciiParser<L, P> {
        &self.parser
    }

    /// Drain `queue`, parsing each file and calling `hooks` around it.
    pub fn run<Q, H>(&self, mut queue: Q, hooks: &mut H) -> BatchReport
    where
        Q: SourceQueue,
        H: BatchHooks + ?Sized,
    {
        self.set_status(WorkerStatus::Running);
        let started = Instant::now();
        let mut report = BatchReport::default();

        while let Some(source) = queue.next_source() {
            let size = source.size();
            report.bytes += size;

            hooks.pre_parse(&source);
            let result = self.parser.parse(&source);
            match &result {
                Ok(outcome) => hooks.post_parse(&source, outcome),
                Err(err) => {
                    log_warn!(
                        component = "batch",
                        event = "file_failed",
                        context = %self.parser.log_context(),
                        filename = source.name(),
                        error = %err,
                    );
                    hooks.error_parse(&source, err);
                }
            }
            hooks.finally_parse(&source);

            report.files.push(FileReport {
                filename: source.name().to_string(),
                size,
                result,
            });
        }

        report.elapsed = started.elapsed();
        if report.throughput().is_some() {
            log_info!(
                component = "batch",
                event = "parse_performance",
                context = %self.parser.log_context(),
                files = report.file_count(),
                bytes = report.bytes,
                elapsed_ms = report.elapsed.as_millis() as u64,
                "Parsing Performance :: {report}"
            );
        }
        self.set_status(WorkerStatus::Finished);
        report
    }

    fn set_status(&self, status: WorkerStatus) {
        self.status.store(status as u8, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        schema::{Dataformat, StaticSchemaLookup},
        sink::MemorySinkProvider,
        source::InMemorySource,
    };

    #[derive(Default)]
    struct Trace(Vec<String>);

    impl BatchHooks for Trace {
        fn pre_parse(&mut self, source: &dyn SourceFile) {
            self.0.push(format!("pre {}", source.name()));
        }

        fn post_parse(&mut self, source: &dyn SourceFile, outcome: &ParseOutcome) {
            self.0
                .push(format!("post {} {}", source.name(), outcome.records()));
        }

        fn error_parse(&mut self, source: &dyn SourceFile, _error: &ParseError) {
            self.0.push(format!("error {}", source.name()));
        }

        fn finally_parse(&mut self, source: &dyn SourceFile) {
            self.0.push(format!("finally {}", source.name()));
        }
    }

    fn runner() -> BatchRunner<StaticSchemaLookup, MemorySinkProvider> {
        let schemas = StaticSchemaLookup::new().with("known", Dataformat::new("df", ["0"]));
        BatchRunner::new(AsciiParser::new(schemas, MemorySinkProvider::new()))
    }

    fn source(name: &str, data: &str) -> InMemorySource {
        InMemorySource::new(name, data)
            .with_property("tag_id", "^([a-z]+)")
            .with_property("header_skip", "0")
    }

    #[test]
    fn failing_file_does_not_stop_the_batch() {
        let runner = runner();
        assert_eq!(runner.status(), WorkerStatus::Initialized);
        let handle = runner.status_handle();

        let files = vec![
            source("known_1", "a\nb\n"),
            source("unknown_1", "c\n"),
            source("known_2", "d\n"),
        ];
        let mut hooks = Trace::default();
        let report = runner.run(files.into_iter(), &mut hooks);

        assert_eq!(handle.get(), WorkerStatus::Finished);
        assert_eq!(report.file_count(), 3);
        assert_eq!(report.records(), 3);
        assert_eq!(report.bytes, 4 + 2 + 2);

        let failed: Vec<_> = report.failures().map(|file| file.filename.as_str()).collect();
        assert_eq!(failed, vec!["unknown_1"]);
        assert!(matches!(
            report.files[1].result,
            Err(ParseError::SchemaNotFound { .. })
        ));

        assert_eq!(
            hooks.0,
            vec![
                "pre known_1",
                "post known_1 2",
                "finally known_1",
                "pre unknown_1",
                "error unknown_1",
                "finally unknown_1",
                "pre known_2",
                "post known_2 1",
                "finally known_2",
            ]
        );
    }

    #[test]
    fn empty_queue_finishes_with_empty_report() {
        let runner = runner();
        let report = runner.run(Vec::<InMemorySource>::new().into_iter(), &mut NoHooks);
        assert_eq!(report.file_count(), 0);
        assert_eq!(report.records(), 0);
        assert_eq!(runner.status(), WorkerStatus::Finished);
    }

    #[test]
    fn throughput_needs_elapsed_time() {
        let mut report = BatchReport {
            bytes: 5000,
            ..Default::default()
        };
        assert_eq!(report.throughput(), None);
        report.elapsed = Duration::from_millis(10);
        assert_eq!(report.throughput(), Some(500));
        assert!(report.to_string().contains("throughput : 500 bytes/ms"));
    }
}
