//! Logging infrastructure for the parser.
//!
//! All events go through `tracing` with target "ascii_parser" and carry an
//! `event` field for filtering.
//!
//! ## Library Integration
//!
//! The crate never initializes a global subscriber. Applications configure
//! tracing via `tracing_subscriber` or similar.
//!
//! ## Conventions
//!
//! - `event`: snake_case event name (required)
//! - `component`: subsystem (e.g., "reader", "traverse", "batch")
//! - Use `%` for Display, `?` for Debug formatting
//! - Row contents are only logged at debug level

use std::fmt;

/// Target for all parser log events.
pub(crate) const PARSER_TARGET: &str = "ascii_parser";

/// Macro for info-level log events.
///
/// # Example
/// ```ignore
/// log_info!(
///     component = "parser",
///     event = "file_parsed",
///     filename = %name,
///     records = count,
/// );
/// ```
macro_rules! log_info {
    ($($field:tt)*) => {
        ::tracing::info!(target: $crate::observability::PARSER_TARGET, $($field)*)
    };
}

/// Macro for debug-level log events.
macro_rules! log_debug {
    ($($field:tt)*) => {
        ::tracing::debug!(target: $crate::observability::PARSER_TARGET, $($field)*)
    };
}

/// Macro for warn-level log events.
macro_rules! log_warn {
    ($($field:tt)*) => {
        ::tracing::warn!(target: $crate::observability::PARSER_TARGET, $($field)*)
    };
}

/// Macro for error-level log events.
macro_rules! log_error {
    ($($field:tt)*) => {
        ::tracing::error!(target: $crate::observability::PARSER_TARGET, $($field)*)
    };
}

pub(crate) use log_debug;
pub(crate) use log_error;
pub(crate) use log_info;
pub(crate) use log_warn;

/// Identity of the worker a parser runs under, appended to parser events.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LogContext {
    tech_pack: String,
    set_type: String,
    set_name: String,
    worker: String,
}

impl LogContext {
    /// Build a context for the given tech pack, set and worker names.
    pub fn new(
        tech_pack: impl Into<String>,
        set_type: impl Into<String>,
        set_name: impl Into<String>,
        worker: impl Into<String>,
    ) -> Self {
        Self {
            tech_pack: tech_pack.into(),
            set_type: set_type.into(),
            set_name: set_name.into(),
            worker: worker.into(),
        }
    }
}

impl fmt::Display for LogContext {
    /// Dotted logger path, e.g. `etl.tp.st.sn.parser.ASCII.worker`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "etl.{}.{}.{}.parser.ASCII",
            self.tech_pack, self.set_type, self.set_name
        )?;
        if !self.worker.is_empty() {
            write!(f, ".{}", self.worker)?;
        }
        Ok(())
    }
}
