//! Per-file parser configuration resolved from source properties.

use std::{collections::BTreeSet, num::ParseIntError, str::FromStr};

use thiserror::Error;

use crate::source::PropertySource;

pub(crate) const COLUMN_DELIMITER: &str = "column_delimiter";
pub(crate) const ROW_DELIMITER: &str = "row_delimiter";
pub(crate) const TAG_ID_MODE: &str = "tag_id_mode";
pub(crate) const TAG_ID: &str = "tag_id";
pub(crate) const DATA_ID_MODE: &str = "data_id_mode";
pub(crate) const HEADER_ROW: &str = "header_row";
pub(crate) const DATATIME_MODE: &str = "datatime_mode";
pub(crate) const DATATIME_COLUMN: &str = "datatime_column";
pub(crate) const HEADER_SKIP: &str = "header_skip";
pub(crate) const HEADER_IN_ROW: &str = "header_in_row";
pub(crate) const BUFFER_SIZE: &str = "buffer_size";
pub(crate) const ROW_DELIMITER_SIZE: &str = "row_delimiter_size";
pub(crate) const FILE_NAME_FORMAT: &str = "fileNameFormat";
pub(crate) const WRITE_FOR_EACH: &str = "writeForEach";
pub(crate) const VERTICAL_TRAVERSING: &str = "verticalTraversing";
pub(crate) const IN_DIR: &str = "inDir";

const DEFAULT_BUFFER_SIZE: usize = 10_000;

/// Errors raised while reading parser configuration. Always file-fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A numeric property could not be parsed.
    #[error("property {key} has non-numeric value {value:?}: {source}")]
    InvalidNumber {
        /// Property name.
        key: &'static str,
        /// Raw property value.
        value: String,
        /// Underlying parse failure.
        #[source]
        source: ParseIntError,
    },
    /// A mode property carries a value outside its known range.
    #[error("property {key} has unknown mode {value}")]
    UnknownMode {
        /// Property name.
        key: &'static str,
        /// Parsed mode number.
        value: u32,
    },
    /// A regular expression that must compile did not.
    #[error("property {key} has invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        /// Property name.
        key: &'static str,
        /// The rejected pattern.
        pattern: String,
        /// Compilation failure.
        #[source]
        source: regex::Error,
    },
    /// A pattern whose capture group 1 is required has none.
    #[error("property {key} pattern {pattern:?} has no capture group")]
    MissingCaptureGroup {
        /// Property name.
        key: &'static str,
        /// The rejected pattern.
        pattern: String,
    },
    /// The read chunk size must be positive.
    #[error("buffer_size must be greater than zero")]
    ZeroBufferSize,
    /// A zero skip length would never move past the row delimiter.
    #[error("row_delimiter_size must be greater than zero")]
    ZeroRowDelimiterSize,
}

/// How the schema identifier (tag id) of a file is discovered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TagIdMode {
    /// `tag_id` is the identifier itself.
    FromConfig,
    /// `tag_id` is a pattern whose first capture in the filename is the identifier.
    FromFilename,
}

/// How row positions are labelled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataIdMode {
    /// Column names come from a header line of the file.
    FromHeader,
    /// Column names come from the `header_row` property.
    FromConfig,
    /// Columns are named by their 0-based position.
    FromColumns,
}

/// Where the `DATETIME_ID` system field comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DatatimeMode {
    /// No `DATETIME_ID` is emitted.
    Disabled,
    /// Copied from the column named by `datatime_column`.
    FromColumn,
    /// Captured from the filename with the `datatime_column` pattern.
    FromFilename,
}

/// Record traversal strategy, fixed for the whole file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Traversal {
    /// Every line is one positional record.
    RowWise,
    /// Every line is one key/value pair; records are assembled at end of file.
    Vertical,
}

macro_rules! mode_from_number {
    ($ty:ty, $key:expr, { $($num:literal => $variant:expr),+ $(,)? }) => {
        impl $ty {
            fn from_number(value: u32) -> Result<Self, ConfigError> {
                match value {
                    $($num => Ok($variant),)+
                    other => Err(ConfigError::UnknownMode { key: $key, value: other }),
                }
            }
        }
    };
}

mode_from_number!(TagIdMode, TAG_ID_MODE, {
    0 => TagIdMode::FromConfig,
    1 => TagIdMode::FromFilename,
});
mode_from_number!(DataIdMode, DATA_ID_MODE, {
    0 => DataIdMode::FromHeader,
    1 => DataIdMode::FromConfig,
    2 => DataIdMode::FromColumns,
});
mode_from_number!(DatatimeMode, DATATIME_MODE, {
    0 => DatatimeMode::Disabled,
    1 => DatatimeMode::FromColumn,
    2 => DatatimeMode::FromFilename,
});

/// Resolved configuration for parsing one source file.
#[derive(Debug, Clone)]
pub struct ParserOptions {
    pub(crate) column_delimiter: String,
    pub(crate) row_delimiter: String,
    pub(crate) row_delimiter_size: usize,
    pub(crate) buffer_size: usize,
    pub(crate) tag_id_mode: TagIdMode,
    pub(crate) tag_id: String,
    pub(crate) data_id_mode: DataIdMode,
    pub(crate) header_row: String,
    pub(crate) datatime_mode: DatatimeMode,
    pub(crate) datatime_column: String,
    pub(crate) header_skip: usize,
    pub(crate) header_in_row: usize,
    pub(crate) file_name_format: Option<String>,
    pub(crate) write_for_each: BTreeSet<String>,
    pub(crate) traversal: Traversal,
    pub(crate) in_dir: Option<String>,
}

impl Default for ParserOptions {
    fn default() -> Self {
        ParserOptions {
            column_delimiter: "\t".to_string(),
            row_delimiter: "\n".to_string(),
            row_delimiter_size: 1,
            buffer_size: DEFAULT_BUFFER_SIZE,
            tag_id_mode: TagIdMode::FromFilename,
            tag_id: "(.+)".to_string(),
            data_id_mode: DataIdMode::FromColumns,
            header_row: String::new(),
            datatime_mode: DatatimeMode::Disabled,
            datatime_column: String::new(),
            header_skip: 1,
            header_in_row: 0,
            file_name_format: None,
            write_for_each: BTreeSet::new(),
            traversal: Traversal::RowWise,
            in_dir: None,
        }
    }
}

impl ParserOptions {
    /// Read every parser property from `props`, falling back to defaults for
    /// absent keys.
    pub fn from_properties<P>(props: &P) -> Result<Self, ConfigError>
    where
        P: PropertySource + ?Sized,
    {
        let defaults = ParserOptions::default();

        let column_delimiter = non_empty_or(props.property(COLUMN_DELIMITER), "\t");
        let row_delimiter = non_empty_or(props.property(ROW_DELIMITER), "\n");
        let row_delimiter_size = match props.property(ROW_DELIMITER_SIZE) {
            Some(raw) => parse_number(ROW_DELIMITER_SIZE, raw)?,
            None => row_delimiter.chars().count(),
        };
        let buffer_size = number_or(props, BUFFER_SIZE, defaults.buffer_size)?;

        let tag_id_mode = TagIdMode::from_number(number_or(props, TAG_ID_MODE, 1)?)?;
        let data_id_mode = DataIdMode::from_number(number_or(props, DATA_ID_MODE, 2)?)?;
        let datatime_mode = DatatimeMode::from_number(number_or(props, DATATIME_MODE, 0)?)?;

        let write_for_each = props
            .property(WRITE_FOR_EACH)
            .map(|list| {
                list.split(',')
                    .filter(|key| !key.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let traversal = match props.property(VERTICAL_TRAVERSING) {
            Some(flag) if flag.eq_ignore_ascii_case("true") => Traversal::Vertical,
            _ => Traversal::RowWise,
        };

        let options = ParserOptions {
            column_delimiter,
            row_delimiter,
            row_delimiter_size,
            buffer_size,
            tag_id_mode,
            tag_id: props.property(TAG_ID).unwrap_or("(.+)").to_string(),
            data_id_mode,
            header_row: props.property(HEADER_ROW).unwrap_or_default().to_string(),
            datatime_mode,
            datatime_column: props
                .property(DATATIME_COLUMN)
                .unwrap_or_default()
                .to_string(),
            header_skip: number_or(props, HEADER_SKIP, defaults.header_skip)?,
            header_in_row: number_or(props, HEADER_IN_ROW, defaults.header_in_row)?,
            file_name_format: props
                .property(FILE_NAME_FORMAT)
                .filter(|pattern| !pattern.is_empty())
                .map(str::to_string),
            write_for_each,
            traversal,
            in_dir: props.property(IN_DIR).map(str::to_string),
        };
        options.validate()?;
        Ok(options)
    }

    /// Literal separator between the fields of a row.
    pub fn column_delimiter(self, column_delimiter: impl Into<String>) -> Self {
        ParserOptions {
            column_delimiter: column_delimiter.into(),
            ..self
        }
    }

    /// Sets the row delimiter and resets the skip length to its character length.
    pub fn row_delimiter(self, row_delimiter: impl Into<String>) -> Self {
        let row_delimiter = row_delimiter.into();
        ParserOptions {
            row_delimiter_size: row_delimiter.chars().count(),
            row_delimiter,
            ..self
        }
    }

    /// Characters skipped after each row delimiter match.
    pub fn row_delimiter_size(self, row_delimiter_size: usize) -> Self {
        ParserOptions {
            row_delimiter_size,
            ..self
        }
    }

    /// Bytes read from the stream per refill. Must be non-zero.
    pub fn buffer_size(self, buffer_size: usize) -> Self {
        ParserOptions {
            buffer_size,
            ..self
        }
    }

    /// How the tag id is resolved. `tag_id` is the literal id or the filename pattern,
    /// depending on `mode`.
    pub fn tag_id(self, mode: TagIdMode, tag_id: impl Into<String>) -> Self {
        ParserOptions {
            tag_id_mode: mode,
            tag_id: tag_id.into(),
            ..self
        }
    }

    /// Where column names come from.
    pub fn data_id(self, mode: DataIdMode) -> Self {
        ParserOptions {
            data_id_mode: mode,
            ..self
        }
    }

    /// Column names used with [`DataIdMode::FromConfig`].
    pub fn header_row(self, header_row: impl Into<String>) -> Self {
        ParserOptions {
            header_row: header_row.into(),
            ..self
        }
    }

    /// How `DATETIME_ID` is filled. `column` is the source column name or the
    /// filename pattern, depending on `mode`.
    pub fn datatime(self, mode: DatatimeMode, column: impl Into<String>) -> Self {
        ParserOptions {
            datatime_mode: mode,
            datatime_column: column.into(),
            ..self
        }
    }

    /// Number of leading lines consumed before data in row-wise mode.
    pub fn header_skip(self, header_skip: usize) -> Self {
        ParserOptions {
            header_skip,
            ..self
        }
    }

    /// 0-based position of the header among the skipped lines.
    pub fn header_in_row(self, header_in_row: usize) -> Self {
        ParserOptions {
            header_in_row,
            ..self
        }
    }

    /// Entity-name pattern; files it does not fully match are skipped.
    pub fn file_name_format(self, pattern: impl Into<String>) -> Self {
        ParserOptions {
            file_name_format: Some(pattern.into()),
            ..self
        }
    }

    /// Keys whose values each produce a record in vertical mode.
    pub fn write_for_each<I, S>(self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ParserOptions {
            write_for_each: keys.into_iter().map(Into::into).collect(),
            ..self
        }
    }

    /// Row-wise or vertical traversal.
    pub fn traversal(self, traversal: Traversal) -> Self {
        ParserOptions { traversal, ..self }
    }

    /// Input directory used to derive the OSS id of announced nodes.
    pub fn in_dir(self, in_dir: impl Into<String>) -> Self {
        ParserOptions {
            in_dir: Some(in_dir.into()),
            ..self
        }
    }
}

impl ParserOptions {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_size == 0 {
            return Err(ConfigError::ZeroBufferSize);
        }
        if self.row_delimiter_size == 0 {
            return Err(ConfigError::ZeroRowDelimiterSize);
        }
        Ok(())
    }
}

fn non_empty_or(value: Option<&str>, default: &str) -> String {
    match value {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => default.to_string(),
    }
}

fn parse_number<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr<Err = ParseIntError>,
{
    raw.trim()
        .parse()
        .map_err(|source| ConfigError::InvalidNumber {
            key,
            value: raw.to_string(),
            source,
        })
}

fn number_or<P, T>(props: &P, key: &'static str, default: T) -> Result<T, ConfigError>
where
    P: PropertySource + ?Sized,
    T: FromStr<Err = ParseIntError>,
{
    match props.property(key) {
        Some(raw) => parse_number(key, raw),
        None => Ok(default),
    }
}
