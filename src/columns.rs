//! Column labelling: turns a row position into the key a value is stored under.

use thiserror::Error;

/// Row-scoped failure: the row is discarded and parsing continues.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RowError {
    /// The row has more fields than the file's header declares.
    #[error("field {index} has no column name ({columns} columns resolved)")]
    UnmappedField {
        /// 0-based position of the first unmapped field.
        index: usize,
        /// Number of resolved column names.
        columns: usize,
    },
}

/// Ordered column names for one file, or positional naming.
///
/// Built once when the file is opened and never rebuilt mid-file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ColumnIndex {
    /// Field keys come from a header line.
    Named(Vec<String>),
    /// Field keys are the 0-based field position.
    Ordinal,
}

impl ColumnIndex {
    /// Build a named index by splitting `header` on `delimiter`.
    pub fn from_header(header: &str, delimiter: &str) -> Self {
        ColumnIndex::Named(split_fields(header, delimiter).map(str::to_string).collect())
    }

    /// Key for the field at `index`. Header names are trimmed.
    pub fn key(&self, index: usize) -> Result<String, RowError> {
        match self {
            ColumnIndex::Ordinal => Ok(index.to_string()),
            ColumnIndex::Named(names) => names
                .get(index)
                .map(|name| name.trim().to_string())
                .ok_or(RowError::UnmappedField {
                    index,
                    columns: names.len(),
                }),
        }
    }
}

/// Split `line` on the literal `delimiter`.
///
/// Trailing empty fields are dropped, except that an empty line yields a
/// single empty field.
pub fn split_fields<'a>(line: &'a str, delimiter: &str) -> impl Iterator<Item = &'a str> {
    let fields: Vec<&'a str> = if line.is_empty() {
        vec![""]
    } else if delimiter.is_empty() {
        vec![line]
    } else {
        let mut fields: Vec<&str> = line.split(delimiter).collect();
        while fields.last().is_some_and(|field| field.is_empty()) {
            fields.pop();
        }
        fields
    };
    fields.into_iter()
}

/// Split `line` into at most a key and a value.
///
/// Returns `None` when the line does not carry both.
pub fn split_pair<'a>(line: &'a str, delimiter: &str) -> Option<(&'a str, &'a str)> {
    if delimiter.is_empty() {
        return None;
    }
    match line.split_once(delimiter) {
        Some((key, value)) if !value.is_empty() => Some((key, value)),
        _ => None,
    }
}
