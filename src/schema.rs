//! Dataformat lookup by tag id.

use std::collections::HashMap;

/// Column layout a tag id's records are stored with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dataformat {
    id: String,
    columns: Vec<String>,
}

impl Dataformat {
    /// `columns` lists the record keys in storage order.
    pub fn new<I, S>(id: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Dataformat identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Output column names, in table order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

/// Resolves the dataformat of a tag id. `None` means the tag is unknown and
/// the file cannot be loaded.
pub trait SchemaLookup {
    /// Dataformat for `tag_id`, or `None` when none is registered.
    fn lookup(&self, tag_id: &str) -> Option<Dataformat>;
}

impl<F> SchemaLookup for F
where
    F: Fn(&str) -> Option<Dataformat>,
{
    fn lookup(&self, tag_id: &str) -> Option<Dataformat> {
        self(tag_id)
    }
}

/// Fixed tag id to dataformat table.
#[derive(Clone, Debug, Default)]
pub struct StaticSchemaLookup {
    formats: HashMap<String, Dataformat>,
}

impl StaticSchemaLookup {
    /// An empty lookup.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `format` for `tag_id`, replacing any earlier entry.
    pub fn insert(&mut self, tag_id: impl Into<String>, format: Dataformat) {
        self.formats.insert(tag_id.into(), format);
    }

    /// Register `format` under `tag_id`.
    pub fn with(mut self, tag_id: impl Into<String>, format: Dataformat) -> Self {
        self.insert(tag_id, format);
        self
    }
}

impl SchemaLookup for StaticSchemaLookup {
    fn lookup(&self, tag_id: &str) -> Option<Dataformat> {
        self.formats.get(tag_id).cloned()
    }
}
