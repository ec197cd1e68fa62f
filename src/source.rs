//! Input files and their configuration properties.

use std::{
    collections::HashMap,
    fs::File,
    io::{self, Cursor, Read},
    path::{Path, PathBuf},
};

/// Named string configuration attached to a source.
pub trait PropertySource {
    /// Value of `key`, or `None` when it is not configured.
    fn property(&self, key: &str) -> Option<&str>;
}

impl PropertySource for HashMap<String, String> {
    fn property(&self, key: &str) -> Option<&str> {
        self.get(key).map(String::as_str)
    }
}

/// A file handed to the parser together with its configuration.
pub trait SourceFile: PropertySource {
    /// File name without directory.
    fn name(&self) -> &str;

    /// Directory the file was picked up from.
    fn dir(&self) -> &str;

    /// Size in bytes, used for throughput reporting.
    fn size(&self) -> u64;

    /// Open a fresh byte stream over the file contents.
    fn open(&self) -> io::Result<Box<dyn Read + '_>>;
}

/// A source backed by a file on the local filesystem.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    name: String,
    dir: String,
    properties: HashMap<String, String>,
}

impl FileSource {
    /// Describe `path` with the given properties. The file is not opened
    /// until [`SourceFile::open`] is called.
    pub fn new(path: impl Into<PathBuf>, properties: HashMap<String, String>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let dir = path
            .parent()
            .map(|dir| dir.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path,
            name,
            dir,
            properties,
        }
    }

    /// Full path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PropertySource for FileSource {
    fn property(&self, key: &str) -> Option<&str> {
        self.properties.property(key)
    }
}

impl SourceFile for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn dir(&self) -> &str {
        &self.dir
    }

    fn size(&self) -> u64 {
        std::fs::metadata(&self.path)
            .map(|meta| meta.len())
            .unwrap_or(0)
    }

    fn open(&self) -> io::Result<Box<dyn Read + '_>> {
        Ok(Box::new(File::open(&self.path)?))
    }
}

/// A source whose contents live in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    name: String,
    dir: String,
    data: Vec<u8>,
    properties: HashMap<String, String>,
}

impl InMemorySource {
    /// Source named `name` holding `data`, with no directory or properties.
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
            ..Default::default()
        }
    }

    /// Set the reported directory.
    pub fn with_dir(self, dir: impl Into<String>) -> Self {
        InMemorySource {
            dir: dir.into(),
            ..self
        }
    }

    /// Set one configuration property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

impl PropertySource for InMemorySource {
    fn property(&self, key: &str) -> Option<&str> {
        self.properties.property(key)
    }
}

impl SourceFile for InMemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn dir(&self) -> &str {
        &self.dir
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn open(&self) -> io::Result<Box<dyn Read + '_>> {
        Ok(Box::new(Cursor::new(self.data.as_slice())))
    }
}
