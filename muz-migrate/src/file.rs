//! Migration files and the per-directory sets they are grouped into.

use std::cmp::Ordering;
use std::fmt;
use std::io;
use std::sync::Arc;

use crate::source::{self, FileSource};
use crate::version::extract_version;

/// A migration file found during discovery.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MigrationFile {
    /// File name within its directory.
    pub path: String,
    /// Version parsed from the leading digits of the name (always >= 1).
    pub version: i64,
}

impl MigrationFile {
    /// Create a migration file entry.
    pub fn new(path: impl Into<String>, version: i64) -> Self {
        Self {
            path: path.into(),
            version,
        }
    }

    /// Build an entry from a file name, or `None` if it carries no version.
    pub fn from_name(name: &str) -> Option<Self> {
        match extract_version(name) {
            0 => None,
            version => Some(Self::new(name, version)),
        }
    }
}

impl Ord for MigrationFile {
    fn cmp(&self, other: &Self) -> Ordering {
        self.version
            .cmp(&other.version)
            .then_with(|| self.path.cmp(&other.path))
    }
}

impl PartialOrd for MigrationFile {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for MigrationFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (v{})", self.path, self.version)
    }
}

/// The ordered migration files of one directory.
///
/// Contents are read lazily from the shared file source.
#[derive(Clone)]
pub struct MigrationSet {
    directory: String,
    files: Vec<MigrationFile>,
    source: Arc<dyn FileSource>,
}

impl MigrationSet {
    /// Create a set; `files` are sorted by `(version, name)`.
    pub fn new(
        directory: impl Into<String>,
        mut files: Vec<MigrationFile>,
        source: Arc<dyn FileSource>,
    ) -> Self {
        files.sort();
        Self {
            directory: directory.into(),
            files,
            source,
        }
    }

    /// Directory relative to the migration root (`"."` for the root).
    pub fn directory(&self) -> &str {
        &self.directory
    }

    /// Files in application order.
    pub fn files(&self) -> &[MigrationFile] {
        &self.files
    }

    /// Number of files in the set.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if the set has no files.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Highest version in the set, or 0 when empty.
    pub fn max_version(&self) -> i64 {
        self.files.last().map_or(0, |f| f.version)
    }

    /// Path of a file relative to the migration root.
    pub fn file_path(&self, name: &str) -> String {
        source::join(&self.directory, name)
    }

    /// Read a file of this directory.
    pub fn read_file(&self, name: &str) -> io::Result<Vec<u8>> {
        self.source.read(&self.file_path(name))
    }

    /// Read a file of this directory as UTF-8 text.
    pub fn read_to_string(&self, name: &str) -> io::Result<String> {
        let bytes = self.read_file(name)?;
        String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

impl fmt::Debug for MigrationSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationSet")
            .field("directory", &self.directory)
            .field("files", &self.files)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;

    #[test]
    fn test_from_name() {
        assert_eq!(
            MigrationFile::from_name("002_create_posts.sql"),
            Some(MigrationFile::new("002_create_posts.sql", 2))
        );
        assert_eq!(MigrationFile::from_name("readme.md"), None);
    }

    #[test]
    fn test_set_sorts_files() {
        let source: Arc<dyn FileSource> = Arc::new(MemorySource::new());
        let set = MigrationSet::new(
            "migrations",
            vec![
                MigrationFile::new("10_tenth.sql", 10),
                MigrationFile::new("001_zebra.sql", 1),
                MigrationFile::new("2_second.sql", 2),
                MigrationFile::new("001_alpha.sql", 1),
            ],
            source,
        );

        let names: Vec<_> = set.files().iter().map(|f| f.path.as_str()).collect();
        assert_eq!(
            names,
            vec!["001_alpha.sql", "001_zebra.sql", "2_second.sql", "10_tenth.sql"]
        );
        assert_eq!(set.max_version(), 10);
    }

    #[test]
    fn test_read_file_from_directory() {
        let source: Arc<dyn FileSource> = Arc::new(
            MemorySource::new()
                .with_file("schema/001_users.sql", "CREATE TABLE users (id int);")
                .with_file("001_root.sql", "SELECT 1;"),
        );

        let schema = MigrationSet::new("schema", vec![], source.clone());
        assert_eq!(schema.file_path("001_users.sql"), "schema/001_users.sql");
        assert_eq!(
            schema.read_to_string("001_users.sql").unwrap(),
            "CREATE TABLE users (id int);"
        );

        let root = MigrationSet::new(".", vec![], source);
        assert_eq!(root.read_to_string("001_root.sql").unwrap(), "SELECT 1;");
        assert!(root.is_empty());
    }

    #[test]
    fn test_invalid_utf8_is_invalid_data() {
        let source: Arc<dyn FileSource> =
            Arc::new(MemorySource::new().with_file("001_bin.sql", vec![0xff, 0xfe]));
        let set = MigrationSet::new(".", vec![], source);
        let err = set.read_to_string("001_bin.sql").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
