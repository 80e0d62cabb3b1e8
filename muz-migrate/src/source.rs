//! Read-only file trees that migrations are discovered in.
//!
//! Paths handed to a [`FileSource`] are relative to its root, use `/` as the
//! separator, and the root itself is `"."`.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{MigrateResult, MigrationError};

/// Name of the root directory of every source.
pub const ROOT: &str = ".";

/// A direct child of a directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SourceEntry {
    /// Base name of the entry.
    pub name: String,
    /// Whether the entry is a directory.
    pub is_dir: bool,
}

impl SourceEntry {
    /// A file entry.
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
        }
    }

    /// A directory entry.
    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: true,
        }
    }
}

/// A hierarchical, read-only file namespace.
pub trait FileSource: fmt::Debug + Send + Sync {
    /// List the direct children of a directory.
    fn read_dir(&self, dir: &str) -> io::Result<Vec<SourceEntry>>;

    /// Read the full contents of a file.
    fn read(&self, path: &str) -> io::Result<Vec<u8>>;
}

/// Join a directory and a child name into a source-relative path.
pub fn join(dir: &str, name: &str) -> String {
    if dir == ROOT || dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

/// Parent of a source-relative path (`"."` for top-level entries).
fn parent(path: &str) -> &str {
    path.rsplit_once('/').map_or(ROOT, |(parent, _)| parent)
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim_start_matches("./").trim_matches('/');
    if trimmed.is_empty() {
        ROOT.to_string()
    } else {
        trimmed.to_string()
    }
}

/// A directory tree on disk.
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    /// Open a directory tree.
    ///
    /// Fails with a configuration error when `root` is not a directory.
    pub fn new(root: impl Into<PathBuf>) -> MigrateResult<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(MigrationError::config(format!(
                "migration path '{}' is not a directory",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    /// The on-disk root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        if path == ROOT {
            self.root.clone()
        } else {
            self.root.join(path)
        }
    }
}

impl FileSource for DirSource {
    fn read_dir(&self, dir: &str) -> io::Result<Vec<SourceEntry>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(self.resolve(dir))? {
            let entry = entry?;
            entries.push(SourceEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir: entry.file_type()?.is_dir(),
            });
        }
        entries.sort();
        Ok(entries)
    }

    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        std::fs::read(self.resolve(path))
    }
}

/// An in-memory file tree, used for bundled migrations and tests.
#[derive(Debug, Clone)]
pub struct MemorySource {
    files: BTreeMap<String, Vec<u8>>,
    dirs: BTreeSet<String>,
}

impl Default for MemorySource {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySource {
    /// Create an empty tree containing only the root.
    pub fn new() -> Self {
        let mut dirs = BTreeSet::new();
        dirs.insert(ROOT.to_string());
        Self {
            files: BTreeMap::new(),
            dirs,
        }
    }

    /// Add a file, creating its parent directories.
    pub fn with_file(mut self, path: &str, contents: impl Into<Vec<u8>>) -> Self {
        self.insert_file(path, contents);
        self
    }

    /// Add an empty directory, creating its parents.
    pub fn with_dir(mut self, path: &str) -> Self {
        self.insert_dir(path);
        self
    }

    /// Add a file, creating its parent directories.
    pub fn insert_file(&mut self, path: &str, contents: impl Into<Vec<u8>>) {
        let path = normalize(path);
        self.insert_dir(parent(&path));
        self.files.insert(path, contents.into());
    }

    /// Add a directory and all of its ancestors.
    pub fn insert_dir(&mut self, path: &str) {
        let mut current = normalize(path);
        while current != ROOT && self.dirs.insert(current.clone()) {
            current = parent(&current).to_string();
        }
    }

    /// Re-root the tree at a sub-directory, dropping everything outside it.
    pub fn subtree(&self, base: &str) -> Self {
        let base = normalize(base);
        if base == ROOT {
            return self.clone();
        }
        let prefix = format!("{}/", base);
        let mut sub = Self::new();
        for dir in &self.dirs {
            if let Some(rest) = dir.strip_prefix(&prefix) {
                sub.insert_dir(rest);
            }
        }
        for (path, contents) in &self.files {
            if let Some(rest) = path.strip_prefix(&prefix) {
                sub.insert_file(rest, contents.clone());
            }
        }
        sub
    }

    /// Number of files in the tree.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Build a tree from a `rust-embed` bundle, rooted at `base` within it.
    #[cfg(feature = "embed")]
    pub fn from_embed<E: rust_embed::RustEmbed>(base: &str) -> Self {
        let mut all = Self::new();
        for path in E::iter() {
            if let Some(file) = E::get(&path) {
                all.insert_file(&path, file.data.into_owned());
            }
        }
        all.subtree(base)
    }
}

impl FileSource for MemorySource {
    fn read_dir(&self, dir: &str) -> io::Result<Vec<SourceEntry>> {
        let dir = normalize(dir);
        if !self.dirs.contains(&dir) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("directory '{}' not found", dir),
            ));
        }

        let mut entries: Vec<SourceEntry> = self
            .dirs
            .iter()
            .filter(|d| d.as_str() != ROOT && parent(d) == dir)
            .map(|d| SourceEntry::dir(d.rsplit('/').next().unwrap_or(d.as_str())))
            .chain(
                self.files
                    .keys()
                    .filter(|f| parent(f) == dir)
                    .map(|f| SourceEntry::file(f.rsplit('/').next().unwrap_or(f.as_str()))),
            )
            .collect();
        entries.sort();
        Ok(entries)
    }

    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        self.files.get(&normalize(path)).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("file '{}' not found", path))
        })
    }
}
