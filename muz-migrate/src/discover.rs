//! Migration discovery: walk the tree, order directories, collect files.
//!
//! Discovery runs in two passes. The first walks directories only
//! (depth-first, pre-order, starting at `"."`) and applies skip rules; the
//! second lists the files of each surviving directory in priority order, one
//! directory per [`Iterator::next`] call.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::{MigrateResult, MigrationError};
use crate::file::{MigrationFile, MigrationSet};
use crate::filter::{Exclusion, PathFilter};
use crate::source::{self, FileSource, ROOT};

/// Directory priority and skip rules for a run.
#[derive(Debug, Clone, Default)]
pub struct OrderingSpec {
    priority: Vec<String>,
    filter: PathFilter,
}

impl OrderingSpec {
    /// Build an ordering from priority directories and skip patterns.
    pub fn new<P, S>(priority: P, skip: S) -> MigrateResult<Self>
    where
        P: IntoIterator,
        P::Item: AsRef<str>,
        S: IntoIterator,
        S::Item: AsRef<str>,
    {
        let priority = priority
            .into_iter()
            .map(|dir| {
                let dir = dir.as_ref();
                dir.strip_prefix('/').unwrap_or(dir).to_string()
            })
            .collect();
        Ok(Self {
            priority,
            filter: PathFilter::new(skip)?,
        })
    }

    /// Priority directories, leading `/` removed.
    pub fn priority(&self) -> &[String] {
        &self.priority
    }

    /// The compiled skip rules.
    pub fn filter(&self) -> &PathFilter {
        &self.filter
    }

    /// Sort directories: priority entries first in the given order, the rest lexically.
    pub fn sort_dirs(&self, dirs: &mut [String]) {
        if self.priority.is_empty() {
            dirs.sort();
            return;
        }

        let mut rank: HashMap<&str, usize> = HashMap::new();
        for (i, dir) in self.priority.iter().enumerate() {
            rank.insert(dir.as_str(), i);
        }

        dirs.sort_by(|a, b| match (rank.get(a.as_str()), rank.get(b.as_str())) {
            (Some(x), Some(y)) => x.cmp(y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.cmp(b),
        });
    }
}

enum State {
    /// Directory walk not started yet.
    Pending,
    /// Yielding one set per remaining directory.
    Scanning(std::vec::IntoIter<String>),
    /// Exhausted or failed.
    Done,
}

/// Lazy sequence of migration sets.
///
/// Yields `Err` at most once; the sequence ends after an error. Dropping the
/// iterator early stops any further directory scans.
pub struct Discovery<'a> {
    source: Arc<dyn FileSource>,
    ordering: &'a OrderingSpec,
    extension: Option<String>,
    state: State,
}

/// Start discovering migration sets in `source`.
///
/// `extension` keeps only files whose name ends with it, compared
/// case-insensitively.
pub fn discover<'a>(
    source: Arc<dyn FileSource>,
    ordering: &'a OrderingSpec,
    extension: Option<&str>,
) -> Discovery<'a> {
    Discovery {
        source,
        ordering,
        extension: extension
            .filter(|ext| !ext.is_empty())
            .map(str::to_lowercase),
        state: State::Pending,
    }
}

impl Discovery<'_> {
    /// Walk the directory tree, returning every directory that is not skipped.
    fn collect_dirs(&self) -> MigrateResult<Vec<String>> {
        let filter = self.ordering.filter();
        let mut dirs = Vec::new();
        let mut stack = vec![ROOT.to_string()];

        while let Some(dir) = stack.pop() {
            match filter.check_dir(&dir) {
                Exclusion::Subtree => {
                    debug!(directory = %dir, "Pruning skipped directory");
                    continue;
                }
                Exclusion::Entry => {
                    debug!(directory = %dir, "Hiding skipped directory");
                }
                Exclusion::None => dirs.push(dir.clone()),
            }

            let entries = self
                .source
                .read_dir(&dir)
                .map_err(|e| MigrationError::discovery(dir.as_str(), e))?;

            // Reverse so the stack pops children in lexical order.
            for entry in entries.iter().rev().filter(|e| e.is_dir) {
                stack.push(source::join(&dir, &entry.name));
            }
        }

        Ok(dirs)
    }

    /// List the migration files directly inside `dir`.
    fn scan_dir(&self, dir: &str) -> MigrateResult<MigrationSet> {
        let filter = self.ordering.filter();
        let entries = self
            .source
            .read_dir(dir)
            .map_err(|e| MigrationError::discovery(dir, e))?;

        let mut files = Vec::new();
        for entry in entries.into_iter().filter(|e| !e.is_dir) {
            if filter.excludes(&source::join(dir, &entry.name)) {
                trace!(directory = %dir, file = %entry.name, "Skipping file");
                continue;
            }

            if let Some(ext) = &self.extension {
                if !entry.name.to_lowercase().ends_with(ext.as_str()) {
                    continue;
                }
            }

            if let Some(file) = MigrationFile::from_name(&entry.name) {
                files.push(file);
            }
        }

        Ok(MigrationSet::new(dir, files, self.source.clone()))
    }
}

impl Iterator for Discovery<'_> {
    type Item = MigrateResult<MigrationSet>;

    fn next(&mut self) -> Option<Self::Item> {
        if matches!(self.state, State::Pending) {
            match self.collect_dirs() {
                Ok(mut dirs) => {
                    self.ordering.sort_dirs(&mut dirs);
                    debug!(directories = dirs.len(), "Discovered migration directories");
                    self.state = State::Scanning(dirs.into_iter());
                }
                Err(e) => {
                    self.state = State::Done;
                    return Some(Err(e));
                }
            }
        }

        let State::Scanning(dirs) = &mut self.state else {
            return None;
        };
        let dir = dirs.next()?;

        let result = self.scan_dir(&dir);
        if result.is_err() {
            self.state = State::Done;
        }
        Some(result)
    }
}

impl std::iter::FusedIterator for Discovery<'_> {}
