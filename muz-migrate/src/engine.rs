//! Migration orchestrator.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::discover::{Discovery, OrderingSpec, discover};
use crate::driver::{Driver, SetReport};
use crate::error::{MigrateResult, MigrationError};
use crate::file::{MigrationFile, MigrationSet};
use crate::history::{MigrationHistory, high_water_marks};
use crate::source::{DirSource, FileSource};

/// Default directory migrations are read from.
pub const DEFAULT_BASE_PATH: &str = "migrations";

/// Configuration for a migration run.
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Root of the migration tree.
    pub base_path: PathBuf,
    /// Directories processed first, in this order.
    pub order: Vec<String>,
    /// Skip patterns, matched against paths relative to the root.
    pub skip: Vec<String>,
    /// Only files ending with this extension are migrations.
    pub extension: Option<String>,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from(DEFAULT_BASE_PATH),
            order: Vec::new(),
            skip: Vec::new(),
            extension: None,
        }
    }
}

impl MigrationConfig {
    /// Create a new configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the migrations directory.
    pub fn base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = path.into();
        self
    }

    /// Set the priority directories.
    pub fn order<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.order = dirs.into_iter().map(Into::into).collect();
        self
    }

    /// Set the skip patterns.
    pub fn skip<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Require a file extension such as `.sql`.
    pub fn extension(mut self, ext: impl Into<String>) -> Self {
        let ext = ext.into();
        self.extension = (!ext.is_empty()).then_some(ext);
        self
    }
}

/// Result of a migration run.
#[derive(Debug, Clone, Default)]
pub struct MigrationReport {
    /// One report per processed set, in processing order.
    pub sets: Vec<SetReport>,
    /// Total duration in milliseconds.
    pub duration_ms: i64,
}

impl MigrationReport {
    /// Number of files applied across all sets.
    pub fn applied_count(&self) -> usize {
        self.sets.iter().map(|s| s.applied.len()).sum()
    }

    /// Number of files left alone because they were already applied.
    pub fn skipped_count(&self) -> usize {
        self.sets.iter().map(|s| s.skipped).sum()
    }

    /// Check if any migrations were applied.
    pub fn has_changes(&self) -> bool {
        self.applied_count() > 0
    }

    /// Applied files with their directories, in application order.
    pub fn applied(&self) -> impl Iterator<Item = (&str, &MigrationFile)> {
        self.sets
            .iter()
            .flat_map(|s| s.applied.iter().map(move |f| (s.directory.as_str(), f)))
    }

    /// Get a summary of the result.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();

        let applied = self.applied_count();
        if applied > 0 {
            parts.push(format!("{} applied", applied));
        }

        let skipped = self.skipped_count();
        if skipped > 0 {
            parts.push(format!("{} already applied", skipped));
        }

        if applied == 0 {
            format!("No migrations applied in {}ms", self.duration_ms)
        } else {
            format!(
                "{} across {} directories in {}ms",
                parts.join(", "),
                self.sets.len(),
                self.duration_ms
            )
        }
    }
}

/// State of a discovered file relative to the tracking table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    /// Recorded in the tracking table.
    Applied,
    /// Above the high-water mark; the next run applies it.
    Pending,
    /// Not recorded but at or below the high-water mark; runs will skip it.
    Skipped,
}

/// Status of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStatus {
    /// The discovered file.
    pub file: MigrationFile,
    /// Its state.
    pub state: FileState,
}

/// Status of one migration set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetStatus {
    /// Directory of the set.
    pub directory: String,
    /// Highest recorded version for the directory.
    pub high_water_mark: i64,
    /// Files in application order.
    pub files: Vec<FileStatus>,
}

/// Discovered migrations paired with the tracking table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationStatus {
    /// Sets in processing order.
    pub sets: Vec<SetStatus>,
}

impl MigrationStatus {
    fn count(&self, state: FileState) -> usize {
        self.sets
            .iter()
            .flat_map(|s| &s.files)
            .filter(|f| f.state == state)
            .count()
    }

    /// Number of applied files.
    pub fn total_applied(&self) -> usize {
        self.count(FileState::Applied)
    }

    /// Number of pending files.
    pub fn total_pending(&self) -> usize {
        self.count(FileState::Pending)
    }

    /// Number of files runs will never apply.
    pub fn total_skipped(&self) -> usize {
        self.count(FileState::Skipped)
    }

    /// Check if the next run would do nothing.
    pub fn is_up_to_date(&self) -> bool {
        self.total_pending() == 0
    }
}

/// Discovers migration sets and drives a [`Driver`] through them.
#[derive(Debug, Clone)]
pub struct Migrator {
    source: Arc<dyn FileSource>,
    ordering: OrderingSpec,
    extension: Option<String>,
}

impl Migrator {
    /// Create a migrator reading from `config.base_path` on disk.
    ///
    /// Fails when a skip pattern is invalid or the base path is not a directory.
    pub fn new(config: MigrationConfig) -> MigrateResult<Self> {
        let source = DirSource::new(&config.base_path)?;
        Self::with_source(Arc::new(source), config)
    }

    /// Create a migrator for a directory with default settings.
    pub fn from_dir(path: impl Into<PathBuf>) -> MigrateResult<Self> {
        Self::new(MigrationConfig::new().base_path(path))
    }

    /// Create a migrator over an arbitrary file source.
    ///
    /// `config.base_path` is not used; the source is already rooted.
    pub fn with_source(source: Arc<dyn FileSource>, config: MigrationConfig) -> MigrateResult<Self> {
        let ordering = OrderingSpec::new(&config.order, &config.skip)?;
        Ok(Self {
            source,
            ordering,
            extension: config.extension,
        })
    }

    /// The compiled ordering rules.
    pub fn ordering(&self) -> &OrderingSpec {
        &self.ordering
    }

    /// Lazily discover migration sets.
    pub fn discover(&self) -> Discovery<'_> {
        discover(self.source.clone(), &self.ordering, self.extension.as_deref())
    }

    /// Apply all pending migrations through `driver`.
    pub async fn run<D>(&self, driver: &mut D) -> MigrateResult<MigrationReport>
    where
        D: Driver + ?Sized,
    {
        self.run_with_cancel(driver, &CancellationToken::new()).await
    }

    /// Apply all pending migrations, stopping between sets once `cancel` fires.
    pub async fn run_with_cancel<D>(
        &self,
        driver: &mut D,
        cancel: &CancellationToken,
    ) -> MigrateResult<MigrationReport>
    where
        D: Driver + ?Sized,
    {
        run_sets(self.discover(), driver, cancel).await
    }

    /// Pair discovered files with what `history` has recorded.
    pub async fn status<H>(&self, history: &H) -> MigrateResult<MigrationStatus>
    where
        H: MigrationHistory + ?Sized,
    {
        let records = history.applied().await?;
        let marks = high_water_marks(&records);

        let mut status = MigrationStatus::default();
        for set in self.discover() {
            let set = set?;
            let mark = marks.get(set.directory()).copied().unwrap_or(0);
            let files = set
                .files()
                .iter()
                .map(|file| {
                    let recorded = records
                        .iter()
                        .any(|r| r.directory == set.directory() && r.version == file.version);
                    let state = if recorded {
                        FileState::Applied
                    } else if file.version > mark {
                        FileState::Pending
                    } else {
                        FileState::Skipped
                    };
                    FileStatus {
                        file: file.clone(),
                        state,
                    }
                })
                .collect();

            status.sets.push(SetStatus {
                directory: set.directory().to_string(),
                high_water_mark: mark,
                files,
            });
        }

        Ok(status)
    }
}

/// Drive `driver` through `sets`.
///
/// `end` is called exactly once after a successful `start`, with the first
/// error that stopped the run. If `end` fails after such an error, the
/// original error is returned and the finalize failure is logged.
pub async fn run_sets<I, D>(
    sets: I,
    driver: &mut D,
    cancel: &CancellationToken,
) -> MigrateResult<MigrationReport>
where
    I: Iterator<Item = MigrateResult<MigrationSet>> + Send,
    D: Driver + ?Sized,
{
    let started = Instant::now();

    driver.start().await?;

    match process_sets(sets, driver, cancel).await {
        Ok(reports) => {
            driver.end(None).await?;
            let report = MigrationReport {
                sets: reports,
                duration_ms: started.elapsed().as_millis() as i64,
            };
            info!(
                applied = report.applied_count(),
                skipped = report.skipped_count(),
                duration_ms = report.duration_ms,
                "Migration run complete"
            );
            Ok(report)
        }
        Err(err) => {
            if let Err(end_err) = driver.end(Some(&err)).await {
                error!(error = %end_err, cause = %err, "Failed to finalize after migration error");
            }
            Err(err)
        }
    }
}

async fn process_sets<I, D>(
    mut sets: I,
    driver: &mut D,
    cancel: &CancellationToken,
) -> MigrateResult<Vec<SetReport>>
where
    I: Iterator<Item = MigrateResult<MigrationSet>> + Send,
    D: Driver + ?Sized,
{
    let mut reports = Vec::new();

    loop {
        if cancel.is_cancelled() {
            warn!(processed = reports.len(), "Migration run cancelled");
            return Err(MigrationError::Cancelled);
        }

        let Some(set) = sets.next() else {
            break;
        };
        let set = set?;

        debug!(directory = %set.directory(), files = set.len(), "Processing migration set");
        let report = driver.process(&set).await?;
        for file in &report.applied {
            info!(directory = %report.directory, file = %file.path, version = file.version, "Applied migration");
        }
        reports.push(report);
    }

    Ok(reports)
}
