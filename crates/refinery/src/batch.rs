//! Batch driver: conform every file in a directory and persist the audit
//! trail once at the end.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::audit::{Action, AuditTrail, Issue, Origin, Stage, Status};
use crate::conform::{ConformanceEngine, SchemaAnomaly, DEFAULT_COLLAPSED_DELIMITER};
use crate::error::{RefineryError, Result};
use crate::input::{Parser, ParserConfig};
use crate::output::{output_path, Writer};
use crate::schema::CanonicalSchema;

/// Layer label written into every record unless configured otherwise.
pub const DEFAULT_LAYER: &str = "silver";

/// Process label for every record written by the batch driver.
pub const PROCESS: &str = "clean";

/// File name of the audit document.
pub const AUDIT_FILE_NAME: &str = "cleaning_metadata.json";

/// What to do when a file cannot be read, conformed or written.
///
/// One policy covers every failure class, so a corrupt file and a file that
/// does not converge to the schema are treated the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Record the failure, skip the file and carry on.
    #[default]
    Continue,
    /// Record the failure, persist the trail so far and stop the batch.
    Abort,
}

impl std::str::FromStr for ErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "continue" | "skip" => Ok(ErrorPolicy::Continue),
            "abort" | "halt" => Ok(ErrorPolicy::Abort),
            _ => Err(format!("Unknown error policy: {}. Use continue or abort.", s)),
        }
    }
}

impl fmt::Display for ErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorPolicy::Continue => write!(f, "continue"),
            ErrorPolicy::Abort => write!(f, "abort"),
        }
    }
}

/// Configuration for a batch run.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Only files whose path contains this substring are processed.
    pub filter: Option<String>,
    /// Layer label for records.
    pub layer: String,
    /// Where to write the audit document (None = beside the destination,
    /// see [`default_audit_path`]).
    pub audit_path: Option<PathBuf>,
    /// Failure handling.
    pub on_error: ErrorPolicy,
    /// Delimiter of collapsed rows.
    pub collapsed_delimiter: char,
    /// Loader configuration.
    pub parser: ParserConfig,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            filter: None,
            layer: DEFAULT_LAYER.to_string(),
            audit_path: None,
            on_error: ErrorPolicy::default(),
            collapsed_delimiter: DEFAULT_COLLAPSED_DELIMITER,
            parser: ParserConfig::default(),
        }
    }
}

impl BatchConfig {
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_layer(mut self, layer: impl Into<String>) -> Self {
        self.layer = layer.into();
        self
    }

    pub fn with_audit_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.audit_path = Some(path.into());
        self
    }

    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.on_error = policy;
        self
    }

    pub fn with_collapsed_delimiter(mut self, delimiter: char) -> Self {
        self.collapsed_delimiter = delimiter;
        self
    }
}

/// Terminal state of one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FileOutcome {
    /// Conformed and written.
    Written,
    /// Conformed, but the destination already existed.
    SkippedWrite,
    /// Could not be read, conformed or written.
    Failed { reason: String },
}

/// Per-file result of a batch run.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    pub outcome: FileOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anomaly: Option<SchemaAnomaly>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_hash: Option<String>,
    pub rows: usize,
}

impl FileReport {
    fn failed(path: &Path, err: &RefineryError) -> Self {
        Self {
            path: path.to_path_buf(),
            output: None,
            outcome: FileOutcome::Failed {
                reason: err.to_string(),
            },
            anomaly: None,
            source_hash: None,
            rows: 0,
        }
    }
}

/// Everything a batch run produced.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub trail: AuditTrail,
    pub files: Vec<FileReport>,
    /// Raw column names of the first file that loaded.
    pub first_seen_columns: Option<Vec<String>>,
    /// Files whose raw columns differ from the first-seen set.
    pub drifted: Vec<PathBuf>,
    pub audit_path: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BatchReport {
    fn count(&self, pred: impl Fn(&FileOutcome) -> bool) -> usize {
        self.files.iter().filter(|f| pred(&f.outcome)).count()
    }

    pub fn written(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Written))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::SkippedWrite))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Failed { .. }))
    }
}

/// Default audit location: `<dest>/../metadata/cleaning_metadata.json`.
pub fn default_audit_path(dest_dir: impl AsRef<Path>) -> PathBuf {
    let dest_dir = dest_dir.as_ref();
    let parent = dest_dir
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    parent.join("metadata").join(AUDIT_FILE_NAME)
}

/// Regular files directly under `dir` whose path contains `filter`, sorted
/// lexicographically.
pub fn list_files(dir: impl AsRef<Path>, filter: Option<&str>) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| RefineryError::io(dir, e))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| filter.is_none_or(|f| path.to_string_lossy().contains(f)))
        .collect();

    paths.sort();
    Ok(paths)
}

#[derive(Default)]
struct ColumnSetTracker {
    first_seen: Option<Vec<String>>,
    drifted: Vec<PathBuf>,
}

impl ColumnSetTracker {
    fn observe(&mut self, path: &Path, columns: Vec<String>) {
        match &self.first_seen {
            None => self.first_seen = Some(columns),
            Some(first) if *first != columns => {
                warn!(
                    file = %path.display(),
                    columns = ?columns,
                    "column set differs from first file"
                );
                self.drifted.push(path.to_path_buf());
            }
            Some(_) => {}
        }
    }
}

/// Runs the conformance engine over a directory, one file at a time.
pub struct BatchDriver {
    config: BatchConfig,
    parser: Parser,
    engine: ConformanceEngine,
    writer: Writer,
}

impl BatchDriver {
    pub fn new(config: BatchConfig) -> Self {
        let parser = Parser::with_config(config.parser.clone());
        let engine = ConformanceEngine::new(CanonicalSchema::intraday())
            .with_delimiter(config.collapsed_delimiter);
        let writer = Writer::new().with_delimiter(config.parser.delimiter);

        Self {
            config,
            parser,
            engine,
            writer,
        }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Process every matching file in `source_dir` into `dest_dir`.
    pub fn run(&self, source_dir: impl AsRef<Path>, dest_dir: impl AsRef<Path>) -> Result<BatchReport> {
        self.run_with_progress(source_dir, dest_dir, |_| {})
    }

    /// Like [`run`](Self::run), calling `progress` after each file.
    pub fn run_with_progress(
        &self,
        source_dir: impl AsRef<Path>,
        dest_dir: impl AsRef<Path>,
        mut progress: impl FnMut(&FileReport),
    ) -> Result<BatchReport> {
        let source_dir = source_dir.as_ref();
        let dest_dir = dest_dir.as_ref();
        let started_at = Utc::now();
        let audit_path = self
            .config
            .audit_path
            .clone()
            .unwrap_or_else(|| default_audit_path(dest_dir));

        let files = list_files(source_dir, self.config.filter.as_deref())?;
        info!(
            source = %source_dir.display(),
            dest = %dest_dir.display(),
            files = files.len(),
            "starting batch"
        );

        let mut trail = AuditTrail::new();
        let mut tracker = ColumnSetTracker::default();
        let mut reports = Vec::with_capacity(files.len());

        for path in files {
            let report = match self.process_file(&path, dest_dir, &mut trail, &mut tracker) {
                Ok(report) => report,
                Err(err) => {
                    let report = FileReport::failed(&path, &err);
                    progress(&report);
                    reports.push(report);

                    if self.config.on_error == ErrorPolicy::Abort {
                        warn!(file = %path.display(), "aborting batch");
                        if let Err(save_err) = trail.save(&audit_path) {
                            error!(
                                path = %audit_path.display(),
                                error = %save_err,
                                "could not save audit trail for aborted batch"
                            );
                        }
                        return Err(RefineryError::Aborted {
                            file: path,
                            source: Box::new(err),
                        });
                    }
                    continue;
                }
            };
            progress(&report);
            reports.push(report);
        }

        trail.save(&audit_path)?;

        let report = BatchReport {
            trail,
            files: reports,
            first_seen_columns: tracker.first_seen,
            drifted: tracker.drifted,
            audit_path,
            started_at,
            finished_at: Utc::now(),
        };
        info!(
            written = report.written(),
            skipped = report.skipped(),
            failed = report.failed(),
            records = report.trail.len(),
            "batch finished"
        );
        Ok(report)
    }

    /// Unprocessed → Detected → Repaired → ReVerified → TypeCoerced →
    /// Written | SkippedWrite. Any error leaves a skipped record behind.
    fn process_file(
        &self,
        path: &Path,
        dest_dir: &Path,
        trail: &mut AuditTrail,
        tracker: &mut ColumnSetTracker,
    ) -> Result<FileReport> {
        let origin = Origin::new(path, &self.config.layer, PROCESS);
        info!(file = %path.display(), "processing");

        let (table, source) = self.parser.parse_file(path).map_err(|e| {
            trail.push(origin.failed(Stage::Read, Issue::Unknown, e.to_string()));
            e
        })?;
        tracker.observe(
            path,
            table.column_names().into_iter().map(str::to_string).collect(),
        );

        let conformed = self.engine.conform(table, &origin, trail)?;
        let rows = conformed.table.row_count();
        let output = output_path(dest_dir, path);

        let outcome = if output.exists() {
            debug!(output = %output.display(), "destination exists, not writing");
            trail.push(origin.record(
                Stage::Write,
                Status::Conforming,
                Issue::NotApplicable,
                Action::Skipped,
                format!("destination already exists: {}", output.display()),
            ));
            FileOutcome::SkippedWrite
        } else {
            self.writer.write(&conformed.table, &output).map_err(|e| {
                trail.push(origin.failed(Stage::Write, Issue::Unknown, e.to_string()));
                e
            })?;
            trail.push(origin.processed(
                Stage::Write,
                format!("wrote {} rows to {}", rows, output.display()),
            ));
            FileOutcome::Written
        };

        Ok(FileReport {
            path: path.to_path_buf(),
            output: Some(output),
            outcome,
            anomaly: Some(conformed.anomaly),
            source_hash: Some(source.hash),
            rows,
        })
    }
}

impl Default for BatchDriver {
    fn default() -> Self {
        Self::new(BatchConfig::default())
    }
}

/// Run a batch with the default configuration and return its audit trail.
pub fn run_batch(source_dir: impl AsRef<Path>, dest_dir: impl AsRef<Path>) -> Result<AuditTrail> {
    BatchDriver::default()
        .run(source_dir, dest_dir)
        .map(|report| report.trail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_error_policy_parse() {
        assert_eq!("abort".parse::<ErrorPolicy>().unwrap(), ErrorPolicy::Abort);
        assert_eq!("Continue".parse::<ErrorPolicy>().unwrap(), ErrorPolicy::Continue);
        assert!("retry".parse::<ErrorPolicy>().is_err());
    }

    #[test]
    fn test_default_audit_path() {
        assert_eq!(
            default_audit_path("data/silver/intraday_prices"),
            PathBuf::from("data/silver/metadata/cleaning_metadata.json")
        );
        assert_eq!(
            default_audit_path("out"),
            PathBuf::from("./metadata/cleaning_metadata.json")
        );
    }

    #[test]
    fn test_list_files_sorted_and_filtered() {
        let dir = tempdir().unwrap();
        for name in ["b 2025.csv", "a 2025.csv", "c 2024.csv"] {
            fs::write(dir.path().join(name), "x\n1\n").unwrap();
        }
        fs::create_dir(dir.path().join("nested 2025")).unwrap();

        let all = list_files(dir.path(), None).unwrap();
        assert_eq!(all.len(), 3);

        let filtered = list_files(dir.path(), Some("2025")).unwrap();
        let names: Vec<_> = filtered
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a 2025.csv", "b 2025.csv"]);
    }

    #[test]
    fn test_column_set_tracker() {
        let mut tracker = ColumnSetTracker::default();
        tracker.observe(Path::new("a"), vec!["ID".to_string()]);
        tracker.observe(Path::new("b"), vec!["ID".to_string()]);
        tracker.observe(Path::new("c"), vec!["1".to_string()]);

        assert_eq!(tracker.first_seen, Some(vec!["ID".to_string()]));
        assert_eq!(tracker.drifted, vec![PathBuf::from("c")]);
    }
}
