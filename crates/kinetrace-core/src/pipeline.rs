use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use kinetrace_parser::{column_kinds, parse_recording, ParserError};
use polars::prelude::DataFrame;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::aligner::{find_valid_start_index, truncate_to};
use crate::config::Settings;
use crate::dedup::{remove_duplicate_indices, DuplicateCount};
use crate::error::{PipelineError, Result};
use crate::file_name::RecordingName;
use crate::gap_audit::{audit_gaps, GapAlert};
use crate::outputs::{self, ColumnLayout, LayoutManifest};
use crate::reorder::reorder_columns;
use crate::row_validator::{remove_abnormal_rows, require_numeric};

/// A recording after every stage ran, still in memory.
#[derive(Debug, Clone)]
pub struct CleanedRecording {
    pub dataframe: DataFrame,
    pub channel_order: Vec<String>,
    pub exercise_order: bool,
    pub dropped_columns: Vec<String>,
    pub rows_read: usize,
    pub rows_rejected: usize,
    pub start_index: usize,
    pub duplicates: Vec<DuplicateCount>,
    pub alerts: Vec<GapAlert>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub file_name: String,
    pub exercise: Option<String>,
    pub channel_order: Vec<String>,
    pub rows_read: usize,
    pub rows_rejected: usize,
    pub start_index: usize,
    pub rows_written: usize,
    pub duplicates: Vec<DuplicateCount>,
    pub alerts: Vec<GapAlert>,
    pub columns: Vec<ColumnLayout>,
}

/// Recoverable per-file data conditions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    EmptyFile,
    HeadersOnly,
    NoValidStart,
    MalformedName(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::EmptyFile => f.write_str("empty file"),
            SkipReason::HeadersOnly => f.write_str("headers only"),
            SkipReason::NoValidStart => f.write_str("no valid timestamps less than 1 second"),
            SkipReason::MalformedName(reason) => write!(f, "malformed file name: {reason}"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    Cleaned(FileReport),
    Skipped { input: PathBuf, reason: SkipReason },
    Failed { input: PathBuf, error: String },
}

impl FileOutcome {
    pub fn input(&self) -> &Path {
        match self {
            FileOutcome::Cleaned(report) => &report.input,
            FileOutcome::Skipped { input, .. } | FileOutcome::Failed { input, .. } => input,
        }
    }

    /// Splits errors into recoverable data conditions and hard failures.
    pub fn from_error(input: &Path, err: PipelineError) -> Self {
        let reason = match err {
            PipelineError::Parser(ParserError::EmptyFile) => SkipReason::EmptyFile,
            PipelineError::Parser(ParserError::HeadersOnly) => SkipReason::HeadersOnly,
            PipelineError::NoValidStart => SkipReason::NoValidStart,
            PipelineError::MalformedName { reason, .. } => SkipReason::MalformedName(reason),
            other => {
                return FileOutcome::Failed {
                    input: input.to_path_buf(),
                    error: other.to_string(),
                }
            }
        };
        FileOutcome::Skipped {
            input: input.to_path_buf(),
            reason,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub outcomes: Vec<FileOutcome>,
}

impl BatchSummary {
    pub fn cleaned(&self) -> usize {
        self.count(|outcome| matches!(outcome, FileOutcome::Cleaned(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|outcome| matches!(outcome, FileOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, FileOutcome::Failed { .. }))
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    fn count(&self, predicate: impl Fn(&FileOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|outcome| predicate(outcome)).count()
    }
}

/// Input files directly under `dir` with the configured extension, sorted by path.
pub fn discover_inputs(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(PipelineError::Read {
            path: dir.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "input directory not found"),
        });
    }
    let pattern = glob::Pattern::escape(&dir.to_string_lossy());
    let pattern = format!("{pattern}/*.{extension}");

    let mut inputs = Vec::new();
    for entry in glob::glob(&pattern)? {
        match entry {
            Ok(path) if path.is_file() => inputs.push(path),
            Ok(_) => {}
            Err(err) => warn!(error = %err, "Could not read path from input directory"),
        }
    }
    inputs.sort();
    Ok(inputs)
}

/// Runs reorder, validation, alignment, deduplication and the gap audit on one recording.
pub fn clean_recording(
    df: &DataFrame,
    name: &RecordingName,
    settings: &Settings,
) -> Result<CleanedRecording> {
    let rows_read = df.height();
    let exercise = name.exercise.as_deref();
    let exercise_order = exercise.is_some_and(|e| settings.exercises.get(e).is_some());
    let order = settings.exercises.order_for(&settings.layout, exercise);

    let reordered = reorder_columns(df, &settings.layout, order)?;
    debug!(
        file = %name.file_name,
        exercise = exercise.unwrap_or_default(),
        exercise_order,
        "Reordered columns"
    );
    if !reordered.dropped_columns.is_empty() {
        debug!(
            file = %name.file_name,
            columns = ?reordered.dropped_columns,
            "Dropped columns outside configured channels"
        );
    }
    let df = reordered.dataframe;

    let names: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect();
    let timestamp_columns = settings.timestamp_columns(&names);
    let index_columns = settings.index_columns(&names);
    require_numeric(&df, &timestamp_columns)?;
    require_numeric(&df, &index_columns)?;

    let validated = remove_abnormal_rows(&df)?;
    if validated.rejected_rows > 0 {
        info!(
            file = %name.file_name,
            rows = validated.rejected_rows,
            "Removed rows with abnormal values"
        );
    }
    let df = validated.dataframe;

    let alignment =
        find_valid_start_index(&df, &timestamp_columns)?.ok_or(PipelineError::NoValidStart)?;
    debug!(
        file = %name.file_name,
        start_index = alignment.start_index,
        candidates = ?alignment.candidates,
        "Aligned channels"
    );
    let df = truncate_to(&df, alignment.start_index);

    let deduped =
        remove_duplicate_indices(&df, &index_columns, settings.duplicate_policy, &settings.layout)?;
    for duplicate in &deduped.duplicates {
        warn!(
            file = %name.file_name,
            column = %duplicate.column,
            count = duplicate.count,
            policy = ?settings.duplicate_policy,
            "Found duplicate index values; removing them"
        );
    }
    let df = deduped.dataframe;

    let alerts = audit_gaps(&df, &timestamp_columns)?;
    for alert in &alerts {
        warn!(
            file = %name.file_name,
            column = %alert.column,
            gaps = alert.gaps,
            "Alert: timestamp differences exceeding 100ms"
        );
    }

    Ok(CleanedRecording {
        dataframe: df,
        channel_order: order.to_vec(),
        exercise_order,
        dropped_columns: reordered.dropped_columns,
        rows_read,
        rows_rejected: validated.rejected_rows,
        start_index: alignment.start_index,
        duplicates: deduped.duplicates,
        alerts,
    })
}

fn try_process_file(input: &Path, output_root: &Path, settings: &Settings) -> Result<FileReport> {
    let name = RecordingName::from_path(input, settings.exercise_separator)?;
    let output = outputs::output_path(output_root, &name, settings.routing)?;

    let content = fs::read_to_string(input).map_err(|source| PipelineError::Read {
        path: input.to_path_buf(),
        source,
    })?;
    let raw = parse_recording(&content)?;
    let cleaned = clean_recording(&raw, &name, settings)?;

    outputs::write_recording(&cleaned.dataframe, &output)?;

    let columns = column_kinds(&cleaned.dataframe)
        .into_iter()
        .map(|(name, kind)| ColumnLayout { name, kind })
        .collect();

    Ok(FileReport {
        input: input.to_path_buf(),
        output,
        file_name: name.file_name,
        exercise: name.exercise,
        channel_order: cleaned.channel_order,
        rows_read: cleaned.rows_read,
        rows_rejected: cleaned.rows_rejected,
        start_index: cleaned.start_index,
        rows_written: cleaned.dataframe.height(),
        duplicates: cleaned.duplicates,
        alerts: cleaned.alerts,
        columns,
    })
}

/// Processes one file end to end. Never panics on bad data; every problem becomes an outcome.
pub fn process_file(input: &Path, output_root: &Path, settings: &Settings) -> FileOutcome {
    info!(file = %input.display(), "Processing file");
    match try_process_file(input, output_root, settings) {
        Ok(report) => {
            info!(
                file = %input.display(),
                output = %report.output.display(),
                rows = report.rows_written,
                "Cleaned data saved"
            );
            FileOutcome::Cleaned(report)
        }
        Err(err) => {
            let outcome = FileOutcome::from_error(input, err);
            match &outcome {
                FileOutcome::Skipped { reason, .. } => {
                    warn!(file = %input.display(), reason = %reason, "Skipping file")
                }
                FileOutcome::Failed { error, .. } => {
                    error!(file = %input.display(), error = %error, "Failed to process file")
                }
                FileOutcome::Cleaned(_) => {}
            }
            outcome
        }
    }
}

/// Processes `inputs` one after another. A failing file never stops the batch.
pub fn run_batch(inputs: &[PathBuf], output_root: &Path, settings: &Settings) -> Result<BatchSummary> {
    prepare_output_root(output_root)?;
    let outcomes = inputs
        .iter()
        .map(|input| process_file(input, output_root, settings))
        .collect();
    finish_batch(output_root, settings, BatchSummary { outcomes })
}

/// Processes `inputs` on blocking tokio tasks, at most `jobs` at a time. Outcomes keep input
/// order.
#[cfg(feature = "runtime")]
pub async fn run_batch_concurrent(
    inputs: Vec<PathBuf>,
    output_root: PathBuf,
    settings: std::sync::Arc<Settings>,
    jobs: usize,
) -> Result<BatchSummary> {
    use std::sync::Arc;

    use tokio::sync::Semaphore;
    use tokio::task::JoinSet;

    prepare_output_root(&output_root)?;

    let semaphore = Arc::new(Semaphore::new(jobs.max(1)));
    let mut slots: Vec<Option<FileOutcome>> = vec![None; inputs.len()];
    let mut tasks = JoinSet::new();

    for (position, input) in inputs.iter().cloned().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        let settings = Arc::clone(&settings);
        let output_root = output_root.clone();
        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            let worker_input = input.clone();
            let joined = tokio::task::spawn_blocking(move || {
                process_file(&worker_input, &output_root, &settings)
            })
            .await;
            let outcome = joined.unwrap_or_else(|err| {
                error!(file = %input.display(), error = %err, "Worker task failed");
                FileOutcome::Failed {
                    input,
                    error: format!("worker task failed: {err}"),
                }
            });
            (position, outcome)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((position, outcome)) => slots[position] = Some(outcome),
            Err(err) => error!(error = %err, "Batch task failed"),
        }
    }

    let outcomes = slots
        .into_iter()
        .zip(inputs)
        .map(|(slot, input)| {
            slot.unwrap_or_else(|| FileOutcome::Failed {
                input,
                error: "task did not report an outcome".to_string(),
            })
        })
        .collect();

    finish_batch(&output_root, &settings, BatchSummary { outcomes })
}

fn prepare_output_root(output_root: &Path) -> Result<()> {
    fs::create_dir_all(output_root).map_err(|source| PipelineError::Write {
        path: output_root.to_path_buf(),
        source,
    })
}

fn finish_batch(output_root: &Path, settings: &Settings, summary: BatchSummary) -> Result<BatchSummary> {
    let manifest = LayoutManifest::from_summary(settings, &summary);
    let path = outputs::write_layout_manifest(output_root, &manifest)?;
    info!(
        processed = summary.total(),
        cleaned = summary.cleaned(),
        skipped = summary.skipped(),
        failed = summary.failed(),
        manifest = %path.display(),
        "Batch finished"
    );
    Ok(summary)
}
