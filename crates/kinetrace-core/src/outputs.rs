use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use kinetrace_parser::ColumnKind;
use polars::prelude::*;
use serde::Serialize;

use crate::config::{OutputRouting, Settings};
use crate::error::PipelineError;
use crate::file_name::RecordingName;
use crate::pipeline::{BatchSummary, FileOutcome};

pub const LAYOUT_MANIFEST: &str = "layout.json";

/// Final location of a cleaned recording. Depends only on the file name.
pub fn output_path(
    root: &Path,
    name: &RecordingName,
    routing: OutputRouting,
) -> Result<PathBuf, PipelineError> {
    let directory = match routing {
        OutputRouting::Flat => root.to_path_buf(),
        OutputRouting::ByDate => root.join(name.date_token()?),
    };
    Ok(directory.join(&name.file_name))
}

pub fn render_csv(df: &DataFrame) -> PolarsResult<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut frame = df.clone();
    CsvWriter::new(&mut buffer)
        .include_header(true)
        .finish(&mut frame)?;
    Ok(buffer)
}

/// Writes the fully rendered recording next to `path` and renames it into place, so readers of
/// the output directory never see a partial file.
pub fn write_recording(df: &DataFrame, path: &Path) -> Result<(), PipelineError> {
    let bytes = render_csv(df)?;
    write_atomic(path, &bytes)
}

pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PipelineError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|source| PipelineError::Write {
        path: parent.to_path_buf(),
        source,
    })?;

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let staging = parent.join(format!(".{file_name}.partial"));

    fs::write(&staging, bytes).map_err(|source| PipelineError::Write {
        path: staging.clone(),
        source,
    })?;
    if let Err(source) = fs::rename(&staging, path) {
        let _ = fs::remove_file(&staging);
        return Err(PipelineError::Write {
            path: path.to_path_buf(),
            source,
        });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnLayout {
    pub name: String,
    pub kind: ColumnKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileLayout {
    pub file: String,
    pub output: PathBuf,
    pub exercise: Option<String>,
    pub channel_order: Vec<String>,
    pub column_count: usize,
    pub columns: Vec<ColumnLayout>,
}

/// Column layout of every cleaned file, for consumers that expect a fixed input shape.
#[derive(Debug, Clone, Serialize)]
pub struct LayoutManifest {
    pub generated_at: DateTime<Utc>,
    pub default_channels: Vec<String>,
    pub files: Vec<FileLayout>,
}

impl LayoutManifest {
    pub fn from_summary(settings: &Settings, summary: &BatchSummary) -> Self {
        let files = summary
            .outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                FileOutcome::Cleaned(report) => Some(FileLayout {
                    file: report.file_name.clone(),
                    output: report.output.clone(),
                    exercise: report.exercise.clone(),
                    channel_order: report.channel_order.clone(),
                    column_count: report.columns.len(),
                    columns: report.columns.clone(),
                }),
                _ => None,
            })
            .collect();

        Self {
            generated_at: Utc::now(),
            default_channels: settings.layout.prefixes().to_vec(),
            files,
        }
    }
}

pub fn write_layout_manifest(
    root: &Path,
    manifest: &LayoutManifest,
) -> Result<PathBuf, PipelineError> {
    let path = root.join(LAYOUT_MANIFEST);
    let bytes = serde_json::to_vec_pretty(manifest)?;
    write_atomic(&path, &bytes)?;
    Ok(path)
}
