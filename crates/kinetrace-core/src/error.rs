// crates/kinetrace-core/src/error.rs

use std::path::PathBuf;

use kinetrace_parser::{ColumnKind, ParserError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("at least one channel prefix must be configured")]
    NoChannels,

    #[error("channel prefix at position {position} is blank")]
    BlankChannel { position: usize },

    #[error("channel prefix '{0}' is configured more than once")]
    DuplicateChannel(String),

    #[error("{name} must not be blank")]
    BlankMarker { name: &'static str },

    #[error("exercise '{exercise}' lists {found} channels, expected {expected}")]
    IncompleteOrdering {
        exercise: String,
        expected: usize,
        found: usize,
    },

    #[error("exercise '{exercise}' references channel position {position}, valid range is 1..={channels}")]
    PositionOutOfRange {
        exercise: String,
        position: usize,
        channels: usize,
    },

    #[error("exercise '{exercise}' repeats channel position {position}")]
    RepeatedPosition { exercise: String, position: usize },
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Parse failed: {0}")]
    Parser(#[from] ParserError),

    #[error("Configuration invalid: {0}")]
    Config(#[from] ConfigError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid input pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("column '{column}' must be numeric but was parsed as {kind}")]
    Schema { column: String, kind: ColumnKind },

    #[error("no valid timestamps less than 1 second found")]
    NoValidStart,

    #[error("malformed file name '{file_name}': {reason}")]
    MalformedName { file_name: String, reason: String },
}

pub type Result<T> = std::result::Result<T, PipelineError>;
