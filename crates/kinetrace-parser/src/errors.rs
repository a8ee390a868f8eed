use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("file is empty")]
    EmptyFile,

    #[error("file contains headers only")]
    HeadersOnly,

    #[error("header column {column_index} invalid: {message}")]
    InvalidHeader {
        column_index: usize,
        message: String,
    },

    #[error("CSV error: {source}")]
    Csv {
        #[source]
        source: csv::Error,
    },

    #[error("data row {line_index} invalid: {message}")]
    DataRow { line_index: usize, message: String },

    #[error("failed to build recording frame: {0}")]
    Frame(#[from] polars::error::PolarsError),
}

impl From<csv::Error> for ParserError {
    fn from(source: csv::Error) -> Self {
        ParserError::Csv { source }
    }
}
