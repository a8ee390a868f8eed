use std::fmt;

use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Storage class of a recording column, decided once when the file is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Integer,
    Float,
    Text,
}

impl ColumnKind {
    pub fn of(dtype: &DataType) -> Self {
        match dtype {
            DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64 => ColumnKind::Integer,
            DataType::Float32 | DataType::Float64 => ColumnKind::Float,
            _ => ColumnKind::Text,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnKind::Integer | ColumnKind::Float)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnKind::Integer => "integer",
            ColumnKind::Float => "float",
            ColumnKind::Text => "text",
        }
    }

    /// All-empty columns are treated as floats holding nulls.
    pub(crate) fn infer(cells: &[String]) -> Self {
        let values: Vec<&str> = cells
            .iter()
            .map(String::as_str)
            .filter(|cell| !cell.is_empty())
            .collect();
        if values.is_empty() {
            return ColumnKind::Float;
        }
        if values.iter().all(|cell| cell.parse::<i64>().is_ok()) {
            ColumnKind::Integer
        } else if values.iter().all(|cell| cell.parse::<f64>().is_ok()) {
            ColumnKind::Float
        } else {
            ColumnKind::Text
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Column names paired with their kinds, in frame order.
pub fn column_kinds(df: &DataFrame) -> Vec<(String, ColumnKind)> {
    df.get_columns()
        .iter()
        .map(|column| (column.name().to_string(), ColumnKind::of(column.dtype())))
        .collect()
}
