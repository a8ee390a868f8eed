use std::collections::HashSet;

use csv::{ReaderBuilder, StringRecord, Trim};
use polars::prelude::*;

use crate::errors::ParserError;
use crate::model::ColumnKind;

/// Parses a headed CSV recording into a typed frame.
///
/// Every column gets a single [`ColumnKind`]: integer when all non-empty cells parse as
/// `i64`, float when they all parse as `f64`, text otherwise. Empty cells become nulls.
pub fn parse_recording(content: &str) -> Result<DataFrame, ParserError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    if content.trim().is_empty() {
        return Err(ParserError::EmptyFile);
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(content.as_bytes());

    let header = reader.headers()?.clone();
    let names = validate_header(&header)?;

    let mut cells: Vec<Vec<String>> = vec![Vec::new(); names.len()];
    for (offset, record) in reader.records().enumerate() {
        let record = record?;
        // header is line 1
        let line_index = offset + 2;
        if record.len() != names.len() {
            return Err(ParserError::DataRow {
                line_index,
                message: format!("expected {} fields, found {}", names.len(), record.len()),
            });
        }
        for (column, value) in cells.iter_mut().zip(record.iter()) {
            column.push(value.to_string());
        }
    }

    if cells.first().is_none_or(|column| column.is_empty()) {
        return Err(ParserError::HeadersOnly);
    }

    let columns = names
        .iter()
        .zip(cells.iter())
        .map(|(name, values)| build_column(name, values))
        .collect::<Vec<Column>>();

    Ok(DataFrame::new(columns)?)
}

fn validate_header(header: &StringRecord) -> Result<Vec<String>, ParserError> {
    if header.is_empty() {
        return Err(ParserError::EmptyFile);
    }

    let mut seen = HashSet::with_capacity(header.len());
    let mut names = Vec::with_capacity(header.len());
    for (column_index, name) in header.iter().enumerate() {
        if name.is_empty() {
            return Err(ParserError::InvalidHeader {
                column_index,
                message: "column name is blank".to_string(),
            });
        }
        if !seen.insert(name) {
            return Err(ParserError::InvalidHeader {
                column_index,
                message: format!("duplicate column name '{name}'"),
            });
        }
        names.push(name.to_string());
    }
    Ok(names)
}

fn build_column(name: &str, values: &[String]) -> Column {
    let series = match ColumnKind::infer(values) {
        ColumnKind::Integer => {
            let parsed = values
                .iter()
                .map(|cell| parse_optional::<i64>(cell))
                .collect::<Vec<Option<i64>>>();
            Series::new(name.into(), parsed)
        }
        ColumnKind::Float => {
            let parsed = values
                .iter()
                .map(|cell| parse_optional::<f64>(cell))
                .collect::<Vec<Option<f64>>>();
            Series::new(name.into(), parsed)
        }
        ColumnKind::Text => {
            let text = values
                .iter()
                .map(|cell| (!cell.is_empty()).then_some(cell.as_str()))
                .collect::<Vec<Option<&str>>>();
            Series::new(name.into(), text)
        }
    };
    series.into()
}

fn parse_optional<T: std::str::FromStr>(cell: &str) -> Option<T> {
    if cell.is_empty() {
        None
    } else {
        cell.parse::<T>().ok()
    }
}
