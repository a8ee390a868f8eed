use polars::prelude::*;

/// Timestamps below this many seconds belong to a channel's warm-up region.
pub const WARMUP_LIMIT_SECONDS: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alignment {
    pub start_index: usize,
    /// First sub-second row per timestamp column that has one.
    pub candidates: Vec<(String, usize)>,
}

/// Common start row for all channels, or `None` when no timestamp column ever drops below
/// [`WARMUP_LIMIT_SECONDS`].
///
/// Each column contributes the first row (in row order) whose value is below the limit; the
/// start is the latest of those rows so every channel has reached its own restart point.
pub fn find_valid_start_index(
    df: &DataFrame,
    timestamp_columns: &[String],
) -> PolarsResult<Option<Alignment>> {
    let mut candidates = Vec::with_capacity(timestamp_columns.len());

    for name in timestamp_columns {
        let values = df
            .column(name)?
            .as_materialized_series()
            .cast(&DataType::Float64)?;
        let first = values
            .f64()?
            .into_iter()
            .position(|value| value.is_some_and(|v| v < WARMUP_LIMIT_SECONDS));
        if let Some(row) = first {
            candidates.push((name.clone(), row));
        }
    }

    let latest = candidates.iter().map(|(_, row)| *row).max();
    Ok(latest.map(|start_index| Alignment {
        start_index,
        candidates,
    }))
}

/// Rows from `start_index` onward, renumbered from zero.
pub fn truncate_to(df: &DataFrame, start_index: usize) -> DataFrame {
    let remaining = df.height().saturating_sub(start_index);
    df.slice(start_index as i64, remaining)
}
