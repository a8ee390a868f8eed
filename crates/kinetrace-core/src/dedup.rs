use std::collections::HashSet;

use polars::prelude::*;
use serde::Serialize;

use crate::config::{ChannelLayout, DuplicatePolicy};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateCount {
    pub column: String,
    pub count: usize,
}

#[derive(Debug, Clone)]
pub struct DedupResult {
    pub dataframe: DataFrame,
    /// One entry per index column that had repeats.
    pub duplicates: Vec<DuplicateCount>,
}

impl DedupResult {
    pub fn total(&self) -> usize {
        self.duplicates.iter().map(|d| d.count).sum()
    }
}

/// Removes repeated sample indices, keeping the first occurrence in each index column.
///
/// Every index column is checked against the same input rows. Under
/// [`DuplicatePolicy::DropRow`] a row flagged by any column is removed from the whole frame;
/// under [`DuplicatePolicy::MaskChannel`] only the flagging channel's cells in that row are
/// nulled. Null and NaN indices never count as repeats.
pub fn remove_duplicate_indices(
    df: &DataFrame,
    index_columns: &[String],
    policy: DuplicatePolicy,
    layout: &ChannelLayout,
) -> PolarsResult<DedupResult> {
    let height = df.height();
    let mut duplicates = Vec::new();
    let mut flagged_by: Vec<(&str, Vec<bool>)> = Vec::new();

    for name in index_columns {
        let flags = duplicate_flags(df.column(name)?.as_materialized_series())?;
        let count = flags.iter().filter(|flag| **flag).count();
        if count > 0 {
            duplicates.push(DuplicateCount {
                column: name.clone(),
                count,
            });
            flagged_by.push((name.as_str(), flags));
        }
    }

    if flagged_by.is_empty() {
        return Ok(DedupResult {
            dataframe: df.clone(),
            duplicates,
        });
    }

    let dataframe = match policy {
        DuplicatePolicy::DropRow => {
            let mut keep = vec![true; height];
            for (_, flags) in &flagged_by {
                for (kept, flagged) in keep.iter_mut().zip(flags) {
                    *kept &= !*flagged;
                }
            }
            df.filter(&BooleanChunked::from_slice("unique".into(), &keep))?
        }
        DuplicatePolicy::MaskChannel => {
            let mut masked = df.clone();
            for (index_column, flags) in &flagged_by {
                let keep: Vec<bool> = flags.iter().map(|flagged| !*flagged).collect();
                let keep = BooleanChunked::from_slice("unique".into(), &keep);
                for name in channel_columns(df, layout, index_column) {
                    let series = masked.column(&name)?.as_materialized_series().clone();
                    let nulls = Series::full_null(series.name().clone(), height, series.dtype());
                    masked.with_column(series.zip_with(&keep, &nulls)?)?;
                }
            }
            masked
        }
    };

    Ok(DedupResult {
        dataframe,
        duplicates,
    })
}

/// `true` at every row whose value already appeared earlier in `series`.
pub fn duplicate_flags(series: &Series) -> PolarsResult<Vec<bool>> {
    let values = series.cast(&DataType::Float64)?;
    let mut seen = HashSet::with_capacity(values.len());
    Ok(values
        .f64()?
        .into_iter()
        .map(|value| match value {
            Some(v) if !v.is_nan() => !seen.insert(normalized_bits(v)),
            _ => false,
        })
        .collect())
}

fn normalized_bits(value: f64) -> u64 {
    if value == 0.0 {
        0.0f64.to_bits()
    } else {
        value.to_bits()
    }
}

/// Columns sharing a channel with `index_column`; just the index column itself when it
/// belongs to no configured channel.
fn channel_columns(df: &DataFrame, layout: &ChannelLayout, index_column: &str) -> Vec<String> {
    match layout.channel_of(index_column) {
        Some(channel) => df
            .get_column_names()
            .into_iter()
            .filter(|name| layout.channel_of(name.as_str()) == Some(channel))
            .map(|name| name.to_string())
            .collect(),
        None => vec![index_column.to_string()],
    }
}
