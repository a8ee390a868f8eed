use polars::prelude::*;
use serde::Serialize;

/// Inter-sample deltas above this many seconds count as a gap.
pub const MAX_SAMPLE_GAP_SECONDS: f64 = 0.1;
/// A channel alerts once it has more gaps than this.
pub const MAX_GAPS_BEFORE_ALERT: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GapAlert {
    pub column: String,
    pub gaps: usize,
}

/// Number of consecutive-row deltas larger than [`MAX_SAMPLE_GAP_SECONDS`]. Pairs involving
/// a null are skipped.
pub fn count_large_gaps(series: &Series) -> PolarsResult<usize> {
    let values = series.cast(&DataType::Float64)?;
    let values: Vec<Option<f64>> = values.f64()?.into_iter().collect();
    Ok(values
        .windows(2)
        .filter(|pair| match (pair[0], pair[1]) {
            (Some(prev), Some(curr)) => curr - prev > MAX_SAMPLE_GAP_SECONDS,
            _ => false,
        })
        .count())
}

/// Diagnostic pass over every timestamp column; never modifies the frame.
pub fn audit_gaps(df: &DataFrame, timestamp_columns: &[String]) -> PolarsResult<Vec<GapAlert>> {
    let mut alerts = Vec::new();
    for name in timestamp_columns {
        let gaps = count_large_gaps(df.column(name)?.as_materialized_series())?;
        if gaps > MAX_GAPS_BEFORE_ALERT {
            alerts.push(GapAlert {
                column: name.clone(),
                gaps,
            });
        }
    }
    Ok(alerts)
}
