use kinetrace_parser::ColumnKind;
use polars::prelude::*;

use crate::error::PipelineError;

/// Numeric cells must lie strictly inside `(-VALUE_LIMIT, VALUE_LIMIT)`.
pub const VALUE_LIMIT: f64 = 1e10;

#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub dataframe: DataFrame,
    pub rejected_rows: usize,
}

/// Ensures every column in `required` was parsed as a number.
pub fn require_numeric(df: &DataFrame, required: &[String]) -> Result<(), PipelineError> {
    for name in required {
        let kind = ColumnKind::of(df.column(name)?.dtype());
        if !kind.is_numeric() {
            return Err(PipelineError::Schema {
                column: name.clone(),
                kind,
            });
        }
    }
    Ok(())
}

/// Drops rows holding a null, NaN or out-of-range value in any numeric column.
///
/// Text columns never reject a row. An all-rejected input yields an empty frame.
pub fn remove_abnormal_rows(df: &DataFrame) -> PolarsResult<ValidationResult> {
    let mut keep = vec![true; df.height()];

    for column in df.get_columns() {
        if !ColumnKind::of(column.dtype()).is_numeric() {
            continue;
        }
        let values = column.as_materialized_series().cast(&DataType::Float64)?;
        for (flag, value) in keep.iter_mut().zip(values.f64()?) {
            if !value.is_some_and(within_limit) {
                *flag = false;
            }
        }
    }

    let rejected_rows = keep.iter().filter(|kept| !**kept).count();
    let dataframe = if rejected_rows == 0 {
        df.clone()
    } else {
        let mask = BooleanChunked::from_slice("valid".into(), &keep);
        df.filter(&mask)?
    };

    Ok(ValidationResult {
        dataframe,
        rejected_rows,
    })
}

fn within_limit(value: f64) -> bool {
    value > -VALUE_LIMIT && value < VALUE_LIMIT
}
