use polars::prelude::*;

use crate::config::ChannelLayout;

#[derive(Debug, Clone)]
pub struct ReorderResult {
    pub dataframe: DataFrame,
    /// Input columns that belong to no configured channel.
    pub dropped_columns: Vec<String>,
}

/// Groups columns by channel and emits the groups in `order`.
///
/// Column ownership comes from [`ChannelLayout::channel_of`]; within a channel the input order
/// is kept. Columns owned by no channel in `order` are dropped.
pub fn reorder_columns(
    df: &DataFrame,
    layout: &ChannelLayout,
    order: &[String],
) -> PolarsResult<ReorderResult> {
    let names: Vec<&str> = df
        .get_column_names()
        .into_iter()
        .map(|name| name.as_str())
        .collect();

    let mut selected: Vec<&str> = Vec::with_capacity(names.len());
    for prefix in order {
        selected.extend(
            names
                .iter()
                .copied()
                .filter(|name| layout.channel_of(name) == Some(prefix.as_str())),
        );
    }

    let dropped_columns = names
        .iter()
        .filter(|name| !selected.contains(name))
        .map(|name| name.to_string())
        .collect();

    let dataframe = df.select(selected.iter().copied())?;

    Ok(ReorderResult {
        dataframe,
        dropped_columns,
    })
}
