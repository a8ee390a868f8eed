use kinetrace_core::config::{ChannelLayout, DuplicatePolicy};
use kinetrace_core::dedup::{remove_duplicate_indices, DuplicateCount};
use polars::prelude::*;

fn index_values(df: &DataFrame, name: &str) -> Vec<Option<i64>> {
    df.column(name)
        .unwrap()
        .as_materialized_series()
        .i64()
        .unwrap()
        .into_iter()
        .collect()
}

fn columns(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

#[test]
fn removes_repeated_index_keeping_first() -> PolarsResult<()> {
    let df = df![
        "ball_timestamp" => [0.1, 0.2, 0.3, 0.4, 0.5, 0.6],
        "ball_index" => [1i64, 2, 3, 3, 4, 5],
    ]?;

    let result = remove_duplicate_indices(
        &df,
        &columns(&["ball_index"]),
        DuplicatePolicy::DropRow,
        &ChannelLayout::default(),
    )?;

    assert_eq!(
        index_values(&result.dataframe, "ball_index"),
        [Some(1), Some(2), Some(3), Some(4), Some(5)]
    );
    assert_eq!(
        result.duplicates,
        [DuplicateCount {
            column: "ball_index".to_string(),
            count: 1
        }]
    );
    Ok(())
}

fn two_channel_frame() -> DataFrame {
    df![
        "right_hand_index" => [1i64, 2, 2, 3, 4],
        "right_hand_acc_x" => [0.1, 0.2, 0.3, 0.4, 0.5],
        "ball_index" => [10i64, 11, 12, 12, 13],
        "ball_acc_x" => [1.1, 1.2, 1.3, 1.4, 1.5],
    ]
    .expect("df")
}

#[test]
fn drop_row_policy_removes_row_for_every_channel() -> PolarsResult<()> {
    let result = remove_duplicate_indices(
        &two_channel_frame(),
        &columns(&["right_hand_index", "ball_index"]),
        DuplicatePolicy::DropRow,
        &ChannelLayout::default(),
    )?;

    assert_eq!(result.dataframe.height(), 3);
    assert_eq!(
        index_values(&result.dataframe, "right_hand_index"),
        [Some(1), Some(2), Some(4)]
    );
    assert_eq!(
        index_values(&result.dataframe, "ball_index"),
        [Some(10), Some(11), Some(13)]
    );
    assert_eq!(result.total(), 2);
    Ok(())
}

#[test]
fn mask_channel_policy_only_nulls_offending_channel() -> PolarsResult<()> {
    let result = remove_duplicate_indices(
        &two_channel_frame(),
        &columns(&["right_hand_index", "ball_index"]),
        DuplicatePolicy::MaskChannel,
        &ChannelLayout::default(),
    )?;

    let df = &result.dataframe;
    assert_eq!(df.height(), 5);
    assert_eq!(
        index_values(df, "right_hand_index"),
        [Some(1), Some(2), None, Some(3), Some(4)]
    );
    assert_eq!(
        index_values(df, "ball_index"),
        [Some(10), Some(11), Some(12), None, Some(13)]
    );

    let hand_acc = df.column("right_hand_acc_x")?.as_materialized_series().f64()?;
    assert!(hand_acc.get(2).is_none());
    assert_eq!(hand_acc.get(3), Some(0.4));
    let ball_acc = df.column("ball_acc_x")?.as_materialized_series().f64()?;
    assert_eq!(ball_acc.get(2), Some(1.3));
    assert!(ball_acc.get(3).is_none());
    Ok(())
}

#[test]
fn deduplication_is_idempotent() -> PolarsResult<()> {
    let layout = ChannelLayout::default();
    let index_columns = columns(&["right_hand_index", "ball_index"]);

    for policy in [DuplicatePolicy::DropRow, DuplicatePolicy::MaskChannel] {
        let once = remove_duplicate_indices(&two_channel_frame(), &index_columns, policy, &layout)?;
        let twice = remove_duplicate_indices(&once.dataframe, &index_columns, policy, &layout)?;

        assert!(twice.duplicates.is_empty(), "{policy:?}");
        assert!(once.dataframe.equals_missing(&twice.dataframe), "{policy:?}");
    }
    Ok(())
}

#[test]
fn null_indices_are_not_duplicates() -> PolarsResult<()> {
    let df = df!["ball_index" => [Some(1i64), None, None, Some(2)]]?;
    let result = remove_duplicate_indices(
        &df,
        &columns(&["ball_index"]),
        DuplicatePolicy::DropRow,
        &ChannelLayout::default(),
    )?;
    assert!(result.duplicates.is_empty());
    assert_eq!(result.dataframe.height(), 4);
    Ok(())
}
