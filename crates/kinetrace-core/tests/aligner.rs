use kinetrace_core::aligner::{find_valid_start_index, truncate_to};
use polars::prelude::*;

fn timestamp_columns() -> Vec<String> {
    vec![
        "right_leg_timestamp".to_string(),
        "left_leg_timestamp".to_string(),
    ]
}

/// Right leg starts at zero; the left leg is still reporting its previous session until its
/// clock restarts at row 25.
fn two_leg_recording() -> DataFrame {
    let right: Vec<f64> = (0..100).map(|i| i as f64 * 0.02).collect();
    let left: Vec<f64> = (0..100)
        .map(|i| {
            if i < 25 {
                4.5 + i as f64 * 0.02
            } else {
                0.5 + (i - 25) as f64 * 0.02
            }
        })
        .collect();
    let rows: Vec<i64> = (0..100).collect();

    df![
        "right_leg_timestamp" => right,
        "right_leg_index" => rows.clone(),
        "left_leg_timestamp" => left,
        "left_leg_index" => rows,
    ]
    .expect("df")
}

#[test]
fn latest_channel_restart_wins() -> PolarsResult<()> {
    let df = two_leg_recording();
    let alignment = find_valid_start_index(&df, &timestamp_columns())?.expect("alignment");

    assert_eq!(alignment.start_index, 25);
    assert_eq!(
        alignment.candidates,
        [
            ("right_leg_timestamp".to_string(), 0),
            ("left_leg_timestamp".to_string(), 25),
        ]
    );

    let truncated = truncate_to(&df, alignment.start_index);
    assert_eq!(truncated.height(), 75);
    let index = truncated
        .column("right_leg_index")?
        .as_materialized_series()
        .i64()?;
    assert_eq!(index.get(0), Some(25));
    Ok(())
}

#[test]
fn realigning_a_truncated_recording_starts_at_zero() -> PolarsResult<()> {
    let df = two_leg_recording();
    let first = find_valid_start_index(&df, &timestamp_columns())?.expect("alignment");
    let truncated = truncate_to(&df, first.start_index);

    let second = find_valid_start_index(&truncated, &timestamp_columns())?.expect("alignment");
    assert_eq!(second.start_index, 0);
    Ok(())
}

#[test]
fn channel_without_sub_second_rows_is_ignored() -> PolarsResult<()> {
    let df = df![
        "right_leg_timestamp" => [5.0, 0.2, 0.3],
        "left_leg_timestamp" => [7.0, 8.0, 9.0],
    ]?;
    let alignment = find_valid_start_index(&df, &timestamp_columns())?.expect("alignment");
    assert_eq!(alignment.start_index, 1);
    assert_eq!(alignment.candidates.len(), 1);
    Ok(())
}

#[test]
fn no_sub_second_rows_means_no_start() -> PolarsResult<()> {
    let df = df![
        "right_leg_timestamp" => [1.0, 1.5],
        "left_leg_timestamp" => [2.0, 2.5],
    ]?;
    assert!(find_valid_start_index(&df, &timestamp_columns())?.is_none());
    Ok(())
}

#[test]
fn empty_recording_means_no_start() -> PolarsResult<()> {
    let df = two_leg_recording().slice(0, 0);
    assert!(find_valid_start_index(&df, &timestamp_columns())?.is_none());
    Ok(())
}

#[test]
fn no_timestamp_columns_means_no_start() -> PolarsResult<()> {
    let df = two_leg_recording();
    assert!(find_valid_start_index(&df, &[])?.is_none());
    Ok(())
}
