use kinetrace_core::config::{ChannelLayout, PipelineConfig};
use kinetrace_core::reorder::reorder_columns;
use polars::prelude::*;

fn names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect()
}

fn scrambled() -> DataFrame {
    df![
        "ball_timestamp" => [0.1, 0.2],
        "left_leg_acc_x" => [1.0, 2.0],
        "right_hand_timestamp" => [0.1, 0.2],
        "notes_free_text" => ["a", "b"],
        "right_hand_acc_x" => [3.0, 4.0],
        "left_leg_timestamp" => [0.1, 0.2],
    ]
    .expect("df")
}

#[test]
fn groups_channels_in_default_order() -> PolarsResult<()> {
    let layout = ChannelLayout::default();
    let result = reorder_columns(&scrambled(), &layout, layout.prefixes())?;

    assert_eq!(
        names(&result.dataframe),
        [
            "right_hand_timestamp",
            "right_hand_acc_x",
            "left_leg_acc_x",
            "left_leg_timestamp",
            "ball_timestamp",
        ]
    );
    assert_eq!(result.dropped_columns, ["notes_free_text"]);
    Ok(())
}

#[test]
fn reordering_is_a_permutation_of_channel_columns() -> PolarsResult<()> {
    let input = scrambled();
    let layout = ChannelLayout::default();
    let result = reorder_columns(&input, &layout, layout.prefixes())?;
    let output = result.dataframe;

    assert_eq!(output.height(), input.height());

    let mut before: Vec<String> = names(&input)
        .into_iter()
        .filter(|name| layout.channel_of(name).is_some())
        .collect();
    let mut after = names(&output);
    before.sort();
    after.sort();
    assert_eq!(before, after);

    for name in names(&output) {
        let after = output.column(&name)?.as_materialized_series();
        let before = input.column(&name)?.as_materialized_series();
        assert!(after.equals(before), "{name} changed");
    }
    Ok(())
}

#[test]
fn exercise_ordering_moves_legs_first() -> PolarsResult<()> {
    let settings = PipelineConfig::from_toml_str("[exercises]\nhopping = [3, 4, 1, 2, 5]\n")
        .unwrap()
        .into_settings()
        .unwrap();
    let order = settings.exercises.order_for(&settings.layout, Some("hopping"));
    let result = reorder_columns(&scrambled(), &settings.layout, order)?;

    assert_eq!(
        names(&result.dataframe),
        [
            "left_leg_acc_x",
            "left_leg_timestamp",
            "right_hand_timestamp",
            "right_hand_acc_x",
            "ball_timestamp",
        ]
    );
    Ok(())
}

#[test]
fn unknown_exercise_uses_default_order() -> PolarsResult<()> {
    let settings = PipelineConfig::from_toml_str("[exercises]\nhopping = [3, 4, 1, 2, 5]\n")
        .unwrap()
        .into_settings()
        .unwrap();
    let order = settings.exercises.order_for(&settings.layout, Some("cartwheel"));
    assert_eq!(order, settings.layout.prefixes());

    let result = reorder_columns(&scrambled(), &settings.layout, order)?;
    assert_eq!(names(&result.dataframe)[0], "right_hand_timestamp");
    Ok(())
}

#[test]
fn missing_channel_contributes_nothing() -> PolarsResult<()> {
    let df = df!["ball_index" => [1i64, 2]]?;
    let layout = ChannelLayout::default();
    let result = reorder_columns(&df, &layout, layout.prefixes())?;
    assert_eq!(names(&result.dataframe), ["ball_index"]);
    assert!(result.dropped_columns.is_empty());
    Ok(())
}
