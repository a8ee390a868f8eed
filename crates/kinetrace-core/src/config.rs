use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_CHANNELS: [&str; 5] = ["right_hand", "left_hand", "right_leg", "left_leg", "ball"];

/// What happens to a row whose sample index repeats in one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// Remove the row from every channel.
    #[default]
    DropRow,
    /// Keep the row but null the offending channel's columns in it.
    MaskChannel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputRouting {
    #[default]
    Flat,
    /// `<output>/<YYYYMMDD>/<file>` using the date token of the file name.
    ByDate,
}

/// On-disk configuration as written in TOML. Every field has a default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub channels: Vec<String>,
    pub timestamp_marker: String,
    pub index_marker: String,
    pub exercise_separator: char,
    pub input_extension: String,
    pub duplicate_policy: DuplicatePolicy,
    pub routing: OutputRouting,
    /// Exercise name -> 1-based positions into `channels`.
    pub exercises: BTreeMap<String, Vec<usize>>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            channels: DEFAULT_CHANNELS.iter().map(|c| c.to_string()).collect(),
            timestamp_marker: "timestamp".to_string(),
            index_marker: "index".to_string(),
            exercise_separator: '_',
            input_extension: "csv".to_string(),
            duplicate_policy: DuplicatePolicy::default(),
            routing: OutputRouting::default(),
            exercises: BTreeMap::new(),
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Validates the configuration and resolves exercise orderings into prefix lists.
    pub fn into_settings(self) -> Result<Settings, ConfigError> {
        if self.timestamp_marker.trim().is_empty() {
            return Err(ConfigError::BlankMarker {
                name: "timestamp_marker",
            });
        }
        if self.index_marker.trim().is_empty() {
            return Err(ConfigError::BlankMarker {
                name: "index_marker",
            });
        }
        if self.input_extension.trim().is_empty() {
            return Err(ConfigError::BlankMarker {
                name: "input_extension",
            });
        }

        let layout = ChannelLayout::new(self.channels)?;
        let exercises = ExerciseOrderings::new(&layout, &self.exercises)?;

        Ok(Settings {
            layout,
            exercises,
            timestamp_marker: self.timestamp_marker,
            index_marker: self.index_marker,
            exercise_separator: self.exercise_separator,
            input_extension: self.input_extension.trim_start_matches('.').to_string(),
            duplicate_policy: self.duplicate_policy,
            routing: self.routing,
        })
    }
}

/// Validated, immutable settings shared by every file of a batch.
#[derive(Debug, Clone)]
pub struct Settings {
    pub layout: ChannelLayout,
    pub exercises: ExerciseOrderings,
    pub timestamp_marker: String,
    pub index_marker: String,
    pub exercise_separator: char,
    pub input_extension: String,
    pub duplicate_policy: DuplicatePolicy,
    pub routing: OutputRouting,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            layout: ChannelLayout::default(),
            exercises: ExerciseOrderings::default(),
            timestamp_marker: "timestamp".to_string(),
            index_marker: "index".to_string(),
            exercise_separator: '_',
            input_extension: "csv".to_string(),
            duplicate_policy: DuplicatePolicy::default(),
            routing: OutputRouting::default(),
        }
    }
}

impl Settings {
    pub fn timestamp_columns(&self, names: &[String]) -> Vec<String> {
        filter_marked(names, &self.timestamp_marker)
    }

    pub fn index_columns(&self, names: &[String]) -> Vec<String> {
        filter_marked(names, &self.index_marker)
    }
}

fn filter_marked(names: &[String], marker: &str) -> Vec<String> {
    names
        .iter()
        .filter(|name| name.contains(marker))
        .cloned()
        .collect()
}

/// The default ordered list of channel prefixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelLayout {
    prefixes: Vec<String>,
}

impl Default for ChannelLayout {
    fn default() -> Self {
        Self {
            prefixes: DEFAULT_CHANNELS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl ChannelLayout {
    pub fn new(prefixes: Vec<String>) -> Result<Self, ConfigError> {
        if prefixes.is_empty() {
            return Err(ConfigError::NoChannels);
        }
        let mut seen = HashSet::with_capacity(prefixes.len());
        for (position, prefix) in prefixes.iter().enumerate() {
            if prefix.trim().is_empty() {
                return Err(ConfigError::BlankChannel {
                    position: position + 1,
                });
            }
            if !seen.insert(prefix.as_str()) {
                return Err(ConfigError::DuplicateChannel(prefix.clone()));
            }
        }
        Ok(Self { prefixes })
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }

    /// Channel owning `column`. The longest matching prefix wins when prefixes nest.
    pub fn channel_of(&self, column: &str) -> Option<&str> {
        self.prefixes
            .iter()
            .filter(|prefix| column.starts_with(prefix.as_str()))
            .max_by_key(|prefix| prefix.len())
            .map(String::as_str)
    }
}

/// Exercise-specific channel orders, resolved against a [`ChannelLayout`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExerciseOrderings {
    orders: BTreeMap<String, Vec<String>>,
}

impl ExerciseOrderings {
    pub fn new(
        layout: &ChannelLayout,
        table: &BTreeMap<String, Vec<usize>>,
    ) -> Result<Self, ConfigError> {
        let mut orders = BTreeMap::new();
        for (exercise, positions) in table {
            if positions.len() != layout.len() {
                return Err(ConfigError::IncompleteOrdering {
                    exercise: exercise.clone(),
                    expected: layout.len(),
                    found: positions.len(),
                });
            }

            let mut used = HashSet::with_capacity(positions.len());
            let mut order = Vec::with_capacity(positions.len());
            for &position in positions {
                if position == 0 || position > layout.len() {
                    return Err(ConfigError::PositionOutOfRange {
                        exercise: exercise.clone(),
                        position,
                        channels: layout.len(),
                    });
                }
                if !used.insert(position) {
                    return Err(ConfigError::RepeatedPosition {
                        exercise: exercise.clone(),
                        position,
                    });
                }
                order.push(layout.prefixes()[position - 1].clone());
            }
            orders.insert(exercise.clone(), order);
        }
        Ok(Self { orders })
    }

    pub fn get(&self, exercise: &str) -> Option<&[String]> {
        self.orders.get(exercise).map(Vec::as_slice)
    }

    /// Order for `exercise`, or the layout's default order when unknown or absent.
    pub fn order_for<'a>(&'a self, layout: &'a ChannelLayout, exercise: Option<&str>) -> &'a [String] {
        exercise
            .and_then(|name| self.get(name))
            .unwrap_or_else(|| layout.prefixes())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.orders
            .iter()
            .map(|(name, order)| (name.as_str(), order.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let settings = PipelineConfig::default().into_settings().unwrap();
        assert_eq!(settings.layout.prefixes().len(), 5);
        assert!(settings.exercises.is_empty());
    }

    #[test]
    fn exercise_order_substitutes_positions() {
        let settings = PipelineConfig::from_toml_str(
            r#"
            [exercises]
            hopping = [3, 4, 1, 2, 5]
            "#,
        )
        .unwrap()
        .into_settings()
        .unwrap();

        let order = settings
            .exercises
            .order_for(&settings.layout, Some("hopping"));
        assert_eq!(
            order,
            ["right_leg", "left_leg", "right_hand", "left_hand", "ball"]
        );
    }

    #[test]
    fn short_ordering_is_config_error() {
        let err = PipelineConfig::from_toml_str("[exercises]\nhopping = [1, 2]\n")
            .unwrap()
            .into_settings()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::IncompleteOrdering {
                expected: 5,
                found: 2,
                ..
            }
        ));
    }

    #[test]
    fn out_of_range_position_is_config_error() {
        let err = PipelineConfig::from_toml_str("[exercises]\nhopping = [1, 2, 3, 4, 6]\n")
            .unwrap()
            .into_settings()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::PositionOutOfRange { position: 6, .. }
        ));

        let err = PipelineConfig::from_toml_str("[exercises]\nhopping = [0, 2, 3, 4, 5]\n")
            .unwrap()
            .into_settings()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::PositionOutOfRange { position: 0, .. }
        ));
    }

    #[test]
    fn repeated_position_is_config_error() {
        let err = PipelineConfig::from_toml_str("[exercises]\nhopping = [1, 1, 3, 4, 5]\n")
            .unwrap()
            .into_settings()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::RepeatedPosition { position: 1, .. }
        ));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(PipelineConfig::from_toml_str("chanels = [\"a\"]\n").is_err());
    }

    #[test]
    fn policy_and_routing_parse_kebab_case() {
        let config = PipelineConfig::from_toml_str(
            "duplicate_policy = \"mask-channel\"\nrouting = \"by-date\"\n",
        )
        .unwrap();
        assert_eq!(config.duplicate_policy, DuplicatePolicy::MaskChannel);
        assert_eq!(config.routing, OutputRouting::ByDate);
    }

    #[test]
    fn nested_prefixes_resolve_to_longest() {
        let layout = ChannelLayout::new(vec!["ball".into(), "ball_aux".into()]).unwrap();
        assert_eq!(layout.channel_of("ball_aux_timestamp"), Some("ball_aux"));
        assert_eq!(layout.channel_of("ball_timestamp"), Some("ball"));
        assert_eq!(layout.channel_of("head_timestamp"), None);
    }

    #[test]
    fn duplicate_channel_is_rejected() {
        let err = ChannelLayout::new(vec!["ball".into(), "ball".into()]).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateChannel(_)));
    }
}
