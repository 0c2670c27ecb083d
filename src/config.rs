use serde::{Deserialize, Serialize};

use crate::{error::{PlanError, PlanResult}, types::DataType};

/// Session options read by node constructors.
///
/// - `shuffle_partitions` is the partition count of a `RepartitionByExpression`
///   built without an explicit count.
/// - `use_current_config_for_view` makes permanent views resolve with the
///   active options instead of the ones captured when the view was created.
/// - `legacy_integer_grouping_id` types the grouping id of an `Expand` as a
///   32 bit integer instead of a 64 bit long.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlanConf {
    pub shuffle_partitions: i64,
    pub use_current_config_for_view: bool,
    pub legacy_integer_grouping_id: bool,
}

impl Default for PlanConf {
    fn default() -> Self {
        Self {
            shuffle_partitions: 200,
            use_current_config_for_view: false,
            legacy_integer_grouping_id: false,
        }
    }
}

impl PlanConf {
    pub const SHUFFLE_PARTITIONS: &'static str = "plan.shuffle.partitions";
    pub const USE_CURRENT_CONFIG_FOR_VIEW: &'static str = "plan.view.useCurrentConfig";
    pub const LEGACY_INTEGER_GROUPING_ID: &'static str = "plan.groupingId.legacyInteger";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_shuffle_partitions(mut self, partitions: i64) -> Self {
        self.shuffle_partitions = partitions;
        self
    }

    pub fn with_current_config_for_view(mut self, enabled: bool) -> Self {
        self.use_current_config_for_view = enabled;
        self
    }

    pub fn with_legacy_integer_grouping_id(mut self, enabled: bool) -> Self {
        self.legacy_integer_grouping_id = enabled;
        self
    }

    /// Parse a JSON document such as `{"shufflePartitions": 8}`; missing keys
    /// keep their defaults.
    pub fn from_json(text: &str) -> PlanResult<Self> {
        serde_json::from_str(text).map_err(|e| PlanError::ConfigFormat(e.to_string()))
    }

    /// Apply `key = value` settings on top of the defaults. Unknown keys are ignored.
    pub fn from_pairs<'a, I>(pairs: I) -> PlanResult<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut conf = Self::default();
        for (key, value) in pairs {
            conf.set(key, value)?;
        }
        Ok(conf)
    }

    pub fn set(&mut self, key: &str, value: &str) -> PlanResult<()> {
        let invalid = || PlanError::InvalidConfig { key: key.to_string(), value: value.to_string() };
        match key {
            Self::SHUFFLE_PARTITIONS => {
                self.shuffle_partitions = value.trim().parse().map_err(|_| invalid())?;
            }
            Self::USE_CURRENT_CONFIG_FOR_VIEW => {
                self.use_current_config_for_view = Self::parse_bool(value).ok_or_else(invalid)?;
            }
            Self::LEGACY_INTEGER_GROUPING_ID => {
                self.legacy_integer_grouping_id = Self::parse_bool(value).ok_or_else(invalid)?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Data type of the grouping id column produced by `Expand`.
    pub fn grouping_id_type(&self) -> DataType {
        if self.legacy_integer_grouping_id { DataType::Integer } else { DataType::Long }
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let conf = PlanConf::new();
        assert_eq!(conf.shuffle_partitions, 200);
        assert!(!conf.use_current_config_for_view);
        assert_eq!(conf.grouping_id_type(), DataType::Long);
    }

    #[test]
    fn from_json_keeps_defaults_for_missing_keys() {
        let conf = PlanConf::from_json(r#"{ "shufflePartitions": 8 }"#).unwrap();
        assert_eq!(conf.shuffle_partitions, 8);
        assert!(!conf.legacy_integer_grouping_id);
    }

    #[test]
    fn from_json_reports_malformed_documents() {
        assert!(matches!(PlanConf::from_json("{ nope"), Err(PlanError::ConfigFormat(_))));
    }

    #[test]
    fn from_pairs_parses_known_keys_and_ignores_others() {
        let conf = PlanConf::from_pairs([
            ("plan.shuffle.partitions", "16"),
            ("plan.groupingId.legacyInteger", "TRUE"),
            ("some.other.key", "x"),
        ]).unwrap();
        assert_eq!(conf.shuffle_partitions, 16);
        assert_eq!(conf.grouping_id_type(), DataType::Integer);
    }

    #[test]
    fn from_pairs_rejects_bad_values() {
        let err = PlanConf::from_pairs([("plan.view.useCurrentConfig", "maybe")]).unwrap_err();
        assert_eq!(err, PlanError::InvalidConfig {
            key: "plan.view.useCurrentConfig".into(),
            value: "maybe".into(),
        });
    }
}
