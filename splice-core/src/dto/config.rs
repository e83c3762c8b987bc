//! Config DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::config::{Config, ConfigKind};

/// Reference to a config: either stored by id or supplied inline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigRef {
    /// Latest revision of a stored config
    Stored(String),
    Inline(Config),
}

impl From<Config> for ConfigRef {
    fn from(config: Config) -> Self {
        ConfigRef::Inline(config)
    }
}

/// Lightweight config summary for listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSummary {
    pub id: String,
    pub kind: ConfigKind,
    pub revision: u32,
    pub instruction: String,
    pub updated_at: DateTime<Utc>,
}

impl From<Config> for ConfigSummary {
    fn from(config: Config) -> Self {
        let kind = config.kind();
        let meta = config.meta().clone();
        Self {
            id: meta.id,
            kind,
            revision: meta.revision,
            instruction: meta.instruction,
            updated_at: meta.updated_at,
        }
    }
}

/// Response to a config upsert
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertedConfig {
    pub id: String,
    pub revision: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::{ConfigMeta, TransformConfig};

    #[test]
    fn test_config_ref_wire_format() {
        let stored: ConfigRef = serde_json::from_str(r#"{"stored": "abc"}"#).unwrap();
        assert_eq!(stored, ConfigRef::Stored("abc".to_string()));

        let inline = ConfigRef::Inline(Config::Transform(TransformConfig {
            meta: ConfigMeta::new("t", ""),
            expression: String::new(),
            schema: serde_json::json!({}),
        }));
        let value = serde_json::to_value(&inline).unwrap();
        assert_eq!(value["inline"]["kind"], "transform");
    }

    #[test]
    fn test_summary_conversion() {
        let config = Config::Transform(TransformConfig {
            meta: ConfigMeta::new("t1", "map users"),
            expression: "return input".to_string(),
            schema: serde_json::json!({}),
        });

        let summary: ConfigSummary = config.into();
        assert_eq!(summary.id, "t1");
        assert_eq!(summary.kind, ConfigKind::Transform);
        assert_eq!(summary.instruction, "map users");
    }
}
