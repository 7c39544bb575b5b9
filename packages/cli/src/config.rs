use anyhow::{Context, Result};
use canvas_editor::BatchPolicy;
use canvas_merge::{ConflictType, MergeConfig, Strategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_NAME: &str = "canvas.config.json";

/// Canvas configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// What `canvas patch` does with a failing `test` op
    pub batch_policy: BatchPolicy,

    /// Resolutions scoring below this go to manual review
    pub auto_apply_threshold: f64,

    /// Node ceiling for diff and merge inputs
    pub max_nodes: usize,

    /// Per conflict type strategy lists, replacing the built-in ones
    pub policy: BTreeMap<ConflictType, Vec<Strategy>>,
}

impl Config {
    /// Load `explicit`, or `canvas.config.json` from `cwd` when present
    pub fn load(cwd: &Path, explicit: Option<&Path>) -> Result<Self> {
        let config_path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);
                if !path.exists() {
                    return Ok(Config::default());
                }
                path
            }
        };

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Cannot read config {}", config_path.display()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config {}", config_path.display()))?;

        tracing::debug!(path = %config_path.display(), "loaded config");

        Ok(config)
    }

    pub fn merge_config(&self) -> MergeConfig {
        self.policy.iter().fold(
            MergeConfig::default()
                .with_threshold(self.auto_apply_threshold)
                .with_max_nodes(self.max_nodes),
            |config, (conflict_type, strategies)| config.with_policy(*conflict_type, strategies.clone()),
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        let merge = MergeConfig::default();
        Self {
            batch_policy: BatchPolicy::default(),
            auto_apply_threshold: merge.auto_apply_threshold,
            max_nodes: merge.max_nodes,
            policy: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "batchPolicy": "skipFailedTests",
            "autoApplyThreshold": 0.8,
            "policy": {
                "delete-vs-modify": ["preferRemote", "manual"]
            }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.batch_policy, BatchPolicy::SkipFailedTests);
        assert_eq!(config.auto_apply_threshold, 0.8);
        assert_eq!(config.max_nodes, 50_000);

        let merge = config.merge_config();
        assert_eq!(
            merge.strategies_for(ConflictType::DeleteModify),
            &[Strategy::PreferRemote, Strategy::Manual]
        );
        assert_eq!(
            merge.strategies_for(ConflictType::MoveMove),
            MergeConfig::default().strategies_for(ConflictType::MoveMove)
        );
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.batch_policy, BatchPolicy::Abort);
        assert_eq!(config.merge_config(), MergeConfig::default());
    }
}
