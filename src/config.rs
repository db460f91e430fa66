//! Layered configuration: built-in defaults → optional YAML file →
//! environment variables → per-call RPC overrides.
//!
//! Modeled on the per-domain `from_env()` composition pattern used by
//! larger sidecar services in this codebase family: a top-level config
//! struct is built from compiled-in defaults, then each later layer is
//! laid over it in order, so the result is always one concrete struct
//! rather than a dynamic map.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Scoring weights for the relevance scorer (§4.3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Weights {
    pub recent_modification: f64,
    pub file_size_optimality: f64,
    pub file_type_priority: f64,
    pub directory_importance: f64,
    pub git_activity: f64,
    pub priority_high_threshold: f64,
    pub priority_medium_threshold: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            recent_modification: 0.30,
            file_size_optimality: 0.20,
            file_type_priority: 0.20,
            directory_importance: 0.15,
            git_activity: 0.15,
            priority_high_threshold: 0.8,
            priority_medium_threshold: 0.5,
        }
    }
}

/// Full effective configuration for one Gandalf process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GandalfConfig {
    pub cache_ttl_seconds: u64,
    pub max_files: usize,
    pub mcp_debug: bool,
    pub fallback_tool: Option<String>,
    pub weights: Weights,
}

impl Default for GandalfConfig {
    fn default() -> Self {
        Self {
            cache_ttl_seconds: 3600,
            max_files: 1000,
            mcp_debug: false,
            fallback_tool: None,
            weights: Weights::default(),
        }
    }
}

/// A YAML document as found in `gandalf-weights.yaml`. Every field is
/// optional; absent fields fall through to the layer below.
#[derive(Debug, Clone, Default, Deserialize)]
struct WeightsFile {
    cache_ttl_seconds: Option<u64>,
    max_files: Option<usize>,
    weights: Option<PartialWeights>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct PartialWeights {
    recent_modification: Option<f64>,
    file_size_optimality: Option<f64>,
    file_type_priority: Option<f64>,
    directory_importance: Option<f64>,
    git_activity: Option<f64>,
    priority_high_threshold: Option<f64>,
    priority_medium_threshold: Option<f64>,
}

impl GandalfConfig {
    /// Builds the effective configuration: defaults, then an optional YAML
    /// file (project root first, then a user config directory), then
    /// environment variables. Invalid YAML produces a warning and is
    /// skipped rather than aborting startup.
    #[must_use]
    pub fn load(project_root: &Path) -> Self {
        let mut config = Self::default();

        for candidate in Self::yaml_candidates(project_root) {
            if !candidate.exists() {
                continue;
            }
            match std::fs::read_to_string(&candidate) {
                Ok(contents) => match serde_yaml::from_str::<WeightsFile>(&contents) {
                    Ok(file) => {
                        config.apply_yaml(file);
                        tracing::info!(path = %candidate.display(), "loaded gandalf-weights.yaml");
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %candidate.display(),
                            error = %e,
                            "invalid gandalf-weights.yaml, falling back to defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(path = %candidate.display(), error = %e, "failed to read gandalf-weights.yaml");
                }
            }
        }

        config.apply_env();
        config
    }

    fn yaml_candidates(project_root: &Path) -> Vec<PathBuf> {
        let mut candidates = vec![project_root.join("gandalf-weights.yaml")];
        if let Some(config_dir) = dirs::config_dir() {
            candidates.push(config_dir.join("gandalf").join("gandalf-weights.yaml"));
        }
        candidates
    }

    fn apply_yaml(&mut self, file: WeightsFile) {
        if let Some(v) = file.cache_ttl_seconds {
            self.cache_ttl_seconds = v;
        }
        if let Some(v) = file.max_files {
            self.max_files = v;
        }
        if let Some(w) = file.weights {
            if let Some(v) = w.recent_modification {
                self.weights.recent_modification = v;
            }
            if let Some(v) = w.file_size_optimality {
                self.weights.file_size_optimality = v;
            }
            if let Some(v) = w.file_type_priority {
                self.weights.file_type_priority = v;
            }
            if let Some(v) = w.directory_importance {
                self.weights.directory_importance = v;
            }
            if let Some(v) = w.git_activity {
                self.weights.git_activity = v;
            }
            if let Some(v) = w.priority_high_threshold {
                self.weights.priority_high_threshold = v;
            }
            if let Some(v) = w.priority_medium_threshold {
                self.weights.priority_medium_threshold = v;
            }
        }
    }

    fn apply_env(&mut self) {
        self.apply_env_from(&Self::env_snapshot());
    }

    /// Applies a captured environment snapshot. Split out from `apply_env`
    /// so tests can exercise layering without mutating the process
    /// environment (which is unsound to do concurrently with other tests).
    fn apply_env_from(&mut self, env: &HashMap<String, String>) {
        if let Some(v) = env.get("GANDALF_CACHE_TTL").and_then(|s| s.parse().ok()) {
            self.cache_ttl_seconds = v;
        }
        if let Some(v) = env.get("GANDALF_MAX_FILES").and_then(|s| s.parse().ok()) {
            self.max_files = v;
        }
        if let Some(v) = env.get("MCP_DEBUG") {
            self.mcp_debug = is_truthy(v);
        }
        if let Some(v) = env.get("GANDALF_FALLBACK_TOOL") {
            self.fallback_tool = Some(v.clone());
        }

        let weight_vars: &[(&str, fn(&mut Weights, f64))] = &[
            ("WEIGHT_RECENT_MODIFICATION", |w, v| w.recent_modification = v),
            ("WEIGHT_FILE_SIZE_OPTIMALITY", |w, v| w.file_size_optimality = v),
            ("WEIGHT_FILE_TYPE_PRIORITY", |w, v| w.file_type_priority = v),
            ("WEIGHT_DIRECTORY_IMPORTANCE", |w, v| w.directory_importance = v),
            ("WEIGHT_GIT_ACTIVITY", |w, v| w.git_activity = v),
            ("WEIGHT_PRIORITY_HIGH_THRESHOLD", |w, v| w.priority_high_threshold = v),
            ("WEIGHT_PRIORITY_MEDIUM_THRESHOLD", |w, v| w.priority_medium_threshold = v),
        ];
        for (name, setter) in weight_vars {
            if let Some(raw) = env.get(*name) {
                match raw.parse::<f64>() {
                    Ok(v) => setter(&mut self.weights, v),
                    Err(_) => tracing::warn!(name, value = %raw, "ignoring invalid WEIGHT_* override"),
                }
            }
        }
    }

    fn env_snapshot() -> HashMap<String, String> {
        const VARS: &[&str] = &[
            "GANDALF_CACHE_TTL",
            "GANDALF_MAX_FILES",
            "MCP_DEBUG",
            "GANDALF_FALLBACK_TOOL",
            "WEIGHT_RECENT_MODIFICATION",
            "WEIGHT_FILE_SIZE_OPTIMALITY",
            "WEIGHT_FILE_TYPE_PRIORITY",
            "WEIGHT_DIRECTORY_IMPORTANCE",
            "WEIGHT_GIT_ACTIVITY",
            "WEIGHT_PRIORITY_HIGH_THRESHOLD",
            "WEIGHT_PRIORITY_MEDIUM_THRESHOLD",
        ];
        VARS.iter()
            .filter_map(|name| std::env::var(name).ok().map(|v| ((*name).to_string(), v)))
            .collect()
    }

    /// Resolves `GANDALF_HOME`, defaulting to `~/.gandalf`.
    #[must_use]
    pub fn gandalf_home() -> PathBuf {
        std::env::var_os("GANDALF_HOME")
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(".gandalf")))
            .unwrap_or_else(|| PathBuf::from(".gandalf"))
    }
}

fn is_truthy(v: &str) -> bool {
    matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_table() {
        let w = Weights::default();
        assert_eq!(w.recent_modification, 0.30);
        assert_eq!(w.file_size_optimality, 0.20);
        assert_eq!(w.file_type_priority, 0.20);
        assert_eq!(w.directory_importance, 0.15);
        assert_eq!(w.git_activity, 0.15);
    }

    #[test]
    fn env_overrides_layer_over_yaml_and_defaults() {
        let mut config = GandalfConfig::default();
        config.apply_yaml(WeightsFile {
            cache_ttl_seconds: Some(100),
            max_files: None,
            weights: Some(PartialWeights {
                recent_modification: Some(0.5),
                ..Default::default()
            }),
        });
        assert_eq!(config.cache_ttl_seconds, 100);
        assert_eq!(config.weights.recent_modification, 0.5);

        let mut env = HashMap::new();
        env.insert("GANDALF_CACHE_TTL".to_string(), "200".to_string());
        env.insert("WEIGHT_RECENT_MODIFICATION".to_string(), "0.9".to_string());
        config.apply_env_from(&env);

        assert_eq!(config.cache_ttl_seconds, 200);
        assert_eq!(config.weights.recent_modification, 0.9);
        // Untouched by env, should keep the YAML-layered value.
        assert_eq!(config.weights.file_size_optimality, 0.20);
    }

    #[test]
    fn invalid_weight_override_is_ignored_not_fatal() {
        let mut config = GandalfConfig::default();
        let mut env = HashMap::new();
        env.insert("WEIGHT_GIT_ACTIVITY".to_string(), "not-a-float".to_string());
        config.apply_env_from(&env);
        assert_eq!(config.weights.git_activity, Weights::default().git_activity);
    }

    #[test]
    fn mcp_debug_truthy_values() {
        let mut config = GandalfConfig::default();
        let mut env = HashMap::new();
        env.insert("MCP_DEBUG".to_string(), "true".to_string());
        config.apply_env_from(&env);
        assert!(config.mcp_debug);
    }
}
