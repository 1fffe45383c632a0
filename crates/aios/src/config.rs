//! Configuration management for AIOS.
//!
//! Loads settings from /etc/aios/config.toml, then the user config
//! directory, then falls back to defaults. Every field has a serde
//! default so partial files are valid.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

/// System-wide config file path
pub const CONFIG_PATH: &str = "/etc/aios/config.toml";

/// Inference backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Generate endpoint of the local Ollama instance
    #[serde(default = "default_inference_url")]
    pub url: String,

    /// Classifier model name
    #[serde(default = "default_inference_model")]
    pub model: String,
}

fn default_inference_url() -> String {
    "http://localhost:11434/api/generate".to_string()
}

fn default_inference_model() -> String {
    "qwen2.5-coder:1.5b".to_string()
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            url: default_inference_url(),
            model: default_inference_model(),
        }
    }
}

/// Background sentinel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentinelConfig {
    /// Polling interval in seconds
    #[serde(default = "default_sentinel_interval")]
    pub interval_secs: u64,

    /// CPU share above which a process is flagged as abnormal
    #[serde(default = "default_cpu_alert_percent")]
    pub cpu_alert_percent: f32,

    /// How many top CPU consumers to sample per tick
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

fn default_sentinel_interval() -> u64 {
    2
}

fn default_cpu_alert_percent() -> f32 {
    90.0
}

fn default_top_n() -> usize {
    5
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_sentinel_interval(),
            cpu_alert_percent: default_cpu_alert_percent(),
            top_n: default_top_n(),
        }
    }
}

/// File scanning configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesConfig {
    /// Root directory for scans and searches. Empty means $HOME.
    #[serde(default)]
    pub scan_root: String,

    /// Only files above this size enter the large-file index
    #[serde(default = "default_index_floor_mb")]
    pub index_floor_mb: u64,
}

fn default_index_floor_mb() -> u64 {
    10
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            scan_root: String::new(),
            index_floor_mb: default_index_floor_mb(),
        }
    }
}

impl FilesConfig {
    /// Resolve the scan root, defaulting to the home directory.
    pub fn resolved_root(&self) -> PathBuf {
        if !self.scan_root.is_empty() {
            return PathBuf::from(&self.scan_root);
        }
        dirs::home_dir().unwrap_or_else(|| PathBuf::from("/"))
    }
}

/// Top-level AIOS configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AiosConfig {
    #[serde(default)]
    pub inference: InferenceConfig,

    #[serde(default)]
    pub sentinel: SentinelConfig,

    #[serde(default)]
    pub files: FilesConfig,
}

impl AiosConfig {
    /// Load configuration, falling back to defaults on any problem.
    pub fn load() -> Self {
        for path in candidate_paths() {
            match fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<AiosConfig>(&contents) {
                    Ok(config) => {
                        info!("Loaded config from {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        warn!("Invalid config at {}: {}", path.display(), e);
                    }
                },
                Err(_) => continue,
            }
        }

        info!("No config file found, using defaults");
        Self::default()
    }
}

fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_PATH)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("aios/config.toml"));
    }
    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config: AiosConfig = toml::from_str("").unwrap();
        assert_eq!(config.inference.url, default_inference_url());
        assert_eq!(config.inference.model, default_inference_model());
        assert_eq!(config.sentinel.interval_secs, 2);
        assert_eq!(config.sentinel.cpu_alert_percent, 90.0);
        assert_eq!(config.sentinel.top_n, 5);
        assert_eq!(config.files.index_floor_mb, 10);
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let config: AiosConfig = toml::from_str(
            r#"
            [inference]
            model = "llama3.2:1b"

            [sentinel]
            interval_secs = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.inference.model, "llama3.2:1b");
        assert_eq!(config.inference.url, default_inference_url());
        assert_eq!(config.sentinel.interval_secs, 5);
        assert_eq!(config.sentinel.cpu_alert_percent, 90.0);
    }

    #[test]
    fn explicit_scan_root_wins() {
        let config = FilesConfig {
            scan_root: "/srv/data".to_string(),
            index_floor_mb: 10,
        };
        assert_eq!(config.resolved_root(), PathBuf::from("/srv/data"));
    }
}
