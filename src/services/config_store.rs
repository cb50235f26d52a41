// Configuration Storage Service
// Handles config file read/write and version backup

use super::detection::aggregation::AggregationPolicy;
use super::detection::fusion::{FusionScheme, WeightOverrides};
use super::providers::MISTRAL_DEFAULT_MODEL;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const BACKUPS_KEPT: usize = 10;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[source] serde_json::Error),
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> ConfigError + '_ {
    move |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub external: ExternalSettings,
    #[serde(default)]
    pub api_keys: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DetectionConfig {
    /// Chunk limit in characters
    pub max_chunk_size: usize,
    /// Trimmed inputs shorter than this are rejected
    pub min_text_chars: usize,
    pub scheme: FusionScheme,
    /// Per-field overrides of the scheme's preset weights
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weights: Option<WeightOverrides>,
    pub aggregation: AggregationPolicy,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: 5000,
            min_text_chars: 50,
            scheme: FusionScheme::default(),
            weights: None,
            aggregation: AggregationPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExternalSettings {
    pub enabled: bool,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    /// Surface classifier failures instead of substituting a neutral verdict
    pub required: bool,
}

impl Default for ExternalSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            model: MISTRAL_DEFAULT_MODEL.to_string(),
            base_url: None,
            timeout_secs: 20,
            max_attempts: 2,
            required: false,
        }
    }
}

pub struct ConfigStore {
    config_dir: PathBuf,
    config_file: PathBuf,
}

impl ConfigStore {
    pub fn new(config_dir: PathBuf) -> Self {
        let config_file = config_dir.join("config.json");
        Self { config_dir, config_file }
    }

    /// Get default config directory
    pub fn default_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("aigard"))
    }

    /// Store rooted at the default directory, if the platform has one
    pub fn open_default() -> Option<Self> {
        Self::default_config_dir().map(Self::new)
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    fn ensure_dir(&self) -> Result<(), ConfigError> {
        fs::create_dir_all(&self.config_dir).map_err(io_err(&self.config_dir))
    }

    /// Load configuration; a missing file yields defaults
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        if !self.config_file.exists() {
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.config_file).map_err(io_err(&self.config_file))?;
        serde_json::from_str(&content).map_err(ConfigError::Parse)
    }

    /// Save configuration, backing up the previous file first
    pub fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
        self.ensure_dir()?;

        if self.config_file.exists() {
            self.create_backup()?;
        }

        let content = serde_json::to_string_pretty(config).map_err(ConfigError::Serialize)?;
        fs::write(&self.config_file, content).map_err(io_err(&self.config_file))
    }

    fn create_backup(&self) -> Result<(), ConfigError> {
        let backup_dir = self.config_dir.join("backups");
        fs::create_dir_all(&backup_dir).map_err(io_err(&backup_dir))?;

        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S_%3f");
        let backup_file = backup_dir.join(format!("config_{}.json", timestamp));

        fs::copy(&self.config_file, &backup_file).map_err(io_err(&backup_file))?;

        cleanup_old_backups(&backup_dir, BACKUPS_KEPT)
    }

    pub fn get_api_key(&self, provider: &str) -> Result<Option<String>, ConfigError> {
        let config = self.load()?;
        Ok(config
            .api_keys
            .get(provider)
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty()))
    }

    pub fn set_api_key(&self, provider: &str, key: &str) -> Result<(), ConfigError> {
        let mut config = self.load()?;
        config.api_keys.insert(provider.to_string(), key.to_string());
        self.save(&config)
    }

    pub fn delete_api_key(&self, provider: &str) -> Result<(), ConfigError> {
        let mut config = self.load()?;
        config.api_keys.remove(provider);
        self.save(&config)
    }
}

/// Remove old backups, keeping only the most recent N.
/// Names embed a sortable timestamp, so name order is age order.
fn cleanup_old_backups(backup_dir: &Path, keep: usize) -> Result<(), ConfigError> {
    let mut entries: Vec<PathBuf> = fs::read_dir(backup_dir)
        .map_err(io_err(backup_dir))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().map_or(false, |ext| ext == "json"))
        .collect();

    if entries.len() <= keep {
        return Ok(());
    }

    entries.sort();
    for path in entries.iter().take(entries.len() - keep) {
        let _ = fs::remove_file(path);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.detection.max_chunk_size, 5000);
        assert_eq!(config.detection.min_text_chars, 50);
        assert_eq!(config.detection.scheme, FusionScheme::Structural);
        assert_eq!(config.external.model, "mistral-small-latest");
        assert!(!config.external.required);
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::new(dir.path().join("nested"));
        let config = store.load().unwrap();
        assert_eq!(config.detection.max_chunk_size, 5000);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("config.json"),
            r#"{"detection":{"scheme":"lexical","aggregation":{"localWeight":0.8}}}"#,
        )
        .unwrap();
        let config = ConfigStore::new(dir.path().to_path_buf()).load().unwrap();
        assert_eq!(config.detection.scheme, FusionScheme::Lexical);
        assert_eq!(config.detection.aggregation.local_weight, 0.8);
        assert_eq!(config.detection.aggregation.evidence_cap, 15);
        assert_eq!(config.external.max_attempts, 2);
    }

    #[test]
    fn test_partial_lexical_weights_keep_lexical_preset() {
        use crate::services::detection::fusion::{FusionPolicy, FusionWeights};

        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("config.json"),
            r#"{"detection":{"scheme":"lexical","weights":{"rhythm":0.4}}}"#,
        )
        .unwrap();
        let config = ConfigStore::new(dir.path().to_path_buf()).load().unwrap();
        let detection = &config.detection;
        let policy = FusionPolicy::new(detection.scheme, detection.weights.as_ref());

        assert_eq!(policy.weights.rhythm, 0.4);
        assert_eq!(policy.weights.base, 0.40);
        assert_eq!(policy.weights.density, 0.25);
        assert_eq!(policy.weights.perfection, 0.0);
        assert_eq!(
            policy.weights,
            FusionWeights {
                rhythm: 0.4,
                ..FusionWeights::lexical()
            }
        );
    }

    #[test]
    fn test_save_load_and_api_keys() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::new(dir.path().to_path_buf());
        assert_eq!(store.get_api_key("mistral").unwrap(), None);

        store.set_api_key("mistral", " sk-test ").unwrap();
        assert_eq!(store.get_api_key("mistral").unwrap().as_deref(), Some("sk-test"));

        store.delete_api_key("mistral").unwrap();
        assert_eq!(store.get_api_key("mistral").unwrap(), None);
        assert!(dir.path().join("backups").is_dir());
    }

    #[test]
    fn test_garbage_file_is_parse_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("config.json"), "{not json").unwrap();
        let err = ConfigStore::new(dir.path().to_path_buf()).load().unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_backup_pruning_keeps_newest() {
        let dir = TempDir::new().unwrap();
        for i in 0..13 {
            fs::write(dir.path().join(format!("config_2024010{:02}.json", i)), "{}").unwrap();
        }
        cleanup_old_backups(dir.path(), 10).unwrap();
        let left = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(left, 10);
        assert!(!dir.path().join("config_202401000.json").exists());
        assert!(dir.path().join("config_202401012.json").exists());
    }
}
