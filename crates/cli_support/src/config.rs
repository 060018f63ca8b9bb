use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use trash_dataset::{SourceKind, DEFAULT_DATASET_ID, DEFAULT_SPLIT};

pub const DEFAULT_CONFIG_NAME: &str = "trashnet.toml";
pub const CONFIG_ENV: &str = "TRASHNET_CONFIG";
pub const DEFAULT_CHECKPOINT: &str = "artifacts/trashnet_cnn.bin";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config file not found: {0}")]
    NotFound(PathBuf),
    #[error("parsing config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSettings {
    pub source: SourceKind,
    pub id: String,
    pub split: String,
    pub data_dir: Option<PathBuf>,
    pub cache_dir: PathBuf,
    pub endpoint: Option<String>,
    pub image_size: u32,
    /// Cap on raw records read before conversion.
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSettings {
    pub batch_size: usize,
    pub epochs: usize,
    pub learning_rate: f64,
    pub val_ratio: f32,
    pub seed: u64,
    pub shuffle: bool,
}

/// Resolved configuration: built-in defaults overlaid with the TOML file.
#[derive(Debug, Clone, PartialEq)]
pub struct TrashnetConfig {
    pub dataset: DatasetSettings,
    pub training: TrainingSettings,
    pub checkpoint: PathBuf,
}

impl Default for TrashnetConfig {
    fn default() -> Self {
        Self {
            dataset: DatasetSettings {
                source: SourceKind::Hub,
                id: DEFAULT_DATASET_ID.to_string(),
                split: DEFAULT_SPLIT.to_string(),
                data_dir: None,
                cache_dir: PathBuf::from("data/hf_cache"),
                endpoint: None,
                image_size: trash_dataset::DEFAULT_IMAGE_SIZE,
                limit: None,
            },
            training: TrainingSettings {
                batch_size: 32,
                epochs: 10,
                learning_rate: 1e-3,
                val_ratio: trash_dataset::DEFAULT_VAL_RATIO,
                seed: trash_dataset::DEFAULT_SPLIT_SEED,
                shuffle: true,
            },
            checkpoint: PathBuf::from(DEFAULT_CHECKPOINT),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    dataset: Option<DatasetSection>,
    training: Option<TrainingSection>,
    artifacts: Option<ArtifactSection>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DatasetSection {
    source: Option<SourceKind>,
    id: Option<String>,
    split: Option<String>,
    data_dir: Option<String>,
    cache_dir: Option<String>,
    endpoint: Option<String>,
    image_size: Option<u32>,
    limit: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct TrainingSection {
    batch_size: Option<usize>,
    epochs: Option<usize>,
    learning_rate: Option<f64>,
    val_ratio: Option<f32>,
    seed: Option<u64>,
    shuffle: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ArtifactSection {
    checkpoint: Option<String>,
}

impl TrashnetConfig {
    /// Load from `$TRASHNET_CONFIG` or `./trashnet.toml`; defaults when absent or unreadable.
    pub fn load() -> Self {
        let path = std::env::var(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_NAME));
        match Self::from_path(&path) {
            Ok(Some(cfg)) => {
                log::info!("loaded config {}", path.display());
                cfg
            }
            Ok(None) => Self::default(),
            Err(e) => {
                log::warn!("{e}; using defaults");
                Self::default()
            }
        }
    }

    /// An explicit `path` must exist and parse; `None` falls back to [`TrashnetConfig::load`].
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => {
                let cfg = Self::from_path(path)?
                    .ok_or_else(|| ConfigError::NotFound(path.to_path_buf()))?;
                log::info!("loaded config {}", path.display());
                Ok(cfg)
            }
            None => Ok(Self::load()),
        }
    }

    /// `Ok(None)` when `path` does not exist.
    pub fn from_path(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml_str(&raw)
            .map(Some)
            .map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                source: e,
            })
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        let file: ConfigFile = toml::from_str(raw)?;
        Ok(Self::from_file(file))
    }

    fn from_file(file: ConfigFile) -> Self {
        let defaults = Self::default();
        let ds = file.dataset.unwrap_or_default();
        let tr = file.training.unwrap_or_default();
        let art = file.artifacts.unwrap_or_default();

        TrashnetConfig {
            dataset: DatasetSettings {
                source: ds.source.unwrap_or(defaults.dataset.source),
                id: ds.id.unwrap_or(defaults.dataset.id),
                split: ds.split.unwrap_or(defaults.dataset.split),
                data_dir: ds.data_dir.map(|v| expand_path(&v)),
                cache_dir: ds
                    .cache_dir
                    .map(|v| expand_path(&v))
                    .unwrap_or(defaults.dataset.cache_dir),
                endpoint: ds.endpoint.filter(|e| !e.trim().is_empty()),
                image_size: ds.image_size.unwrap_or(defaults.dataset.image_size),
                limit: ds.limit,
            },
            training: TrainingSettings {
                batch_size: tr.batch_size.unwrap_or(defaults.training.batch_size),
                epochs: tr.epochs.unwrap_or(defaults.training.epochs),
                learning_rate: tr.learning_rate.unwrap_or(defaults.training.learning_rate),
                val_ratio: tr.val_ratio.unwrap_or(defaults.training.val_ratio),
                seed: tr.seed.unwrap_or(defaults.training.seed),
                shuffle: tr.shuffle.unwrap_or(defaults.training.shuffle),
            },
            checkpoint: art
                .checkpoint
                .map(|v| expand_path(&v))
                .unwrap_or(defaults.checkpoint),
        }
    }

    /// Settings that will be adjusted, or that cannot work for the chosen source.
    pub fn warnings(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.training.batch_size == 0 {
            out.push("training.batch_size is 0; batches of 1 will be used".to_string());
        }
        if !(0.0..1.0).contains(&self.training.val_ratio) {
            out.push(format!(
                "training.val_ratio {} outside [0, 1); it will be clamped",
                self.training.val_ratio
            ));
        }
        if self.dataset.source != SourceKind::Hub && self.dataset.data_dir.is_none() {
            out.push(format!(
                "dataset.source {:?} needs dataset.data_dir (or --data-dir)",
                self.dataset.source
            ));
        }
        out
    }

    pub fn warn_if_invalid(&self) {
        for warning in self.warnings() {
            log::warn!("config: {warning}");
        }
    }
}

pub fn expand_path(raw: &str) -> PathBuf {
    let mut out = raw.to_string();
    if let Some(stripped) = out.strip_prefix('~') {
        if let Ok(home) = std::env::var("HOME") {
            out = format!("{home}{stripped}");
        }
    }
    PathBuf::from(expand_env(&out))
}

/// Replace `${VAR}` with its value; unknown variables are left untouched.
fn expand_env(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let key = &after[..end];
                match std::env::var(key) {
                    Ok(val) => out.push_str(&val),
                    Err(_) => out.push_str(&rest[start..start + end + 3]),
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_env_leaves_unknown_vars() {
        assert_eq!(
            expand_env("a/${TRASHNET_SURELY_UNSET_VAR}/b"),
            "a/${TRASHNET_SURELY_UNSET_VAR}/b"
        );
        assert_eq!(expand_env("plain/path"), "plain/path");
        assert_eq!(expand_env("open/${brace"), "open/${brace");
    }

    #[test]
    fn expand_env_substitutes_known_vars() {
        let path = std::env::var("PATH").unwrap_or_default();
        assert_eq!(expand_env("x:${PATH}"), format!("x:{path}"));
    }
}
