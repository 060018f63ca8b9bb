use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ModelArtifactSchemaVersion {
    V1,
}

/// Architecture parameters needed to rebuild the network before loading weights.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelShape {
    pub num_classes: usize,
    /// Square input side length in pixels.
    pub image_size: usize,
    pub channels: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrainingParams {
    pub dataset_id: String,
    pub split: String,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub val_ratio: f32,
    pub seed: u64,
    pub train_samples: usize,
    pub val_samples: usize,
    pub skipped_records: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct EpochMetrics {
    pub epoch: usize,
    pub loss: f32,
    pub accuracy: f32,
    pub val_loss: Option<f32>,
    pub val_accuracy: Option<f32>,
}

/// Sidecar written next to a checkpoint (same stem, `.json` extension).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelMetadata {
    pub schema_version: ModelArtifactSchemaVersion,
    pub model: ModelShape,
    pub class_names: Vec<String>,
    pub training: Option<TrainingParams>,
    #[serde(default)]
    pub history: Vec<EpochMetrics>,
    /// Hex-encoded SHA256 of the checkpoint file.
    pub checkpoint_sha256: Option<String>,
    pub created_at_unix: f64,
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("num_classes must be at least 1")]
    NoClasses,
    #[error("image_size {0} too small for the network (minimum {MIN_IMAGE_SIZE})")]
    ImageTooSmall(usize),
    #[error("expected 3 input channels, got {0}")]
    Channels(usize),
    #[error("class_names has {names} entries but num_classes is {classes}")]
    ClassNameCount { names: usize, classes: usize },
    #[error("checkpoint_sha256 is not a 64-char hex digest: {0:?}")]
    InvalidChecksum(String),
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("json error at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Smallest square input that survives three valid 3x3 convolutions and two 2x2 pools.
pub const MIN_IMAGE_SIZE: usize = 18;

pub fn check_image_size(image_size: usize) -> Result<(), ValidationError> {
    if image_size < MIN_IMAGE_SIZE {
        return Err(ValidationError::ImageTooSmall(image_size));
    }
    Ok(())
}

impl ModelShape {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.num_classes == 0 {
            return Err(ValidationError::NoClasses);
        }
        check_image_size(self.image_size)?;
        if self.channels != 3 {
            return Err(ValidationError::Channels(self.channels));
        }
        Ok(())
    }
}

impl ModelMetadata {
    pub fn new(model: ModelShape, class_names: Vec<String>) -> Self {
        let created_at_unix = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        Self {
            schema_version: ModelArtifactSchemaVersion::V1,
            model,
            class_names,
            training: None,
            history: Vec::new(),
            checkpoint_sha256: None,
            created_at_unix,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.model.validate()?;
        if !self.class_names.is_empty() && self.class_names.len() != self.model.num_classes {
            return Err(ValidationError::ClassNameCount {
                names: self.class_names.len(),
                classes: self.model.num_classes,
            });
        }
        if let Some(sum) = &self.checkpoint_sha256 {
            if sum.len() != 64 || !sum.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(ValidationError::InvalidChecksum(sum.clone()));
            }
        }
        Ok(())
    }

    /// Sidecar location for a checkpoint path.
    pub fn sidecar_path(checkpoint: &Path) -> PathBuf {
        checkpoint.with_extension("json")
    }

    pub fn load(path: &Path) -> Result<Self, ValidationError> {
        let raw = fs::read(path).map_err(|e| ValidationError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let meta: ModelMetadata =
            serde_json::from_slice(&raw).map_err(|e| ValidationError::Json {
                path: path.to_path_buf(),
                source: e,
            })?;
        meta.validate()?;
        Ok(meta)
    }

    pub fn save(&self, path: &Path) -> Result<(), ValidationError> {
        let json = serde_json::to_vec_pretty(self).map_err(|e| ValidationError::Json {
            path: path.to_path_buf(),
            source: e,
        })?;
        fs::write(path, json).map_err(|e| ValidationError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn last_epoch(&self) -> Option<&EpochMetrics> {
        self.history.last()
    }
}
