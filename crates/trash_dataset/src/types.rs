//! Core types, error definitions, and data structures for trash_dataset.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

pub type DatasetResult<T> = Result<T, TrashDatasetError>;

/// RGB channel count of every converted image.
pub const CHANNELS: usize = 3;
/// Default square side length images are resized to.
pub const DEFAULT_IMAGE_SIZE: u32 = 128;

#[derive(Debug, Error)]
pub enum TrashDatasetError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("json parse error from {url}: {source}")]
    Json {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("http error for {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("parquet error at {path}: {source}")]
    Parquet {
        path: PathBuf,
        #[source]
        source: parquet::errors::ParquetError,
    },
    #[error("arrow error at {path}: {source}")]
    Arrow {
        path: PathBuf,
        #[source]
        source: arrow_schema::ArrowError,
    },
    #[error("image decode error at {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("no parquet files listed for dataset {dataset} split {split}")]
    EmptyListing { dataset: String, split: String },
    #[error("{0}")]
    Other(String),
}

/// Encoded image carried by a raw dataset row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImagePayload {
    /// Encoded file bytes (JPEG/PNG/...).
    Bytes(Vec<u8>),
    /// Path to an image file on disk.
    Path(PathBuf),
}

/// One dataset row prior to conversion.
#[derive(Debug, Clone, Default)]
pub struct RawRecord {
    pub image: Option<ImagePayload>,
    pub label: Option<i64>,
}

/// Images stored as `(N, H, W, 3)` u8, row-major HWC per image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageArray {
    pub data: Vec<u8>,
    pub len: usize,
    pub height: usize,
    pub width: usize,
}

impl ImageArray {
    pub fn with_capacity(capacity: usize, width: usize, height: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity * width * height * CHANNELS),
            len: 0,
            height,
            width,
        }
    }

    pub fn shape(&self) -> [usize; 4] {
        [self.len, self.height, self.width, CHANNELS]
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn image_len(&self) -> usize {
        self.height * self.width * CHANNELS
    }

    /// Pixels of image `idx` in HWC order.
    pub fn image(&self, idx: usize) -> &[u8] {
        let n = self.image_len();
        &self.data[idx * n..(idx + 1) * n]
    }

    pub(crate) fn push(&mut self, pixels: &[u8]) -> DatasetResult<()> {
        if pixels.len() != self.image_len() {
            return Err(TrashDatasetError::Other(format!(
                "image buffer has {} bytes, expected {}",
                pixels.len(),
                self.image_len()
            )));
        }
        self.data.extend_from_slice(pixels);
        self.len += 1;
        Ok(())
    }
}

/// Converted images paired with their integer labels (`labels.len() == images.len`).
#[derive(Debug, Clone, Default)]
pub struct LabeledArrays {
    pub images: ImageArray,
    pub labels: Vec<i64>,
}

impl LabeledArrays {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// `max(label) + 1`, or 0 for an empty set.
    pub fn num_classes(&self) -> usize {
        self.labels
            .iter()
            .copied()
            .max()
            .map(|m| (m.max(-1) + 1) as usize)
            .unwrap_or(0)
    }

    /// Per-class sample counts indexed by label.
    pub fn class_counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.num_classes()];
        for &l in &self.labels {
            if l >= 0 {
                counts[l as usize] += 1;
            }
        }
        counts
    }
}

/// Tally of what happened to each record during conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionReport {
    pub total: usize,
    pub converted: usize,
    pub missing_image: usize,
    pub missing_label: usize,
    pub decode_failed: usize,
}

impl ConversionReport {
    pub fn skipped(&self) -> usize {
        self.missing_image + self.missing_label + self.decode_failed
    }
}

/// Where training records come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Parquet shards listed by the Hugging Face datasets server.
    Hub,
    /// A local directory of parquet shards.
    Parquet,
    /// A local `root/<class>/<image>` tree.
    ImageFolder,
}
