//! Shared data contracts for model artifacts and dataset class labels.

pub mod artifact;
pub mod classes;

pub use artifact::{
    check_image_size, EpochMetrics, ModelArtifactSchemaVersion, ModelMetadata, ModelShape,
    TrainingParams, ValidationError, MIN_IMAGE_SIZE,
};
pub use classes::{
    bin_guidance, class_name, default_class_names, BinGuidance, BinTally, DisposalBin,
    TRASHNET_CLASSES,
};
