#![recursion_limit = "256"]
//! Reload a trained TrashNet checkpoint and classify images with it.

pub mod classifier;

use cli_support::{CheckpointArgs, ConfigArgs};
use std::path::PathBuf;

#[cfg(feature = "backend-wgpu")]
pub type InferenceBackend = burn_wgpu::Wgpu<f32>;
#[cfg(not(feature = "backend-wgpu"))]
pub type InferenceBackend = burn_ndarray::NdArray<f32>;

pub use classifier::{
    load_classifier, random_input, sanity_report, Prediction, TrashClassifier,
};

/// Checkpoint path from `--checkpoint`, else the config's `[artifacts] checkpoint`.
///
/// Resolves the same file `train` writes for the same `--config`.
pub fn resolve_checkpoint(
    config: &ConfigArgs,
    checkpoint: &CheckpointArgs,
) -> anyhow::Result<PathBuf> {
    let cfg = config.load()?;
    Ok(training::checkpoint_file(&checkpoint.resolve(&cfg)))
}

pub mod prelude {
    pub use crate::classifier::{
        load_classifier, random_input, sanity_report, Prediction, TrashClassifier,
    };
    pub use crate::{resolve_checkpoint, InferenceBackend};
}
