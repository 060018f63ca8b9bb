#![recursion_limit = "256"]
//! Training loop, evaluation, and checkpoint persistence for the TrashNet CNN.

pub mod checkpoint;
pub mod dataset;
pub mod util;

pub use checkpoint::{checkpoint_file, load_checkpoint, save_checkpoint, sha256_file};
pub use dataset::{prepare_dataset, PreparedDataset};
pub use models::{TrashCnn, TrashCnnConfig};
pub use util::{
    evaluate, resolve_config, run_train, train_and_save, train_model, EvalMetrics, TrainArgs,
    TrainOutcome,
};
/// Backend alias for training/eval (NdArray by default; WGPU if enabled).
#[cfg(feature = "backend-wgpu")]
pub type TrainBackend = burn_wgpu::Wgpu<f32>;
#[cfg(not(feature = "backend-wgpu"))]
pub type TrainBackend = burn_ndarray::NdArray<f32>;
