//! Dataset acquisition, conversion, splitting, and Burn-compatible batching for TrashNet.
//!
//! This crate provides utilities for:
//! - Fetching parquet shards by dataset identifier from the Hugging Face datasets server
//! - Reading raw rows from parquet shards or an image-folder tree
//! - Converting rows into fixed-size RGB u8 arrays, skipping malformed records
//! - Stratified train/val splitting
//! - Burn tensor batches (feature `burn-runtime`)

pub mod convert;
pub mod hub;
pub mod records;
pub mod splits;
pub mod types;

#[cfg(feature = "burn-runtime")]
pub mod batch;

pub use convert::{dataset_to_arrays, decode_payload, image_to_array};
pub use hub::{HubClient, ParquetFile, DEFAULT_DATASET_ID, DEFAULT_SPLIT};
pub use records::{
    load_records, read_image_folder, read_parquet_dir, read_parquet_records, LoadedRecords,
    SourceSpec,
};
pub use splits::{count_labels, split_stratified, DEFAULT_SPLIT_SEED, DEFAULT_VAL_RATIO};
pub use types::*;

#[cfg(feature = "burn-runtime")]
pub use batch::{images_to_tensor, labels_to_tensor, make_batch, BatchIter, BurnBatch};
