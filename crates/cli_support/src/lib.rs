//! Shared CLI plumbing for the TrashNet binaries.

pub mod common;
pub mod config;
pub mod logging;

pub use common::{
    validate_backend_choice, BackendArgs, BackendKind, CheckpointArgs, ConfigArgs,
};
pub use config::{ConfigError, TrashnetConfig, DEFAULT_CHECKPOINT};
