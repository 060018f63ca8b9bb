use clap::{Args, ValueEnum};
use std::path::PathBuf;

use crate::config::{ConfigError, TrashnetConfig};

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    NdArray,
    Wgpu,
}

/// Reject a backend the binary was not built with.
pub fn validate_backend_choice(kind: BackendKind) -> anyhow::Result<()> {
    let built_wgpu = cfg!(feature = "backend-wgpu");
    match (kind, built_wgpu) {
        (BackendKind::Wgpu, false) => {
            anyhow::bail!("backend-wgpu feature not enabled; rebuild with --features backend-wgpu or choose ndarray backend")
        }
        (BackendKind::NdArray, true) => {
            log::warn!("built with backend-wgpu; the WGPU backend is used despite --backend ndarray");
        }
        _ => {}
    }
    Ok(())
}

/// Config file shared by the training and inference binaries.
#[derive(Debug, Clone, Default, Args)]
pub struct ConfigArgs {
    /// TOML config path (defaults to $TRASHNET_CONFIG or ./trashnet.toml).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl ConfigArgs {
    pub fn load(&self) -> Result<TrashnetConfig, ConfigError> {
        TrashnetConfig::load_from(self.config.as_deref())
    }
}

/// Checkpoint location shared by the training and inference binaries.
#[derive(Debug, Clone, Args)]
pub struct CheckpointArgs {
    /// Checkpoint path (defaults to artifacts.checkpoint from the config file).
    #[arg(long)]
    pub checkpoint: Option<PathBuf>,
}

impl CheckpointArgs {
    pub fn resolve(&self, cfg: &TrashnetConfig) -> PathBuf {
        self.checkpoint
            .clone()
            .unwrap_or_else(|| cfg.checkpoint.clone())
    }
}

/// Backend selection shared by the training and inference binaries.
#[derive(Debug, Clone, Args)]
pub struct BackendArgs {
    /// Backend to use (ndarray or wgpu if enabled).
    #[arg(long, value_enum, default_value_t = BackendKind::NdArray)]
    pub backend: BackendKind,
}
