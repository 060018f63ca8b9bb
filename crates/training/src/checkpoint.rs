use anyhow::Context;
use burn::module::Module;
use burn::record::{BinFileRecorder, FullPrecisionSettings};
use burn::tensor::backend::Backend;
use data_contracts::ModelMetadata;
use models::{TrashCnn, TrashCnnConfig};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

const CHECKPOINT_EXTENSION: &str = "bin";

/// The recorder appends `.bin`; normalize so the sidecar sits next to the real file.
pub fn checkpoint_file(path: &Path) -> PathBuf {
    path.with_extension(CHECKPOINT_EXTENSION)
}

pub fn sha256_file(path: &Path) -> anyhow::Result<String> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

/// Record weights, then write the metadata sidecar with the checkpoint's SHA256.
pub fn save_checkpoint<B: Backend>(
    model: &TrashCnn<B>,
    mut metadata: ModelMetadata,
    path: &Path,
) -> anyhow::Result<(PathBuf, ModelMetadata)> {
    let ckpt = checkpoint_file(path);
    if ckpt != path {
        log::warn!(
            "checkpoint path {} rewritten to {}",
            path.display(),
            ckpt.display()
        );
    }
    if let Some(parent) = ckpt.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
    model
        .clone()
        .save_file(ckpt.clone(), &recorder)
        .map_err(|e| anyhow::anyhow!("failed to save checkpoint: {e}"))?;

    metadata.checkpoint_sha256 = Some(sha256_file(&ckpt)?);
    metadata.validate()?;
    let sidecar = ModelMetadata::sidecar_path(&ckpt);
    metadata
        .save(&sidecar)
        .with_context(|| format!("writing metadata {}", sidecar.display()))?;
    log::info!("wrote metadata {}", sidecar.display());
    Ok((ckpt, metadata))
}

/// Read the sidecar, verify the checksum, and load weights into a matching network.
pub fn load_checkpoint<B: Backend>(
    path: &Path,
    device: &B::Device,
) -> anyhow::Result<(TrashCnn<B>, ModelMetadata)> {
    let ckpt = checkpoint_file(path);
    if !ckpt.exists() {
        anyhow::bail!("checkpoint not found: {}", ckpt.display());
    }
    let sidecar = ModelMetadata::sidecar_path(&ckpt);
    let metadata = ModelMetadata::load(&sidecar)
        .with_context(|| format!("loading metadata {}", sidecar.display()))?;
    if let Some(expected) = &metadata.checkpoint_sha256 {
        let actual = sha256_file(&ckpt)?;
        if !actual.eq_ignore_ascii_case(expected) {
            anyhow::bail!(
                "checkpoint {} checksum mismatch: metadata says {expected}, file is {actual}",
                ckpt.display()
            );
        }
    }
    let cfg = TrashCnnConfig {
        num_classes: metadata.model.num_classes,
        image_size: metadata.model.image_size,
        channels: metadata.model.channels,
    };
    let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
    let model = TrashCnn::<B>::new(cfg, device)
        .load_file(ckpt.clone(), &recorder, device)
        .map_err(|e| anyhow::anyhow!("failed to load checkpoint {}: {e}", ckpt.display()))?;
    Ok((model, metadata))
}
