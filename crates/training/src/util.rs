use burn::backend::Autodiff;
use burn::module::AutodiffModule;
use burn::nn::loss::CrossEntropyLossConfig;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor};
use clap::{Parser, ValueEnum};
use cli_support::config::TrainingSettings;
use cli_support::{
    validate_backend_choice, BackendArgs, CheckpointArgs, ConfigArgs, TrashnetConfig,
};
use data_contracts::{check_image_size, EpochMetrics, ModelMetadata, ModelShape, TrainingParams};
use models::{TrashCnn, TrashCnnConfig};
use std::path::{Path, PathBuf};
use trash_dataset::{make_batch, BatchIter, LabeledArrays, SourceKind, CHANNELS};

use crate::checkpoint::save_checkpoint;
use crate::dataset::{prepare_dataset, PreparedDataset};
use crate::TrainBackend;

pub type ADBackend = Autodiff<TrainBackend>;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceArg {
    Hub,
    Parquet,
    ImageFolder,
}

impl From<SourceArg> for SourceKind {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Hub => SourceKind::Hub,
            SourceArg::Parquet => SourceKind::Parquet,
            SourceArg::ImageFolder => SourceKind::ImageFolder,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "train",
    about = "Fetch a labeled image dataset, train the TrashNet CNN, and save a checkpoint"
)]
pub struct TrainArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
    /// Where records come from.
    #[arg(long, value_enum)]
    pub source: Option<SourceArg>,
    /// Dataset identifier on the hub.
    #[arg(long)]
    pub dataset_id: Option<String>,
    /// Dataset split to train on.
    #[arg(long)]
    pub split: Option<String>,
    /// Local directory for parquet / image-folder sources.
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
    /// Download cache for hub shards.
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,
    /// Datasets-server base URL.
    #[arg(long)]
    pub endpoint: Option<String>,
    /// Square side length images are resized to.
    #[arg(long)]
    pub image_size: Option<u32>,
    /// Read at most this many records.
    #[arg(long)]
    pub limit: Option<usize>,
    /// Number of epochs.
    #[arg(long)]
    pub epochs: Option<usize>,
    /// Batch size.
    #[arg(long)]
    pub batch_size: Option<usize>,
    /// Adam learning rate.
    #[arg(long)]
    pub lr: Option<f64>,
    /// Fraction of each class held out for validation.
    #[arg(long)]
    pub val_ratio: Option<f32>,
    /// Seed for the split and per-epoch shuffling.
    #[arg(long)]
    pub seed: Option<u64>,
    /// Keep training order fixed across epochs.
    #[arg(long, default_value_t = false)]
    pub no_shuffle: bool,
    #[command(flatten)]
    pub backend: BackendArgs,
    #[command(flatten)]
    pub output: CheckpointArgs,
}

/// Built-in defaults < config file < CLI flags.
pub fn resolve_config(args: &TrainArgs) -> anyhow::Result<TrashnetConfig> {
    let mut cfg = args.config.load()?;
    let ds = &mut cfg.dataset;
    if let Some(source) = args.source {
        ds.source = source.into();
    }
    if let Some(id) = &args.dataset_id {
        ds.id = id.clone();
    }
    if let Some(split) = &args.split {
        ds.split = split.clone();
    }
    if let Some(dir) = &args.data_dir {
        ds.data_dir = Some(dir.clone());
    }
    if let Some(dir) = &args.cache_dir {
        ds.cache_dir = dir.clone();
    }
    if let Some(endpoint) = &args.endpoint {
        ds.endpoint = Some(endpoint.clone());
    }
    if let Some(size) = args.image_size {
        ds.image_size = size;
    }
    if args.limit.is_some() {
        ds.limit = args.limit;
    }
    let tr = &mut cfg.training;
    if let Some(epochs) = args.epochs {
        tr.epochs = epochs;
    }
    if let Some(bs) = args.batch_size {
        tr.batch_size = bs;
    }
    if let Some(lr) = args.lr {
        tr.learning_rate = lr;
    }
    if let Some(ratio) = args.val_ratio {
        tr.val_ratio = ratio;
    }
    if let Some(seed) = args.seed {
        tr.seed = seed;
    }
    if args.no_shuffle {
        tr.shuffle = false;
    }
    cfg.checkpoint = args.output.resolve(&cfg);
    cfg.warn_if_invalid();
    Ok(cfg)
}

#[derive(Debug, Clone)]
pub struct TrainOutcome {
    pub checkpoint: PathBuf,
    pub metadata: ModelMetadata,
}

pub fn run_train(args: TrainArgs) -> anyhow::Result<TrainOutcome> {
    validate_backend_choice(args.backend.backend)?;
    let cfg = resolve_config(&args)?;
    check_image_size(cfg.dataset.image_size as usize)?;
    let prepared = prepare_dataset(&cfg)?;
    let outcome = train_and_save(&cfg, &prepared, &cfg.checkpoint)?;
    println!("Saved checkpoint to {}", outcome.checkpoint.display());
    Ok(outcome)
}

/// Train on prepared arrays and persist the checkpoint plus metadata sidecar.
pub fn train_and_save(
    cfg: &TrashnetConfig,
    prepared: &PreparedDataset,
    ckpt_path: &Path,
) -> anyhow::Result<TrainOutcome> {
    let device = <ADBackend as Backend>::Device::default();
    let (model, history) = train_model(&cfg.training, prepared, &device)?;

    let shape = ModelShape {
        num_classes: prepared.num_classes(),
        image_size: prepared.image_size,
        channels: CHANNELS,
    };
    let mut metadata = ModelMetadata::new(shape, prepared.class_names.clone());
    metadata.training = Some(TrainingParams {
        dataset_id: cfg.dataset.id.clone(),
        split: cfg.dataset.split.clone(),
        epochs: cfg.training.epochs,
        batch_size: cfg.training.batch_size,
        learning_rate: cfg.training.learning_rate,
        val_ratio: cfg.training.val_ratio,
        seed: cfg.training.seed,
        train_samples: prepared.train.len(),
        val_samples: prepared.val.len(),
        skipped_records: prepared.report.skipped(),
    });
    metadata.history = history;

    let (checkpoint, metadata) = save_checkpoint(&model.valid(), metadata, ckpt_path)?;
    Ok(TrainOutcome {
        checkpoint,
        metadata,
    })
}

/// Fit a fresh network with Adam and cross-entropy, validating after each epoch.
pub fn train_model(
    settings: &TrainingSettings,
    prepared: &PreparedDataset,
    device: &<ADBackend as Backend>::Device,
) -> anyhow::Result<(TrashCnn<ADBackend>, Vec<EpochMetrics>)> {
    let num_classes = prepared.num_classes();
    let model_cfg = TrashCnnConfig::new(num_classes, prepared.image_size);
    ModelShape {
        num_classes,
        image_size: prepared.image_size,
        channels: CHANNELS,
    }
    .validate()?;
    log::info!("model summary:\n{}", model_cfg.describe());

    let mut model = TrashCnn::<ADBackend>::new(model_cfg, device);
    let mut optim = AdamConfig::new().init();
    let loss_fn = CrossEntropyLossConfig::new().init(device);

    let batch_size = settings.batch_size.max(1);
    let mut batches = BatchIter::new(
        prepared.train.clone(),
        batch_size,
        settings.shuffle,
        Some(settings.seed),
    );
    let mut history = Vec::with_capacity(settings.epochs);
    for epoch in 0..settings.epochs {
        batches.reset(epoch);
        let mut loss_sum = 0.0f64;
        let mut correct = 0usize;
        let mut seen = 0usize;
        for idx in batches.by_ref() {
            let batch = make_batch::<ADBackend>(&prepared.data, &idx, device);
            let logits = model.forward(batch.images);
            let loss = loss_fn.forward(logits.clone(), batch.targets.clone());

            correct += count_correct(logits.detach(), batch.targets)?;
            loss_sum += scalar(loss.clone().detach())? as f64 * idx.len() as f64;
            seen += idx.len();

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(settings.learning_rate, model, grads);
        }
        let denom = seen.max(1) as f64;
        let loss = (loss_sum / denom) as f32;
        let accuracy = (correct as f64 / denom) as f32;

        let val = if prepared.val.is_empty() {
            None
        } else {
            Some(evaluate(
                &model.valid(),
                &prepared.data,
                &prepared.val,
                batch_size,
                device,
            )?)
        };
        match val {
            Some(v) => log::info!(
                "epoch {}/{}: loss={loss:.4} accuracy={accuracy:.4} val_loss={:.4} val_accuracy={:.4}",
                epoch + 1,
                settings.epochs,
                v.loss,
                v.accuracy
            ),
            None => log::info!(
                "epoch {}/{}: loss={loss:.4} accuracy={accuracy:.4}",
                epoch + 1,
                settings.epochs
            ),
        }
        history.push(EpochMetrics {
            epoch: epoch + 1,
            loss,
            accuracy,
            val_loss: val.map(|v| v.loss),
            val_accuracy: val.map(|v| v.accuracy),
        });
    }
    Ok((model, history))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalMetrics {
    pub loss: f32,
    pub accuracy: f32,
}

/// Mean cross-entropy and accuracy over `indices`, without gradients.
pub fn evaluate<B: Backend>(
    model: &TrashCnn<B>,
    data: &LabeledArrays,
    indices: &[usize],
    batch_size: usize,
    device: &B::Device,
) -> anyhow::Result<EvalMetrics> {
    let loss_fn = CrossEntropyLossConfig::new().init(device);
    let mut loss_sum = 0.0f64;
    let mut correct = 0usize;
    for chunk in indices.chunks(batch_size.max(1)) {
        let batch = make_batch::<B>(data, chunk, device);
        let logits = model.forward(batch.images);
        let loss = loss_fn.forward(logits.clone(), batch.targets.clone());
        loss_sum += scalar(loss)? as f64 * chunk.len() as f64;
        correct += count_correct(logits, batch.targets)?;
    }
    let denom = indices.len().max(1) as f64;
    Ok(EvalMetrics {
        loss: (loss_sum / denom) as f32,
        accuracy: (correct as f64 / denom) as f32,
    })
}

/// Number of rows whose argmax matches the target class.
pub fn count_correct<B: Backend>(
    logits: Tensor<B, 2>,
    targets: Tensor<B, 1, Int>,
) -> anyhow::Result<usize> {
    let [batch, _] = logits.dims();
    let preds = logits.argmax(1).reshape([batch]);
    let hits = preds
        .equal(targets)
        .int()
        .sum()
        .into_data()
        .iter::<i64>()
        .next()
        .ok_or_else(|| anyhow::anyhow!("empty accuracy tensor"))?;
    Ok(hits as usize)
}

fn scalar<B: Backend, const D: usize>(t: Tensor<B, D>) -> anyhow::Result<f32> {
    t.into_data()
        .to_vec::<f32>()
        .map_err(|e| anyhow::anyhow!("reading scalar tensor: {e:?}"))?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("empty scalar tensor"))
}
