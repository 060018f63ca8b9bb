use cli_support::TrashnetConfig;
use data_contracts::default_class_names;
use trash_dataset::{
    count_labels, dataset_to_arrays, load_records, split_stratified, ConversionReport,
    LabeledArrays, SourceSpec,
};

/// Converted arrays plus the train/val partition used for one training run.
#[derive(Debug, Clone)]
pub struct PreparedDataset {
    pub data: LabeledArrays,
    pub train: Vec<usize>,
    pub val: Vec<usize>,
    pub class_names: Vec<String>,
    pub report: ConversionReport,
    pub image_size: usize,
}

impl PreparedDataset {
    pub fn num_classes(&self) -> usize {
        self.data.num_classes()
    }

    /// Split already-converted arrays. Errors on an empty set.
    pub fn from_arrays(
        data: LabeledArrays,
        class_names: Option<Vec<String>>,
        report: ConversionReport,
        val_ratio: f32,
        seed: u64,
    ) -> anyhow::Result<Self> {
        if data.is_empty() {
            anyhow::bail!(
                "no usable images after conversion ({} records, {} skipped)",
                report.total,
                report.skipped()
            );
        }
        if data.images.height != data.images.width {
            anyhow::bail!(
                "expected square images, got {}x{}",
                data.images.width,
                data.images.height
            );
        }
        let num_classes = data.num_classes();
        let class_names = match class_names {
            Some(mut names) if names.len() >= num_classes => {
                names.truncate(num_classes);
                names
            }
            Some(names) => {
                log::warn!(
                    "source lists {} class names but labels reach {num_classes}; using defaults",
                    names.len()
                );
                default_class_names(num_classes)
            }
            None => default_class_names(num_classes),
        };
        let (train, val) = split_stratified(&data.labels, val_ratio, seed);
        log::info!(
            "split: train={} val={} (val_ratio={val_ratio}, seed={seed})",
            train.len(),
            val.len()
        );
        for (label, count) in count_labels(&data.labels, &train) {
            log::debug!("train class {label}: {count}");
        }
        let image_size = data.images.height;
        Ok(Self {
            data,
            train,
            val,
            class_names,
            report,
            image_size,
        })
    }
}

pub fn source_spec(cfg: &TrashnetConfig) -> SourceSpec {
    SourceSpec {
        kind: cfg.dataset.source,
        dataset_id: cfg.dataset.id.clone(),
        split: cfg.dataset.split.clone(),
        data_dir: cfg.dataset.data_dir.clone(),
        cache_dir: cfg.dataset.cache_dir.clone(),
        endpoint: cfg.dataset.endpoint.clone(),
    }
}

/// Fetch records, convert them to arrays, and split train/val.
pub fn prepare_dataset(cfg: &TrashnetConfig) -> anyhow::Result<PreparedDataset> {
    let spec = source_spec(cfg);
    log::info!(
        "loading dataset {} (source {:?}, split {})",
        spec.dataset_id,
        spec.kind,
        spec.split
    );
    let mut loaded = load_records(&spec)
        .map_err(|e| anyhow::anyhow!("failed to load dataset {}: {e}", spec.dataset_id))?;
    log::info!("dataset loaded: {} items", loaded.records.len());
    if let Some(limit) = cfg.dataset.limit {
        if loaded.records.len() > limit {
            log::info!("limiting to first {limit} records");
            loaded.records.truncate(limit);
        }
    }

    let size = cfg.dataset.image_size;
    let (data, report) = dataset_to_arrays(&loaded.records, (size, size))?;
    log::info!(
        "shape: images {:?} labels [{}]",
        data.images.shape(),
        data.labels.len()
    );
    PreparedDataset::from_arrays(
        data,
        loaded.class_names,
        report,
        cfg.training.val_ratio,
        cfg.training.seed,
    )
}
