use burn::backend::Autodiff;
use burn::module::AutodiffModule;
use burn_ndarray::NdArray;
use clap::Parser;
use cli_support::config::TrainingSettings;
use image::{Rgb, RgbImage};
use std::fs;
use std::path::Path;
use trash_dataset::{ConversionReport, ImageArray, LabeledArrays, CHANNELS};
use training::util::{evaluate, train_model};
use training::{load_checkpoint, PreparedDataset, TrainArgs};

type B = NdArray<f32>;
type AD = Autodiff<B>;

const SIZE: usize = 24;

/// Two flat-colored classes, `per_class` images each.
fn synthetic_arrays(per_class: usize) -> LabeledArrays {
    let mut data = Vec::new();
    let mut labels = Vec::new();
    for (label, value) in [(0i64, 20u8), (1i64, 230u8)] {
        for i in 0..per_class {
            let v = value.saturating_add(i as u8);
            data.extend(std::iter::repeat(v).take(SIZE * SIZE * CHANNELS));
            labels.push(label);
        }
    }
    LabeledArrays {
        images: ImageArray {
            data,
            len: labels.len(),
            height: SIZE,
            width: SIZE,
        },
        labels,
    }
}

fn settings(epochs: usize) -> TrainingSettings {
    TrainingSettings {
        batch_size: 4,
        epochs,
        learning_rate: 1e-3,
        val_ratio: 0.25,
        seed: 42,
        shuffle: true,
    }
}

fn write_image_folder(root: &Path) {
    for (class, color) in [("glass", [10u8, 200, 10]), ("paper", [240, 240, 240])] {
        let dir = root.join(class);
        fs::create_dir_all(&dir).unwrap();
        for i in 0..4u8 {
            RgbImage::from_pixel(30, 20, Rgb([color[0], color[1], color[2].wrapping_add(i)]))
                .save(dir.join(format!("{class}_{i}.png")))
                .unwrap();
        }
    }
}

#[test]
fn prepared_dataset_splits_per_class() {
    let prepared = PreparedDataset::from_arrays(
        synthetic_arrays(4),
        None,
        ConversionReport::default(),
        0.25,
        42,
    )
    .unwrap();
    assert_eq!(prepared.num_classes(), 2);
    assert_eq!(prepared.image_size, SIZE);
    assert_eq!(prepared.train.len(), 6);
    assert_eq!(prepared.val.len(), 2);
    assert_eq!(prepared.class_names, vec!["cardboard", "glass"]);
}

#[test]
fn prepared_dataset_rejects_empty_input() {
    let empty = LabeledArrays {
        images: ImageArray::with_capacity(0, SIZE, SIZE),
        labels: Vec::new(),
    };
    let report = ConversionReport {
        total: 3,
        missing_label: 3,
        ..Default::default()
    };
    let err = PreparedDataset::from_arrays(empty, None, report, 0.2, 42).unwrap_err();
    assert!(err.to_string().contains("no usable images"));
}

#[test]
fn train_one_epoch_records_history_and_metrics_in_range() {
    let prepared =
        PreparedDataset::from_arrays(synthetic_arrays(4), None, ConversionReport::default(), 0.25, 42)
            .unwrap();
    let device = <AD as burn::tensor::backend::Backend>::Device::default();
    let (model, history) = train_model(&settings(1), &prepared, &device).unwrap();

    assert_eq!(history.len(), 1);
    let epoch = &history[0];
    assert_eq!(epoch.epoch, 1);
    assert!(epoch.loss.is_finite() && epoch.loss > 0.0);
    assert!((0.0..=1.0).contains(&epoch.accuracy));
    assert!(epoch.val_loss.is_some());

    let metrics = evaluate(&model.valid(), &prepared.data, &prepared.val, 3, &device).unwrap();
    assert!(metrics.loss.is_finite());
    assert!((0.0..=1.0).contains(&metrics.accuracy));
}

#[test]
fn run_train_from_image_folder_writes_reloadable_checkpoint() {
    let tmp = tempfile::tempdir().unwrap();
    let data_dir = tmp.path().join("images");
    write_image_folder(&data_dir);
    // Extension is normalized to `.bin`.
    let requested = tmp.path().join("out").join("model.ckpt");

    let args = TrainArgs::parse_from([
        "train".to_string(),
        "--source".into(),
        "image-folder".into(),
        "--data-dir".into(),
        data_dir.display().to_string(),
        "--image-size".into(),
        SIZE.to_string(),
        "--epochs".into(),
        "1".into(),
        "--batch-size".into(),
        "4".into(),
        "--checkpoint".into(),
        requested.display().to_string(),
    ]);
    let outcome = training::run_train(args).unwrap();

    assert_eq!(outcome.checkpoint, tmp.path().join("out").join("model.bin"));
    assert!(outcome.checkpoint.exists());
    assert!(tmp.path().join("out").join("model.json").exists());
    assert_eq!(outcome.metadata.class_names, vec!["glass", "paper"]);
    assert_eq!(outcome.metadata.model.image_size, SIZE);
    let params = outcome.metadata.training.as_ref().unwrap();
    assert_eq!(params.train_samples + params.val_samples, 8);
    assert_eq!(params.skipped_records, 0);
    assert_eq!(outcome.metadata.history.len(), 1);

    let device = Default::default();
    let (model, metadata) = load_checkpoint::<B>(&outcome.checkpoint, &device).unwrap();
    assert_eq!(model.num_classes(), 2);
    assert_eq!(metadata.checkpoint_sha256, outcome.metadata.checkpoint_sha256);
}

#[test]
fn load_checkpoint_rejects_tampered_weights() {
    let tmp = tempfile::tempdir().unwrap();
    let prepared =
        PreparedDataset::from_arrays(synthetic_arrays(2), None, ConversionReport::default(), 0.0, 7)
            .unwrap();
    let cfg = cli_support::TrashnetConfig {
        training: settings(1),
        ..Default::default()
    };
    let outcome =
        training::train_and_save(&cfg, &prepared, &tmp.path().join("tiny.bin")).unwrap();

    let mut bytes = fs::read(&outcome.checkpoint).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xff;
    fs::write(&outcome.checkpoint, bytes).unwrap();

    let err = load_checkpoint::<B>(&outcome.checkpoint, &Default::default()).unwrap_err();
    assert!(err.to_string().contains("checksum mismatch"));
}

#[test]
fn load_checkpoint_missing_file_errors() {
    let tmp = tempfile::tempdir().unwrap();
    let err = load_checkpoint::<B>(&tmp.path().join("absent.bin"), &Default::default()).unwrap_err();
    assert!(err.to_string().contains("checkpoint not found"));
}

#[test]
fn undersized_images_rejected_before_loading() {
    let tmp = tempfile::tempdir().unwrap();
    let args = TrainArgs::parse_from([
        "train".to_string(),
        "--source".into(),
        "image-folder".into(),
        "--data-dir".into(),
        tmp.path().join("never-read").display().to_string(),
        "--image-size".into(),
        "8".into(),
    ]);
    let err = training::run_train(args).unwrap_err();
    assert!(err.to_string().contains("too small"), "{err}");
}

#[test]
fn config_file_then_flags_then_validation() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("custom.toml");
    fs::write(
        &path,
        "[dataset]\nsource = \"image_folder\"\n\n[training]\nepochs = 2\n\n[artifacts]\ncheckpoint = \"custom/model.bin\"\n",
    )
    .unwrap();
    let config = path.display().to_string();

    let args = TrainArgs::parse_from(["train", "--config", config.as_str()]);
    let cfg = training::resolve_config(&args).unwrap();
    assert_eq!(cfg.training.epochs, 2);
    assert_eq!(cfg.checkpoint, Path::new("custom/model.bin"));
    assert!(cfg.warnings().iter().any(|w| w.contains("data_dir")));

    let cfg = training::resolve_config(&TrainArgs::parse_from([
        "train",
        "--config",
        config.as_str(),
        "--data-dir",
        "imgs",
        "--epochs",
        "5",
    ]))
    .unwrap();
    assert_eq!(cfg.training.epochs, 5);
    assert!(cfg.warnings().is_empty());

    let missing = tmp.path().join("missing.toml").display().to_string();
    let args = TrainArgs::parse_from(["train", "--config", missing.as_str()]);
    assert!(training::resolve_config(&args).is_err());
}
