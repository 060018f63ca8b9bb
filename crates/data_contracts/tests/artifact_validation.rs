use data_contracts::artifact::{ModelMetadata, ModelShape, ValidationError};

fn shape(num_classes: usize) -> ModelShape {
    ModelShape {
        num_classes,
        image_size: 128,
        channels: 3,
    }
}

#[test]
fn class_name_count_must_match() {
    let meta = ModelMetadata::new(shape(6), vec!["glass".into(), "metal".into()]);
    let err = meta.validate().unwrap_err();
    assert!(matches!(
        err,
        ValidationError::ClassNameCount {
            names: 2,
            classes: 6
        }
    ));
}

#[test]
fn tiny_images_rejected() {
    let meta = ModelMetadata::new(
        ModelShape {
            num_classes: 2,
            image_size: 8,
            channels: 3,
        },
        Vec::new(),
    );
    assert!(matches!(
        meta.validate().unwrap_err(),
        ValidationError::ImageTooSmall(8)
    ));
}

#[test]
fn malformed_checksum_rejected() {
    let mut meta = ModelMetadata::new(shape(2), Vec::new());
    meta.checkpoint_sha256 = Some("abc".into());
    assert!(matches!(
        meta.validate().unwrap_err(),
        ValidationError::InvalidChecksum(_)
    ));
}

#[test]
fn sidecar_roundtrips_through_disk() {
    let tmp = tempfile::tempdir().unwrap();
    let ckpt = tmp.path().join("model.bin");
    let sidecar = ModelMetadata::sidecar_path(&ckpt);
    assert_eq!(sidecar, tmp.path().join("model.json"));

    let mut meta = ModelMetadata::new(
        shape(6),
        data_contracts::default_class_names(6),
    );
    meta.checkpoint_sha256 = Some("0".repeat(64));
    meta.save(&sidecar).unwrap();

    let loaded = ModelMetadata::load(&sidecar).unwrap();
    assert_eq!(loaded.model, meta.model);
    assert_eq!(loaded.class_names[1], "glass");
}

#[test]
fn missing_sidecar_is_io_error() {
    let tmp = tempfile::tempdir().unwrap();
    let err = ModelMetadata::load(&tmp.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, ValidationError::Io { .. }));
}
