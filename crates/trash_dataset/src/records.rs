//! Reading raw dataset rows from parquet shards or an image-folder tree.

use crate::hub::HubClient;
use crate::types::{DatasetResult, ImagePayload, RawRecord, SourceKind, TrashDatasetError};
use arrow_array::cast::AsArray;
use arrow_array::types::{
    Int16Type, Int32Type, Int64Type, Int8Type, UInt16Type, UInt32Type, UInt64Type, UInt8Type,
};
use arrow_array::{Array, ArrayRef};
use arrow_schema::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::fs;
use std::path::{Path, PathBuf};

const IMAGE_COLUMN: &str = "image";
const LABEL_COLUMN: &str = "label";
const IMAGE_EXTENSIONS: [&str; 7] = ["jpg", "jpeg", "png", "bmp", "gif", "webp", "tiff"];

/// Everything needed to locate the training records.
#[derive(Debug, Clone)]
pub struct SourceSpec {
    pub kind: SourceKind,
    pub dataset_id: String,
    pub split: String,
    /// Local root for `Parquet` and `ImageFolder` sources.
    pub data_dir: Option<PathBuf>,
    /// Download cache for `Hub` sources.
    pub cache_dir: PathBuf,
    /// Datasets-server base URL; `None` reads `HF_ENDPOINT` or uses the public server.
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct LoadedRecords {
    pub records: Vec<RawRecord>,
    /// Class names when the source carries them (image folders do).
    pub class_names: Option<Vec<String>>,
}

pub fn load_records(spec: &SourceSpec) -> DatasetResult<LoadedRecords> {
    match spec.kind {
        SourceKind::Hub => {
            let client = match &spec.endpoint {
                Some(endpoint) => HubClient::new(
                    endpoint.clone(),
                    std::env::var("HF_TOKEN").ok().filter(|s| !s.trim().is_empty()),
                )?,
                None => HubClient::from_env()?,
            };
            let shards = client.fetch_split(&spec.dataset_id, &spec.split, &spec.cache_dir)?;
            let mut records = Vec::new();
            for shard in &shards {
                records.extend(read_parquet_records(shard)?);
            }
            Ok(LoadedRecords {
                records,
                class_names: None,
            })
        }
        SourceKind::Parquet => {
            let dir = require_data_dir(spec)?;
            Ok(LoadedRecords {
                records: read_parquet_dir(dir)?,
                class_names: None,
            })
        }
        SourceKind::ImageFolder => {
            let dir = require_data_dir(spec)?;
            let (records, names) = read_image_folder(dir)?;
            Ok(LoadedRecords {
                records,
                class_names: Some(names),
            })
        }
    }
}

fn require_data_dir(spec: &SourceSpec) -> DatasetResult<&Path> {
    spec.data_dir.as_deref().ok_or_else(|| {
        TrashDatasetError::Other(format!("source {:?} requires a data directory", spec.kind))
    })
}

/// Read every row of a parquet shard. Unreadable cells become `None`, not errors.
pub fn read_parquet_records(path: &Path) -> DatasetResult<Vec<RawRecord>> {
    let file = fs::File::open(path).map_err(|e| TrashDatasetError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .and_then(|b| b.build())
        .map_err(|e| TrashDatasetError::Parquet {
            path: path.to_path_buf(),
            source: e,
        })?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));

    let mut records = Vec::new();
    for batch in reader {
        let batch = batch.map_err(|e| TrashDatasetError::Arrow {
            path: path.to_path_buf(),
            source: e,
        })?;
        let image_col = batch.column_by_name(IMAGE_COLUMN);
        let label_col = batch.column_by_name(LABEL_COLUMN);
        for row in 0..batch.num_rows() {
            records.push(RawRecord {
                image: image_col.and_then(|c| image_at(c, row, base)),
                label: label_col.and_then(|c| label_at(c, row)),
            });
        }
    }
    log::debug!("read {} rows from {}", records.len(), path.display());
    Ok(records)
}

/// Read all `*.parquet` files in `dir`, in file-name order.
pub fn read_parquet_dir(dir: &Path) -> DatasetResult<Vec<RawRecord>> {
    let entries = fs::read_dir(dir).map_err(|e| TrashDatasetError::Io {
        path: dir.to_path_buf(),
        source: e,
    })?;
    let mut shards: Vec<PathBuf> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("parquet"))
        .collect();
    shards.sort();
    if shards.is_empty() {
        log::warn!("no parquet files under {}", dir.display());
    }
    let mut records = Vec::new();
    for shard in &shards {
        records.extend(read_parquet_records(shard)?);
    }
    Ok(records)
}

/// Index a `root/<class>/<image>` tree. Classes are the sorted subdirectory names.
pub fn read_image_folder(root: &Path) -> DatasetResult<(Vec<RawRecord>, Vec<String>)> {
    let entries = fs::read_dir(root).map_err(|e| TrashDatasetError::Io {
        path: root.to_path_buf(),
        source: e,
    })?;
    let mut class_dirs: Vec<PathBuf> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_dir())
        .collect();
    class_dirs.sort();

    let mut records = Vec::new();
    let mut names = Vec::with_capacity(class_dirs.len());
    for (label, dir) in class_dirs.iter().enumerate() {
        let name = dir
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        let files = fs::read_dir(dir).map_err(|e| TrashDatasetError::Io {
            path: dir.clone(),
            source: e,
        })?;
        let mut images: Vec<PathBuf> = files
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && has_image_extension(p))
            .collect();
        images.sort();
        log::debug!("class {label} ({name}): {} images", images.len());
        records.extend(images.into_iter().map(|p| RawRecord {
            image: Some(ImagePayload::Path(p)),
            label: Some(label as i64),
        }));
        names.push(name);
    }
    Ok((records, names))
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

fn image_at(col: &ArrayRef, row: usize, base: &Path) -> Option<ImagePayload> {
    if col.is_null(row) {
        return None;
    }
    match col.data_type() {
        DataType::Struct(_) => {
            let s = col.as_struct();
            if let Some(bytes) = s.column_by_name("bytes").and_then(|c| binary_at(c, row)) {
                return Some(ImagePayload::Bytes(bytes));
            }
            s.column_by_name("path")
                .and_then(|c| string_at(c, row))
                .filter(|p| !p.trim().is_empty())
                .map(|p| ImagePayload::Path(base.join(p)))
        }
        DataType::Binary | DataType::LargeBinary => binary_at(col, row).map(ImagePayload::Bytes),
        _ => None,
    }
}

fn binary_at(col: &ArrayRef, row: usize) -> Option<Vec<u8>> {
    if col.is_null(row) {
        return None;
    }
    match col.data_type() {
        DataType::Binary => Some(col.as_binary::<i32>().value(row).to_vec()),
        DataType::LargeBinary => Some(col.as_binary::<i64>().value(row).to_vec()),
        _ => None,
    }
}

fn string_at(col: &ArrayRef, row: usize) -> Option<String> {
    if col.is_null(row) {
        return None;
    }
    match col.data_type() {
        DataType::Utf8 => Some(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => Some(col.as_string::<i64>().value(row).to_string()),
        _ => None,
    }
}

fn label_at(col: &ArrayRef, row: usize) -> Option<i64> {
    if col.is_null(row) {
        return None;
    }
    let value = match col.data_type() {
        DataType::Int8 => col.as_primitive::<Int8Type>().value(row) as i64,
        DataType::Int16 => col.as_primitive::<Int16Type>().value(row) as i64,
        DataType::Int32 => col.as_primitive::<Int32Type>().value(row) as i64,
        DataType::Int64 => col.as_primitive::<Int64Type>().value(row),
        DataType::UInt8 => col.as_primitive::<UInt8Type>().value(row) as i64,
        DataType::UInt16 => col.as_primitive::<UInt16Type>().value(row) as i64,
        DataType::UInt32 => col.as_primitive::<UInt32Type>().value(row) as i64,
        DataType::UInt64 => i64::try_from(col.as_primitive::<UInt64Type>().value(row)).ok()?,
        _ => return None,
    };
    Some(value)
}
