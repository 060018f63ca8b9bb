//! Fetching dataset parquet shards from the Hugging Face datasets server.

use crate::types::{DatasetResult, TrashDatasetError};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_DATASET_ID: &str = "garythung/trashnet";
pub const DEFAULT_SPLIT: &str = "train";
pub const DEFAULT_ENDPOINT: &str = "https://datasets-server.huggingface.co";
const DEFAULT_CONFIG: &str = "default";
const DOWNLOAD_TIMEOUT_SECS: u64 = 600;

/// One parquet shard as listed by the datasets server.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ParquetFile {
    pub dataset: String,
    pub config: String,
    pub split: String,
    pub url: String,
    pub filename: String,
    pub size: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ParquetListing {
    #[serde(default)]
    parquet_files: Vec<ParquetFile>,
}

/// Pick the shards for `split`, preferring the `default` config when present.
pub fn select_split_files(files: Vec<ParquetFile>, split: &str) -> Vec<ParquetFile> {
    let in_split: Vec<ParquetFile> = files.into_iter().filter(|f| f.split == split).collect();
    let has_default = in_split.iter().any(|f| f.config == DEFAULT_CONFIG);
    let mut selected: Vec<ParquetFile> = in_split
        .into_iter()
        .filter(|f| !has_default || f.config == DEFAULT_CONFIG)
        .collect();
    selected.sort_by(|a, b| (&a.config, &a.filename).cmp(&(&b.config, &b.filename)));
    selected
}

/// Parse a `/parquet` listing response body.
pub fn parse_listing(body: &str, url: &str) -> DatasetResult<Vec<ParquetFile>> {
    let listing: ParquetListing =
        serde_json::from_str(body).map_err(|e| TrashDatasetError::Json {
            url: url.to_string(),
            source: e,
        })?;
    Ok(listing.parquet_files)
}

/// Cache location for a shard: `<cache>/<dataset with / as __>/<config>/<split>/<file>`.
pub fn cache_path(cache_dir: &Path, file: &ParquetFile) -> PathBuf {
    cache_dir
        .join(file.dataset.replace('/', "__"))
        .join(&file.config)
        .join(&file.split)
        .join(&file.filename)
}

pub struct HubClient {
    client: reqwest::blocking::Client,
    endpoint: String,
    token: Option<String>,
}

impl HubClient {
    pub fn new(endpoint: impl Into<String>, token: Option<String>) -> DatasetResult<Self> {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
            .build()
            .map_err(|e| TrashDatasetError::Http {
                url: endpoint.clone(),
                source: e,
            })?;
        Ok(Self {
            client,
            endpoint,
            token,
        })
    }

    /// Build from `HF_ENDPOINT` / `HF_TOKEN`, defaulting to the public datasets server.
    pub fn from_env() -> DatasetResult<Self> {
        let endpoint = std::env::var("HF_ENDPOINT")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let token = std::env::var("HF_TOKEN")
            .ok()
            .filter(|s| !s.trim().is_empty());
        Self::new(endpoint, token)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn get(&self, url: &str) -> DatasetResult<reqwest::blocking::Response> {
        let mut req = self.client.get(url);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        req.send()
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| TrashDatasetError::Http {
                url: url.to_string(),
                source: e,
            })
    }

    pub fn list_parquet_files(
        &self,
        dataset_id: &str,
        split: &str,
    ) -> DatasetResult<Vec<ParquetFile>> {
        let url = format!("{}/parquet?dataset={}", self.endpoint, dataset_id);
        log::debug!("listing parquet shards from {url}");
        let body = self
            .get(&url)?
            .text()
            .map_err(|e| TrashDatasetError::Http {
                url: url.clone(),
                source: e,
            })?;
        let files = parse_listing(&body, &url)?;
        Ok(select_split_files(files, split))
    }

    /// Download a shard into the cache, reusing a complete cached copy.
    pub fn download(&self, file: &ParquetFile, cache_dir: &Path) -> DatasetResult<PathBuf> {
        let dest = cache_path(cache_dir, file);
        if let Ok(meta) = fs::metadata(&dest) {
            let complete = file.size.map(|s| s == meta.len()).unwrap_or(true);
            if complete {
                log::info!("using cached {}", dest.display());
                return Ok(dest);
            }
            log::warn!(
                "cached {} has {} bytes, listing says {:?}; downloading again",
                dest.display(),
                meta.len(),
                file.size
            );
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| TrashDatasetError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        log::info!("downloading {} -> {}", file.url, dest.display());
        let part = dest.with_extension("parquet.part");
        let mut resp = self.get(&file.url)?;
        let mut out = fs::File::create(&part).map_err(|e| TrashDatasetError::Io {
            path: part.clone(),
            source: e,
        })?;
        resp.copy_to(&mut out).map_err(|e| TrashDatasetError::Http {
            url: file.url.clone(),
            source: e,
        })?;
        drop(out);
        fs::rename(&part, &dest).map_err(|e| TrashDatasetError::Io {
            path: dest.clone(),
            source: e,
        })?;
        Ok(dest)
    }

    /// List and download every shard of `split`, returning local paths in listing order.
    pub fn fetch_split(
        &self,
        dataset_id: &str,
        split: &str,
        cache_dir: &Path,
    ) -> DatasetResult<Vec<PathBuf>> {
        let files = self.list_parquet_files(dataset_id, split)?;
        if files.is_empty() {
            return Err(TrashDatasetError::EmptyListing {
                dataset: dataset_id.to_string(),
                split: split.to_string(),
            });
        }
        log::info!(
            "dataset {dataset_id} split {split}: {} parquet shard(s)",
            files.len()
        );
        files
            .iter()
            .map(|f| self.download(f, cache_dir))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"{
        "parquet_files": [
            {"dataset": "garythung/trashnet", "config": "default", "split": "train",
             "url": "https://example.invalid/default/train/0001.parquet", "filename": "0001.parquet", "size": 20},
            {"dataset": "garythung/trashnet", "config": "default", "split": "train",
             "url": "https://example.invalid/default/train/0000.parquet", "filename": "0000.parquet", "size": 10},
            {"dataset": "garythung/trashnet", "config": "other", "split": "train",
             "url": "https://example.invalid/other/train/0000.parquet", "filename": "0000.parquet", "size": 5},
            {"dataset": "garythung/trashnet", "config": "default", "split": "test",
             "url": "https://example.invalid/default/test/0000.parquet", "filename": "0000.parquet"}
        ],
        "pending": [],
        "failed": [],
        "partial": false
    }"#;

    #[test]
    fn selects_default_config_in_filename_order() {
        let files = parse_listing(LISTING, "test").unwrap();
        assert_eq!(files.len(), 4);
        let train = select_split_files(files, "train");
        let names: Vec<_> = train
            .iter()
            .map(|f| (f.config.as_str(), f.filename.as_str()))
            .collect();
        assert_eq!(
            names,
            vec![("default", "0000.parquet"), ("default", "0001.parquet")]
        );
    }

    #[test]
    fn falls_back_to_other_configs() {
        let files = parse_listing(LISTING, "test").unwrap();
        let only_other: Vec<_> = files.into_iter().filter(|f| f.config == "other").collect();
        let train = select_split_files(only_other, "train");
        assert_eq!(train.len(), 1);
        assert_eq!(train[0].config, "other");
    }

    #[test]
    fn missing_size_parses_as_none() {
        let files = parse_listing(LISTING, "test").unwrap();
        let test_split = select_split_files(files, "test");
        assert_eq!(test_split[0].size, None);
    }

    #[test]
    fn cache_path_is_namespaced() {
        let files = parse_listing(LISTING, "test").unwrap();
        let p = cache_path(Path::new("cache"), &files[0]);
        assert_eq!(
            p,
            Path::new("cache/garythung__trashnet/default/train/0001.parquet")
        );
    }

    #[test]
    fn cached_file_short_circuits_download() {
        let tmp = tempfile::tempdir().unwrap();
        let file = ParquetFile {
            dataset: "a/b".into(),
            config: "default".into(),
            split: "train".into(),
            url: "http://127.0.0.1:9/never".into(),
            filename: "0000.parquet".into(),
            size: Some(3),
        };
        let dest = cache_path(tmp.path(), &file);
        fs::create_dir_all(dest.parent().unwrap()).unwrap();
        fs::write(&dest, b"abc").unwrap();
        let client = HubClient::new("http://127.0.0.1:9", None).unwrap();
        assert_eq!(client.download(&file, tmp.path()).unwrap(), dest);
    }

    #[test]
    fn garbage_listing_is_json_error() {
        let err = parse_listing("not json", "u").unwrap_err();
        assert!(matches!(err, TrashDatasetError::Json { .. }));
    }
}
