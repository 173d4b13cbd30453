//! Flat-file storage for uploads and converted PDFs
//!
//! Every upload is written under a fresh UUID (`<uuid>.<ext>`); the name the
//! client sent is kept only as metadata. Conversions of an upload land in the
//! convert directory as `<uuid>.pdf`. Nothing is ever deleted.
//!
//! Each upload's metadata is also written to `<index dir>/<uuid>.json`, kept
//! outside the served directories, and the in-memory index is rebuilt from
//! those files when the store is opened.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Extensions that must go through the converter before printing or preview
pub const OFFICE_EXTENSIONS: [&str; 2] = ["doc", "docx"];

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Metadata for one stored upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRecord {
    pub id: Uuid,
    /// Filename as sent by the client
    pub original_name: String,
    /// Lowercased extension without the dot
    pub extension: String,
    /// Name of the file inside the upload directory
    pub stored_name: String,
    pub size: u64,
    /// Hex SHA-256 of the content
    pub sha256: String,
    pub uploaded_at: DateTime<Utc>,
}

impl UploadRecord {
    /// Whether this upload needs conversion before it can be printed as PDF
    pub fn is_office_document(&self) -> bool {
        OFFICE_EXTENSIONS.contains(&self.extension.as_str())
    }

    pub fn is_pdf(&self) -> bool {
        self.extension == "pdf"
    }

    /// File name the converter produces for this upload
    pub fn converted_name(&self) -> String {
        format!("{}.pdf", self.id)
    }
}

/// Lowercased suffix after the last `.`, or `None` if there is no dot
pub fn extension_of(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

/// Upload and convert directories plus an index of upload metadata
#[derive(Debug, Clone)]
pub struct FileStore {
    upload_dir: PathBuf,
    convert_dir: PathBuf,
    index_dir: PathBuf,
    index: Arc<DashMap<Uuid, UploadRecord>>,
}

impl FileStore {
    pub fn new(
        upload_dir: impl Into<PathBuf>,
        convert_dir: impl Into<PathBuf>,
        index_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            convert_dir: convert_dir.into(),
            index_dir: index_dir.into(),
            index: Arc::new(DashMap::new()),
        }
    }

    /// Create the directories if they do not exist and load existing records
    pub fn ensure_dirs(&self) -> Result<(), StoreError> {
        for dir in [&self.upload_dir, &self.convert_dir, &self.index_dir] {
            std::fs::create_dir_all(dir).map_err(|source| StoreError::CreateDir {
                path: dir.clone(),
                source,
            })?;
        }
        let loaded = self.load_index()?;
        if loaded > 0 {
            tracing::info!("Loaded {} upload records from {}", loaded, self.index_dir.display());
        }
        Ok(())
    }

    /// Read every metadata file in the index directory
    ///
    /// Unreadable records, and records whose upload is gone, are skipped.
    pub fn load_index(&self) -> Result<usize, StoreError> {
        let mut loaded = 0;
        for entry in std::fs::read_dir(&self.index_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let record = match read_record(&path) {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!("Skipping upload record {}: {}", path.display(), e);
                    continue;
                }
            };
            if !self.upload_path(&record).is_file() {
                tracing::debug!("Upload {} no longer on disk", record.stored_name);
                continue;
            }
            self.index.insert(record.id, record);
            loaded += 1;
        }
        Ok(loaded)
    }

    pub fn index_dir(&self) -> &Path {
        &self.index_dir
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn convert_dir(&self) -> &Path {
        &self.convert_dir
    }

    /// Write upload bytes under a new id and record its metadata
    pub async fn save_upload(
        &self,
        original_name: &str,
        extension: &str,
        data: &[u8],
    ) -> Result<UploadRecord, StoreError> {
        let id = Uuid::new_v4();
        let extension = extension.to_ascii_lowercase();
        let stored_name = format!("{}.{}", id, extension);
        let path = self.upload_dir.join(&stored_name);

        tokio::fs::write(&path, data).await?;

        let record = UploadRecord {
            id,
            original_name: original_name.to_string(),
            extension,
            stored_name,
            size: data.len() as u64,
            sha256: sha256_hex(data),
            uploaded_at: Utc::now(),
        };
        let meta = serde_json::to_vec_pretty(&record)?;
        tokio::fs::write(self.index_dir.join(format!("{}.json", id)), meta).await?;

        tracing::debug!(
            "Stored upload {} ({} bytes) as {}",
            record.original_name,
            record.size,
            path.display()
        );
        self.index.insert(id, record.clone());
        Ok(record)
    }

    /// Path of the stored upload
    pub fn upload_path(&self, record: &UploadRecord) -> PathBuf {
        self.upload_dir.join(&record.stored_name)
    }

    /// Path where the converted PDF for this upload is expected
    pub fn converted_path(&self, record: &UploadRecord) -> PathBuf {
        self.convert_dir.join(record.converted_name())
    }

    /// Metadata of one upload
    pub fn get(&self, id: Uuid) -> Option<UploadRecord> {
        self.index.get(&id).map(|entry| entry.value().clone())
    }

    /// All upload records, newest first
    pub fn list(&self) -> Vec<UploadRecord> {
        let mut records: Vec<UploadRecord> =
            self.index.iter().map(|entry| entry.value().clone()).collect();
        records.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        records
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

fn read_record(path: &Path) -> Result<UploadRecord, StoreError> {
    let bytes = std::fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
