//! Local durable sink for registrations the profile API did not accept
//!
//! One JSON file per registration, named by wall-clock timestamp. Files are
//! created exclusively so two registrations in the same instant never overwrite.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use crate::api::MenteeSetup;

const FILE_PREFIX: &str = "registration_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackRecord {
    pub phone_number: String,
    pub recorded_at: DateTime<Utc>,
    /// Why the profile API call failed
    pub error: String,
    pub profile: MenteeSetup,
}

#[derive(Debug, Clone)]
pub struct FallbackSink {
    dir: PathBuf,
}

impl FallbackSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write a record, returning the file it landed in
    pub async fn write(&self, record: &FallbackRecord) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await.with_context(|| {
            format!("Failed to create fallback directory: {}", self.dir.display())
        })?;

        let json =
            serde_json::to_vec_pretty(record).context("Failed to serialize fallback record")?;
        let stamp = Local::now().format("%Y%m%d_%H%M%S_%6f").to_string();

        let mut attempt = 0u32;
        loop {
            let name = if attempt == 0 {
                format!("{}{}.json", FILE_PREFIX, stamp)
            } else {
                format!("{}{}_{}.json", FILE_PREFIX, stamp, attempt)
            };
            let path = self.dir.join(name);

            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(mut file) => {
                    file.write_all(&json).await.with_context(|| {
                        format!("Failed to write fallback file: {}", path.display())
                    })?;
                    file.flush().await?;
                    return Ok(path);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!("Failed to create fallback file: {}", path.display())
                    });
                }
            }
        }
    }

    /// Fallback files waiting to be replayed, oldest first
    pub async fn pending(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(files),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read fallback directory: {}", self.dir.display())
                });
            }
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_record = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(FILE_PREFIX) && n.ends_with(".json"));
            if is_record {
                files.push(path);
            }
        }

        files.sort();
        Ok(files)
    }

    pub async fn read(&self, path: &Path) -> Result<FallbackRecord> {
        let raw = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read fallback file: {}", path.display()))?;
        serde_json::from_slice(&raw)
            .with_context(|| format!("Invalid fallback file: {}", path.display()))
    }

    pub async fn remove(&self, path: &Path) -> Result<()> {
        tokio::fs::remove_file(path)
            .await
            .with_context(|| format!("Failed to remove fallback file: {}", path.display()))
    }
}

#[cfg(test)]
pub(crate) fn scratch_dir() -> PathBuf {
    std::env::temp_dir().join(format!("mentor-ussd-fallback-{}", uuid::Uuid::new_v4()))
}
