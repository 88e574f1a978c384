//! On-disk index snapshot.
//!
//! One JSON document holding the embedding identity, per-source ingestion
//! times and every chunk with its embedding. Written to a temporary file
//! first and renamed into place, so readers never see a half-written file.

use crate::chunk::Chunk;
use crate::embeddings::EmbeddingIdentity;
use crate::types::SourceInfo;
use chrono::{DateTime, Utc};
use grounded_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedSnapshot {
    pub format_version: u32,
    pub identity: EmbeddingIdentity,
    pub created_at: DateTime<Utc>,
    pub sources: Vec<SourceInfo>,
    pub chunks: Vec<PersistedChunk>,
}

/// A chunk as stored: `{id, source, position, text, length, metadata, embedding}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedChunk {
    #[serde(flatten)]
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "snapshot.json".into());
    name.push(".tmp");
    path.with_file_name(name)
}

/// Serialize `snapshot` to `path`, replacing any previous file.
pub fn write_snapshot(path: &Path, snapshot: &PersistedSnapshot) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| {
                AppError::Index(format!("Failed to create index directory {:?}: {}", parent, e))
            })?;
        }
    }

    let json = serde_json::to_vec(snapshot)?;
    let tmp = temp_path(path);

    fs::write(&tmp, json)
        .map_err(|e| AppError::Index(format!("Failed to write snapshot {:?}: {}", tmp, e)))?;
    fs::rename(&tmp, path).map_err(|e| {
        AppError::Index(format!("Failed to move snapshot into place at {:?}: {}", path, e))
    })?;

    tracing::debug!(
        "Wrote snapshot with {} chunks to {:?}",
        snapshot.chunks.len(),
        path
    );
    Ok(())
}

/// Read a snapshot written by [`write_snapshot`].
pub fn read_snapshot(path: &Path) -> AppResult<PersistedSnapshot> {
    let bytes = fs::read(path)
        .map_err(|e| AppError::Index(format!("Failed to read snapshot {:?}: {}", path, e)))?;

    let snapshot: PersistedSnapshot = serde_json::from_slice(&bytes)
        .map_err(|e| AppError::Index(format!("Corrupt snapshot {:?}: {}", path, e)))?;

    if snapshot.format_version != SNAPSHOT_FORMAT_VERSION {
        return Err(AppError::Index(format!(
            "Unsupported snapshot format version {} in {:?} (expected {})",
            snapshot.format_version, path, SNAPSHOT_FORMAT_VERSION
        )));
    }

    Ok(snapshot)
}
