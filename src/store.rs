use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::guards::decode_checkpoint;
use crate::model::RecoveryCheckpoint;
use crate::retention::{MAX_RECOVERY_ENTRIES, clamp_retention_limit};
use crate::workbook::SheetIdentity;

pub const STORE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreDocument {
    version: u32,
    #[serde(default)]
    entries: Vec<Value>,
    #[serde(default)]
    sheet_ids: Vec<SheetIdentity>,
}

/// Append-only checkpoint log, oldest first, bounded by the retention limit.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    entries: Vec<RecoveryCheckpoint>,
    retention_limit: usize,
    sheet_ids: Vec<SheetIdentity>,
}

impl Default for CheckpointStore {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            retention_limit: MAX_RECOVERY_ENTRIES,
            sheet_ids: Vec::new(),
        }
    }
}

impl CheckpointStore {
    /// Empty store; `retention` is the raw stored setting.
    pub fn new(retention: &Value) -> Self {
        Self {
            retention_limit: clamp_retention_limit(retention),
            ..Self::default()
        }
    }

    pub fn retention_limit(&self) -> usize {
        self.retention_limit
    }

    pub fn set_retention_limit(&mut self, retention: &Value) -> Vec<RecoveryCheckpoint> {
        self.retention_limit = clamp_retention_limit(retention);
        self.evict()
    }

    /// Drops the oldest entries beyond the limit and returns them.
    fn evict(&mut self) -> Vec<RecoveryCheckpoint> {
        if self.entries.len() <= self.retention_limit {
            return Vec::new();
        }
        let excess = self.entries.len() - self.retention_limit;
        let evicted: Vec<_> = self.entries.drain(..excess).collect();
        warn!(
            evicted = evicted.len(),
            retention_limit = self.retention_limit,
            "evicted oldest checkpoints"
        );
        evicted
    }

    pub fn append(&mut self, checkpoint: RecoveryCheckpoint) -> Vec<RecoveryCheckpoint> {
        info!(
            id = %checkpoint.id,
            tool = %checkpoint.tool_name,
            address = %checkpoint.address,
            changed = checkpoint.changed_count,
            "recorded checkpoint"
        );
        self.entries.push(checkpoint);
        self.evict()
    }

    pub fn get(&self, id: &str) -> Option<&RecoveryCheckpoint> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn list(&self) -> &[RecoveryCheckpoint] {
        &self.entries
    }

    pub fn latest(&self) -> Option<&RecoveryCheckpoint> {
        self.entries.last()
    }

    pub fn remove(&mut self, id: &str) -> Option<RecoveryCheckpoint> {
        let idx = self.entries.iter().position(|entry| entry.id == id)?;
        Some(self.entries.remove(idx))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn sheet_ids(&self) -> &[SheetIdentity] {
        &self.sheet_ids
    }

    pub fn set_sheet_ids(&mut self, sheet_ids: Vec<SheetIdentity>) {
        self.sheet_ids = sheet_ids;
    }

    /// Load a store file. A missing file is an empty store; entries that fail
    /// the shape guards are dropped with a warning.
    pub fn load(path: &Path, retention: &Value) -> Result<Self> {
        let mut store = Self::new(retention);
        if !path.exists() {
            return Ok(store);
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read checkpoint store {}", path.display()))?;
        let document: StoreDocument = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse checkpoint store {}", path.display()))?;
        if document.version > STORE_VERSION {
            warn!(
                version = document.version,
                supported = STORE_VERSION,
                "checkpoint store written by a newer version; unknown entries will be dropped"
            );
        }

        for (index, entry) in document.entries.iter().enumerate() {
            match decode_checkpoint(entry) {
                Some(checkpoint) => store.entries.push(checkpoint),
                None => {
                    let id = entry.get("id").and_then(Value::as_str).unwrap_or("?");
                    warn!(index, id, "discarding unrestorable checkpoint");
                }
            }
        }
        store.sheet_ids = document.sheet_ids;
        store.evict();
        Ok(store)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let document = StoreDocument {
            version: STORE_VERSION,
            entries: self
                .entries
                .iter()
                .map(serde_json::to_value)
                .collect::<Result<_, _>>()?,
            sheet_ids: self.sheet_ids.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&document)?;

        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent)?;
        let mut tmp = NamedTempFile::new_in(parent)?;
        tmp.as_file_mut().write_all(&bytes)?;
        tmp.as_file_mut().flush()?;
        tmp.persist(path)
            .map_err(|err| err.error)
            .with_context(|| format!("failed to write checkpoint store {}", path.display()))?;
        Ok(())
    }
}
