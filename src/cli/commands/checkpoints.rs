use anyhow::{Result, bail};
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;

use super::{Session, blocking, display_path};
use crate::config::RecoveryConfig;
use crate::errors::RecoveryError;
use crate::model::RecoveryCheckpoint;
use crate::tools::{ToolOutcome, restore_checkpoint};

/// Checkpoint fields without the captured state.
#[derive(Debug, Serialize)]
pub(crate) struct CheckpointSummary {
    id: String,
    tool_name: String,
    tool_call_id: String,
    kind: &'static str,
    at: i64,
    address: String,
    changed_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    restored_from: Option<String>,
}

impl From<&RecoveryCheckpoint> for CheckpointSummary {
    fn from(checkpoint: &RecoveryCheckpoint) -> Self {
        Self {
            id: checkpoint.id.clone(),
            tool_name: checkpoint.tool_name.clone(),
            tool_call_id: checkpoint.tool_call_id.clone(),
            kind: checkpoint.state.type_name(),
            at: checkpoint.at,
            address: checkpoint.address.clone(),
            changed_count: checkpoint.changed_count,
            restored_from: checkpoint.restored_from_snapshot_id.clone(),
        }
    }
}

/// What an editing command reports back.
#[derive(Debug, Serialize)]
pub(crate) struct EditResponse {
    file: String,
    store: String,
    tool: String,
    tool_call_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    checkpoint: Option<CheckpointSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    evicted: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
}

impl EditResponse {
    pub(crate) fn new(session: &Session, outcome: ToolOutcome) -> Self {
        Self {
            file: display_path(&session.workbook_path),
            store: display_path(&session.store_path),
            tool: outcome.tool_name,
            tool_call_id: outcome.tool_call_id,
            checkpoint: outcome.checkpoint.as_ref().map(CheckpointSummary::from),
            evicted: outcome.evicted,
            warnings: outcome.warnings,
        }
    }
}

#[derive(Debug, Serialize)]
struct ListResponse {
    file: String,
    store: String,
    retention_limit: usize,
    count: usize,
    checkpoints: Vec<CheckpointSummary>,
}

pub async fn list(file: PathBuf, config: &RecoveryConfig) -> Result<Value> {
    let config = config.clone();
    let (store_path, store) = {
        let file = file.clone();
        blocking(move || Session::load_store(&file, &config)).await?
    };
    let response = ListResponse {
        file: display_path(&file),
        store: display_path(&store_path),
        retention_limit: store.retention_limit(),
        count: store.len(),
        checkpoints: store.list().iter().map(CheckpointSummary::from).collect(),
    };
    Ok(serde_json::to_value(response)?)
}

pub async fn show(file: PathBuf, id: String, config: &RecoveryConfig) -> Result<Value> {
    let config = config.clone();
    let (_, store) = blocking(move || Session::load_store(&file, &config)).await?;
    let Some(checkpoint) = store.get(&id) else {
        bail!(RecoveryError::InvalidRequest(format!(
            "checkpoint '{}' not found",
            id
        )));
    };
    Ok(serde_json::to_value(checkpoint)?)
}

pub async fn restore(file: PathBuf, id: String, config: &RecoveryConfig) -> Result<Value> {
    let config = config.clone();
    blocking(move || {
        let mut session = Session::open(&file, &config)?;
        let outcome = restore_checkpoint(
            &mut session.workbook,
            &mut session.store,
            &session.limits,
            &id,
        )?;
        let response = EditResponse::new(&session, outcome);
        session.commit()?;
        Ok(serde_json::to_value(response)?)
    })
    .await
}
