pub mod checkpoints;
pub mod edit;

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};

use crate::capture::CaptureLimits;
use crate::config::RecoveryConfig;
use crate::store::CheckpointStore;
use crate::workbook::XlsxWorkbook;

/// A workbook opened together with its checkpoint store.
///
/// Edits happen in memory; nothing reaches disk until [`Session::commit`].
/// The workbook is written before the store.
pub(crate) struct Session {
    pub(crate) workbook_path: PathBuf,
    pub(crate) store_path: PathBuf,
    pub(crate) workbook: XlsxWorkbook,
    pub(crate) store: CheckpointStore,
    pub(crate) limits: CaptureLimits,
}

impl Session {
    pub(crate) fn open(file: &Path, config: &RecoveryConfig) -> Result<Self> {
        if !file.exists() {
            bail!("workbook {} does not exist", file.display());
        }
        let store_path = config.store_path_for(file);
        let store = CheckpointStore::load(&store_path, &config.retention_setting)?;
        let workbook = XlsxWorkbook::open(file, store.sheet_ids())
            .with_context(|| format!("failed to open workbook {}", file.display()))?;
        Ok(Self {
            workbook_path: file.to_path_buf(),
            store_path,
            workbook,
            store,
            limits: config.capture_limits(),
        })
    }

    /// Only the store; for read-only checkpoint commands.
    pub(crate) fn load_store(file: &Path, config: &RecoveryConfig) -> Result<(PathBuf, CheckpointStore)> {
        let store_path = config.store_path_for(file);
        let store = CheckpointStore::load(&store_path, &config.retention_setting)?;
        Ok((store_path, store))
    }

    pub(crate) fn commit(mut self) -> Result<()> {
        self.workbook.save(&self.workbook_path)?;
        self.store.set_sheet_ids(self.workbook.identities());
        self.store.save(&self.store_path)
    }
}

/// Runs workbook and store I/O on tokio's blocking pool.
pub(crate) async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await?
}

pub(crate) fn display_path(path: &Path) -> String {
    path.display().to_string()
}
