use thiserror::Error;

/// Hard refusals and corruption raised by capture/apply.
///
/// Engine functions return `anyhow::Result`; these values travel inside the
/// `anyhow::Error` so callers can `downcast_ref::<RecoveryError>()` to decide
/// how to surface them.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RecoveryError {
    #[error("sheet '{0}' not found")]
    SheetNotFound(String),

    #[error("{cell_count} cells exceed the recovery capture limit of {max_cells}")]
    TooLarge { cell_count: u64, max_cells: u64 },

    #[error(
        "refusing to delete {target}: it holds {cell_count} cells of data and no allowDataDelete consent was recorded"
    )]
    DataDeleteRefused { target: String, cell_count: u64 },

    #[error("{target} already exists; restoring would overwrite it")]
    TargetExists { target: String },

    #[error("corrupt recovery state: {0}")]
    CorruptState(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("not supported by this workbook backend: {0}")]
    UnsupportedByBackend(String),
}

impl RecoveryError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::SheetNotFound(_) => "SHEET_NOT_FOUND",
            Self::TooLarge { .. } => "CAPTURE_TOO_LARGE",
            Self::DataDeleteRefused { .. } => "DATA_DELETE_REFUSED",
            Self::TargetExists { .. } => "TARGET_EXISTS",
            Self::CorruptState(_) => "CORRUPT_STATE",
            Self::InvalidRequest(_) => "INVALID_ARGUMENT",
            Self::UnsupportedByBackend(_) => "UNSUPPORTED",
        }
    }

    /// Whether the error blocked a mutation before anything was written.
    pub fn is_hard_refusal(&self) -> bool {
        matches!(
            self,
            Self::TooLarge { .. } | Self::DataDeleteRefused { .. } | Self::TargetExists { .. }
        )
    }
}

/// Find a [`RecoveryError`] anywhere in an `anyhow` chain.
pub fn recovery_error(error: &anyhow::Error) -> Option<&RecoveryError> {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<RecoveryError>())
}
