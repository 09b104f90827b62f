use serde::Serialize;

use crate::errors::{RecoveryError, recovery_error};

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub try_this: Option<String>,
}

fn hint_for(error: &RecoveryError) -> Option<&'static str> {
    match error {
        RecoveryError::SheetNotFound(_) => {
            Some("check the sheet name; names match case-insensitively")
        }
        RecoveryError::TooLarge { .. } => {
            Some("edit a smaller range or raise --max-capture-cells")
        }
        RecoveryError::DataDeleteRefused { .. } => {
            Some("re-run with --allow-data-delete to delete cells that hold data")
        }
        RecoveryError::TargetExists { .. } => Some("rename or delete the existing sheet first"),
        RecoveryError::CorruptState(_) => {
            Some("this checkpoint cannot be restored; list-checkpoints shows the others")
        }
        RecoveryError::InvalidRequest(_) | RecoveryError::UnsupportedByBackend(_) => None,
    }
}

pub fn envelope_for(error: &anyhow::Error) -> ErrorEnvelope {
    match recovery_error(error) {
        Some(recovery) => ErrorEnvelope {
            code: recovery.code().to_string(),
            message: format!("{error:#}"),
            try_this: hint_for(recovery).map(str::to_string),
        },
        None => ErrorEnvelope {
            code: "COMMAND_FAILED".to_string(),
            message: format!("{error:#}"),
            try_this: None,
        },
    }
}

pub fn emit_error_and_exit(error: anyhow::Error) -> ! {
    let envelope = envelope_for(&error);
    let stderr = std::io::stderr();
    let mut handle = stderr.lock();
    if serde_json::to_writer(&mut handle, &envelope).is_err() {
        eprintln!("{{\"code\":\"COMMAND_FAILED\",\"message\":\"{}\"}}", error);
    } else {
        use std::io::Write;
        let _ = handle.write_all(b"\n");
    }
    std::process::exit(1)
}
