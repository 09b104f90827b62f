//! Checkpoints for spreadsheet edits.
//!
//! Every mutating tool captures the workbook state it is about to overwrite,
//! records it as a [`RecoveryCheckpoint`], and can later apply that state back.
//! Applying a state returns the state it replaced, so a restore is itself
//! recorded and can be undone.

pub mod accessor;
pub mod apply;
pub mod capture;
pub mod cli;
pub mod config;
pub mod errors;
pub mod grid;
pub mod guards;
pub mod model;
pub mod retention;
pub mod store;
pub mod styles;
pub mod tools;
pub mod utils;
pub mod workbook;

pub use accessor::{NewSheet, RangeSnapshot, SheetInfo, SheetRef, WorkbookAccessor};
pub use apply::{
    apply_conditional_format_state, apply_format_state, apply_modify_structure_state,
    apply_range_values_state, apply_recovery_state,
};
pub use capture::{
    AxisPosition, CaptureLimits, StructureCaptureKind, StructureCaptureRequest,
    capture_conditional_format_state, capture_format_state, capture_modify_structure_state,
    capture_range_values_state,
};
pub use config::RecoveryConfig;
pub use errors::{RecoveryError, recovery_error};
pub use model::{RecoveryCheckpoint, RecoveryState};
pub use store::CheckpointStore;
pub use tools::{FormatPatch, StructureOp, ToolCall, ToolOutcome};
pub use workbook::{MemoryWorkbook, XlsxWorkbook};
