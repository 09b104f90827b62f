//! Shape checks for recovery payloads read back from storage.
//!
//! Every predicate fails closed: an unknown discriminant, a missing required
//! field or a field of the wrong type yields `false`. A value accepted here
//! always deserializes into the typed model.

mod conditional_format;
mod format;
mod structure;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::model::{RecoveryCheckpoint, RecoveryModifyStructureState, RecoveryState};

pub use conditional_format::{
    is_color_scale_criteria, is_conditional_bound_rule, is_icon_set_criteria,
    is_recovery_conditional_format_rule, is_recovery_conditional_format_state,
};
pub use format::{is_recovery_format_range_state, is_recovery_format_selection};
pub use structure::{is_recovery_modify_structure_state, is_recovery_structure_value_range_state};

pub fn is_record(value: &Value) -> bool {
    value.is_object()
}

pub(crate) type Record = Map<String, Value>;

/// A present, non-null field.
pub(crate) fn field<'a>(obj: &'a Record, key: &str) -> Option<&'a Value> {
    obj.get(key).filter(|v| !v.is_null())
}

pub(crate) fn has_string(obj: &Record, key: &str) -> bool {
    field(obj, key).is_some_and(Value::is_string)
}

pub(crate) fn optional_string(obj: &Record, key: &str) -> bool {
    field(obj, key).is_none_or(Value::is_string)
}

pub(crate) fn optional_bool(obj: &Record, key: &str) -> bool {
    field(obj, key).is_none_or(Value::is_boolean)
}

pub(crate) fn is_u32(value: &Value) -> bool {
    value.as_u64().is_some_and(|n| n <= u32::MAX as u64)
}

pub(crate) fn has_u32(obj: &Record, key: &str) -> bool {
    field(obj, key).is_some_and(is_u32)
}

pub(crate) fn has_positive_u32(obj: &Record, key: &str) -> bool {
    field(obj, key)
        .and_then(Value::as_u64)
        .is_some_and(|n| (1..=u32::MAX as u64).contains(&n))
}

pub(crate) fn optional_u32(obj: &Record, key: &str) -> bool {
    field(obj, key).is_none_or(is_u32)
}

/// String literal accepted by the serde representation of `T`.
pub(crate) fn is_literal<T: DeserializeOwned>(value: &Value) -> bool {
    value.is_string() && serde_json::from_value::<T>(value.clone()).is_ok()
}

pub(crate) fn has_literal<T: DeserializeOwned>(obj: &Record, key: &str) -> bool {
    field(obj, key).is_some_and(is_literal::<T>)
}

pub(crate) fn optional_literal<T: DeserializeOwned>(obj: &Record, key: &str) -> bool {
    field(obj, key).is_none_or(is_literal::<T>)
}

pub fn is_recovery_range_values_state(value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };
    has_string(obj, "sheetId")
        && has_string(obj, "sheetName")
        && field(obj, "dataRange").is_some_and(is_recovery_structure_value_range_state)
}

pub fn is_recovery_state(value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };
    let Some(data) = field(obj, "data") else {
        return false;
    };
    match field(obj, "type").and_then(Value::as_str) {
        Some("modify_structure") => is_recovery_modify_structure_state(data),
        Some("format_range") => is_recovery_format_range_state(data),
        Some("conditional_format") => is_recovery_conditional_format_state(data),
        Some("range_values") => is_recovery_range_values_state(data),
        _ => false,
    }
}

pub fn is_recovery_checkpoint(value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };
    optional_string(obj, "restoredFromSnapshotId")
        && has_string(obj, "id")
        && has_string(obj, "toolName")
        && has_string(obj, "toolCallId")
        && field(obj, "at").is_some_and(|v| v.as_i64().is_some())
        && has_string(obj, "address")
        && field(obj, "changedCount").is_some_and(|v| v.as_u64().is_some())
        && field(obj, "state").is_some_and(is_recovery_state)
}

/// Guard, decode and validate a persisted checkpoint.
pub fn decode_checkpoint(value: &Value) -> Option<RecoveryCheckpoint> {
    if !is_recovery_checkpoint(value) {
        return None;
    }
    let checkpoint: RecoveryCheckpoint = serde_json::from_value(value.clone()).ok()?;
    validate_state(&checkpoint.state).then_some(checkpoint)
}

fn validate_state(state: &RecoveryState) -> bool {
    match state {
        RecoveryState::ModifyStructure(structure) => match structure {
            RecoveryModifyStructureState::SheetPresent { data_range, .. }
            | RecoveryModifyStructureState::RowsPresent { data_range, .. }
            | RecoveryModifyStructureState::ColumnsPresent { data_range, .. } => data_range
                .as_ref()
                .is_none_or(|range| range.validate().is_ok()),
            _ => true,
        },
        RecoveryState::FormatRange(format) => {
            format.areas.iter().all(|area| area.validate().is_ok())
        }
        RecoveryState::ConditionalFormat(_) => true,
        RecoveryState::RangeValues(values) => values.data_range.validate().is_ok(),
    }
}
