use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::conditional_format::RecoveryConditionalFormatState;
use super::format::RecoveryFormatRangeState;
use super::structure::RecoveryModifyStructureState;
use super::values::RecoveryStructureValueRangeState;
use crate::grid::{CellRange, column_number_to_letter, format_sheet_prefix};

/// Prior contents of a range that a value write replaced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryRangeValuesState {
    pub sheet_id: String,
    pub sheet_name: String,
    pub data_range: RecoveryStructureValueRangeState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum RecoveryState {
    ModifyStructure(RecoveryModifyStructureState),
    FormatRange(RecoveryFormatRangeState),
    ConditionalFormat(RecoveryConditionalFormatState),
    RangeValues(RecoveryRangeValuesState),
}

impl RecoveryState {
    pub fn type_name(&self) -> &'static str {
        match self {
            RecoveryState::ModifyStructure(_) => "modify_structure",
            RecoveryState::FormatRange(_) => "format_range",
            RecoveryState::ConditionalFormat(_) => "conditional_format",
            RecoveryState::RangeValues(_) => "range_values",
        }
    }

    pub fn changed_count(&self) -> u64 {
        match self {
            RecoveryState::ModifyStructure(state) => state.changed_count(),
            RecoveryState::FormatRange(state) => state.changed_count(),
            RecoveryState::ConditionalFormat(state) => CellRange::parse(&state.address)
                .map(|range| range.cell_count())
                .unwrap_or(0),
            RecoveryState::RangeValues(state) => state.data_range.cell_count(),
        }
    }

    /// Address shown next to the checkpoint in listings.
    pub fn display_address(&self) -> String {
        match self {
            RecoveryState::ModifyStructure(state) => match state {
                RecoveryModifyStructureState::SheetName { name, .. } => name.clone(),
                RecoveryModifyStructureState::SheetVisibility { sheet_id, .. } => sheet_id.clone(),
                RecoveryModifyStructureState::SheetAbsent { sheet_name, .. }
                | RecoveryModifyStructureState::SheetPresent { sheet_name, .. } => {
                    sheet_name.clone()
                }
                RecoveryModifyStructureState::RowsAbsent {
                    sheet_name,
                    position,
                    count,
                    ..
                }
                | RecoveryModifyStructureState::RowsPresent {
                    sheet_name,
                    position,
                    count,
                    ..
                } => format!(
                    "{}{}:{}",
                    format_sheet_prefix(sheet_name),
                    position,
                    position.saturating_add(count.saturating_sub(1))
                ),
                RecoveryModifyStructureState::ColumnsAbsent {
                    sheet_name,
                    position,
                    count,
                    ..
                }
                | RecoveryModifyStructureState::ColumnsPresent {
                    sheet_name,
                    position,
                    count,
                    ..
                } => format!(
                    "{}{}:{}",
                    format_sheet_prefix(sheet_name),
                    column_number_to_letter(*position),
                    column_number_to_letter(position.saturating_add(count.saturating_sub(1)))
                ),
            },
            RecoveryState::FormatRange(state) => {
                format!("{}{}", format_sheet_prefix(&state.sheet_name), state.address())
            }
            RecoveryState::ConditionalFormat(state) => {
                format!("{}{}", format_sheet_prefix(&state.sheet_name), state.address)
            }
            RecoveryState::RangeValues(state) => format!(
                "{}{}",
                format_sheet_prefix(&state.sheet_name),
                state.data_range.address
            ),
        }
    }
}

/// One entry of the checkpoint log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryCheckpoint {
    pub id: String,
    pub tool_name: String,
    pub tool_call_id: String,
    /// Epoch milliseconds.
    pub at: i64,
    pub address: String,
    pub changed_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restored_from_snapshot_id: Option<String>,
    pub state: RecoveryState,
}
