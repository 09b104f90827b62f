use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use super::values::RecoveryStructureValueRangeState;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    JsonSchema,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum SheetVisibility {
    #[default]
    Visible,
    Hidden,
    VeryHidden,
}

/// State that, when applied, reverses one structural edit.
///
/// Sheet `position` is the 0-based tab index. Row and column `position` is
/// 1-based and `count` is at least 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum RecoveryModifyStructureState {
    SheetName {
        sheet_id: String,
        name: String,
    },
    SheetVisibility {
        sheet_id: String,
        visibility: SheetVisibility,
    },
    SheetAbsent {
        sheet_id: String,
        sheet_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        allow_data_delete: Option<bool>,
    },
    SheetPresent {
        sheet_id: String,
        sheet_name: String,
        position: u32,
        visibility: SheetVisibility,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data_range: Option<RecoveryStructureValueRangeState>,
    },
    RowsAbsent {
        sheet_id: String,
        sheet_name: String,
        position: u32,
        count: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        allow_data_delete: Option<bool>,
    },
    RowsPresent {
        sheet_id: String,
        sheet_name: String,
        position: u32,
        count: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data_range: Option<RecoveryStructureValueRangeState>,
    },
    ColumnsAbsent {
        sheet_id: String,
        sheet_name: String,
        position: u32,
        count: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        allow_data_delete: Option<bool>,
    },
    ColumnsPresent {
        sheet_id: String,
        sheet_name: String,
        position: u32,
        count: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data_range: Option<RecoveryStructureValueRangeState>,
    },
}

impl RecoveryModifyStructureState {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SheetName { .. } => "sheet_name",
            Self::SheetVisibility { .. } => "sheet_visibility",
            Self::SheetAbsent { .. } => "sheet_absent",
            Self::SheetPresent { .. } => "sheet_present",
            Self::RowsAbsent { .. } => "rows_absent",
            Self::RowsPresent { .. } => "rows_present",
            Self::ColumnsAbsent { .. } => "columns_absent",
            Self::ColumnsPresent { .. } => "columns_present",
        }
    }

    pub fn sheet_id(&self) -> &str {
        match self {
            Self::SheetName { sheet_id, .. }
            | Self::SheetVisibility { sheet_id, .. }
            | Self::SheetAbsent { sheet_id, .. }
            | Self::SheetPresent { sheet_id, .. }
            | Self::RowsAbsent { sheet_id, .. }
            | Self::RowsPresent { sheet_id, .. }
            | Self::ColumnsAbsent { sheet_id, .. }
            | Self::ColumnsPresent { sheet_id, .. } => sheet_id,
        }
    }

    pub fn data_range(&self) -> Option<&RecoveryStructureValueRangeState> {
        match self {
            Self::SheetPresent { data_range, .. }
            | Self::RowsPresent { data_range, .. }
            | Self::ColumnsPresent { data_range, .. } => data_range.as_ref(),
            _ => None,
        }
    }

    pub fn changed_count(&self) -> u64 {
        match self {
            Self::RowsAbsent { count, .. }
            | Self::RowsPresent { count, .. }
            | Self::ColumnsAbsent { count, .. }
            | Self::ColumnsPresent { count, .. } => *count as u64,
            Self::SheetName { .. }
            | Self::SheetVisibility { .. }
            | Self::SheetAbsent { .. }
            | Self::SheetPresent { .. } => 1,
        }
    }
}
