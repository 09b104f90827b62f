use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::grid::{CellAddress, CellRange};
use crate::model::{
    CellFormat, CellFormatProperty, CellValue, RecoveryConditionalFormatRule, SheetVisibility,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SheetInfo {
    /// Durable id; survives renames and reorders.
    pub id: String,
    pub name: String,
    /// 0-based tab index.
    pub position: u32,
    pub visibility: SheetVisibility,
}

/// How a caller names a sheet: `{"id": "..."}` or `{"name": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SheetRef {
    Id(String),
    Name(String),
}

impl SheetRef {
    pub fn id(id: impl Into<String>) -> Self {
        SheetRef::Id(id.into())
    }

    pub fn name(name: impl Into<String>) -> Self {
        SheetRef::Name(name.into())
    }
}

/// Values and formula text of a range, row-major. `formulas` holds `""` for plain cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RangeSnapshot {
    pub values: Vec<Vec<CellValue>>,
    pub formulas: Vec<Vec<String>>,
}

impl RangeSnapshot {
    pub fn is_blank(&self) -> bool {
        self.values.iter().flatten().all(CellValue::is_empty)
            && self.formulas.iter().flatten().all(String::is_empty)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSheet {
    /// Reuse a durable id (restoring a deleted sheet); a fresh one is minted when `None`.
    pub id: Option<String>,
    pub name: String,
    /// Requested tab index; past the end appends.
    pub position: Option<u32>,
    pub visibility: SheetVisibility,
}

/// Read/write primitives against a live workbook.
///
/// Each call returns fully loaded data, so every read needed for a decision
/// completes before the caller issues a mutation. Methods that address a sheet
/// fail with `RecoveryError::SheetNotFound` when the id is unknown.
pub trait WorkbookAccessor {
    /// All sheets in tab order.
    fn sheets(&self) -> Vec<SheetInfo>;

    fn sheet_by_id(&self, id: &str) -> Option<SheetInfo> {
        self.sheets().into_iter().find(|sheet| sheet.id == id)
    }

    /// Case-insensitive, like the host application.
    fn sheet_by_name(&self, name: &str) -> Option<SheetInfo> {
        let wanted = name.trim().to_lowercase();
        self.sheets()
            .into_iter()
            .find(|sheet| sheet.name.to_lowercase() == wanted)
    }

    fn resolve_sheet(&self, sheet: &SheetRef) -> Option<SheetInfo> {
        match sheet {
            SheetRef::Id(id) => self.sheet_by_id(id),
            SheetRef::Name(name) => self.sheet_by_name(name),
        }
    }

    /// Bounding box of cells holding a value or formula, `None` for a blank sheet.
    fn used_range(&self, sheet_id: &str) -> Result<Option<CellRange>>;

    fn read_cells(&self, sheet_id: &str, range: &CellRange) -> Result<RangeSnapshot>;

    /// Writes a grid exactly the size of `range`. `Text` starting with `=` is
    /// written as a formula; an empty `Text` clears the cell.
    fn write_cells(&mut self, sheet_id: &str, range: &CellRange, grid: &[Vec<CellValue>])
    -> Result<()>;

    fn rename_sheet(&mut self, sheet_id: &str, name: &str) -> Result<()>;
    fn set_sheet_visibility(&mut self, sheet_id: &str, visibility: SheetVisibility) -> Result<()>;
    fn add_sheet(&mut self, sheet: &NewSheet) -> Result<SheetInfo>;
    fn delete_sheet(&mut self, sheet_id: &str) -> Result<()>;

    fn insert_rows(&mut self, sheet_id: &str, position: u32, count: u32) -> Result<()>;
    fn delete_rows(&mut self, sheet_id: &str, position: u32, count: u32) -> Result<()>;
    fn insert_columns(&mut self, sheet_id: &str, position: u32, count: u32) -> Result<()>;
    fn delete_columns(&mut self, sheet_id: &str, position: u32, count: u32) -> Result<()>;

    fn read_cell_format(&self, sheet_id: &str, cell: CellAddress) -> Result<CellFormat>;

    /// Sets only `properties`; a `None` value resets that property to default.
    fn write_cell_format(
        &mut self,
        sheet_id: &str,
        cell: CellAddress,
        format: &CellFormat,
        properties: &[CellFormatProperty],
    ) -> Result<()>;

    /// Rules whose applies-to range is exactly `range`.
    fn conditional_formats(
        &self,
        sheet_id: &str,
        range: &CellRange,
    ) -> Result<Vec<RecoveryConditionalFormatRule>>;

    /// Replaces every rule applying to exactly `range` with `rules`.
    fn set_conditional_formats(
        &mut self,
        sheet_id: &str,
        range: &CellRange,
        rules: &[RecoveryConditionalFormatRule],
    ) -> Result<()>;
}
