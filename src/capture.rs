use anyhow::{Result, bail};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::accessor::{RangeSnapshot, SheetRef, WorkbookAccessor};
use crate::errors::RecoveryError;
use crate::grid::{CellAddress, CellRange, MAX_COLUMNS, MAX_ROWS, column_letter_to_number};
use crate::model::{
    DataRangeCapture, RecoveryConditionalFormatState, RecoveryFormatAreaState,
    RecoveryFormatRangeState, RecoveryFormatSelection, RecoveryModifyStructureState,
    RecoveryRangeValuesState, RecoveryStructureValueRangeState,
};

pub const DEFAULT_MAX_CAPTURE_CELLS: u64 = 20_000;

/// Upper bound on how many cells a single capture may hold in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureLimits {
    pub max_cells: u64,
}

impl Default for CaptureLimits {
    fn default() -> Self {
        Self {
            max_cells: DEFAULT_MAX_CAPTURE_CELLS,
        }
    }
}

impl CaptureLimits {
    pub fn new(max_cells: u64) -> Self {
        Self { max_cells }
    }

    pub fn check(&self, cell_count: u64) -> Result<(), RecoveryError> {
        if cell_count > self.max_cells {
            return Err(RecoveryError::TooLarge {
                cell_count,
                max_cells: self.max_cells,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StructureCaptureKind {
    SheetName,
    SheetVisibility,
    SheetAbsent,
    RowsAbsent,
    ColumnsAbsent,
}

/// A row/column position as callers send it: a number, or column letters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum AxisPosition {
    Number(f64),
    Letters(String),
}

impl From<u32> for AxisPosition {
    fn from(value: u32) -> Self {
        AxisPosition::Number(value as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StructureCaptureRequest {
    pub kind: StructureCaptureKind,
    pub sheet_ref: SheetRef,
    #[serde(default)]
    pub position: Option<AxisPosition>,
    #[serde(default)]
    pub count: Option<f64>,
    #[serde(default)]
    pub allow_data_delete: Option<bool>,
}

impl StructureCaptureRequest {
    pub fn sheet(kind: StructureCaptureKind, sheet_ref: SheetRef) -> Self {
        Self {
            kind,
            sheet_ref,
            position: None,
            count: None,
            allow_data_delete: None,
        }
    }

    pub fn axis(
        kind: StructureCaptureKind,
        sheet_ref: SheetRef,
        position: impl Into<AxisPosition>,
        count: u32,
    ) -> Self {
        Self {
            kind,
            sheet_ref,
            position: Some(position.into()),
            count: Some(count as f64),
            allow_data_delete: None,
        }
    }
}

/// Floor to a positive `u32`, or `None`.
fn positive_integer(raw: f64) -> Option<u32> {
    if !raw.is_finite() {
        return None;
    }
    let floored = raw.floor();
    (floored >= 1.0 && floored <= u32::MAX as f64).then_some(floored as u32)
}

pub(crate) fn normalize_position(position: Option<&AxisPosition>, letters_allowed: bool) -> Option<u32> {
    match position? {
        AxisPosition::Number(n) => positive_integer(*n),
        AxisPosition::Letters(letters) if letters_allowed => {
            column_letter_to_number(letters.trim())
        }
        AxisPosition::Letters(_) => None,
    }
}

/// Span `position..position+count` fits inside a sheet edge of `limit`.
fn axis_span(
    request: &StructureCaptureRequest,
    letters_allowed: bool,
    limit: u32,
) -> Option<(u32, u32)> {
    let position = normalize_position(request.position.as_ref(), letters_allowed)?;
    let count = request.count.and_then(positive_integer)?;
    (position <= limit && count <= limit - position + 1).then_some((position, count))
}

/// Snapshot what is needed to undo a structural edit that is about to run.
///
/// `Ok(None)` means there is nothing to checkpoint (unknown sheet, or a
/// position/count that does not normalize to a positive integer); callers still
/// perform their edit.
pub fn capture_modify_structure_state<A: WorkbookAccessor + ?Sized>(
    accessor: &A,
    request: &StructureCaptureRequest,
) -> Result<Option<RecoveryModifyStructureState>> {
    let Some(sheet) = accessor.resolve_sheet(&request.sheet_ref) else {
        debug!(sheet = ?request.sheet_ref, "structure capture skipped: sheet not found");
        return Ok(None);
    };

    let state = match request.kind {
        StructureCaptureKind::SheetName => Some(RecoveryModifyStructureState::SheetName {
            sheet_id: sheet.id,
            name: sheet.name,
        }),
        StructureCaptureKind::SheetVisibility => {
            Some(RecoveryModifyStructureState::SheetVisibility {
                sheet_id: sheet.id,
                visibility: sheet.visibility,
            })
        }
        StructureCaptureKind::SheetAbsent => Some(RecoveryModifyStructureState::SheetAbsent {
            sheet_id: sheet.id,
            sheet_name: sheet.name,
            allow_data_delete: request.allow_data_delete,
        }),
        StructureCaptureKind::RowsAbsent => {
            axis_span(request, false, MAX_ROWS).map(|(position, count)| {
                RecoveryModifyStructureState::RowsAbsent {
                    sheet_id: sheet.id,
                    sheet_name: sheet.name,
                    position,
                    count,
                    allow_data_delete: request.allow_data_delete,
                }
            })
        }
        StructureCaptureKind::ColumnsAbsent => {
            axis_span(request, true, MAX_COLUMNS).map(|(position, count)| {
                RecoveryModifyStructureState::ColumnsAbsent {
                    sheet_id: sheet.id,
                    sheet_name: sheet.name,
                    position,
                    count,
                    allow_data_delete: request.allow_data_delete,
                }
            })
        }
    };

    match &state {
        Some(state) => debug!(kind = state.kind(), sheet_id = state.sheet_id(), "captured structure state"),
        None => debug!(kind = ?request.kind, "structure capture skipped: invalid position or count"),
    }
    Ok(state)
}

pub(crate) fn value_range_state(
    range: &CellRange,
    snapshot: RangeSnapshot,
) -> RecoveryStructureValueRangeState {
    RecoveryStructureValueRangeState {
        address: range.to_a1(),
        row_count: range.row_count(),
        column_count: range.column_count(),
        values: snapshot.values,
        formulas: snapshot.formulas,
    }
}

fn capture_used<A: WorkbookAccessor + ?Sized>(
    accessor: &A,
    sheet_id: &str,
    used: Option<CellRange>,
    limits: &CaptureLimits,
) -> Result<DataRangeCapture> {
    let Some(range) = used else {
        return Ok(DataRangeCapture::Empty);
    };
    let cell_count = range.cell_count();
    if cell_count > limits.max_cells {
        debug!(sheet_id, cell_count, max_cells = limits.max_cells, "data capture too large");
        return Ok(DataRangeCapture::TooLarge { cell_count });
    }
    let snapshot = accessor.read_cells(sheet_id, &range)?;
    if snapshot.is_blank() {
        return Ok(DataRangeCapture::Empty);
    }
    debug!(sheet_id, address = %range, "captured data range");
    Ok(DataRangeCapture::Captured {
        data_range: value_range_state(&range, snapshot),
    })
}

/// Data inside `range` that a destructive edit would lose.
pub fn capture_value_data_range<A: WorkbookAccessor + ?Sized>(
    accessor: &A,
    sheet_id: &str,
    range: &CellRange,
    limits: &CaptureLimits,
) -> Result<DataRangeCapture> {
    let used = accessor
        .used_range(sheet_id)?
        .and_then(|used| used.intersect(range));
    capture_used(accessor, sheet_id, used, limits)
}

/// All data on a sheet.
pub fn capture_sheet_value_data_range<A: WorkbookAccessor + ?Sized>(
    accessor: &A,
    sheet_id: &str,
    limits: &CaptureLimits,
) -> Result<DataRangeCapture> {
    let used = accessor.used_range(sheet_id)?;
    capture_used(accessor, sheet_id, used, limits)
}

/// Exact contents of `address` before a value write.
pub fn capture_range_values_state<A: WorkbookAccessor + ?Sized>(
    accessor: &A,
    sheet_ref: &SheetRef,
    address: &str,
    limits: &CaptureLimits,
) -> Result<Option<RecoveryRangeValuesState>> {
    let Some(sheet) = accessor.resolve_sheet(sheet_ref) else {
        debug!(sheet = ?sheet_ref, "value capture skipped: sheet not found");
        return Ok(None);
    };
    let range = require_range(address)?;
    limits.check(range.cell_count())?;
    let snapshot = accessor.read_cells(&sheet.id, &range)?;
    Ok(Some(RecoveryRangeValuesState {
        sheet_id: sheet.id,
        sheet_name: sheet.name,
        data_range: value_range_state(&range, snapshot),
    }))
}

/// Prior values of the selected format facets across one or more areas.
pub fn capture_format_state<A: WorkbookAccessor + ?Sized>(
    accessor: &A,
    sheet_ref: &SheetRef,
    areas: &[CellRange],
    selection: &RecoveryFormatSelection,
    limits: &CaptureLimits,
) -> Result<Option<RecoveryFormatRangeState>> {
    if selection.is_empty() || areas.is_empty() {
        debug!("format capture skipped: nothing selected");
        return Ok(None);
    }
    let Some(sheet) = accessor.resolve_sheet(sheet_ref) else {
        debug!(sheet = ?sheet_ref, "format capture skipped: sheet not found");
        return Ok(None);
    };
    let total: u64 = areas.iter().map(CellRange::cell_count).sum();
    limits.check(total)?;

    let mut captured = Vec::with_capacity(areas.len());
    for area in areas {
        let mut rows = Vec::with_capacity(area.row_count() as usize);
        for row in area.start.row..=area.end.row {
            let mut cells = Vec::with_capacity(area.column_count() as usize);
            for col in area.start.col..=area.end.col {
                let cell = CellAddress::new(col, row);
                let props = selection.properties_at(area, cell);
                if props.is_empty() {
                    cells.push(Default::default());
                    continue;
                }
                cells.push(accessor.read_cell_format(&sheet.id, cell)?.masked(&props));
            }
            rows.push(cells);
        }
        captured.push(RecoveryFormatAreaState {
            address: area.to_a1(),
            row_count: area.row_count(),
            column_count: area.column_count(),
            cells: rows,
        });
    }
    debug!(sheet_id = %sheet.id, areas = captured.len(), cells = total, "captured format state");
    Ok(Some(RecoveryFormatRangeState {
        sheet_id: sheet.id,
        sheet_name: sheet.name,
        selection: selection.clone(),
        areas: captured,
    }))
}

/// Rules applying to exactly `address`.
pub fn capture_conditional_format_state<A: WorkbookAccessor + ?Sized>(
    accessor: &A,
    sheet_ref: &SheetRef,
    address: &str,
) -> Result<Option<RecoveryConditionalFormatState>> {
    let Some(sheet) = accessor.resolve_sheet(sheet_ref) else {
        debug!(sheet = ?sheet_ref, "conditional format capture skipped: sheet not found");
        return Ok(None);
    };
    let range = require_range(address)?;
    let rules = accessor.conditional_formats(&sheet.id, &range)?;
    debug!(sheet_id = %sheet.id, address = %range, rules = rules.len(), "captured conditional formats");
    Ok(Some(RecoveryConditionalFormatState {
        sheet_id: sheet.id,
        sheet_name: sheet.name,
        address: range.to_a1(),
        rules,
    }))
}

pub(crate) fn require_range(address: &str) -> Result<CellRange> {
    match CellRange::parse(address) {
        Some(range) => Ok(range),
        None => bail!(RecoveryError::InvalidRequest(format!(
            "invalid range address: {}",
            address
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_floor_and_reject_non_positive() {
        assert_eq!(positive_integer(3.9), Some(3));
        assert_eq!(positive_integer(1.0), Some(1));
        assert_eq!(positive_integer(0.99), None);
        assert_eq!(positive_integer(-2.0), None);
        assert_eq!(positive_integer(f64::NAN), None);
        assert_eq!(positive_integer(f64::INFINITY), None);
    }

    #[test]
    fn column_positions_accept_letters() {
        let letters = AxisPosition::Letters("c".to_string());
        assert_eq!(normalize_position(Some(&letters), true), Some(3));
        assert_eq!(normalize_position(Some(&letters), false), None);
        assert_eq!(normalize_position(None, true), None);
    }
}
