use anyhow::{Result, bail};
use tracing::{debug, warn};

use crate::accessor::{NewSheet, SheetInfo, SheetRef, WorkbookAccessor};
use crate::capture::{
    CaptureLimits, capture_conditional_format_state, capture_format_state,
    capture_range_values_state, capture_sheet_value_data_range, capture_value_data_range,
    require_range,
};
use crate::errors::RecoveryError;
use crate::grid::{
    Axis, CellAddress, CellRange, check_span, column_number_to_letter, to_restore_values,
};
use crate::model::{
    DataRangeCapture, RecoveryConditionalFormatState, RecoveryFormatRangeState,
    RecoveryModifyStructureState, RecoveryRangeValuesState, RecoveryState,
    RecoveryStructureValueRangeState,
};

fn require_sheet<A: WorkbookAccessor + ?Sized>(accessor: &A, sheet_id: &str) -> Result<SheetInfo> {
    match accessor.sheet_by_id(sheet_id) {
        Some(sheet) => Ok(sheet),
        None => bail!(RecoveryError::SheetNotFound(sheet_id.to_string())),
    }
}

/// Turn the capture taken right before a destructive edit into the data to
/// keep, refusing when data would be lost without recorded consent.
fn guard_destructive(
    capture: DataRangeCapture,
    allow_data_delete: Option<bool>,
    target: String,
    limits: &CaptureLimits,
) -> Result<Option<RecoveryStructureValueRangeState>, RecoveryError> {
    let consented = allow_data_delete == Some(true);
    match capture {
        DataRangeCapture::Empty => Ok(None),
        DataRangeCapture::Captured { data_range } if consented => Ok(Some(data_range)),
        DataRangeCapture::Captured { data_range } => Err(RecoveryError::DataDeleteRefused {
            target,
            cell_count: data_range.cell_count(),
        }),
        DataRangeCapture::TooLarge { cell_count } if consented => Err(RecoveryError::TooLarge {
            cell_count,
            max_cells: limits.max_cells,
        }),
        DataRangeCapture::TooLarge { cell_count } => {
            Err(RecoveryError::DataDeleteRefused { target, cell_count })
        }
    }
}

/// Captured data must fall inside the span it is restored into.
fn check_within(
    data_range: Option<&RecoveryStructureValueRangeState>,
    span: &CellRange,
) -> Result<(), RecoveryError> {
    if let Some(data) = data_range {
        data.validate()?;
        let range = data.range()?;
        if !span.contains_range(&range) {
            return Err(RecoveryError::CorruptState(format!(
                "data range {} lies outside {}",
                data.address, span
            )));
        }
    }
    Ok(())
}

fn rehydrate<A: WorkbookAccessor + ?Sized>(
    accessor: &mut A,
    sheet_id: &str,
    data_range: Option<&RecoveryStructureValueRangeState>,
) -> Result<()> {
    if let Some(data) = data_range {
        let range = data.range()?;
        let grid = to_restore_values(&data.values, &data.formulas);
        accessor.write_cells(sheet_id, &range, &grid)?;
        debug!(sheet_id, address = %range, "rehydrated data range");
    }
    Ok(())
}

fn rows_label(sheet: &str, position: u32, count: u32) -> String {
    format!("rows {}:{} on '{}'", position, position + count - 1, sheet)
}

fn columns_label(sheet: &str, position: u32, count: u32) -> String {
    format!(
        "columns {}:{} on '{}'",
        column_number_to_letter(position),
        column_number_to_letter(position + count - 1),
        sheet
    )
}

/// Apply a structure state and return the state that undoes it.
///
/// Applying the returned state reverses this call, so a sequence of applies is
/// its own undo/redo stack. Hard refusals leave the workbook untouched.
pub fn apply_modify_structure_state<A: WorkbookAccessor + ?Sized>(
    accessor: &mut A,
    target: &RecoveryModifyStructureState,
    limits: &CaptureLimits,
) -> Result<RecoveryModifyStructureState> {
    debug!(kind = target.kind(), sheet_id = target.sheet_id(), "applying structure state");
    match target {
        RecoveryModifyStructureState::SheetName { sheet_id, name } => {
            let sheet = require_sheet(accessor, sheet_id)?;
            if let Some(owner) = accessor.sheet_by_name(name)
                && owner.id != sheet.id
            {
                bail!(RecoveryError::TargetExists {
                    target: format!("sheet '{}'", owner.name)
                });
            }
            if sheet.name != *name {
                accessor.rename_sheet(&sheet.id, name)?;
            }
            Ok(RecoveryModifyStructureState::SheetName {
                sheet_id: sheet.id,
                name: sheet.name,
            })
        }

        RecoveryModifyStructureState::SheetVisibility {
            sheet_id,
            visibility,
        } => {
            let sheet = require_sheet(accessor, sheet_id)?;
            if sheet.visibility != *visibility {
                accessor.set_sheet_visibility(&sheet.id, *visibility)?;
            }
            Ok(RecoveryModifyStructureState::SheetVisibility {
                sheet_id: sheet.id,
                visibility: sheet.visibility,
            })
        }

        RecoveryModifyStructureState::SheetAbsent {
            sheet_id,
            allow_data_delete,
            ..
        } => {
            let sheet = require_sheet(accessor, sheet_id)?;
            let capture = capture_sheet_value_data_range(accessor, &sheet.id, limits)?;
            let data_range = guard_destructive(
                capture,
                *allow_data_delete,
                format!("sheet '{}'", sheet.name),
                limits,
            )?;
            accessor.delete_sheet(&sheet.id)?;
            Ok(RecoveryModifyStructureState::SheetPresent {
                sheet_id: sheet.id,
                sheet_name: sheet.name,
                position: sheet.position,
                visibility: sheet.visibility,
                data_range,
            })
        }

        RecoveryModifyStructureState::SheetPresent {
            sheet_id,
            sheet_name,
            position,
            visibility,
            data_range,
        } => {
            if let Some(existing) = accessor
                .sheet_by_id(sheet_id)
                .or_else(|| accessor.sheet_by_name(sheet_name))
            {
                bail!(RecoveryError::TargetExists {
                    target: format!("sheet '{}'", existing.name)
                });
            }
            if let Some(data) = data_range {
                data.validate()?;
            }
            let tab_count = accessor.sheets().len() as u32;
            if *position > tab_count {
                warn!(
                    sheet = %sheet_name,
                    position,
                    tab_count,
                    "restore position is past the last tab; appending at end"
                );
            }
            let created = accessor.add_sheet(&NewSheet {
                id: Some(sheet_id.clone()),
                name: sheet_name.clone(),
                position: Some(*position),
                visibility: *visibility,
            })?;
            rehydrate(accessor, &created.id, data_range.as_ref())?;
            Ok(RecoveryModifyStructureState::SheetAbsent {
                sheet_id: created.id,
                sheet_name: created.name,
                allow_data_delete: data_range.is_some().then_some(true),
            })
        }

        RecoveryModifyStructureState::RowsAbsent {
            sheet_id,
            position,
            count,
            allow_data_delete,
            ..
        } => {
            check_span(Axis::Rows, *position, *count)?;
            let sheet = require_sheet(accessor, sheet_id)?;
            let span = CellRange::rows(*position, *count);
            let capture = capture_value_data_range(accessor, &sheet.id, &span, limits)?;
            let data_range = guard_destructive(
                capture,
                *allow_data_delete,
                rows_label(&sheet.name, *position, *count),
                limits,
            )?;
            accessor.delete_rows(&sheet.id, *position, *count)?;
            Ok(RecoveryModifyStructureState::RowsPresent {
                sheet_id: sheet.id,
                sheet_name: sheet.name,
                position: *position,
                count: *count,
                data_range,
            })
        }

        RecoveryModifyStructureState::RowsPresent {
            sheet_id,
            position,
            count,
            data_range,
            ..
        } => {
            check_span(Axis::Rows, *position, *count)?;
            check_within(data_range.as_ref(), &CellRange::rows(*position, *count))?;
            let sheet = require_sheet(accessor, sheet_id)?;
            accessor.insert_rows(&sheet.id, *position, *count)?;
            rehydrate(accessor, &sheet.id, data_range.as_ref())?;
            Ok(RecoveryModifyStructureState::RowsAbsent {
                sheet_id: sheet.id,
                sheet_name: sheet.name,
                position: *position,
                count: *count,
                allow_data_delete: data_range.is_some().then_some(true),
            })
        }

        RecoveryModifyStructureState::ColumnsAbsent {
            sheet_id,
            position,
            count,
            allow_data_delete,
            ..
        } => {
            check_span(Axis::Columns, *position, *count)?;
            let sheet = require_sheet(accessor, sheet_id)?;
            let span = CellRange::columns(*position, *count);
            let capture = capture_value_data_range(accessor, &sheet.id, &span, limits)?;
            let data_range = guard_destructive(
                capture,
                *allow_data_delete,
                columns_label(&sheet.name, *position, *count),
                limits,
            )?;
            accessor.delete_columns(&sheet.id, *position, *count)?;
            Ok(RecoveryModifyStructureState::ColumnsPresent {
                sheet_id: sheet.id,
                sheet_name: sheet.name,
                position: *position,
                count: *count,
                data_range,
            })
        }

        RecoveryModifyStructureState::ColumnsPresent {
            sheet_id,
            position,
            count,
            data_range,
            ..
        } => {
            check_span(Axis::Columns, *position, *count)?;
            check_within(data_range.as_ref(), &CellRange::columns(*position, *count))?;
            let sheet = require_sheet(accessor, sheet_id)?;
            accessor.insert_columns(&sheet.id, *position, *count)?;
            rehydrate(accessor, &sheet.id, data_range.as_ref())?;
            Ok(RecoveryModifyStructureState::ColumnsAbsent {
                sheet_id: sheet.id,
                sheet_name: sheet.name,
                position: *position,
                count: *count,
                allow_data_delete: data_range.is_some().then_some(true),
            })
        }
    }
}

/// Write the captured per-cell formats back and return what they replaced.
pub fn apply_format_state<A: WorkbookAccessor + ?Sized>(
    accessor: &mut A,
    target: &RecoveryFormatRangeState,
    limits: &CaptureLimits,
) -> Result<RecoveryFormatRangeState> {
    if target.selection.is_empty() {
        bail!(RecoveryError::CorruptState(
            "format state selects no facets".to_string()
        ));
    }
    let areas = target
        .areas
        .iter()
        .map(|area| area.validate())
        .collect::<Result<Vec<_>, _>>()?;
    let sheet = require_sheet(accessor, &target.sheet_id)?;
    let Some(prior) = capture_format_state(
        accessor,
        &SheetRef::Id(sheet.id.clone()),
        &areas,
        &target.selection,
        limits,
    )?
    else {
        bail!(RecoveryError::SheetNotFound(sheet.id));
    };

    for (area, state) in areas.iter().zip(&target.areas) {
        for (r, row) in state.cells.iter().enumerate() {
            for (c, format) in row.iter().enumerate() {
                let cell = CellAddress::new(area.start.col + c as u32, area.start.row + r as u32);
                let props = target.selection.properties_at(area, cell);
                if !props.is_empty() {
                    accessor.write_cell_format(&sheet.id, cell, format, &props)?;
                }
            }
        }
    }
    debug!(sheet_id = %sheet.id, cells = target.changed_count(), "applied format state");
    Ok(prior)
}

/// Replace the rules on `address` and return the rules that were there.
pub fn apply_conditional_format_state<A: WorkbookAccessor + ?Sized>(
    accessor: &mut A,
    target: &RecoveryConditionalFormatState,
) -> Result<RecoveryConditionalFormatState> {
    let range = require_range(&target.address)?;
    let sheet = require_sheet(accessor, &target.sheet_id)?;
    let Some(prior) =
        capture_conditional_format_state(accessor, &SheetRef::Id(sheet.id.clone()), &target.address)?
    else {
        bail!(RecoveryError::SheetNotFound(sheet.id));
    };
    accessor.set_conditional_formats(&sheet.id, &range, &target.rules)?;
    debug!(sheet_id = %sheet.id, address = %range, rules = target.rules.len(), "applied conditional formats");
    Ok(prior)
}

/// Write a captured value block back and return what it replaced.
pub fn apply_range_values_state<A: WorkbookAccessor + ?Sized>(
    accessor: &mut A,
    target: &RecoveryRangeValuesState,
    limits: &CaptureLimits,
) -> Result<RecoveryRangeValuesState> {
    target.data_range.validate()?;
    let range = target.data_range.range()?;
    let sheet = require_sheet(accessor, &target.sheet_id)?;
    let Some(prior) = capture_range_values_state(
        accessor,
        &SheetRef::Id(sheet.id.clone()),
        &target.data_range.address,
        limits,
    )?
    else {
        bail!(RecoveryError::SheetNotFound(sheet.id));
    };
    let grid = to_restore_values(&target.data_range.values, &target.data_range.formulas);
    accessor.write_cells(&sheet.id, &range, &grid)?;
    debug!(sheet_id = %sheet.id, address = %range, "applied range values");
    Ok(prior)
}

pub fn apply_recovery_state<A: WorkbookAccessor + ?Sized>(
    accessor: &mut A,
    target: &RecoveryState,
    limits: &CaptureLimits,
) -> Result<RecoveryState> {
    Ok(match target {
        RecoveryState::ModifyStructure(state) => {
            RecoveryState::ModifyStructure(apply_modify_structure_state(accessor, state, limits)?)
        }
        RecoveryState::FormatRange(state) => {
            RecoveryState::FormatRange(apply_format_state(accessor, state, limits)?)
        }
        RecoveryState::ConditionalFormat(state) => {
            RecoveryState::ConditionalFormat(apply_conditional_format_state(accessor, state)?)
        }
        RecoveryState::RangeValues(state) => {
            RecoveryState::RangeValues(apply_range_values_state(accessor, state, limits)?)
        }
    })
}
