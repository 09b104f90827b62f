use serde_json::Value;

use super::{Record, field, has_literal, has_positive_u32, has_string, has_u32, optional_bool};
use crate::grid::{CellRange, is_rectangular};
use crate::model::SheetVisibility;

pub fn is_recovery_structure_value_range_state(value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };
    let Some(range) = field(obj, "address")
        .and_then(Value::as_str)
        .and_then(CellRange::parse)
    else {
        return false;
    };
    if !has_u32(obj, "rowCount") || !has_u32(obj, "columnCount") {
        return false;
    }
    let row_count = obj["rowCount"].as_u64().unwrap_or_default() as usize;
    let column_count = obj["columnCount"].as_u64().unwrap_or_default() as usize;

    let Some(values) = grid_of(field(obj, "values"), is_scalar) else {
        return false;
    };
    let Some(formulas) = grid_of(field(obj, "formulas"), Value::is_string) else {
        return false;
    };

    is_rectangular(&values, row_count, column_count)
        && is_rectangular(&formulas, row_count, column_count)
        && range.row_count() as usize == row_count
        && range.column_count() as usize == column_count
}

fn is_scalar(value: &Value) -> bool {
    value.is_boolean() || value.is_number() || value.is_string()
}

/// Row-major grid whose every cell satisfies `cell_ok`.
fn grid_of<'a>(value: Option<&'a Value>, cell_ok: fn(&Value) -> bool) -> Option<Vec<Vec<&'a Value>>> {
    let rows = value?.as_array()?;
    let mut grid = Vec::with_capacity(rows.len());
    for row in rows {
        let cells = row.as_array()?;
        if !cells.iter().all(cell_ok) {
            return None;
        }
        grid.push(cells.iter().collect());
    }
    Some(grid)
}

fn optional_value_range(obj: &Record) -> bool {
    field(obj, "dataRange").is_none_or(is_recovery_structure_value_range_state)
}

fn is_axis_state(obj: &Record) -> bool {
    has_string(obj, "sheetName") && has_positive_u32(obj, "position") && has_positive_u32(obj, "count")
}

pub fn is_recovery_modify_structure_state(value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };
    if !optional_bool(obj, "allowDataDelete") || !optional_value_range(obj) {
        return false;
    }
    if !has_string(obj, "sheetId") {
        return false;
    }
    match field(obj, "kind").and_then(Value::as_str) {
        Some("sheet_name") => has_string(obj, "name"),
        Some("sheet_visibility") => has_literal::<SheetVisibility>(obj, "visibility"),
        Some("sheet_absent") => has_string(obj, "sheetName"),
        Some("sheet_present") => {
            has_string(obj, "sheetName")
                && has_u32(obj, "position")
                && has_literal::<SheetVisibility>(obj, "visibility")
        }
        Some("rows_absent") | Some("rows_present") | Some("columns_absent")
        | Some("columns_present") => is_axis_state(obj),
        _ => false,
    }
}
