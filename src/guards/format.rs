use serde_json::Value;

use super::{Record, field, has_string, has_u32, optional_bool, optional_literal, optional_string};
use crate::grid::CellRange;
use crate::model::{
    BorderStyle, FormatFacet, HorizontalAlignment, UnderlineStyle, VerticalAlignment,
};

const CELL_FORMAT_KEYS: [&str; 15] = [
    "numberFormat",
    "fillColor",
    "fontColor",
    "bold",
    "italic",
    "underline",
    "fontName",
    "fontSize",
    "horizontalAlignment",
    "verticalAlignment",
    "wrapText",
    "borderTop",
    "borderBottom",
    "borderLeft",
    "borderRight",
];

/// Known facet keys with boolean values; at least one must be `true`.
pub fn is_recovery_format_selection(value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };
    let mut any_selected = false;
    for (key, flag) in obj {
        if FormatFacet::from_key(key).is_none() {
            return false;
        }
        match flag.as_bool() {
            Some(selected) => any_selected |= selected,
            None => return false,
        }
    }
    any_selected
}

fn is_border_edge(value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };
    field(obj, "style").is_some_and(super::is_literal::<BorderStyle>) && optional_string(obj, "color")
}

fn optional_border(obj: &Record, key: &str) -> bool {
    field(obj, key).is_none_or(is_border_edge)
}

fn is_cell_format(value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };
    obj.keys().all(|key| CELL_FORMAT_KEYS.contains(&key.as_str()))
        && optional_string(obj, "numberFormat")
        && optional_string(obj, "fillColor")
        && optional_string(obj, "fontColor")
        && optional_bool(obj, "bold")
        && optional_bool(obj, "italic")
        && optional_literal::<UnderlineStyle>(obj, "underline")
        && optional_string(obj, "fontName")
        && field(obj, "fontSize").is_none_or(|v| v.as_f64().is_some_and(|n| n > 0.0))
        && optional_literal::<HorizontalAlignment>(obj, "horizontalAlignment")
        && optional_literal::<VerticalAlignment>(obj, "verticalAlignment")
        && optional_bool(obj, "wrapText")
        && optional_border(obj, "borderTop")
        && optional_border(obj, "borderBottom")
        && optional_border(obj, "borderLeft")
        && optional_border(obj, "borderRight")
}

fn is_format_area(value: &Value) -> bool {
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
    let row_count = obj["rowCount"].as_u64().unwrap_or_default();
    let column_count = obj["columnCount"].as_u64().unwrap_or_default();
    if range.row_count() as u64 != row_count || range.column_count() as u64 != column_count {
        return false;
    }
    let Some(rows) = field(obj, "cells").and_then(Value::as_array) else {
        return false;
    };
    rows.len() as u64 == row_count
        && rows.iter().all(|row| {
            row.as_array().is_some_and(|cells| {
                cells.len() as u64 == column_count && cells.iter().all(is_cell_format)
            })
        })
}

pub fn is_recovery_format_range_state(value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };
    has_string(obj, "sheetId")
        && has_string(obj, "sheetName")
        && field(obj, "selection").is_some_and(is_recovery_format_selection)
        && field(obj, "areas")
            .and_then(Value::as_array)
            .is_some_and(|areas| !areas.is_empty() && areas.iter().all(is_format_area))
}
