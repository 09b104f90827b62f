use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::PathBuf;

use super::{Session, blocking};
use super::checkpoints::EditResponse;
use crate::accessor::SheetRef;
use crate::capture::AxisPosition;
use crate::config::RecoveryConfig;
use crate::errors::RecoveryError;
use crate::model::{CellValue, RecoveryConditionalFormatRule, SheetVisibility};
use crate::tools::{self, FormatPatch, StructureOp, ToolCall, ToolOutcome};

fn parse_json_arg<T: DeserializeOwned>(raw: &str, what: &str) -> Result<T> {
    serde_json::from_str(raw).map_err(|err| {
        anyhow::Error::new(RecoveryError::InvalidRequest(format!(
            "{what} is not valid JSON: {err}"
        )))
    })
}

/// `"5"` is a column number, `"E"` a column letter.
fn parse_column_position(raw: &str) -> AxisPosition {
    match raw.trim().parse::<u32>() {
        Ok(number) => AxisPosition::from(number),
        Err(_) => AxisPosition::Letters(raw.trim().to_string()),
    }
}

async fn run_edit<F>(file: PathBuf, config: &RecoveryConfig, edit: F) -> Result<Value>
where
    F: FnOnce(&mut Session) -> Result<ToolOutcome> + Send + 'static,
{
    let config = config.clone();
    blocking(move || {
        let mut session = Session::open(&file, &config)?;
        let outcome = edit(&mut session)?;
        let response = EditResponse::new(&session, outcome);
        session
            .commit()
            .with_context(|| format!("failed to save {}", file.display()))?;
        Ok(serde_json::to_value(response)?)
    })
    .await
}

async fn structure(file: PathBuf, config: &RecoveryConfig, op: StructureOp) -> Result<Value> {
    run_edit(file, config, move |session| {
        let call = ToolCall::new(op.tool_name());
        tools::modify_structure(
            &mut session.workbook,
            &mut session.store,
            &session.limits,
            call,
            op,
        )
    })
    .await
}

pub async fn rename_sheet(
    file: PathBuf,
    sheet: String,
    new_name: String,
    config: &RecoveryConfig,
) -> Result<Value> {
    structure(
        file,
        config,
        StructureOp::RenameSheet {
            sheet: SheetRef::name(sheet),
            new_name,
        },
    )
    .await
}

pub async fn set_visibility(
    file: PathBuf,
    sheet: String,
    visibility: SheetVisibility,
    config: &RecoveryConfig,
) -> Result<Value> {
    structure(
        file,
        config,
        StructureOp::SetSheetVisibility {
            sheet: SheetRef::name(sheet),
            visibility,
        },
    )
    .await
}

pub async fn add_sheet(
    file: PathBuf,
    name: String,
    position: Option<u32>,
    visibility: Option<SheetVisibility>,
    config: &RecoveryConfig,
) -> Result<Value> {
    structure(
        file,
        config,
        StructureOp::AddSheet {
            name,
            position,
            visibility,
        },
    )
    .await
}

pub async fn delete_sheet(
    file: PathBuf,
    sheet: String,
    allow_data_delete: bool,
    config: &RecoveryConfig,
) -> Result<Value> {
    structure(
        file,
        config,
        StructureOp::DeleteSheet {
            sheet: SheetRef::name(sheet),
            allow_data_delete,
        },
    )
    .await
}

pub async fn insert_rows(
    file: PathBuf,
    sheet: String,
    position: u32,
    count: u32,
    config: &RecoveryConfig,
) -> Result<Value> {
    structure(
        file,
        config,
        StructureOp::InsertRows {
            sheet: SheetRef::name(sheet),
            position,
            count,
        },
    )
    .await
}

pub async fn delete_rows(
    file: PathBuf,
    sheet: String,
    position: u32,
    count: u32,
    allow_data_delete: bool,
    config: &RecoveryConfig,
) -> Result<Value> {
    structure(
        file,
        config,
        StructureOp::DeleteRows {
            sheet: SheetRef::name(sheet),
            position,
            count,
            allow_data_delete,
        },
    )
    .await
}

pub async fn insert_columns(
    file: PathBuf,
    sheet: String,
    position: String,
    count: u32,
    config: &RecoveryConfig,
) -> Result<Value> {
    structure(
        file,
        config,
        StructureOp::InsertColumns {
            sheet: SheetRef::name(sheet),
            position: parse_column_position(&position),
            count,
        },
    )
    .await
}

pub async fn delete_columns(
    file: PathBuf,
    sheet: String,
    position: String,
    count: u32,
    allow_data_delete: bool,
    config: &RecoveryConfig,
) -> Result<Value> {
    structure(
        file,
        config,
        StructureOp::DeleteColumns {
            sheet: SheetRef::name(sheet),
            position: parse_column_position(&position),
            count,
            allow_data_delete,
        },
    )
    .await
}

pub async fn write_values(
    file: PathBuf,
    sheet: String,
    range: String,
    values: String,
    config: &RecoveryConfig,
) -> Result<Value> {
    let grid: Vec<Vec<CellValue>> = parse_json_arg(&values, "values")?;
    run_edit(file, config, move |session| {
        tools::write_values(
            &mut session.workbook,
            &mut session.store,
            &session.limits,
            ToolCall::new("write_values"),
            &SheetRef::name(sheet),
            &range,
            grid,
        )
    })
    .await
}

pub async fn format_range(
    file: PathBuf,
    sheet: String,
    ranges: Vec<String>,
    patch: String,
    config: &RecoveryConfig,
) -> Result<Value> {
    let patch: FormatPatch = parse_json_arg(&patch, "patch")?;
    run_edit(file, config, move |session| {
        tools::format_ranges(
            &mut session.workbook,
            &mut session.store,
            &session.limits,
            ToolCall::new("format_range"),
            &SheetRef::name(sheet),
            &ranges,
            &patch,
        )
    })
    .await
}

pub async fn set_conditional_formats(
    file: PathBuf,
    sheet: String,
    range: String,
    rules: String,
    config: &RecoveryConfig,
) -> Result<Value> {
    let rules: Vec<RecoveryConditionalFormatRule> = parse_json_arg(&rules, "rules")?;
    run_edit(file, config, move |session| {
        tools::set_conditional_formats(
            &mut session.workbook,
            &mut session.store,
            ToolCall::new("set_conditional_formats"),
            &SheetRef::name(sheet),
            &range,
            rules,
        )
    })
    .await
}
