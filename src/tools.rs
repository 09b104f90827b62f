//! Mutating tools that record a checkpoint for every edit.
//!
//! Each tool captures the state it is about to overwrite immediately before
//! mutating, then appends that capture to the [`CheckpointStore`]. Destructive
//! edits and forward edits are expressed as applies of a target state, so the
//! prior state returned by the apply is the checkpoint.

use anyhow::{Result, bail};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use tracing::{info, warn};

use crate::accessor::{NewSheet, SheetInfo, SheetRef, WorkbookAccessor};
use crate::apply::{
    apply_conditional_format_state, apply_format_state, apply_modify_structure_state,
    apply_range_values_state, apply_recovery_state,
};
use crate::capture::{
    AxisPosition, CaptureLimits, StructureCaptureKind, StructureCaptureRequest,
    capture_modify_structure_state, normalize_position, require_range,
};
use crate::errors::RecoveryError;
use crate::grid::{Axis, CellAddress, CellRange, check_span, is_formula, is_rectangular};
use crate::model::{
    BorderEdge, CellFormat, CellValue, FormatFacet, HorizontalAlignment,
    RecoveryCheckpoint, RecoveryConditionalFormatRule, RecoveryConditionalFormatState,
    RecoveryFormatAreaState, RecoveryFormatRangeState, RecoveryFormatSelection,
    RecoveryModifyStructureState, RecoveryRangeValuesState, RecoveryState,
    RecoveryStructureValueRangeState, SheetVisibility, UnderlineStyle, VerticalAlignment,
};
use crate::store::CheckpointStore;
use crate::utils::{make_short_random_id, now_epoch_ms};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ToolCall {
    pub tool_name: String,
    pub tool_call_id: String,
}

impl ToolCall {
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            tool_call_id: make_short_random_id("call", 12),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolOutcome {
    pub tool_name: String,
    pub tool_call_id: String,
    /// `None` when there was nothing to checkpoint.
    pub checkpoint: Option<RecoveryCheckpoint>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub evicted: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ToolOutcome {
    fn new(call: &ToolCall) -> Self {
        Self {
            tool_name: call.tool_name.clone(),
            tool_call_id: call.tool_call_id.clone(),
            checkpoint: None,
            evicted: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn skipped(mut self, reason: &str) -> Self {
        warn!(tool = %self.tool_name, reason, "no checkpoint recorded");
        self.warnings.push(format!("no checkpoint available: {reason}"));
        self
    }
}

fn record(
    store: &mut CheckpointStore,
    call: &ToolCall,
    state: RecoveryState,
    restored_from_snapshot_id: Option<String>,
) -> ToolOutcome {
    let checkpoint = RecoveryCheckpoint {
        id: make_short_random_id("ckpt", 12),
        tool_name: call.tool_name.clone(),
        tool_call_id: call.tool_call_id.clone(),
        at: now_epoch_ms(),
        address: state.display_address(),
        changed_count: state.changed_count(),
        restored_from_snapshot_id,
        state,
    };
    let mut outcome = ToolOutcome::new(call);
    outcome.evicted = store
        .append(checkpoint.clone())
        .into_iter()
        .map(|evicted| evicted.id)
        .collect();
    outcome.checkpoint = Some(checkpoint);
    outcome
}

fn require_sheet<A: WorkbookAccessor + ?Sized>(accessor: &A, sheet: &SheetRef) -> Result<SheetInfo> {
    match accessor.resolve_sheet(sheet) {
        Some(info) => Ok(info),
        None => bail!(RecoveryError::SheetNotFound(match sheet {
            SheetRef::Id(id) => id.clone(),
            SheetRef::Name(name) => name.clone(),
        })),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StructureOp {
    RenameSheet {
        sheet: SheetRef,
        new_name: String,
    },
    SetSheetVisibility {
        sheet: SheetRef,
        visibility: SheetVisibility,
    },
    AddSheet {
        name: String,
        #[serde(default)]
        position: Option<u32>,
        #[serde(default)]
        visibility: Option<SheetVisibility>,
    },
    DeleteSheet {
        sheet: SheetRef,
        #[serde(default)]
        allow_data_delete: bool,
    },
    InsertRows {
        sheet: SheetRef,
        position: u32,
        count: u32,
    },
    DeleteRows {
        sheet: SheetRef,
        position: u32,
        count: u32,
        #[serde(default)]
        allow_data_delete: bool,
    },
    InsertColumns {
        sheet: SheetRef,
        position: AxisPosition,
        count: u32,
    },
    DeleteColumns {
        sheet: SheetRef,
        position: AxisPosition,
        count: u32,
        #[serde(default)]
        allow_data_delete: bool,
    },
}

impl StructureOp {
    pub fn tool_name(&self) -> &'static str {
        match self {
            StructureOp::RenameSheet { .. } => "rename_sheet",
            StructureOp::SetSheetVisibility { .. } => "set_sheet_visibility",
            StructureOp::AddSheet { .. } => "add_sheet",
            StructureOp::DeleteSheet { .. } => "delete_sheet",
            StructureOp::InsertRows { .. } => "insert_rows",
            StructureOp::DeleteRows { .. } => "delete_rows",
            StructureOp::InsertColumns { .. } => "insert_columns",
            StructureOp::DeleteColumns { .. } => "delete_columns",
        }
    }
}

fn column_position(position: &AxisPosition) -> Result<u32> {
    match normalize_position(Some(position), true) {
        Some(column) => Ok(column),
        None => bail!(RecoveryError::InvalidRequest(format!(
            "invalid column position: {:?}",
            position
        ))),
    }
}

pub fn modify_structure<A: WorkbookAccessor + ?Sized>(
    accessor: &mut A,
    store: &mut CheckpointStore,
    limits: &CaptureLimits,
    call: ToolCall,
    op: StructureOp,
) -> Result<ToolOutcome> {
    let prior = match op {
        StructureOp::RenameSheet { sheet, new_name } => {
            let captured = capture_modify_structure_state(
                accessor,
                &StructureCaptureRequest::sheet(StructureCaptureKind::SheetName, sheet.clone()),
            )?;
            let info = require_sheet(accessor, &sheet)?;
            if let Some(owner) = accessor.sheet_by_name(&new_name)
                && owner.id != info.id
            {
                bail!(RecoveryError::TargetExists {
                    target: format!("sheet '{}'", owner.name)
                });
            }
            accessor.rename_sheet(&info.id, &new_name)?;
            captured
        }
        StructureOp::SetSheetVisibility { sheet, visibility } => {
            let captured = capture_modify_structure_state(
                accessor,
                &StructureCaptureRequest::sheet(StructureCaptureKind::SheetVisibility, sheet.clone()),
            )?;
            let info = require_sheet(accessor, &sheet)?;
            accessor.set_sheet_visibility(&info.id, visibility)?;
            captured
        }
        StructureOp::AddSheet {
            name,
            position,
            visibility,
        } => {
            let created = accessor.add_sheet(&NewSheet {
                id: None,
                name,
                position,
                visibility: visibility.unwrap_or_default(),
            })?;
            capture_modify_structure_state(
                accessor,
                &StructureCaptureRequest::sheet(
                    StructureCaptureKind::SheetAbsent,
                    SheetRef::Id(created.id),
                ),
            )?
        }
        StructureOp::DeleteSheet {
            sheet,
            allow_data_delete,
        } => {
            let info = require_sheet(accessor, &sheet)?;
            let target = RecoveryModifyStructureState::SheetAbsent {
                sheet_id: info.id,
                sheet_name: info.name,
                allow_data_delete: Some(allow_data_delete),
            };
            Some(apply_modify_structure_state(accessor, &target, limits)?)
        }
        StructureOp::InsertRows {
            sheet,
            position,
            count,
        } => {
            check_span(Axis::Rows, position, count)?;
            let captured = capture_modify_structure_state(
                accessor,
                &StructureCaptureRequest::axis(
                    StructureCaptureKind::RowsAbsent,
                    sheet.clone(),
                    position,
                    count,
                ),
            )?;
            let info = require_sheet(accessor, &sheet)?;
            accessor.insert_rows(&info.id, position, count)?;
            captured
        }
        StructureOp::DeleteRows {
            sheet,
            position,
            count,
            allow_data_delete,
        } => {
            let info = require_sheet(accessor, &sheet)?;
            let target = RecoveryModifyStructureState::RowsAbsent {
                sheet_id: info.id,
                sheet_name: info.name,
                position,
                count,
                allow_data_delete: Some(allow_data_delete),
            };
            Some(apply_modify_structure_state(accessor, &target, limits)?)
        }
        StructureOp::InsertColumns {
            sheet,
            position,
            count,
        } => {
            let column = column_position(&position)?;
            check_span(Axis::Columns, column, count)?;
            let captured = capture_modify_structure_state(
                accessor,
                &StructureCaptureRequest::axis(
                    StructureCaptureKind::ColumnsAbsent,
                    sheet.clone(),
                    column,
                    count,
                ),
            )?;
            let info = require_sheet(accessor, &sheet)?;
            accessor.insert_columns(&info.id, column, count)?;
            captured
        }
        StructureOp::DeleteColumns {
            sheet,
            position,
            count,
            allow_data_delete,
        } => {
            let column = column_position(&position)?;
            let info = require_sheet(accessor, &sheet)?;
            let target = RecoveryModifyStructureState::ColumnsAbsent {
                sheet_id: info.id,
                sheet_name: info.name,
                position: column,
                count,
                allow_data_delete: Some(allow_data_delete),
            };
            Some(apply_modify_structure_state(accessor, &target, limits)?)
        }
    };

    Ok(match prior {
        Some(state) => record(store, &call, RecoveryState::ModifyStructure(state), None),
        None => ToolOutcome::new(&call).skipped("nothing to capture for this structural edit"),
    })
}

/// Write a grid of values/formulas into `address`.
pub fn write_values<A: WorkbookAccessor + ?Sized>(
    accessor: &mut A,
    store: &mut CheckpointStore,
    limits: &CaptureLimits,
    call: ToolCall,
    sheet: &SheetRef,
    address: &str,
    values: Vec<Vec<CellValue>>,
) -> Result<ToolOutcome> {
    let info = require_sheet(accessor, sheet)?;
    let range = require_range(address)?;
    let (rows, columns) = (range.row_count() as usize, range.column_count() as usize);
    if !is_rectangular(&values, rows, columns) {
        bail!(RecoveryError::InvalidRequest(format!(
            "values must be a {}x{} grid for {}",
            rows, columns, range
        )));
    }
    let formulas = values
        .iter()
        .map(|row| {
            row.iter()
                .map(|value| match value {
                    CellValue::Text(text) if is_formula(text) => text.clone(),
                    _ => String::new(),
                })
                .collect()
        })
        .collect();
    let target = RecoveryRangeValuesState {
        sheet_id: info.id,
        sheet_name: info.name,
        data_range: RecoveryStructureValueRangeState {
            address: range.to_a1(),
            row_count: range.row_count(),
            column_count: range.column_count(),
            values,
            formulas,
        },
    };
    let prior = apply_range_values_state(accessor, &target, limits)?;
    Ok(record(store, &call, RecoveryState::RangeValues(prior), None))
}

/// Format properties to set. A facet is touched when its field is present or
/// it is listed in `clear` (reset to default).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct FormatPatch {
    pub number_format: Option<String>,
    pub fill_color: Option<String>,
    pub font_color: Option<String>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<UnderlineStyle>,
    pub font_name: Option<String>,
    pub font_size: Option<f64>,
    pub horizontal_alignment: Option<HorizontalAlignment>,
    pub vertical_alignment: Option<VerticalAlignment>,
    pub wrap_text: Option<bool>,
    pub border_top: Option<BorderEdge>,
    pub border_bottom: Option<BorderEdge>,
    pub border_left: Option<BorderEdge>,
    pub border_right: Option<BorderEdge>,
    pub border_inside_horizontal: Option<BorderEdge>,
    pub border_inside_vertical: Option<BorderEdge>,
    pub clear: Vec<FormatFacet>,
}

impl FormatPatch {
    fn has(&self, facet: FormatFacet) -> bool {
        match facet {
            FormatFacet::NumberFormat => self.number_format.is_some(),
            FormatFacet::FillColor => self.fill_color.is_some(),
            FormatFacet::FontColor => self.font_color.is_some(),
            FormatFacet::Bold => self.bold.is_some(),
            FormatFacet::Italic => self.italic.is_some(),
            FormatFacet::Underline => self.underline.is_some(),
            FormatFacet::FontName => self.font_name.is_some(),
            FormatFacet::FontSize => self.font_size.is_some(),
            FormatFacet::HorizontalAlignment => self.horizontal_alignment.is_some(),
            FormatFacet::VerticalAlignment => self.vertical_alignment.is_some(),
            FormatFacet::WrapText => self.wrap_text.is_some(),
            FormatFacet::BorderTop => self.border_top.is_some(),
            FormatFacet::BorderBottom => self.border_bottom.is_some(),
            FormatFacet::BorderLeft => self.border_left.is_some(),
            FormatFacet::BorderRight => self.border_right.is_some(),
            FormatFacet::BorderInsideHorizontal => self.border_inside_horizontal.is_some(),
            FormatFacet::BorderInsideVertical => self.border_inside_vertical.is_some(),
        }
    }

    pub fn selection(&self) -> RecoveryFormatSelection {
        let mut selection = RecoveryFormatSelection::default();
        for facet in FormatFacet::iter() {
            if self.has(facet) || self.clear.contains(&facet) {
                selection.select(facet);
            }
        }
        selection
    }

    /// Write this patch's value for `facet` into `format`.
    fn fill(&self, facet: FormatFacet, format: &mut CellFormat) {
        match facet {
            FormatFacet::NumberFormat => format.number_format = self.number_format.clone(),
            FormatFacet::FillColor => format.fill_color = self.fill_color.clone(),
            FormatFacet::FontColor => format.font_color = self.font_color.clone(),
            FormatFacet::Bold => format.bold = self.bold,
            FormatFacet::Italic => format.italic = self.italic,
            FormatFacet::Underline => format.underline = self.underline,
            FormatFacet::FontName => format.font_name = self.font_name.clone(),
            FormatFacet::FontSize => format.font_size = self.font_size,
            FormatFacet::HorizontalAlignment => {
                format.horizontal_alignment = self.horizontal_alignment
            }
            FormatFacet::VerticalAlignment => format.vertical_alignment = self.vertical_alignment,
            FormatFacet::WrapText => format.wrap_text = self.wrap_text,
            FormatFacet::BorderTop => format.border_top = self.border_top.clone(),
            FormatFacet::BorderBottom => format.border_bottom = self.border_bottom.clone(),
            FormatFacet::BorderLeft => format.border_left = self.border_left.clone(),
            FormatFacet::BorderRight => format.border_right = self.border_right.clone(),
            FormatFacet::BorderInsideHorizontal => {
                format.border_bottom = self.border_inside_horizontal.clone()
            }
            FormatFacet::BorderInsideVertical => {
                format.border_right = self.border_inside_vertical.clone()
            }
        }
    }

    fn area_state(&self, selection: &RecoveryFormatSelection, area: &CellRange) -> RecoveryFormatAreaState {
        let cells = (area.start.row..=area.end.row)
            .map(|row| {
                (area.start.col..=area.end.col)
                    .map(|col| {
                        let cell = CellAddress::new(col, row);
                        let mut format = CellFormat::default();
                        for facet in selection.facets() {
                            if facet.property_at(area, cell).is_some() {
                                self.fill(facet, &mut format);
                            }
                        }
                        format
                    })
                    .collect()
            })
            .collect();
        RecoveryFormatAreaState {
            address: area.to_a1(),
            row_count: area.row_count(),
            column_count: area.column_count(),
            cells,
        }
    }
}

/// Apply `patch` to one or more areas of a sheet.
pub fn format_ranges<A: WorkbookAccessor + ?Sized>(
    accessor: &mut A,
    store: &mut CheckpointStore,
    limits: &CaptureLimits,
    call: ToolCall,
    sheet: &SheetRef,
    areas: &[String],
    patch: &FormatPatch,
) -> Result<ToolOutcome> {
    let info = require_sheet(accessor, sheet)?;
    let ranges = areas
        .iter()
        .map(|address| require_range(address))
        .collect::<Result<Vec<_>>>()?;
    let selection = patch.selection();
    if selection.is_empty() || ranges.is_empty() {
        return Ok(ToolOutcome::new(&call).skipped("no format properties selected"));
    }
    limits.check(ranges.iter().map(CellRange::cell_count).sum())?;

    let target = RecoveryFormatRangeState {
        sheet_id: info.id,
        sheet_name: info.name,
        areas: ranges
            .iter()
            .map(|range| patch.area_state(&selection, range))
            .collect(),
        selection,
    };
    let prior = apply_format_state(accessor, &target, limits)?;
    Ok(record(store, &call, RecoveryState::FormatRange(prior), None))
}

/// Replace the conditional formats applying to `address`.
pub fn set_conditional_formats<A: WorkbookAccessor + ?Sized>(
    accessor: &mut A,
    store: &mut CheckpointStore,
    call: ToolCall,
    sheet: &SheetRef,
    address: &str,
    rules: Vec<RecoveryConditionalFormatRule>,
) -> Result<ToolOutcome> {
    let info = require_sheet(accessor, sheet)?;
    let range = require_range(address)?;
    let target = RecoveryConditionalFormatState {
        sheet_id: info.id,
        sheet_name: info.name,
        address: range.to_a1(),
        rules,
    };
    let prior = apply_conditional_format_state(accessor, &target)?;
    Ok(record(store, &call, RecoveryState::ConditionalFormat(prior), None))
}

/// Undo the edit behind checkpoint `id`.
///
/// The checkpoint is consumed; the state returned by the apply is appended as
/// a new checkpoint pointing back at it, so the restore can itself be undone.
pub fn restore_checkpoint<A: WorkbookAccessor + ?Sized>(
    accessor: &mut A,
    store: &mut CheckpointStore,
    limits: &CaptureLimits,
    id: &str,
) -> Result<ToolOutcome> {
    let Some(checkpoint) = store.get(id).cloned() else {
        bail!(RecoveryError::InvalidRequest(format!(
            "checkpoint '{}' not found",
            id
        )));
    };
    let reverse = apply_recovery_state(accessor, &checkpoint.state, limits)?;
    store.remove(id);
    info!(id, kind = checkpoint.state.type_name(), "restored checkpoint");
    let call = ToolCall::new("restore_checkpoint");
    Ok(record(store, &call, reverse, Some(checkpoint.id)))
}
