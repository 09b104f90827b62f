use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;
use umya_spreadsheet::structs::EnumTrait;
use umya_spreadsheet::{
    Cell, ConditionalFormatValues, ConditionalFormatting, ConditionalFormattingOperatorValues,
    ConditionalFormattingRule, Formula, Spreadsheet, Worksheet,
};

use crate::accessor::{NewSheet, RangeSnapshot, SheetInfo, WorkbookAccessor};
use crate::errors::RecoveryError;
use crate::grid::{Axis, AxisEdit, CellAddress, CellRange, is_formula, is_rectangular};
use crate::model::{
    CellFormat, CellFormatProperty, CellValue, CellValueOperator, ConditionalFormatCriteria,
    RecoveryConditionalFormatRule, SheetVisibility,
};
use crate::styles::{apply_cell_format, cell_format_from_style, conditional_style_from_dxf, dxf_style};
use crate::workbook::references::{EditedSheet, rewrite_formula};

/// Durable id for a sheet in a file-backed workbook. xlsx has no stable sheet
/// id, so the mapping is persisted next to the checkpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SheetIdentity {
    pub id: String,
    pub name: String,
}

/// An `.xlsx` file loaded with umya-spreadsheet.
///
/// Structural edits go through umya's worksheet primitives. Row and column
/// edits also rewrite references to the edited sheet in every formula and
/// workbook-level defined name; sheet renames do not.
pub struct XlsxWorkbook {
    book: Spreadsheet,
    /// Parallel to the sheet collection.
    ids: Vec<String>,
    next_id: u64,
}

impl XlsxWorkbook {
    /// Wrap a loaded book, reusing ids from `identities` by sheet name.
    pub fn from_spreadsheet(book: Spreadsheet, identities: &[SheetIdentity]) -> Self {
        let mut workbook = Self {
            book,
            ids: Vec::new(),
            next_id: 0,
        };
        let names: Vec<String> = workbook
            .book
            .get_sheet_collection_no_check()
            .iter()
            .map(|sheet| sheet.get_name().to_string())
            .collect();
        for name in names {
            let known = identities
                .iter()
                .find(|identity| identity.name.eq_ignore_ascii_case(&name))
                .map(|identity| identity.id.clone())
                .filter(|id| !workbook.ids.contains(id));
            let id = match known {
                Some(id) => id,
                None => workbook.mint_id(identities),
            };
            workbook.ids.push(id);
        }
        workbook
    }

    pub fn open(path: &Path, identities: &[SheetIdentity]) -> Result<Self> {
        let book = umya_spreadsheet::reader::xlsx::read(path)
            .with_context(|| format!("failed to open workbook '{}'", path.display()))?;
        Ok(Self::from_spreadsheet(book, identities))
    }

    /// Write through a sibling temp file so a failed save leaves the original intact.
    pub fn save(&self, path: &Path) -> Result<()> {
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let tmp = tempfile::Builder::new()
            .prefix(".recovery-")
            .suffix(".xlsx")
            .tempfile_in(parent)?;
        umya_spreadsheet::writer::xlsx::write(&self.book, tmp.path())
            .with_context(|| format!("failed to save workbook '{}'", path.display()))?;
        tmp.persist(path)
            .map_err(|err| err.error)
            .with_context(|| format!("failed to replace workbook '{}'", path.display()))?;
        Ok(())
    }

    pub fn identities(&self) -> Vec<SheetIdentity> {
        self.book
            .get_sheet_collection_no_check()
            .iter()
            .zip(&self.ids)
            .map(|(sheet, id)| SheetIdentity {
                id: id.clone(),
                name: sheet.get_name().to_string(),
            })
            .collect()
    }

    pub fn spreadsheet(&self) -> &Spreadsheet {
        &self.book
    }

    fn mint_id(&mut self, reserved: &[SheetIdentity]) -> String {
        loop {
            self.next_id += 1;
            let id = format!("sheet-{}", self.next_id);
            if !self.ids.contains(&id) && !reserved.iter().any(|identity| identity.id == id) {
                return id;
            }
        }
    }

    fn index_of(&self, sheet_id: &str) -> Result<usize> {
        self.ids
            .iter()
            .position(|id| id == sheet_id)
            .ok_or_else(|| anyhow!(RecoveryError::SheetNotFound(sheet_id.to_string())))
    }

    fn sheet(&self, sheet_id: &str) -> Result<&Worksheet> {
        let idx = self.index_of(sheet_id)?;
        self.book
            .get_sheet_collection_no_check()
            .get(idx)
            .ok_or_else(|| anyhow!(RecoveryError::SheetNotFound(sheet_id.to_string())))
    }

    fn sheet_mut(&mut self, sheet_id: &str) -> Result<&mut Worksheet> {
        let idx = self.index_of(sheet_id)?;
        self.book
            .get_sheet_collection_mut()
            .get_mut(idx)
            .ok_or_else(|| anyhow!(RecoveryError::SheetNotFound(sheet_id.to_string())))
    }

    fn name_taken(&self, name: &str, except_idx: Option<usize>) -> bool {
        self.book
            .get_sheet_collection_no_check()
            .iter()
            .enumerate()
            .any(|(idx, sheet)| Some(idx) != except_idx && sheet.get_name().eq_ignore_ascii_case(name))
    }

    fn visible_count(&self) -> usize {
        self.book
            .get_sheet_collection_no_check()
            .iter()
            .filter(|sheet| visibility_of(sheet) == SheetVisibility::Visible)
            .count()
    }

    /// Row/column insert or delete with formula references kept in step.
    ///
    /// umya rewrites formulas on the edited sheet only, and underflows on
    /// references into a deleted span. Formulas on that sheet are lifted off
    /// before the edit and every reference is rewritten here instead.
    fn restructure(&mut self, sheet_id: &str, edit: AxisEdit) -> Result<()> {
        let idx = self.index_of(sheet_id)?;
        let sheets = self.book.get_sheet_collection_mut();
        let sheet = sheets
            .get_mut(idx)
            .ok_or_else(|| anyhow!(RecoveryError::SheetNotFound(sheet_id.to_string())))?;
        let sheet_name = sheet.get_name().to_string();
        let lifted = lift_formulas(sheet);
        match (edit.axis, edit.insert) {
            (Axis::Rows, true) => sheet.insert_new_row(&edit.position, &edit.count),
            (Axis::Rows, false) => sheet.remove_row(&edit.position, &edit.count),
            (Axis::Columns, true) => sheet.insert_new_column_by_index(&edit.position, &edit.count),
            (Axis::Columns, false) => sheet.remove_column_by_index(&edit.position, &edit.count),
        }

        let local = EditedSheet {
            name: &sheet_name,
            local: true,
        };
        let mut rewritten = 0;
        for (cell, formula) in lifted {
            let Some(moved) = edit.shift_cell(cell) else {
                continue;
            };
            let formula = match rewrite_formula(&formula, local, &edit) {
                Some(text) => {
                    rewritten += 1;
                    text
                }
                None => formula,
            };
            sheet.get_cell_mut((moved.col, moved.row)).set_formula(formula);
        }

        let remote = EditedSheet {
            name: &sheet_name,
            local: false,
        };
        for (other_idx, other) in sheets.iter_mut().enumerate() {
            if other_idx != idx {
                rewritten += rewrite_sheet_formulas(other, remote, &edit);
            }
        }
        for defined in self.book.get_defined_names_mut().iter_mut() {
            if let Some(address) = rewrite_formula(&defined.get_address(), remote, &edit) {
                defined.set_address(address);
                rewritten += 1;
            }
        }

        debug!(
            sheet = %sheet_name,
            axis = ?edit.axis,
            position = edit.position,
            count = edit.count,
            insert = edit.insert,
            rewritten,
            "restructured sheet"
        );
        Ok(())
    }
}

/// Takes the formulas off `sheet`, leaving their cached values in place.
/// Shared-formula followers carry no text and are left as they are.
fn lift_formulas(sheet: &mut Worksheet) -> Vec<(CellAddress, String)> {
    let mut lifted = Vec::new();
    for cell in sheet.get_cell_collection_mut() {
        if !cell.is_formula() || cell.get_formula().is_empty() {
            continue;
        }
        let coordinate = cell.get_coordinate();
        let at = CellAddress::new(*coordinate.get_col_num(), *coordinate.get_row_num());
        lifted.push((at, cell.get_formula().to_string()));
        cell.get_cell_value_mut().remove_formula();
    }
    lifted
}

fn rewrite_sheet_formulas(sheet: &mut Worksheet, edited: EditedSheet<'_>, edit: &AxisEdit) -> usize {
    let mut rewritten = 0;
    for cell in sheet.get_cell_collection_mut() {
        if !cell.is_formula() {
            continue;
        }
        if let Some(formula) = rewrite_formula(cell.get_formula(), edited, edit) {
            cell.set_formula(formula);
            rewritten += 1;
        }
    }
    rewritten
}

fn visibility_of(sheet: &Worksheet) -> SheetVisibility {
    match sheet.get_sheet_state() {
        "hidden" => SheetVisibility::Hidden,
        "veryHidden" => SheetVisibility::VeryHidden,
        _ => SheetVisibility::Visible,
    }
}

fn sheet_state(visibility: SheetVisibility) -> &'static str {
    match visibility {
        SheetVisibility::Visible => "visible",
        SheetVisibility::Hidden => "hidden",
        SheetVisibility::VeryHidden => "veryHidden",
    }
}

fn cell_value(cell: &Cell) -> CellValue {
    let raw = cell.get_value();
    if raw.is_empty() {
        return CellValue::empty();
    }
    match cell.get_data_type() {
        "n" => raw
            .parse::<f64>()
            .map(CellValue::Number)
            .unwrap_or_else(|_| CellValue::Text(raw.to_string())),
        "b" => CellValue::Bool(raw.eq_ignore_ascii_case("true") || raw == "1"),
        _ => CellValue::Text(raw.to_string()),
    }
}

fn cell_formula(cell: &Cell) -> String {
    if cell.is_formula() {
        format!("={}", cell.get_formula())
    } else {
        String::new()
    }
}

fn normalize_sqref(sqref: &str) -> String {
    sqref.replace(' ', "").replace('$', "").to_ascii_uppercase()
}

fn operator_to_umya(operator: CellValueOperator) -> Option<ConditionalFormattingOperatorValues> {
    match operator {
        CellValueOperator::EqualTo => Some(ConditionalFormattingOperatorValues::Equal),
        CellValueOperator::NotEqualTo => Some(ConditionalFormattingOperatorValues::NotEqual),
        CellValueOperator::GreaterThan => Some(ConditionalFormattingOperatorValues::GreaterThan),
        CellValueOperator::LessThan => Some(ConditionalFormattingOperatorValues::LessThan),
        CellValueOperator::GreaterThanOrEqual => {
            Some(ConditionalFormattingOperatorValues::GreaterThanOrEqual)
        }
        CellValueOperator::LessThanOrEqual => {
            Some(ConditionalFormattingOperatorValues::LessThanOrEqual)
        }
        // umya keeps a single formula per rule
        CellValueOperator::Between | CellValueOperator::NotBetween => None,
    }
}

fn operator_from_umya(operator: &ConditionalFormattingOperatorValues) -> Option<CellValueOperator> {
    match operator {
        ConditionalFormattingOperatorValues::Equal => Some(CellValueOperator::EqualTo),
        ConditionalFormattingOperatorValues::NotEqual => Some(CellValueOperator::NotEqualTo),
        ConditionalFormattingOperatorValues::GreaterThan => Some(CellValueOperator::GreaterThan),
        ConditionalFormattingOperatorValues::LessThan => Some(CellValueOperator::LessThan),
        ConditionalFormattingOperatorValues::GreaterThanOrEqual => {
            Some(CellValueOperator::GreaterThanOrEqual)
        }
        ConditionalFormattingOperatorValues::LessThanOrEqual => {
            Some(CellValueOperator::LessThanOrEqual)
        }
        _ => None,
    }
}

fn unsupported(what: impl std::fmt::Display) -> anyhow::Error {
    anyhow!(RecoveryError::UnsupportedByBackend(format!(
        "xlsx backend does not support {what}"
    )))
}

fn rule_from_umya(rule: &ConditionalFormattingRule) -> Result<RecoveryConditionalFormatRule> {
    let formula = rule
        .get_formula()
        .map(|f| f.get_address_str())
        .unwrap_or_default();
    let format = rule.get_style().and_then(conditional_style_from_dxf);
    let criteria = match rule.get_type() {
        ConditionalFormatValues::Expression => ConditionalFormatCriteria::Custom { formula, format },
        ConditionalFormatValues::CellIs => {
            let operator = operator_from_umya(rule.get_operator()).ok_or_else(|| {
                unsupported(format!(
                    "cellIs operator '{}'",
                    rule.get_operator().get_value_string()
                ))
            })?;
            ConditionalFormatCriteria::CellValue {
                operator,
                formula1: formula,
                formula2: None,
                format,
            }
        }
        other => {
            return Err(unsupported(format!(
                "conditional format type '{}'",
                other.get_value_string()
            )));
        }
    };
    let priority = *rule.get_priority();
    Ok(RecoveryConditionalFormatRule {
        stop_if_true: (*rule.get_stop_if_true()).then_some(true),
        priority: (priority > 0).then_some(priority as u32),
        criteria,
    })
}

fn rule_to_umya(rule: &RecoveryConditionalFormatRule, priority: i32) -> Result<ConditionalFormattingRule> {
    let mut out = ConditionalFormattingRule::default();
    let (formula, format) = match &rule.criteria {
        ConditionalFormatCriteria::Custom { formula, format } => {
            out.set_type(ConditionalFormatValues::Expression);
            (formula, format)
        }
        ConditionalFormatCriteria::CellValue {
            operator,
            formula1,
            format,
            ..
        } => {
            let operator = operator_to_umya(*operator)
                .ok_or_else(|| unsupported(format!("cell value operator {:?}", operator)))?;
            out.set_type(ConditionalFormatValues::CellIs);
            out.set_operator(operator);
            (formula1, format)
        }
        other => {
            return Err(unsupported(format!(
                "conditional format type '{}'",
                other.type_name()
            )));
        }
    };
    let mut umya_formula = Formula::default();
    umya_formula.set_string_value(formula.trim().trim_start_matches('='));
    out.set_formula(umya_formula);
    out.set_priority(priority);
    if rule.stop_if_true == Some(true) {
        out.set_stop_if_true(true);
    }
    if let Some(format) = format {
        out.set_style(dxf_style(format));
    }
    Ok(out)
}

impl WorkbookAccessor for XlsxWorkbook {
    fn sheets(&self) -> Vec<SheetInfo> {
        self.book
            .get_sheet_collection_no_check()
            .iter()
            .zip(&self.ids)
            .enumerate()
            .map(|(idx, (sheet, id))| SheetInfo {
                id: id.clone(),
                name: sheet.get_name().to_string(),
                position: idx as u32,
                visibility: visibility_of(sheet),
            })
            .collect()
    }

    fn used_range(&self, sheet_id: &str) -> Result<Option<CellRange>> {
        let sheet = self.sheet(sheet_id)?;
        let mut used: Option<CellRange> = None;
        for cell in sheet.get_cell_collection() {
            if !cell.is_formula() && cell.get_value().is_empty() {
                continue;
            }
            let coordinate = cell.get_coordinate();
            let here = CellAddress::new(*coordinate.get_col_num(), *coordinate.get_row_num());
            let here = CellRange::new(here, here);
            used = Some(match used {
                Some(range) => range.union(&here),
                None => here,
            });
        }
        Ok(used)
    }

    fn read_cells(&self, sheet_id: &str, range: &CellRange) -> Result<RangeSnapshot> {
        let sheet = self.sheet(sheet_id)?;
        let mut snapshot = RangeSnapshot::default();
        for row in range.start.row..=range.end.row {
            let mut values = Vec::with_capacity(range.column_count() as usize);
            let mut formulas = Vec::with_capacity(range.column_count() as usize);
            for col in range.start.col..=range.end.col {
                match sheet.get_cell((col, row)) {
                    Some(cell) => {
                        values.push(cell_value(cell));
                        formulas.push(cell_formula(cell));
                    }
                    None => {
                        values.push(CellValue::empty());
                        formulas.push(String::new());
                    }
                }
            }
            snapshot.values.push(values);
            snapshot.formulas.push(formulas);
        }
        Ok(snapshot)
    }

    fn write_cells(
        &mut self,
        sheet_id: &str,
        range: &CellRange,
        grid: &[Vec<CellValue>],
    ) -> Result<()> {
        if !is_rectangular(grid, range.row_count() as usize, range.column_count() as usize) {
            bail!(RecoveryError::InvalidRequest(format!(
                "grid does not match the {}x{} shape of {}",
                range.row_count(),
                range.column_count(),
                range
            )));
        }
        let sheet = self.sheet_mut(sheet_id)?;
        for (addr, value) in range.cells().zip(grid.iter().flatten()) {
            let key = (addr.col, addr.row);
            match value {
                CellValue::Text(text) if text.is_empty() => {
                    if sheet.get_cell(key).is_some() {
                        sheet.get_cell_mut(key).set_value(String::new());
                    }
                }
                CellValue::Text(text) if is_formula(text) => {
                    let cell = sheet.get_cell_mut(key);
                    cell.set_formula(text[1..].to_string());
                    cell.get_cell_value_mut()
                        .set_formula_result_default(String::new());
                }
                CellValue::Text(text) => {
                    sheet.get_cell_mut(key).set_value_string(text.clone());
                }
                CellValue::Number(number) => {
                    sheet.get_cell_mut(key).set_value_number(*number);
                }
                CellValue::Bool(flag) => {
                    sheet.get_cell_mut(key).set_value_bool(*flag);
                }
            }
        }
        Ok(())
    }

    fn rename_sheet(&mut self, sheet_id: &str, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            bail!(RecoveryError::InvalidRequest("sheet name must not be empty".to_string()));
        }
        let idx = self.index_of(sheet_id)?;
        if self.name_taken(name, Some(idx)) {
            bail!(RecoveryError::TargetExists {
                target: format!("sheet '{}'", name)
            });
        }
        self.book
            .set_sheet_name(idx, name.to_string())
            .map_err(|e| anyhow!("failed to rename sheet {}: {}", sheet_id, e))?;
        debug!(sheet_id, name, "renamed sheet");
        Ok(())
    }

    fn set_sheet_visibility(&mut self, sheet_id: &str, visibility: SheetVisibility) -> Result<()> {
        let currently_visible = visibility_of(self.sheet(sheet_id)?) == SheetVisibility::Visible;
        if currently_visible && visibility != SheetVisibility::Visible && self.visible_count() <= 1 {
            bail!(RecoveryError::InvalidRequest(
                "cannot hide the last visible sheet".to_string()
            ));
        }
        self.sheet_mut(sheet_id)?
            .set_sheet_state(sheet_state(visibility).to_string());
        Ok(())
    }

    fn add_sheet(&mut self, request: &NewSheet) -> Result<SheetInfo> {
        let name = request.name.trim();
        if name.is_empty() {
            bail!(RecoveryError::InvalidRequest("sheet name must not be empty".to_string()));
        }
        if self.name_taken(name, None) {
            bail!(RecoveryError::TargetExists {
                target: format!("sheet '{}'", name)
            });
        }
        let id = match &request.id {
            Some(id) if self.ids.contains(id) => {
                bail!(RecoveryError::TargetExists {
                    target: format!("sheet id {}", id)
                });
            }
            Some(id) => id.clone(),
            None => self.mint_id(&[]),
        };

        self.book
            .new_sheet(name.to_string())
            .map_err(|e| anyhow!("failed to create sheet '{}': {}", name, e))?;
        let len = self.book.get_sheet_collection_no_check().len();
        let position = request
            .position
            .map(|p| (p as usize).min(len - 1))
            .unwrap_or(len - 1);
        if position != len - 1 {
            let sheets = self.book.get_sheet_collection_mut();
            let created = sheets.remove(len - 1);
            sheets.insert(position, created);
        }
        self.ids.insert(position, id.clone());
        if request.visibility != SheetVisibility::Visible {
            self.sheet_mut(&id)?
                .set_sheet_state(sheet_state(request.visibility).to_string());
        }
        debug!(sheet_id = %id, name, position, "added sheet");
        Ok(SheetInfo {
            id,
            name: name.to_string(),
            position: position as u32,
            visibility: request.visibility,
        })
    }

    fn delete_sheet(&mut self, sheet_id: &str) -> Result<()> {
        let idx = self.index_of(sheet_id)?;
        if self.ids.len() <= 1 {
            bail!(RecoveryError::InvalidRequest(
                "cannot delete the last remaining sheet".to_string()
            ));
        }
        let sheet = self.sheet(sheet_id)?;
        if visibility_of(sheet) == SheetVisibility::Visible && self.visible_count() <= 1 {
            bail!(RecoveryError::InvalidRequest(
                "cannot delete the last visible sheet".to_string()
            ));
        }
        let name = sheet.get_name().to_string();
        self.book
            .remove_sheet_by_name(&name)
            .map_err(|e| anyhow!("failed to delete sheet '{}': {}", name, e))?;
        self.ids.remove(idx);
        Ok(())
    }

    fn insert_rows(&mut self, sheet_id: &str, position: u32, count: u32) -> Result<()> {
        self.restructure(sheet_id, AxisEdit::new(Axis::Rows, position, count, true)?)
    }

    fn delete_rows(&mut self, sheet_id: &str, position: u32, count: u32) -> Result<()> {
        self.restructure(sheet_id, AxisEdit::new(Axis::Rows, position, count, false)?)
    }

    fn insert_columns(&mut self, sheet_id: &str, position: u32, count: u32) -> Result<()> {
        self.restructure(sheet_id, AxisEdit::new(Axis::Columns, position, count, true)?)
    }

    fn delete_columns(&mut self, sheet_id: &str, position: u32, count: u32) -> Result<()> {
        self.restructure(sheet_id, AxisEdit::new(Axis::Columns, position, count, false)?)
    }

    fn read_cell_format(&self, sheet_id: &str, cell: CellAddress) -> Result<CellFormat> {
        let sheet = self.sheet(sheet_id)?;
        Ok(sheet
            .get_cell((cell.col, cell.row))
            .map(|c| cell_format_from_style(c.get_style()))
            .unwrap_or_default())
    }

    fn write_cell_format(
        &mut self,
        sheet_id: &str,
        cell: CellAddress,
        format: &CellFormat,
        properties: &[CellFormatProperty],
    ) -> Result<()> {
        let sheet = self.sheet_mut(sheet_id)?;
        let target = sheet.get_cell_mut((cell.col, cell.row));
        let mut style = target.get_style().clone();
        apply_cell_format(&mut style, format, properties);
        target.set_style(style);
        Ok(())
    }

    fn conditional_formats(
        &self,
        sheet_id: &str,
        range: &CellRange,
    ) -> Result<Vec<RecoveryConditionalFormatRule>> {
        let sheet = self.sheet(sheet_id)?;
        let sqref = range.to_a1();
        let mut rules = Vec::new();
        for cf in sheet.get_conditional_formatting_collection() {
            if normalize_sqref(&cf.get_sequence_of_references().get_sqref()) != sqref {
                continue;
            }
            for rule in cf.get_conditional_collection() {
                rules.push(rule_from_umya(rule)?);
            }
        }
        rules.sort_by_key(|rule| rule.priority.unwrap_or(u32::MAX));
        Ok(rules)
    }

    fn set_conditional_formats(
        &mut self,
        sheet_id: &str,
        range: &CellRange,
        rules: &[RecoveryConditionalFormatRule],
    ) -> Result<()> {
        let sqref = range.to_a1();
        let sheet = self.sheet_mut(sheet_id)?;

        let kept: Vec<ConditionalFormatting> = sheet
            .get_conditional_formatting_collection()
            .iter()
            .filter(|cf| normalize_sqref(&cf.get_sequence_of_references().get_sqref()) != sqref)
            .cloned()
            .collect();
        let mut next = kept
            .iter()
            .flat_map(|cf| cf.get_conditional_collection())
            .map(|rule| *rule.get_priority())
            .max()
            .unwrap_or(0)
            .saturating_add(1)
            .max(1);

        // Build every rule before touching the sheet so an unsupported rule
        // leaves it unchanged.
        let mut built = Vec::with_capacity(rules.len());
        for rule in rules {
            let priority = match rule.priority {
                Some(priority) if priority > 0 => priority as i32,
                _ => {
                    let assigned = next;
                    next = next.saturating_add(1);
                    assigned
                }
            };
            built.push(rule_to_umya(rule, priority)?);
        }

        sheet.set_conditional_formatting_collection(kept);
        if !built.is_empty() {
            let mut cf = ConditionalFormatting::default();
            cf.get_sequence_of_references_mut().set_sqref(sqref.as_str());
            for rule in built {
                cf.add_conditional_collection(rule);
            }
            sheet.add_conditional_formatting_collection(cf);
        }
        debug!(sheet_id, address = %sqref, rules = rules.len(), "replaced conditional formats");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqref_comparison_ignores_case_spacing_and_anchors() {
        assert_eq!(normalize_sqref("$a$1: $c$3"), "A1:C3");
    }

    #[test]
    fn sheets_reuse_persisted_ids_by_name() {
        let mut book = umya_spreadsheet::new_file();
        book.new_sheet("Data").expect("add Data sheet");
        let identities = vec![SheetIdentity {
            id: "sheet-7".to_string(),
            name: "data".to_string(),
        }];
        let workbook = XlsxWorkbook::from_spreadsheet(book, &identities);
        let sheets = workbook.sheets();
        assert_eq!(sheets.len(), 2);
        assert_eq!(sheets[1].id, "sheet-7");
        assert_ne!(sheets[0].id, "sheet-7");
    }
}
