use std::collections::BTreeMap;

use anyhow::{Result, anyhow, bail};

use crate::accessor::{NewSheet, RangeSnapshot, SheetInfo, WorkbookAccessor};
use crate::errors::RecoveryError;
use crate::grid::{Axis, AxisEdit, CellAddress, CellRange, is_formula, is_rectangular};
use crate::model::{
    CellFormat, CellFormatProperty, CellValue, RecoveryConditionalFormatRule, SheetVisibility,
};

#[derive(Debug, Clone, PartialEq)]
struct MemoryCell {
    value: CellValue,
    formula: Option<String>,
}

/// Cell maps are keyed `(row, col)` so iteration is row-major.
#[derive(Debug, Clone)]
struct MemorySheet {
    id: String,
    name: String,
    visibility: SheetVisibility,
    cells: BTreeMap<(u32, u32), MemoryCell>,
    formats: BTreeMap<(u32, u32), CellFormat>,
    conditional_formats: Vec<(CellRange, Vec<RecoveryConditionalFormatRule>)>,
}

impl MemorySheet {
    fn new(id: String, name: String, visibility: SheetVisibility) -> Self {
        Self {
            id,
            name,
            visibility,
            cells: BTreeMap::new(),
            formats: BTreeMap::new(),
            conditional_formats: Vec::new(),
        }
    }
}

/// An in-memory workbook.
///
/// Behaves like the host application for the rules recovery relies on: sheet
/// names are unique ignoring case, a workbook keeps at least one visible
/// sheet, and inserting or deleting rows/columns shifts the cells after them.
/// Formula text is stored verbatim and never recalculated or rewritten.
#[derive(Debug, Clone, Default)]
pub struct MemoryWorkbook {
    sheets: Vec<MemorySheet>,
    next_id: u64,
}

impl MemoryWorkbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheets(names: &[&str]) -> Self {
        let mut book = Self::new();
        for name in names {
            let id = book.mint_id();
            book.sheets
                .push(MemorySheet::new(id, name.to_string(), SheetVisibility::Visible));
        }
        book
    }

    fn mint_id(&mut self) -> String {
        loop {
            self.next_id += 1;
            let id = format!("sheet-{}", self.next_id);
            if !self.sheets.iter().any(|sheet| sheet.id == id) {
                return id;
            }
        }
    }

    fn index_of(&self, sheet_id: &str) -> Result<usize> {
        self.sheets
            .iter()
            .position(|sheet| sheet.id == sheet_id)
            .ok_or_else(|| RecoveryError::SheetNotFound(sheet_id.to_string()).into())
    }

    fn sheet(&self, sheet_id: &str) -> Result<&MemorySheet> {
        let idx = self.index_of(sheet_id)?;
        Ok(&self.sheets[idx])
    }

    fn sheet_mut(&mut self, sheet_id: &str) -> Result<&mut MemorySheet> {
        let idx = self.index_of(sheet_id)?;
        Ok(&mut self.sheets[idx])
    }

    fn named(&self, name: &str) -> Result<&MemorySheet> {
        self.sheets
            .iter()
            .find(|sheet| sheet.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| anyhow!(RecoveryError::SheetNotFound(name.to_string())))
    }

    fn name_taken(&self, name: &str, except_id: Option<&str>) -> bool {
        let wanted = name.to_lowercase();
        self.sheets
            .iter()
            .any(|sheet| Some(sheet.id.as_str()) != except_id && sheet.name.to_lowercase() == wanted)
    }

    fn visible_count(&self) -> usize {
        self.sheets
            .iter()
            .filter(|sheet| sheet.visibility == SheetVisibility::Visible)
            .count()
    }

    /// Sets a value or, for `=...` text, a formula. Test and CLI seeding helper.
    pub fn set_cell(&mut self, sheet_name: &str, address: &str, value: impl Into<CellValue>) -> Result<()> {
        let id = self.named(sheet_name)?.id.clone();
        let cell = CellAddress::parse(address)
            .ok_or_else(|| anyhow!("invalid cell address: {}", address))?;
        let range = CellRange::new(cell, cell);
        self.write_cells(&id, &range, &[vec![value.into()]])
    }

    /// Formula with a cached result, as a recalculated workbook would hold it.
    pub fn set_formula_with_value(
        &mut self,
        sheet_name: &str,
        address: &str,
        formula: &str,
        cached: impl Into<CellValue>,
    ) -> Result<()> {
        let id = self.named(sheet_name)?.id.clone();
        let cell = CellAddress::parse(address)
            .ok_or_else(|| anyhow!("invalid cell address: {}", address))?;
        self.sheet_mut(&id)?.cells.insert(
            (cell.row, cell.col),
            MemoryCell {
                value: cached.into(),
                formula: Some(formula.to_string()),
            },
        );
        Ok(())
    }

    pub fn value(&self, sheet_name: &str, address: &str) -> Option<CellValue> {
        let cell = CellAddress::parse(address)?;
        let sheet = self.named(sheet_name).ok()?;
        sheet.cells.get(&(cell.row, cell.col)).map(|c| c.value.clone())
    }

    pub fn formula(&self, sheet_name: &str, address: &str) -> Option<String> {
        let cell = CellAddress::parse(address)?;
        let sheet = self.named(sheet_name).ok()?;
        sheet
            .cells
            .get(&(cell.row, cell.col))
            .and_then(|c| c.formula.clone())
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|sheet| sheet.name.clone()).collect()
    }

    fn shift(&mut self, sheet_id: &str, edit: AxisEdit) -> Result<()> {
        let sheet = self.sheet_mut(sheet_id)?;
        sheet.cells = std::mem::take(&mut sheet.cells)
            .into_iter()
            .filter_map(|((row, col), cell)| {
                let moved = edit.shift_cell(CellAddress::new(col, row))?;
                Some(((moved.row, moved.col), cell))
            })
            .collect();
        sheet.formats = std::mem::take(&mut sheet.formats)
            .into_iter()
            .filter_map(|((row, col), format)| {
                let moved = edit.shift_cell(CellAddress::new(col, row))?;
                Some(((moved.row, moved.col), format))
            })
            .collect();
        sheet.conditional_formats = std::mem::take(&mut sheet.conditional_formats)
            .into_iter()
            .filter_map(|(range, rules)| edit.shift_range(&range).map(|r| (r, rules)))
            .collect();
        Ok(())
    }
}

impl WorkbookAccessor for MemoryWorkbook {
    fn sheets(&self) -> Vec<SheetInfo> {
        self.sheets
            .iter()
            .enumerate()
            .map(|(idx, sheet)| SheetInfo {
                id: sheet.id.clone(),
                name: sheet.name.clone(),
                position: idx as u32,
                visibility: sheet.visibility,
            })
            .collect()
    }

    fn used_range(&self, sheet_id: &str) -> Result<Option<CellRange>> {
        let sheet = self.sheet(sheet_id)?;
        let mut used: Option<CellRange> = None;
        for (&(row, col), cell) in &sheet.cells {
            if cell.value.is_empty() && cell.formula.is_none() {
                continue;
            }
            let here = CellRange::new(CellAddress::new(col, row), CellAddress::new(col, row));
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
                match sheet.cells.get(&(row, col)) {
                    Some(cell) => {
                        values.push(cell.value.clone());
                        formulas.push(cell.formula.clone().unwrap_or_default());
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
        for (cell, value) in range.cells().zip(grid.iter().flatten()) {
            let key = (cell.row, cell.col);
            match value {
                CellValue::Text(text) if text.is_empty() => {
                    sheet.cells.remove(&key);
                }
                CellValue::Text(text) if is_formula(text) => {
                    sheet.cells.insert(
                        key,
                        MemoryCell {
                            value: CellValue::empty(),
                            formula: Some(text.clone()),
                        },
                    );
                }
                other => {
                    sheet.cells.insert(
                        key,
                        MemoryCell {
                            value: other.clone(),
                            formula: None,
                        },
                    );
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
        if self.name_taken(name, Some(sheet_id)) {
            bail!(RecoveryError::TargetExists {
                target: format!("sheet '{}'", name)
            });
        }
        self.sheet_mut(sheet_id)?.name = name.to_string();
        Ok(())
    }

    fn set_sheet_visibility(&mut self, sheet_id: &str, visibility: SheetVisibility) -> Result<()> {
        let idx = self.index_of(sheet_id)?;
        let currently_visible = self.sheets[idx].visibility == SheetVisibility::Visible;
        if currently_visible && visibility != SheetVisibility::Visible && self.visible_count() <= 1 {
            bail!(RecoveryError::InvalidRequest(
                "cannot hide the last visible sheet".to_string()
            ));
        }
        self.sheets[idx].visibility = visibility;
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
            Some(id) if self.sheets.iter().any(|sheet| &sheet.id == id) => {
                bail!(RecoveryError::TargetExists {
                    target: format!("sheet id {}", id)
                });
            }
            Some(id) => id.clone(),
            None => self.mint_id(),
        };
        let position = request
            .position
            .map(|p| (p as usize).min(self.sheets.len()))
            .unwrap_or(self.sheets.len());
        self.sheets.insert(
            position,
            MemorySheet::new(id.clone(), name.to_string(), request.visibility),
        );
        Ok(SheetInfo {
            id,
            name: name.to_string(),
            position: position as u32,
            visibility: request.visibility,
        })
    }

    fn delete_sheet(&mut self, sheet_id: &str) -> Result<()> {
        let idx = self.index_of(sheet_id)?;
        if self.sheets.len() <= 1 {
            bail!(RecoveryError::InvalidRequest(
                "cannot delete the last remaining sheet".to_string()
            ));
        }
        if self.sheets[idx].visibility == SheetVisibility::Visible && self.visible_count() <= 1 {
            bail!(RecoveryError::InvalidRequest(
                "cannot delete the last visible sheet".to_string()
            ));
        }
        self.sheets.remove(idx);
        Ok(())
    }

    fn insert_rows(&mut self, sheet_id: &str, position: u32, count: u32) -> Result<()> {
        let edit = AxisEdit::new(Axis::Rows, position, count, true)?;
        self.shift(sheet_id, edit)
    }

    fn delete_rows(&mut self, sheet_id: &str, position: u32, count: u32) -> Result<()> {
        let edit = AxisEdit::new(Axis::Rows, position, count, false)?;
        self.shift(sheet_id, edit)
    }

    fn insert_columns(&mut self, sheet_id: &str, position: u32, count: u32) -> Result<()> {
        let edit = AxisEdit::new(Axis::Columns, position, count, true)?;
        self.shift(sheet_id, edit)
    }

    fn delete_columns(&mut self, sheet_id: &str, position: u32, count: u32) -> Result<()> {
        let edit = AxisEdit::new(Axis::Columns, position, count, false)?;
        self.shift(sheet_id, edit)
    }

    fn read_cell_format(&self, sheet_id: &str, cell: CellAddress) -> Result<CellFormat> {
        let sheet = self.sheet(sheet_id)?;
        Ok(sheet
            .formats
            .get(&(cell.row, cell.col))
            .cloned()
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
        let key = (cell.row, cell.col);
        let mut current = sheet.formats.remove(&key).unwrap_or_default();
        for prop in properties {
            current.copy_property(format, *prop);
        }
        if current != CellFormat::default() {
            sheet.formats.insert(key, current);
        }
        Ok(())
    }

    fn conditional_formats(
        &self,
        sheet_id: &str,
        range: &CellRange,
    ) -> Result<Vec<RecoveryConditionalFormatRule>> {
        let sheet = self.sheet(sheet_id)?;
        Ok(sheet
            .conditional_formats
            .iter()
            .filter(|(applies_to, _)| applies_to == range)
            .flat_map(|(_, rules)| rules.iter().cloned())
            .collect())
    }

    fn set_conditional_formats(
        &mut self,
        sheet_id: &str,
        range: &CellRange,
        rules: &[RecoveryConditionalFormatRule],
    ) -> Result<()> {
        let sheet = self.sheet_mut(sheet_id)?;
        sheet
            .conditional_formats
            .retain(|(applies_to, _)| applies_to != range);
        if !rules.is_empty() {
            sheet.conditional_formats.push((*range, rules.to_vec()));
        }
        Ok(())
    }
}
