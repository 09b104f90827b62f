use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::errors::RecoveryError;
use crate::grid::{CellRange, grid_extent, is_rectangular};

/// A scalar cell value as the workbook reports it. Empty cells are `Text("")`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum CellValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Default for CellValue {
    fn default() -> Self {
        CellValue::Text(String::new())
    }
}

impl CellValue {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Text(text) if text.is_empty())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Display form used when a backend stores everything as strings.
    pub fn to_display(&self) -> String {
        match self {
            CellValue::Bool(true) => "TRUE".to_string(),
            CellValue::Bool(false) => "FALSE".to_string(),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            CellValue::Text(text) => text.clone(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

/// Values and formulas of a rectangular block, captured before it is destroyed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryStructureValueRangeState {
    /// Sheet-local A1 address, e.g. `A5:C7`.
    pub address: String,
    pub row_count: u32,
    pub column_count: u32,
    pub values: Vec<Vec<CellValue>>,
    /// Formula text (leading `=`) or `""` for plain cells.
    pub formulas: Vec<Vec<String>>,
}

impl RecoveryStructureValueRangeState {
    pub fn range(&self) -> Result<CellRange, RecoveryError> {
        CellRange::parse(&self.address).ok_or_else(|| {
            RecoveryError::CorruptState(format!("invalid data range address '{}'", self.address))
        })
    }

    /// Both grids must span exactly `row_count` x `column_count`, matching the address.
    pub fn validate(&self) -> Result<(), RecoveryError> {
        let (rows, columns) = (self.row_count as usize, self.column_count as usize);
        if !is_rectangular(&self.values, rows, columns)
            || !is_rectangular(&self.formulas, rows, columns)
        {
            let values = grid_extent(&self.values);
            let formulas = grid_extent(&self.formulas);
            return Err(RecoveryError::CorruptState(format!(
                "data range {} declares {}x{} but holds values {}x{} and formulas {}x{}",
                self.address,
                rows,
                columns,
                values.0,
                values.1,
                formulas.0,
                formulas.1
            )));
        }
        let range = self.range()?;
        if range.row_count() != self.row_count || range.column_count() != self.column_count {
            return Err(RecoveryError::CorruptState(format!(
                "data range address {} does not span {}x{}",
                self.address, self.row_count, self.column_count
            )));
        }
        Ok(())
    }

    pub fn cell_count(&self) -> u64 {
        self.row_count as u64 * self.column_count as u64
    }
}

/// Result of reading the data that an operation is about to destroy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "status", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum DataRangeCapture {
    Empty,
    Captured {
        data_range: RecoveryStructureValueRangeState,
    },
    TooLarge {
        cell_count: u64,
    },
}

impl DataRangeCapture {
    pub fn data_range(&self) -> Option<&RecoveryStructureValueRangeState> {
        match self {
            DataRangeCapture::Captured { data_range } => Some(data_range),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(values: Vec<Vec<CellValue>>, formulas: Vec<Vec<String>>) -> RecoveryStructureValueRangeState {
        RecoveryStructureValueRangeState {
            address: "A1:B1".to_string(),
            row_count: 1,
            column_count: 2,
            values,
            formulas,
        }
    }

    #[test]
    fn validate_checks_both_grids() {
        let ok = state(
            vec![vec![1.0.into(), "x".into()]],
            vec![vec![String::new(), String::new()]],
        );
        assert!(ok.validate().is_ok());

        let short = state(vec![vec![1.0.into()]], vec![vec![String::new(), String::new()]]);
        assert!(matches!(short.validate(), Err(RecoveryError::CorruptState(_))));

        let mut wrong_address = ok.clone();
        wrong_address.address = "A1:C1".to_string();
        assert!(wrong_address.validate().is_err());
    }

    #[test]
    fn cell_values_serialize_untagged() {
        let row = vec![CellValue::Number(2.5), CellValue::Bool(true), CellValue::empty()];
        assert_eq!(
            serde_json::to_value(&row).unwrap(),
            serde_json::json!([2.5, true, ""])
        );
        assert_eq!(CellValue::Number(3.0).to_display(), "3");
    }
}
