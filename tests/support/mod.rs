#![allow(dead_code)]

use std::path::Path;

use spreadsheet_recovery::model::CellValue;
use spreadsheet_recovery::{CheckpointStore, MemoryWorkbook, WorkbookAccessor};

/// `Data` holds `r{n}` in A1:A10 and `n*10` in B1:B10; `Other` is empty.
pub fn data_book() -> MemoryWorkbook {
    let mut book = MemoryWorkbook::with_sheets(&["Data", "Other"]);
    for row in 1..=10 {
        book.set_cell("Data", &format!("A{row}"), format!("r{row}").as_str())
            .expect("seed text");
        book.set_cell("Data", &format!("B{row}"), row as f64 * 10.0)
            .expect("seed number");
    }
    book
}

pub fn sheet_id<A: WorkbookAccessor>(book: &A, name: &str) -> String {
    book.sheet_by_name(name)
        .unwrap_or_else(|| panic!("sheet {name} exists"))
        .id
}

pub fn text(value: &str) -> CellValue {
    CellValue::Text(value.to_string())
}

pub fn column_a(book: &MemoryWorkbook, sheet: &str, rows: std::ops::RangeInclusive<u32>) -> Vec<CellValue> {
    rows.map(|row| {
        book.value(sheet, &format!("A{row}"))
            .unwrap_or_else(CellValue::empty)
    })
    .collect()
}

pub fn store() -> CheckpointStore {
    CheckpointStore::new(&serde_json::Value::Null)
}

/// Small xlsx with `Sheet1` and `Notes`; `Sheet1!A1:B3` holds values and a formula.
pub fn write_xlsx_fixture(path: &Path) {
    let mut book = umya_spreadsheet::new_file();
    {
        let sheet = book
            .get_sheet_by_name_mut("Sheet1")
            .expect("default sheet exists");
        sheet.get_cell_mut("A1").set_value("alpha");
        sheet.get_cell_mut("A2").set_value("beta");
        sheet.get_cell_mut("A3").set_value("gamma");
        sheet.get_cell_mut("B1").set_value_number(1.0);
        sheet.get_cell_mut("B2").set_value_number(2.0);
        sheet.get_cell_mut("B3").set_formula("SUM(B1:B2)");
    }
    book.new_sheet("Notes").expect("add sheet");
    umya_spreadsheet::writer::xlsx::write(&book, path).expect("write workbook");
}
