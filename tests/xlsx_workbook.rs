use anyhow::Result;
use assert_matches::assert_matches;
use spreadsheet_recovery::grid::{CellAddress, CellRange};
use spreadsheet_recovery::model::{
    CellValue, CellValueOperator, ConditionalFormatCriteria, ConditionalFormatStyle,
    RecoveryConditionalFormatRule, SheetVisibility,
};
use spreadsheet_recovery::tools::{
    format_ranges, modify_structure, restore_checkpoint, set_conditional_formats, write_values,
};
use spreadsheet_recovery::{
    AxisPosition, CaptureLimits, CheckpointStore, FormatPatch, RecoveryError, SheetRef, StructureOp, ToolCall,
    WorkbookAccessor, XlsxWorkbook, recovery_error,
};
use std::path::Path;
use tempfile::tempdir;

mod support;

fn values(book: &XlsxWorkbook, sheet: &str, address: &str) -> Result<Vec<Vec<CellValue>>> {
    let id = support::sheet_id(book, sheet);
    let range = CellRange::parse(address).expect("range");
    Ok(book.read_cells(&id, &range)?.values)
}

fn save(book: &XlsxWorkbook, store: &mut CheckpointStore, path: &Path, store_path: &Path) -> Result<()> {
    book.save(path)?;
    store.set_sheet_ids(book.identities());
    store.save(store_path)
}

#[test]
fn opening_assigns_ids_and_reads_cells() -> Result<()> {
    let tmp = tempdir()?;
    let path = tmp.path().join("book.xlsx");
    support::write_xlsx_fixture(&path);

    let book = XlsxWorkbook::open(&path, &[])?;
    let sheets = book.sheets();
    assert_eq!(
        sheets.iter().map(|sheet| sheet.name.as_str()).collect::<Vec<_>>(),
        vec!["Sheet1", "Notes"]
    );
    assert_ne!(sheets[0].id, sheets[1].id);

    let id = support::sheet_id(&book, "sheet1");
    let snapshot = book.read_cells(&id, &CellRange::parse("A1:B3").expect("range"))?;
    assert_eq!(snapshot.values[0][0], support::text("alpha"));
    assert_eq!(snapshot.values[1][1], CellValue::Number(2.0));
    assert_eq!(snapshot.formulas[2][1], "=SUM(B1:B2)");
    assert_eq!(
        book.used_range(&id)?,
        CellRange::parse("A1:B3")
    );
    assert_eq!(book.used_range(&support::sheet_id(&book, "Notes"))?, None);
    Ok(())
}

#[test]
fn sheet_ids_survive_renames_across_saves() -> Result<()> {
    let tmp = tempdir()?;
    let path = tmp.path().join("book.xlsx");
    let store_path = tmp.path().join("book.xlsx.recovery.json");
    support::write_xlsx_fixture(&path);

    let mut store = support::store();
    let mut book = XlsxWorkbook::open(&path, store.sheet_ids())?;
    let original_id = support::sheet_id(&book, "Sheet1");
    let checkpoint = modify_structure(
        &mut book,
        &mut store,
        &CaptureLimits::default(),
        ToolCall::new("rename_sheet"),
        StructureOp::RenameSheet {
            sheet: SheetRef::name("Sheet1"),
            new_name: "Ledger".to_string(),
        },
    )?
    .checkpoint
    .expect("checkpoint");
    save(&book, &mut store, &path, &store_path)?;

    let mut store = CheckpointStore::load(&store_path, &serde_json::Value::Null)?;
    let mut book = XlsxWorkbook::open(&path, store.sheet_ids())?;
    assert_eq!(support::sheet_id(&book, "Ledger"), original_id);

    restore_checkpoint(&mut book, &mut store, &CaptureLimits::default(), &checkpoint.id)?;
    assert_eq!(book.sheets()[0].name, "Sheet1");
    assert_eq!(book.sheets()[0].id, original_id);
    Ok(())
}

#[test]
fn deleted_rows_restore_after_a_save() -> Result<()> {
    let tmp = tempdir()?;
    let path = tmp.path().join("book.xlsx");
    let store_path = tmp.path().join("store.json");
    support::write_xlsx_fixture(&path);

    let mut store = support::store();
    let mut book = XlsxWorkbook::open(&path, store.sheet_ids())?;
    let err = modify_structure(
        &mut book,
        &mut store,
        &CaptureLimits::default(),
        ToolCall::new("delete_rows"),
        StructureOp::DeleteRows {
            sheet: SheetRef::name("Sheet1"),
            position: 2,
            count: 1,
            allow_data_delete: false,
        },
    )
    .unwrap_err();
    assert_matches!(
        recovery_error(&err),
        Some(RecoveryError::DataDeleteRefused { cell_count: 2, .. })
    );

    let checkpoint = modify_structure(
        &mut book,
        &mut store,
        &CaptureLimits::default(),
        ToolCall::new("delete_rows"),
        StructureOp::DeleteRows {
            sheet: SheetRef::name("Sheet1"),
            position: 2,
            count: 1,
            allow_data_delete: true,
        },
    )?
    .checkpoint
    .expect("checkpoint");
    assert_eq!(values(&book, "Sheet1", "A2")?, vec![vec![support::text("gamma")]]);
    save(&book, &mut store, &path, &store_path)?;

    let mut store = CheckpointStore::load(&store_path, &serde_json::Value::Null)?;
    let mut book = XlsxWorkbook::open(&path, store.sheet_ids())?;
    restore_checkpoint(&mut book, &mut store, &CaptureLimits::default(), &checkpoint.id)?;
    assert_eq!(
        values(&book, "Sheet1", "A1:B2")?,
        vec![
            vec![support::text("alpha"), CellValue::Number(1.0)],
            vec![support::text("beta"), CellValue::Number(2.0)],
        ]
    );
    assert_eq!(values(&book, "Sheet1", "A3")?, vec![vec![support::text("gamma")]]);
    Ok(())
}

fn formula(book: &XlsxWorkbook, sheet: &str, address: &str) -> Result<String> {
    let id = support::sheet_id(book, sheet);
    let range = CellRange::parse(address).expect("range");
    Ok(book.read_cells(&id, &range)?.formulas[0][0].clone())
}

#[test]
fn deleting_rows_that_feed_a_formula_leaves_ref_errors() -> Result<()> {
    let tmp = tempdir()?;
    let path = tmp.path().join("book.xlsx");
    support::write_xlsx_fixture(&path);

    let mut store = support::store();
    let mut book = XlsxWorkbook::open(&path, &[])?;
    let limits = CaptureLimits::default();
    write_values(
        &mut book,
        &mut store,
        &limits,
        ToolCall::new("write_values"),
        &SheetRef::name("Notes"),
        "A1",
        vec![vec![support::text("=Sheet1!B3*2")]],
    )?;

    let checkpoint = modify_structure(
        &mut book,
        &mut store,
        &limits,
        ToolCall::new("delete_rows"),
        StructureOp::DeleteRows {
            sheet: SheetRef::name("Sheet1"),
            position: 1,
            count: 2,
            allow_data_delete: true,
        },
    )?
    .checkpoint
    .expect("checkpoint");
    assert_eq!(values(&book, "Sheet1", "A1")?, vec![vec![support::text("gamma")]]);
    assert_eq!(formula(&book, "Sheet1", "B1")?, "=SUM(#REF!)");
    assert_eq!(formula(&book, "Notes", "A1")?, "=Sheet1!B1*2");
    save(&book, &mut store, &path, &tmp.path().join("store.json"))?;

    restore_checkpoint(&mut book, &mut store, &limits, &checkpoint.id)?;
    assert_eq!(
        values(&book, "Sheet1", "A1:B2")?,
        vec![
            vec![support::text("alpha"), CellValue::Number(1.0)],
            vec![support::text("beta"), CellValue::Number(2.0)],
        ]
    );
    assert_eq!(values(&book, "Sheet1", "A3")?, vec![vec![support::text("gamma")]]);
    assert_eq!(formula(&book, "Sheet1", "B3")?, "=SUM(#REF!)");
    assert_eq!(formula(&book, "Notes", "A1")?, "=Sheet1!B3*2");
    Ok(())
}

#[test]
fn inserting_columns_moves_references_on_every_sheet() -> Result<()> {
    let tmp = tempdir()?;
    let path = tmp.path().join("book.xlsx");
    support::write_xlsx_fixture(&path);

    let mut store = support::store();
    let mut book = XlsxWorkbook::open(&path, &[])?;
    let limits = CaptureLimits::default();
    let notes = support::sheet_id(&book, "Notes");
    book.write_cells(
        &notes,
        &CellRange::parse("A1").expect("range"),
        &[vec![support::text("=SUM(Sheet1!$B$1:$B$3)")]],
    )?;

    let checkpoint = modify_structure(
        &mut book,
        &mut store,
        &limits,
        ToolCall::new("insert_columns"),
        StructureOp::InsertColumns {
            sheet: SheetRef::name("Sheet1"),
            position: AxisPosition::Letters("B".to_string()),
            count: 2,
        },
    )?
    .checkpoint
    .expect("checkpoint");
    assert_eq!(formula(&book, "Sheet1", "D3")?, "=SUM(D1:D2)");
    assert_eq!(formula(&book, "Notes", "A1")?, "=SUM(Sheet1!$D$1:$D$3)");

    restore_checkpoint(&mut book, &mut store, &limits, &checkpoint.id)?;
    assert_eq!(formula(&book, "Sheet1", "B3")?, "=SUM(B1:B2)");
    assert_eq!(formula(&book, "Notes", "A1")?, "=SUM(Sheet1!$B$1:$B$3)");
    Ok(())
}

#[test]
fn structural_edits_past_the_sheet_edge_are_rejected() -> Result<()> {
    let tmp = tempdir()?;
    let path = tmp.path().join("book.xlsx");
    support::write_xlsx_fixture(&path);

    let mut store = support::store();
    let mut book = XlsxWorkbook::open(&path, &[])?;
    let limits = CaptureLimits::default();
    let id = support::sheet_id(&book, "Sheet1");

    let ops = [
        StructureOp::InsertRows {
            sheet: SheetRef::name("Sheet1"),
            position: 2,
            count: u32::MAX,
        },
        StructureOp::InsertColumns {
            sheet: SheetRef::name("Sheet1"),
            position: AxisPosition::Letters("XFD".to_string()),
            count: 2,
        },
        StructureOp::DeleteRows {
            sheet: SheetRef::name("Sheet1"),
            position: 1_048_576,
            count: 5,
            allow_data_delete: true,
        },
    ];
    for op in ops {
        let err = modify_structure(&mut book, &mut store, &limits, ToolCall::new("edit"), op)
            .unwrap_err();
        assert_matches!(recovery_error(&err), Some(RecoveryError::InvalidRequest(_)));
    }

    let err = book.delete_columns(&id, 0, 1).unwrap_err();
    assert_matches!(recovery_error(&err), Some(RecoveryError::InvalidRequest(_)));
    let err = book.insert_rows(&id, 3, u32::MAX).unwrap_err();
    assert_matches!(recovery_error(&err), Some(RecoveryError::InvalidRequest(_)));

    assert!(store.is_empty());
    assert_eq!(book.used_range(&id)?, CellRange::parse("A1:B3"));
    Ok(())
}

#[test]
fn deleted_sheets_come_back_at_their_tab() -> Result<()> {
    let tmp = tempdir()?;
    let path = tmp.path().join("book.xlsx");
    support::write_xlsx_fixture(&path);

    let mut store = support::store();
    let mut book = XlsxWorkbook::open(&path, &[])?;
    let sheet1 = support::sheet_id(&book, "Sheet1");
    let checkpoint = modify_structure(
        &mut book,
        &mut store,
        &CaptureLimits::default(),
        ToolCall::new("delete_sheet"),
        StructureOp::DeleteSheet {
            sheet: SheetRef::id(&sheet1),
            allow_data_delete: true,
        },
    )?
    .checkpoint
    .expect("checkpoint");
    assert_eq!(book.sheets().len(), 1);

    restore_checkpoint(&mut book, &mut store, &CaptureLimits::default(), &checkpoint.id)?;
    let sheets = book.sheets();
    assert_eq!(sheets[0].name, "Sheet1");
    assert_eq!(sheets[0].id, sheet1);
    let snapshot = book.read_cells(&sheet1, &CellRange::parse("B3").expect("range"))?;
    assert_eq!(snapshot.formulas[0][0], "=SUM(B1:B2)");
    Ok(())
}

#[test]
fn hidden_sheets_and_the_last_visible_rule() -> Result<()> {
    let tmp = tempdir()?;
    let path = tmp.path().join("book.xlsx");
    support::write_xlsx_fixture(&path);

    let mut store = support::store();
    let mut book = XlsxWorkbook::open(&path, &[])?;
    let limits = CaptureLimits::default();
    let checkpoint = modify_structure(
        &mut book,
        &mut store,
        &limits,
        ToolCall::new("set_sheet_visibility"),
        StructureOp::SetSheetVisibility {
            sheet: SheetRef::name("Notes"),
            visibility: SheetVisibility::Hidden,
        },
    )?
    .checkpoint
    .expect("checkpoint");
    assert_eq!(
        book.sheet_by_name("Notes").map(|sheet| sheet.visibility),
        Some(SheetVisibility::Hidden)
    );

    let err = modify_structure(
        &mut book,
        &mut store,
        &limits,
        ToolCall::new("set_sheet_visibility"),
        StructureOp::SetSheetVisibility {
            sheet: SheetRef::name("Sheet1"),
            visibility: SheetVisibility::VeryHidden,
        },
    )
    .unwrap_err();
    assert_matches!(recovery_error(&err), Some(RecoveryError::InvalidRequest(_)));

    restore_checkpoint(&mut book, &mut store, &limits, &checkpoint.id)?;
    assert_eq!(
        book.sheet_by_name("Notes").map(|sheet| sheet.visibility),
        Some(SheetVisibility::Visible)
    );
    Ok(())
}

#[test]
fn values_and_formats_restore_on_xlsx() -> Result<()> {
    let tmp = tempdir()?;
    let path = tmp.path().join("book.xlsx");
    support::write_xlsx_fixture(&path);

    let mut store = support::store();
    let mut book = XlsxWorkbook::open(&path, &[])?;
    let limits = CaptureLimits::default();
    let sheet = SheetRef::name("Sheet1");
    let id = support::sheet_id(&book, "Sheet1");

    let written = write_values(
        &mut book,
        &mut store,
        &limits,
        ToolCall::new("write_values"),
        &sheet,
        "A1:A2",
        vec![vec![CellValue::Number(9.5)], vec![support::text("=B1*3")]],
    )?
    .checkpoint
    .expect("checkpoint");
    let formatted = format_ranges(
        &mut book,
        &mut store,
        &limits,
        ToolCall::new("format_range"),
        &sheet,
        &["A1".to_string()],
        &FormatPatch {
            bold: Some(true),
            fill_color: Some("#FFEB9C".to_string()),
            ..FormatPatch::default()
        },
    )?
    .checkpoint
    .expect("checkpoint");

    let format = book.read_cell_format(&id, CellAddress::new(1, 1))?;
    assert_eq!(format.bold, Some(true));
    assert_eq!(format.fill_color.as_deref(), Some("#FFEB9C"));

    restore_checkpoint(&mut book, &mut store, &limits, &formatted.id)?;
    let format = book.read_cell_format(&id, CellAddress::new(1, 1))?;
    assert_eq!(format.bold, None);
    assert_eq!(format.fill_color, None);

    restore_checkpoint(&mut book, &mut store, &limits, &written.id)?;
    assert_eq!(
        values(&book, "Sheet1", "A1:A2")?,
        vec![vec![support::text("alpha")], vec![support::text("beta")]]
    );
    Ok(())
}

fn expression(formula: &str) -> RecoveryConditionalFormatRule {
    RecoveryConditionalFormatRule {
        stop_if_true: None,
        priority: Some(1),
        criteria: ConditionalFormatCriteria::Custom {
            formula: formula.to_string(),
            format: Some(ConditionalFormatStyle {
                bold: Some(true),
                ..ConditionalFormatStyle::default()
            }),
        },
    }
}

#[test]
fn conditional_formats_round_trip_and_reject_unsupported_rules() -> Result<()> {
    let tmp = tempdir()?;
    let path = tmp.path().join("book.xlsx");
    support::write_xlsx_fixture(&path);

    let mut store = support::store();
    let mut book = XlsxWorkbook::open(&path, &[])?;
    let id = support::sheet_id(&book, "Sheet1");
    let range = CellRange::parse("B1:B3").expect("range");

    let checkpoint = set_conditional_formats(
        &mut book,
        &mut store,
        ToolCall::new("set_conditional_formats"),
        &SheetRef::name("Sheet1"),
        "$B$1:$B$3",
        vec![expression("B1>1")],
    )?
    .checkpoint
    .expect("checkpoint");
    let rules = book.conditional_formats(&id, &range)?;
    assert_eq!(rules.len(), 1);
    assert_matches!(
        &rules[0].criteria,
        ConditionalFormatCriteria::Custom { formula, .. } if formula == "B1>1"
    );

    let between = RecoveryConditionalFormatRule {
        stop_if_true: None,
        priority: None,
        criteria: ConditionalFormatCriteria::CellValue {
            operator: CellValueOperator::Between,
            formula1: "1".to_string(),
            formula2: Some("2".to_string()),
            format: None,
        },
    };
    let err = set_conditional_formats(
        &mut book,
        &mut store,
        ToolCall::new("set_conditional_formats"),
        &SheetRef::name("Sheet1"),
        "B1:B3",
        vec![between],
    )
    .unwrap_err();
    assert_matches!(
        recovery_error(&err),
        Some(RecoveryError::UnsupportedByBackend(_))
    );
    assert_eq!(book.conditional_formats(&id, &range)?.len(), 1);

    restore_checkpoint(&mut book, &mut store, &CaptureLimits::default(), &checkpoint.id)?;
    assert!(book.conditional_formats(&id, &range)?.is_empty());
    Ok(())
}
