use anyhow::Result;
use assert_matches::assert_matches;
use spreadsheet_recovery::model::{CellValue, RecoveryModifyStructureState, SheetVisibility};
use spreadsheet_recovery::tools::{modify_structure, restore_checkpoint};
use spreadsheet_recovery::{
    AxisPosition, CaptureLimits, RecoveryError, RecoveryState, SheetRef, StructureOp, ToolCall,
    WorkbookAccessor, apply_modify_structure_state, recovery_error,
};

mod support;

fn structure_state(state: &RecoveryState) -> &RecoveryModifyStructureState {
    match state {
        RecoveryState::ModifyStructure(inner) => inner,
        other => panic!("expected a structure state, got {}", other.type_name()),
    }
}

fn delete_rows(position: u32, count: u32, allow_data_delete: bool) -> StructureOp {
    StructureOp::DeleteRows {
        sheet: SheetRef::name("Data"),
        position,
        count,
        allow_data_delete,
    }
}

#[test]
fn deleting_rows_with_data_requires_consent() -> Result<()> {
    let mut book = support::data_book();
    let mut store = support::store();
    let limits = CaptureLimits::default();

    let err = modify_structure(
        &mut book,
        &mut store,
        &limits,
        ToolCall::new("delete_rows"),
        delete_rows(5, 3, false),
    )
    .unwrap_err();

    assert_matches!(
        recovery_error(&err),
        Some(RecoveryError::DataDeleteRefused { cell_count: 6, .. })
    );
    assert!(store.is_empty());
    assert_eq!(book.value("Data", "A5"), Some(support::text("r5")));
    Ok(())
}

#[test]
fn deleted_rows_come_back_with_their_data() -> Result<()> {
    let mut book = support::data_book();
    let mut store = support::store();
    let limits = CaptureLimits::default();

    let outcome = modify_structure(
        &mut book,
        &mut store,
        &limits,
        ToolCall::new("delete_rows"),
        delete_rows(5, 3, true),
    )?;
    let checkpoint = outcome.checkpoint.expect("checkpoint recorded");
    assert_eq!(checkpoint.tool_name, "delete_rows");
    assert_eq!(checkpoint.changed_count, 3);
    assert_matches!(
        structure_state(&checkpoint.state),
        RecoveryModifyStructureState::RowsPresent {
            position: 5,
            count: 3,
            data_range: Some(data),
            ..
        } if data.address == "A5:B7"
    );
    assert_eq!(book.value("Data", "A5"), Some(support::text("r8")));
    assert_eq!(book.value("Data", "A8"), None);

    let restored = restore_checkpoint(&mut book, &mut store, &limits, &checkpoint.id)?;
    assert_eq!(
        support::column_a(&book, "Data", 4..=8),
        ["r4", "r5", "r6", "r7", "r8"]
            .into_iter()
            .map(support::text)
            .collect::<Vec<_>>()
    );
    assert_eq!(book.value("Data", "B6"), Some(CellValue::Number(60.0)));

    let reverse = restored.checkpoint.expect("restore is itself recorded");
    assert_eq!(reverse.restored_from_snapshot_id.as_deref(), Some(checkpoint.id.as_str()));
    assert_eq!(store.len(), 1);
    assert_matches!(
        structure_state(&reverse.state),
        RecoveryModifyStructureState::RowsAbsent {
            allow_data_delete: Some(true),
            ..
        }
    );
    Ok(())
}

#[test]
fn undoing_a_restore_deletes_the_rows_again() -> Result<()> {
    let mut book = support::data_book();
    let mut store = support::store();
    let limits = CaptureLimits::default();

    let first = modify_structure(
        &mut book,
        &mut store,
        &limits,
        ToolCall::new("delete_rows"),
        delete_rows(2, 1, true),
    )?
    .checkpoint
    .expect("checkpoint");
    let second = restore_checkpoint(&mut book, &mut store, &limits, &first.id)?
        .checkpoint
        .expect("checkpoint");
    assert_eq!(book.value("Data", "A2"), Some(support::text("r2")));

    restore_checkpoint(&mut book, &mut store, &limits, &second.id)?;
    assert_eq!(book.value("Data", "A2"), Some(support::text("r3")));
    Ok(())
}

#[test]
fn oversized_deletes_are_refused_either_way() {
    let limits = CaptureLimits::new(5);

    let mut book = support::data_book();
    let mut store = support::store();
    let err = modify_structure(
        &mut book,
        &mut store,
        &limits,
        ToolCall::new("delete_rows"),
        delete_rows(1, 10, true),
    )
    .unwrap_err();
    assert_matches!(
        recovery_error(&err),
        Some(RecoveryError::TooLarge {
            cell_count: 20,
            max_cells: 5
        })
    );

    let err = modify_structure(
        &mut book,
        &mut store,
        &limits,
        ToolCall::new("delete_rows"),
        delete_rows(1, 10, false),
    )
    .unwrap_err();
    assert_matches!(
        recovery_error(&err),
        Some(RecoveryError::DataDeleteRefused { cell_count: 20, .. })
    );
    assert_eq!(book.value("Data", "A1"), Some(support::text("r1")));
    assert!(store.is_empty());
}

#[test]
fn empty_rows_delete_without_consent() -> Result<()> {
    let mut book = support::data_book();
    let mut store = support::store();
    let limits = CaptureLimits::default();

    let outcome = modify_structure(
        &mut book,
        &mut store,
        &limits,
        ToolCall::new("delete_rows"),
        delete_rows(20, 5, false),
    )?;
    let checkpoint = outcome.checkpoint.expect("checkpoint");
    assert_matches!(
        structure_state(&checkpoint.state),
        RecoveryModifyStructureState::RowsPresent {
            data_range: None,
            ..
        }
    );
    Ok(())
}

#[test]
fn undoing_an_insert_refuses_once_the_new_rows_hold_data() -> Result<()> {
    let mut book = support::data_book();
    let mut store = support::store();
    let limits = CaptureLimits::default();

    let inserted = modify_structure(
        &mut book,
        &mut store,
        &limits,
        ToolCall::new("insert_rows"),
        StructureOp::InsertRows {
            sheet: SheetRef::name("Data"),
            position: 3,
            count: 2,
        },
    )?
    .checkpoint
    .expect("checkpoint");
    assert_matches!(
        structure_state(&inserted.state),
        RecoveryModifyStructureState::RowsAbsent {
            position: 3,
            count: 2,
            allow_data_delete: None,
            ..
        }
    );
    assert_eq!(book.value("Data", "A5"), Some(support::text("r3")));

    book.set_cell("Data", "C4", "typed later")?;
    let err = restore_checkpoint(&mut book, &mut store, &limits, &inserted.id).unwrap_err();
    assert_matches!(
        recovery_error(&err),
        Some(RecoveryError::DataDeleteRefused { .. })
    );
    assert!(store.get(&inserted.id).is_some());

    book.set_cell("Data", "C4", "")?;
    restore_checkpoint(&mut book, &mut store, &limits, &inserted.id)?;
    assert_eq!(book.value("Data", "A3"), Some(support::text("r3")));
    Ok(())
}

#[test]
fn deleted_columns_restore_by_letter() -> Result<()> {
    let mut book = support::data_book();
    let mut store = support::store();
    let limits = CaptureLimits::default();

    let checkpoint = modify_structure(
        &mut book,
        &mut store,
        &limits,
        ToolCall::new("delete_columns"),
        StructureOp::DeleteColumns {
            sheet: SheetRef::name("Data"),
            position: AxisPosition::Letters("a".to_string()),
            count: 1,
            allow_data_delete: true,
        },
    )?
    .checkpoint
    .expect("checkpoint");
    assert_eq!(book.value("Data", "A1"), Some(CellValue::Number(10.0)));
    assert_eq!(checkpoint.address, "Data!A:A");

    restore_checkpoint(&mut book, &mut store, &limits, &checkpoint.id)?;
    assert_eq!(book.value("Data", "A1"), Some(support::text("r1")));
    assert_eq!(book.value("Data", "B1"), Some(CellValue::Number(10.0)));
    Ok(())
}

#[test]
fn invalid_column_letters_are_rejected() {
    let mut book = support::data_book();
    let mut store = support::store();
    let err = modify_structure(
        &mut book,
        &mut store,
        &CaptureLimits::default(),
        ToolCall::new("insert_columns"),
        StructureOp::InsertColumns {
            sheet: SheetRef::name("Data"),
            position: AxisPosition::Letters("1A".to_string()),
            count: 1,
        },
    )
    .unwrap_err();
    assert_matches!(recovery_error(&err), Some(RecoveryError::InvalidRequest(_)));
}

#[test]
fn deleted_sheet_returns_with_id_position_and_data() -> Result<()> {
    let mut book = support::data_book();
    let mut store = support::store();
    let limits = CaptureLimits::default();
    let data_id = support::sheet_id(&book, "Data");
    book.set_formula_with_value("Data", "C1", "=SUM(B1:B10)", 550.0)?;

    let checkpoint = modify_structure(
        &mut book,
        &mut store,
        &limits,
        ToolCall::new("delete_sheet"),
        StructureOp::DeleteSheet {
            sheet: SheetRef::name("data"),
            allow_data_delete: true,
        },
    )?
    .checkpoint
    .expect("checkpoint");
    assert_eq!(book.sheet_names(), vec!["Other"]);

    restore_checkpoint(&mut book, &mut store, &limits, &checkpoint.id)?;
    let restored = book.sheet_by_name("Data").expect("sheet is back");
    assert_eq!(restored.id, data_id);
    assert_eq!(restored.position, 0);
    assert_eq!(book.value("Data", "A10"), Some(support::text("r10")));
    assert_eq!(book.formula("Data", "C1").as_deref(), Some("=SUM(B1:B10)"));
    Ok(())
}

#[test]
fn restoring_a_sheet_over_a_same_named_sheet_is_refused() -> Result<()> {
    let mut book = support::data_book();
    let mut store = support::store();
    let limits = CaptureLimits::default();

    let checkpoint = modify_structure(
        &mut book,
        &mut store,
        &limits,
        ToolCall::new("delete_sheet"),
        StructureOp::DeleteSheet {
            sheet: SheetRef::name("Other"),
            allow_data_delete: false,
        },
    )?
    .checkpoint
    .expect("checkpoint");
    modify_structure(
        &mut book,
        &mut store,
        &limits,
        ToolCall::new("add_sheet"),
        StructureOp::AddSheet {
            name: "OTHER".to_string(),
            position: None,
            visibility: None,
        },
    )?;

    let err = restore_checkpoint(&mut book, &mut store, &limits, &checkpoint.id).unwrap_err();
    assert_matches!(
        recovery_error(&err),
        Some(RecoveryError::TargetExists { .. })
    );
    assert_eq!(book.sheet_names(), vec!["Data", "OTHER"]);
    Ok(())
}

#[test]
fn renames_refuse_taken_names_and_restore_the_old_name() -> Result<()> {
    let mut book = support::data_book();
    let mut store = support::store();
    let limits = CaptureLimits::default();

    let err = modify_structure(
        &mut book,
        &mut store,
        &limits,
        ToolCall::new("rename_sheet"),
        StructureOp::RenameSheet {
            sheet: SheetRef::name("Data"),
            new_name: "other".to_string(),
        },
    )
    .unwrap_err();
    assert_matches!(
        recovery_error(&err),
        Some(RecoveryError::TargetExists { .. })
    );
    assert!(store.is_empty());

    let checkpoint = modify_structure(
        &mut book,
        &mut store,
        &limits,
        ToolCall::new("rename_sheet"),
        StructureOp::RenameSheet {
            sheet: SheetRef::name("Data"),
            new_name: "Ledger".to_string(),
        },
    )?
    .checkpoint
    .expect("checkpoint");
    assert_eq!(book.sheet_names(), vec!["Ledger", "Other"]);

    restore_checkpoint(&mut book, &mut store, &limits, &checkpoint.id)?;
    assert_eq!(book.sheet_names(), vec!["Data", "Other"]);
    Ok(())
}

#[test]
fn visibility_and_added_sheets_undo() -> Result<()> {
    let mut book = support::data_book();
    let mut store = support::store();
    let limits = CaptureLimits::default();

    let hidden = modify_structure(
        &mut book,
        &mut store,
        &limits,
        ToolCall::new("set_sheet_visibility"),
        StructureOp::SetSheetVisibility {
            sheet: SheetRef::name("Other"),
            visibility: SheetVisibility::VeryHidden,
        },
    )?
    .checkpoint
    .expect("checkpoint");
    let added = modify_structure(
        &mut book,
        &mut store,
        &limits,
        ToolCall::new("add_sheet"),
        StructureOp::AddSheet {
            name: "Scratch".to_string(),
            position: Some(0),
            visibility: None,
        },
    )?
    .checkpoint
    .expect("checkpoint");
    assert_matches!(
        structure_state(&added.state),
        RecoveryModifyStructureState::SheetAbsent { sheet_name, .. } if sheet_name == "Scratch"
    );
    assert_eq!(book.sheet_names(), vec!["Scratch", "Data", "Other"]);

    restore_checkpoint(&mut book, &mut store, &limits, &added.id)?;
    restore_checkpoint(&mut book, &mut store, &limits, &hidden.id)?;
    assert_eq!(book.sheet_names(), vec!["Data", "Other"]);
    assert_eq!(
        book.sheet_by_name("Other").map(|sheet| sheet.visibility),
        Some(SheetVisibility::Visible)
    );
    Ok(())
}

#[test]
fn unknown_sheets_skip_the_checkpoint_for_inserts() -> Result<()> {
    let mut book = support::data_book();
    let mut store = support::store();
    let err = modify_structure(
        &mut book,
        &mut store,
        &CaptureLimits::default(),
        ToolCall::new("insert_rows"),
        StructureOp::InsertRows {
            sheet: SheetRef::name("Missing"),
            position: 1,
            count: 1,
        },
    )
    .unwrap_err();
    assert_matches!(recovery_error(&err), Some(RecoveryError::SheetNotFound(_)));
    assert!(store.is_empty());
    Ok(())
}

#[test]
fn applying_twice_returns_to_the_start() -> Result<()> {
    let mut book = support::data_book();
    let limits = CaptureLimits::default();
    let sheet_id = support::sheet_id(&book, "Data");
    let target = RecoveryModifyStructureState::ColumnsAbsent {
        sheet_id: sheet_id.clone(),
        sheet_name: "Data".to_string(),
        position: 2,
        count: 1,
        allow_data_delete: Some(true),
    };

    let inverse = apply_modify_structure_state(&mut book, &target, &limits)?;
    assert_eq!(book.value("Data", "B1"), None);
    let again = apply_modify_structure_state(&mut book, &inverse, &limits)?;
    assert_eq!(again, target);
    assert_eq!(book.value("Data", "B3"), Some(CellValue::Number(30.0)));
    assert_eq!(book.sheets().len(), 2);
    Ok(())
}

#[test]
fn present_states_with_data_outside_the_span_are_corrupt() -> Result<()> {
    let mut book = support::data_book();
    let sheet_id = support::sheet_id(&book, "Data");
    let target: RecoveryModifyStructureState = serde_json::from_value(serde_json::json!({
        "kind": "rows_present",
        "sheetId": sheet_id,
        "sheetName": "Data",
        "position": 2,
        "count": 1,
        "dataRange": {
            "address": "A5:A5",
            "rowCount": 1,
            "columnCount": 1,
            "values": [["x"]],
            "formulas": [[""]]
        }
    }))?;

    let err = apply_modify_structure_state(&mut book, &target, &CaptureLimits::default())
        .unwrap_err();
    assert_matches!(recovery_error(&err), Some(RecoveryError::CorruptState(_)));
    assert_eq!(book.value("Data", "A2"), Some(support::text("r2")));
    Ok(())
}
