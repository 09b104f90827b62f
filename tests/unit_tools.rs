use anyhow::Result;
use assert_matches::assert_matches;
use serde_json::json;
use spreadsheet_recovery::grid::CellAddress;
use spreadsheet_recovery::model::{
    BorderEdge, BorderStyle, CellFormat, CellValue, ConditionalFormatCriteria,
    ConditionalFormatStyle, FormatFacet, RecoveryConditionalFormatRule,
};
use spreadsheet_recovery::tools::{
    format_ranges, restore_checkpoint, set_conditional_formats, write_values,
};
use spreadsheet_recovery::{
    CaptureLimits, CheckpointStore, FormatPatch, RecoveryError, RecoveryState, SheetRef, ToolCall,
    WorkbookAccessor, capture_conditional_format_state, recovery_error,
};

mod support;

fn write(
    book: &mut spreadsheet_recovery::MemoryWorkbook,
    store: &mut CheckpointStore,
    address: &str,
    values: Vec<Vec<CellValue>>,
) -> Result<spreadsheet_recovery::ToolOutcome> {
    write_values(
        book,
        store,
        &CaptureLimits::default(),
        ToolCall::new("write_values"),
        &SheetRef::name("Data"),
        address,
        values,
    )
}

#[test]
fn value_writes_restore_values_and_formulas() -> Result<()> {
    let mut book = support::data_book();
    let mut store = support::store();
    book.set_formula_with_value("Data", "C1", "=B1+1", 11.0)?;

    let outcome = write(
        &mut book,
        &mut store,
        "A1:C1",
        vec![vec![support::text("new"), support::text("=A1&\"!\""), CellValue::Bool(true)]],
    )?;
    let checkpoint = outcome.checkpoint.expect("checkpoint");
    assert_eq!(checkpoint.address, "Data!A1:C1");
    assert_eq!(checkpoint.changed_count, 3);
    assert_eq!(book.formula("Data", "B1").as_deref(), Some("=A1&\"!\""));
    assert_eq!(book.value("Data", "C1"), Some(CellValue::Bool(true)));

    restore_checkpoint(&mut book, &mut store, &CaptureLimits::default(), &checkpoint.id)?;
    assert_eq!(book.value("Data", "A1"), Some(support::text("r1")));
    assert_eq!(book.value("Data", "B1"), Some(CellValue::Number(10.0)));
    assert_eq!(book.formula("Data", "B1"), None);
    assert_eq!(book.formula("Data", "C1").as_deref(), Some("=B1+1"));
    Ok(())
}

#[test]
fn value_grids_must_match_the_range() {
    let mut book = support::data_book();
    let mut store = support::store();
    let err = write(
        &mut book,
        &mut store,
        "A1:B2",
        vec![vec![CellValue::Number(1.0), CellValue::Number(2.0)]],
    )
    .unwrap_err();
    assert_matches!(recovery_error(&err), Some(RecoveryError::InvalidRequest(_)));

    let err = write(&mut book, &mut store, "not a range", vec![]).unwrap_err();
    assert_matches!(recovery_error(&err), Some(RecoveryError::InvalidRequest(_)));
    assert!(store.is_empty());
}

#[test]
fn retention_evicts_the_oldest_checkpoints_first() -> Result<()> {
    let mut book = support::data_book();
    let mut store = CheckpointStore::new(&json!(5));
    let mut ids = Vec::new();
    let mut evicted = Vec::new();

    for n in 0..7 {
        let outcome = write(
            &mut book,
            &mut store,
            "D1",
            vec![vec![CellValue::Number(n as f64)]],
        )?;
        ids.push(outcome.checkpoint.expect("checkpoint").id);
        evicted.extend(outcome.evicted);
    }

    assert_eq!(store.len(), 5);
    assert_eq!(evicted, ids[..2].to_vec());
    let kept: Vec<_> = store.list().iter().map(|entry| entry.id.clone()).collect();
    assert_eq!(kept, ids[2..].to_vec());
    assert_eq!(store.latest().map(|entry| entry.id.as_str()), ids.last().map(String::as_str));
    Ok(())
}

#[test]
fn restoring_an_unknown_checkpoint_is_an_invalid_request() {
    let mut book = support::data_book();
    let mut store = support::store();
    let err = restore_checkpoint(&mut book, &mut store, &CaptureLimits::default(), "ckpt_missing")
        .unwrap_err();
    assert_matches!(recovery_error(&err), Some(RecoveryError::InvalidRequest(_)));
}

fn thin() -> BorderEdge {
    BorderEdge {
        style: BorderStyle::Thin,
        color: Some("#000000".to_string()),
    }
}

fn format_at(book: &spreadsheet_recovery::MemoryWorkbook, address: &str) -> CellFormat {
    let id = support::sheet_id(book, "Data");
    book.read_cell_format(&id, CellAddress::parse(address).expect("address"))
        .expect("read format")
}

#[test]
fn format_patches_restore_prior_formats() -> Result<()> {
    let mut book = support::data_book();
    let mut store = support::store();
    let limits = CaptureLimits::default();
    let data = support::sheet_id(&book, "Data");
    book.write_cell_format(
        &data,
        CellAddress::new(1, 1),
        &CellFormat {
            fill_color: Some("#FFFF00".to_string()),
            ..CellFormat::default()
        },
        &[spreadsheet_recovery::model::CellFormatProperty::FillColor],
    )?;

    let patch = FormatPatch {
        bold: Some(true),
        fill_color: Some("#00FF00".to_string()),
        border_inside_horizontal: Some(thin()),
        ..FormatPatch::default()
    };
    let outcome = format_ranges(
        &mut book,
        &mut store,
        &limits,
        ToolCall::new("format_range"),
        &SheetRef::name("Data"),
        &["A1:B2".to_string(), "D5".to_string()],
        &patch,
    )?;
    let checkpoint = outcome.checkpoint.expect("checkpoint");
    assert_eq!(checkpoint.changed_count, 5);
    assert_eq!(checkpoint.address, "Data!A1:B2,D5");

    assert_eq!(format_at(&book, "A1").bold, Some(true));
    assert_eq!(format_at(&book, "A1").border_bottom, Some(thin()));
    assert_eq!(format_at(&book, "A2").border_bottom, None);
    assert_eq!(format_at(&book, "D5").fill_color.as_deref(), Some("#00FF00"));

    restore_checkpoint(&mut book, &mut store, &limits, &checkpoint.id)?;
    assert_eq!(
        format_at(&book, "A1"),
        CellFormat {
            fill_color: Some("#FFFF00".to_string()),
            ..CellFormat::default()
        }
    );
    assert_eq!(format_at(&book, "B1"), CellFormat::default());
    assert_eq!(format_at(&book, "D5"), CellFormat::default());
    Ok(())
}

#[test]
fn cleared_facets_are_captured_and_restored() -> Result<()> {
    let mut book = support::data_book();
    let mut store = support::store();
    let limits = CaptureLimits::default();
    let set_italic = FormatPatch {
        italic: Some(true),
        ..FormatPatch::default()
    };
    format_ranges(
        &mut book,
        &mut store,
        &limits,
        ToolCall::new("format_range"),
        &SheetRef::name("Data"),
        &["C3".to_string()],
        &set_italic,
    )?;

    let clear = FormatPatch {
        clear: vec![FormatFacet::Italic],
        ..FormatPatch::default()
    };
    let checkpoint = format_ranges(
        &mut book,
        &mut store,
        &limits,
        ToolCall::new("format_range"),
        &SheetRef::name("Data"),
        &["C3".to_string()],
        &clear,
    )?
    .checkpoint
    .expect("checkpoint");
    assert_eq!(format_at(&book, "C3").italic, None);
    match &checkpoint.state {
        RecoveryState::FormatRange(state) => {
            assert!(state.selection.italic);
            assert!(!state.selection.bold);
            assert_eq!(state.areas[0].cells[0][0].italic, Some(true));
        }
        other => panic!("unexpected state {}", other.type_name()),
    }

    restore_checkpoint(&mut book, &mut store, &limits, &checkpoint.id)?;
    assert_eq!(format_at(&book, "C3").italic, Some(true));
    Ok(())
}

#[test]
fn empty_format_patches_record_nothing() -> Result<()> {
    let mut book = support::data_book();
    let mut store = support::store();
    let outcome = format_ranges(
        &mut book,
        &mut store,
        &CaptureLimits::default(),
        ToolCall::new("format_range"),
        &SheetRef::name("Data"),
        &["A1".to_string()],
        &FormatPatch::default(),
    )?;
    assert!(outcome.checkpoint.is_none());
    assert_eq!(outcome.warnings.len(), 1);
    assert!(store.is_empty());

    let err = format_ranges(
        &mut book,
        &mut store,
        &CaptureLimits::new(3),
        ToolCall::new("format_range"),
        &SheetRef::name("Data"),
        &["A1:B2".to_string()],
        &FormatPatch {
            bold: Some(true),
            ..FormatPatch::default()
        },
    )
    .unwrap_err();
    assert_matches!(
        recovery_error(&err),
        Some(RecoveryError::TooLarge { cell_count: 4, .. })
    );
    assert_eq!(format_at(&book, "A1"), CellFormat::default());
    Ok(())
}

fn highlight(formula: &str) -> RecoveryConditionalFormatRule {
    RecoveryConditionalFormatRule {
        stop_if_true: None,
        priority: Some(1),
        criteria: ConditionalFormatCriteria::Custom {
            formula: formula.to_string(),
            format: Some(ConditionalFormatStyle {
                fill_color: Some("#FFC7CE".to_string()),
                ..ConditionalFormatStyle::default()
            }),
        },
    }
}

#[test]
fn conditional_formats_restore_in_sequence() -> Result<()> {
    let mut book = support::data_book();
    let mut store = support::store();
    let limits = CaptureLimits::default();
    let sheet = SheetRef::name("Data");

    let first = set_conditional_formats(
        &mut book,
        &mut store,
        ToolCall::new("set_conditional_formats"),
        &sheet,
        "B1:B10",
        vec![highlight("=B1>50")],
    )?
    .checkpoint
    .expect("checkpoint");
    let second = set_conditional_formats(
        &mut book,
        &mut store,
        ToolCall::new("set_conditional_formats"),
        &sheet,
        "B1:B10",
        vec![highlight("=B1>90"), highlight("=B1<20")],
    )?
    .checkpoint
    .expect("checkpoint");
    assert_eq!(second.changed_count, 10);

    let rules = |book: &spreadsheet_recovery::MemoryWorkbook| {
        capture_conditional_format_state(book, &sheet, "B1:B10")
            .expect("capture")
            .expect("sheet exists")
            .rules
    };
    assert_eq!(rules(&book).len(), 2);

    restore_checkpoint(&mut book, &mut store, &limits, &second.id)?;
    assert_eq!(rules(&book), vec![highlight("=B1>50")]);
    restore_checkpoint(&mut book, &mut store, &limits, &first.id)?;
    assert!(rules(&book).is_empty());
    Ok(())
}

#[test]
fn outcomes_serialize_without_empty_lists() -> Result<()> {
    let mut book = support::data_book();
    let mut store = support::store();
    let outcome = write(&mut book, &mut store, "E1", vec![vec![CellValue::Number(1.0)]])?;
    let json = serde_json::to_value(&outcome)?;
    assert_eq!(json["tool_name"], "write_values");
    assert!(json.get("warnings").is_none());
    assert!(json.get("evicted").is_none());
    assert_eq!(json["checkpoint"]["state"]["type"], "range_values");
    assert_eq!(json["checkpoint"]["state"]["data"]["dataRange"]["address"], "E1");
    Ok(())
}
