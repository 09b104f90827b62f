//! Cell reference rewriting for row and column inserts/deletes.
//!
//! Formulas are scanned for A1-style references; the ones that point at the
//! edited sheet are shifted with the same arithmetic the grid uses. A single
//! cell that was deleted, or a range whose cells were all deleted, becomes
//! `#REF!`. Text inside string literals is left alone.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::grid::{Axis, AxisEdit, MAX_ROWS, column_letter_to_number, column_number_to_letter};

pub const REF_ERROR: &str = "#REF!";

static REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?:(?P<sheet>'(?:[^']|'')+'|[A-Za-z_][A-Za-z0-9_.]*)!)?",
        r"(?P<refs>\$?[A-Za-z]{1,3}\$?[0-9]+(?::\$?[A-Za-z]{1,3}\$?[0-9]+)?",
        r"|\$?[A-Za-z]{1,3}:\$?[A-Za-z]{1,3}",
        r"|\$?[0-9]+:\$?[0-9]+)",
    ))
    .expect("regex")
});

/// The sheet whose rows or columns moved.
#[derive(Debug, Clone, Copy)]
pub struct EditedSheet<'a> {
    pub name: &'a str,
    /// Unqualified references count too (the formula lives on this sheet).
    pub local: bool,
}

/// Rewrites `formula` for `edit`; `None` when no reference changed.
pub fn rewrite_formula(formula: &str, sheet: EditedSheet<'_>, edit: &AxisEdit) -> Option<String> {
    let literals = string_literals(formula);
    let mut out = String::with_capacity(formula.len());
    let mut cursor = 0;
    let mut changed = false;

    for caps in REFERENCE.captures_iter(formula) {
        let Some(whole) = caps.get(0) else { continue };
        if !at_boundary(formula, whole.start(), whole.end())
            || literals
                .iter()
                .any(|&(start, end)| whole.start() >= start && whole.start() < end)
        {
            continue;
        }
        let Some(adjusted) = rewrite_match(&caps, sheet, edit) else {
            continue;
        };
        if adjusted != whole.as_str() {
            out.push_str(&formula[cursor..whole.start()]);
            out.push_str(&adjusted);
            cursor = whole.end();
            changed = true;
        }
    }

    if !changed {
        return None;
    }
    out.push_str(&formula[cursor..]);
    Some(out)
}

fn rewrite_match(caps: &Captures<'_>, sheet: EditedSheet<'_>, edit: &AxisEdit) -> Option<String> {
    let refs = caps.name("refs")?.as_str();
    match caps.name("sheet") {
        Some(prefix) => {
            if !sheet_part_matches(prefix.as_str(), sheet.name) {
                return None;
            }
            Some(format!("{}!{}", prefix.as_str(), shift_reference(refs, edit)?))
        }
        None if sheet.local => shift_reference(refs, edit),
        None => None,
    }
}

fn sheet_part_matches(sheet_part: &str, name: &str) -> bool {
    let trimmed = sheet_part.trim();
    let unquoted = match trimmed
        .strip_prefix('\'')
        .and_then(|inner| inner.strip_suffix('\''))
    {
        Some(inner) => inner.replace("''", "'"),
        None => trimmed.to_string(),
    };
    unquoted.to_lowercase() == name.to_lowercase()
}

/// Function names (`LOG10(`), defined names (`Q1_TOTAL`) and 3D ranges
/// (`Jan:Mar!A1`) must not be read as cell references.
fn at_boundary(formula: &str, start: usize, end: usize) -> bool {
    let word = |c: char| c.is_alphanumeric() || c == '_' || c == '.';
    let before = formula[..start].chars().next_back();
    let after = formula[end..].chars().next();
    !before.is_some_and(|c| word(c) || matches!(c, '$' | '!' | '\'' | ':'))
        && !after.is_some_and(|c| word(c) || matches!(c, '(' | '!' | '$' | ':' | '\''))
}

/// Byte spans of `"..."` literals; a doubled quote inside one re-opens it.
fn string_literals(formula: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut open = None;
    for (idx, byte) in formula.bytes().enumerate() {
        if byte == b'"' {
            match open.take() {
                Some(start) => spans.push((start, idx + 1)),
                None => open = Some(idx),
            }
        }
    }
    if let Some(start) = open {
        spans.push((start, formula.len()));
    }
    spans
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Coord {
    index: u32,
    locked: bool,
}

/// One side of a reference: `$B$7`, `B`, `7`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RefPart {
    col: Option<Coord>,
    row: Option<Coord>,
}

impl RefPart {
    fn parse(text: &str) -> Option<Self> {
        let digits_at = text.find(|c: char| c.is_ascii_digit()).unwrap_or(text.len());
        let (letters, digits) = text.split_at(digits_at);
        let row_locked = !digits.is_empty() && letters.ends_with('$');
        let col_text = if row_locked {
            &letters[..letters.len() - 1]
        } else {
            letters
        };

        let col = if col_text.is_empty() {
            None
        } else {
            let name = col_text.trim_start_matches('$');
            Some(Coord {
                index: column_letter_to_number(name)?,
                locked: col_text.starts_with('$'),
            })
        };
        let row = if digits.is_empty() {
            None
        } else {
            let index = digits.parse::<u32>().ok()?;
            if index == 0 || index > MAX_ROWS {
                return None;
            }
            Some(Coord {
                index,
                locked: row_locked,
            })
        };
        Some(Self { col, row })
    }

    fn along(&mut self, axis: Axis) -> Option<&mut Coord> {
        match axis {
            Axis::Rows => self.row.as_mut(),
            Axis::Columns => self.col.as_mut(),
        }
    }
}

impl std::fmt::Display for RefPart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(col) = self.col {
            if col.locked {
                f.write_str("$")?;
            }
            f.write_str(&column_number_to_letter(col.index))?;
        }
        if let Some(row) = self.row {
            if row.locked {
                f.write_str("$")?;
            }
            write!(f, "{}", row.index)?;
        }
        Ok(())
    }
}

/// Shifted text of `A1`, `A1:B2`, `A:B` or `1:2`. Anchors (`$`) are kept
/// but do not pin a reference in place. `None` if the text is not a
/// reference after all.
fn shift_reference(refs: &str, edit: &AxisEdit) -> Option<String> {
    let Some((first, second)) = refs.split_once(':') else {
        let mut part = RefPart::parse(refs)?;
        if let Some(coord) = part.along(edit.axis) {
            match edit.shift_index(coord.index) {
                Some(index) => coord.index = index,
                None => return Some(REF_ERROR.to_string()),
            }
        }
        return Some(part.to_string());
    };

    let mut start = RefPart::parse(first)?;
    let mut end = RefPart::parse(second)?;
    // Whole rows are untouched by column edits and vice versa.
    if let (Some(a), Some(b)) = (start.along(edit.axis), end.along(edit.axis)) {
        let (lo, hi) = (a.index.min(b.index), a.index.max(b.index));
        let Some((new_lo, new_hi)) = edit.shift_span(lo, hi) else {
            return Some(REF_ERROR.to_string());
        };
        if a.index <= b.index {
            a.index = new_lo;
            b.index = new_hi;
        } else {
            a.index = new_hi;
            b.index = new_lo;
        }
    }
    Some(format!("{start}:{end}"))
}
