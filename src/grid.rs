use std::cmp::Ordering;
use std::fmt;

use crate::errors::RecoveryError;
use crate::model::CellValue;

pub const MAX_ROWS: u32 = 1_048_576;
pub const MAX_COLUMNS: u32 = 16_384;

/// Bijective base-26 column name. `0` has no name and yields an empty string.
pub fn column_number_to_letter(mut column: u32) -> String {
    let mut letters = Vec::new();
    while column > 0 {
        let rem = (column - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        column = (column - 1) / 26;
    }
    letters.iter().rev().collect()
}

pub fn column_letter_to_number(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    let mut col: u32 = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        col = col
            .checked_mul(26)?
            .checked_add(c.to_ascii_uppercase() as u32 - 'A' as u32 + 1)?;
    }
    (col <= MAX_COLUMNS).then_some(col)
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct CellAddress {
    pub col: u32,
    pub row: u32,
}

impl CellAddress {
    pub fn new(col: u32, row: u32) -> Self {
        Self { col, row }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let cleaned: String = s.trim().chars().filter(|c| *c != '$').collect();
        let split_idx = cleaned.find(|c: char| c.is_ascii_digit())?;
        let (col_str, row_str) = cleaned.split_at(split_idx);

        let row = row_str.parse::<u32>().ok()?;
        let col = column_letter_to_number(col_str)?;
        if row == 0 || row > MAX_ROWS {
            return None;
        }
        Some(Self { col, row })
    }

    pub fn to_a1(&self) -> String {
        format!("{}{}", column_number_to_letter(self.col), self.row)
    }
}

impl Ord for CellAddress {
    fn cmp(&self, other: &Self) -> Ordering {
        // Row-major ordering
        match self.row.cmp(&other.row) {
            Ordering::Equal => self.col.cmp(&other.col),
            ord => ord,
        }
    }
}

impl PartialOrd for CellAddress {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Inclusive rectangle, always normalized so `start` is the top-left corner.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct CellRange {
    pub start: CellAddress,
    pub end: CellAddress,
}

impl CellRange {
    pub fn new(a: CellAddress, b: CellAddress) -> Self {
        Self {
            start: CellAddress::new(a.col.min(b.col), a.row.min(b.row)),
            end: CellAddress::new(a.col.max(b.col), a.row.max(b.row)),
        }
    }

    pub fn from_bounds(first_row: u32, first_col: u32, row_count: u32, column_count: u32) -> Self {
        Self::new(
            CellAddress::new(first_col, first_row),
            CellAddress::new(
                first_col.saturating_add(column_count.max(1) - 1),
                first_row.saturating_add(row_count.max(1) - 1),
            ),
        )
    }

    /// Whole rows `position..position+count`.
    pub fn rows(position: u32, count: u32) -> Self {
        Self::from_bounds(position, 1, count, MAX_COLUMNS)
    }

    /// Whole columns `position..position+count`.
    pub fn columns(position: u32, count: u32) -> Self {
        Self::from_bounds(1, position, MAX_ROWS, count)
    }

    /// Accepts `A1`, `A1:C3`, `$A$1:$C$3`, `5:7` and `C:E`. A sheet prefix
    /// (`Sheet1!A1`) is not accepted here; see [`split_sheet_qualified`].
    pub fn parse(s: &str) -> Option<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.contains('!') {
            return None;
        }
        let (left, right) = match trimmed.split_once(':') {
            Some((l, r)) => (l, r),
            None => (trimmed, trimmed),
        };
        let left = left.replace('$', "");
        let right = right.replace('$', "");

        if let (Ok(r1), Ok(r2)) = (left.parse::<u32>(), right.parse::<u32>()) {
            if r1 == 0 || r2 == 0 || r1 > MAX_ROWS || r2 > MAX_ROWS || !trimmed.contains(':') {
                return None;
            }
            return Some(Self::new(
                CellAddress::new(1, r1),
                CellAddress::new(MAX_COLUMNS, r2),
            ));
        }

        if left.chars().all(|c| c.is_ascii_alphabetic())
            && right.chars().all(|c| c.is_ascii_alphabetic())
        {
            if !trimmed.contains(':') {
                return None;
            }
            let c1 = column_letter_to_number(&left)?;
            let c2 = column_letter_to_number(&right)?;
            return Some(Self::new(
                CellAddress::new(c1, 1),
                CellAddress::new(c2, MAX_ROWS),
            ));
        }

        let start = CellAddress::parse(&left)?;
        let end = CellAddress::parse(&right)?;
        Some(Self::new(start, end))
    }

    pub fn row_count(&self) -> u32 {
        self.end.row - self.start.row + 1
    }

    pub fn column_count(&self) -> u32 {
        self.end.col - self.start.col + 1
    }

    pub fn cell_count(&self) -> u64 {
        self.row_count() as u64 * self.column_count() as u64
    }

    pub fn contains(&self, addr: CellAddress) -> bool {
        addr.row >= self.start.row
            && addr.row <= self.end.row
            && addr.col >= self.start.col
            && addr.col <= self.end.col
    }

    pub fn contains_range(&self, other: &CellRange) -> bool {
        self.contains(other.start) && self.contains(other.end)
    }

    pub fn intersect(&self, other: &CellRange) -> Option<CellRange> {
        let start_col = self.start.col.max(other.start.col);
        let start_row = self.start.row.max(other.start.row);
        let end_col = self.end.col.min(other.end.col);
        let end_row = self.end.row.min(other.end.row);
        if start_col > end_col || start_row > end_row {
            return None;
        }
        Some(CellRange {
            start: CellAddress::new(start_col, start_row),
            end: CellAddress::new(end_col, end_row),
        })
    }

    /// Smallest range covering both.
    pub fn union(&self, other: &CellRange) -> CellRange {
        CellRange {
            start: CellAddress::new(
                self.start.col.min(other.start.col),
                self.start.row.min(other.start.row),
            ),
            end: CellAddress::new(
                self.end.col.max(other.end.col),
                self.end.row.max(other.end.row),
            ),
        }
    }

    pub fn to_a1(&self) -> String {
        if self.start == self.end {
            self.start.to_a1()
        } else {
            format!("{}:{}", self.start.to_a1(), self.end.to_a1())
        }
    }

    /// Iterates cell addresses row-major.
    pub fn cells(&self) -> impl Iterator<Item = CellAddress> + '_ {
        (self.start.row..=self.end.row).flat_map(move |row| {
            (self.start.col..=self.end.col).map(move |col| CellAddress::new(col, row))
        })
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1())
    }
}

/// Splits `'My Sheet'!A1:B2` into `(Some("My Sheet"), "A1:B2")`.
pub fn split_sheet_qualified(address: &str) -> (Option<String>, &str) {
    let Some(bang) = address.rfind('!') else {
        return (None, address);
    };
    let (sheet, rest) = address.split_at(bang);
    let sheet = sheet.trim();
    let sheet = if sheet.len() >= 2 && sheet.starts_with('\'') && sheet.ends_with('\'') {
        sheet[1..sheet.len() - 1].replace("''", "'")
    } else {
        sheet.to_string()
    };
    (Some(sheet), &rest[1..])
}

pub fn qualified_address(sheet_name: &str, range: &CellRange) -> String {
    format!("{}{}", format_sheet_prefix(sheet_name), range.to_a1())
}

pub fn format_sheet_prefix(sheet_name: &str) -> String {
    if sheet_name_needs_quoting(sheet_name) {
        let escaped = sheet_name.replace('\'', "''");
        format!("'{escaped}'!")
    } else {
        format!("{sheet_name}!")
    }
}

fn sheet_name_needs_quoting(name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    let bytes = name.as_bytes();
    if bytes[0].is_ascii_digit() {
        return true;
    }
    for &byte in bytes {
        match byte {
            b' ' | b'!' | b'"' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'(' | b')' | b'*' | b'+'
            | b',' | b'-' | b'.' | b'/' | b':' | b';' | b'<' | b'=' | b'>' | b'?' | b'@' | b'['
            | b'\\' | b']' | b'^' | b'`' | b'{' | b'|' | b'}' | b'~' => return true,
            _ => {}
        }
    }
    // Names that look like a cell reference (e.g. "AB12") must be quoted too.
    if CellAddress::parse(name).is_some() {
        return true;
    }
    let upper = name.to_uppercase();
    matches!(upper.as_str(), "TRUE" | "FALSE")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Rows,
    Columns,
}

impl Axis {
    pub fn limit(self) -> u32 {
        match self {
            Axis::Rows => MAX_ROWS,
            Axis::Columns => MAX_COLUMNS,
        }
    }

    fn noun(self) -> &'static str {
        match self {
            Axis::Rows => "rows",
            Axis::Columns => "columns",
        }
    }
}

/// `position..position+count` must stay inside the sheet.
pub fn check_span(axis: Axis, position: u32, count: u32) -> Result<(), RecoveryError> {
    AxisEdit::new(axis, position, count, false).map(|_| ())
}

/// `count` rows or columns inserted (or deleted) starting at `position`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisEdit {
    pub axis: Axis,
    pub position: u32,
    pub count: u32,
    pub insert: bool,
}

impl AxisEdit {
    /// Rejects spans that start at 0, are empty, or run past the sheet edge.
    pub fn new(axis: Axis, position: u32, count: u32, insert: bool) -> Result<Self, RecoveryError> {
        let limit = axis.limit();
        if position == 0 || count == 0 || position > limit || count > limit - position + 1 {
            return Err(RecoveryError::InvalidRequest(format!(
                "{} {position}+{count} is outside the sheet",
                axis.noun()
            )));
        }
        Ok(Self {
            axis,
            position,
            count,
            insert,
        })
    }

    fn last(&self) -> u32 {
        self.position + (self.count - 1)
    }

    /// New index after the edit; `None` if the index was deleted or pushed
    /// past the sheet edge.
    pub fn shift_index(&self, index: u32) -> Option<u32> {
        if index < self.position {
            return Some(index);
        }
        if self.insert {
            let shifted = index as u64 + self.count as u64;
            (shifted <= self.axis.limit() as u64).then_some(shifted as u32)
        } else if index <= self.last() {
            None
        } else {
            Some(index - self.count)
        }
    }

    /// New bounds of `lo..=hi`. Inserts grow a span they cut through; deletes
    /// shrink it, and a span that is deleted entirely yields `None`.
    pub fn shift_span(&self, lo: u32, hi: u32) -> Option<(u32, u32)> {
        if self.insert {
            let new_lo = self.shift_index(lo)?;
            let new_hi = self.shift_index(hi).unwrap_or(self.axis.limit());
            return Some((new_lo, new_hi));
        }
        let end = self.last();
        if lo >= self.position && hi <= end {
            return None;
        }
        let new_lo = if lo < self.position {
            lo
        } else if lo <= end {
            self.position
        } else {
            lo - self.count
        };
        let new_hi = if hi < self.position {
            hi
        } else if hi <= end {
            self.position - 1
        } else {
            hi - self.count
        };
        Some((new_lo, new_hi))
    }

    /// Shifts `range` along this edit's axis.
    pub fn shift_range(&self, range: &CellRange) -> Option<CellRange> {
        Some(match self.axis {
            Axis::Rows => {
                let (lo, hi) = self.shift_span(range.start.row, range.end.row)?;
                CellRange::new(
                    CellAddress::new(range.start.col, lo),
                    CellAddress::new(range.end.col, hi),
                )
            }
            Axis::Columns => {
                let (lo, hi) = self.shift_span(range.start.col, range.end.col)?;
                CellRange::new(
                    CellAddress::new(lo, range.start.row),
                    CellAddress::new(hi, range.end.row),
                )
            }
        })
    }

    /// Shifts a single cell; `None` if it was deleted.
    pub fn shift_cell(&self, cell: CellAddress) -> Option<CellAddress> {
        match self.axis {
            Axis::Rows => self
                .shift_index(cell.row)
                .map(|row| CellAddress::new(cell.col, row)),
            Axis::Columns => self
                .shift_index(cell.col)
                .map(|col| CellAddress::new(col, cell.row)),
        }
    }
}

pub fn is_formula(text: &str) -> bool {
    text.starts_with('=')
}

/// Merge a captured values grid with its formulas grid for writing back.
/// A formula wins over the cached value at the same position.
pub fn to_restore_values(values: &[Vec<CellValue>], formulas: &[Vec<String>]) -> Vec<Vec<CellValue>> {
    values
        .iter()
        .enumerate()
        .map(|(r, row)| {
            row.iter()
                .enumerate()
                .map(|(c, value)| {
                    match formulas.get(r).and_then(|f| f.get(c)) {
                        Some(formula) if is_formula(formula) => CellValue::Text(formula.clone()),
                        _ => value.clone(),
                    }
                })
                .collect()
        })
        .collect()
}

/// `(rows, widest row)` of a grid.
pub fn grid_extent<T>(grid: &[Vec<T>]) -> (usize, usize) {
    let widest = grid.iter().map(Vec::len).max().unwrap_or(0);
    (grid.len(), widest)
}

/// Exactly `rows` rows of exactly `columns` cells each.
pub fn is_rectangular<T>(grid: &[Vec<T>], rows: usize, columns: usize) -> bool {
    grid.len() == rows && grid.iter().all(|row| row.len() == columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_letters_are_bijective_base_26() {
        assert_eq!(column_number_to_letter(1), "A");
        assert_eq!(column_number_to_letter(26), "Z");
        assert_eq!(column_number_to_letter(27), "AA");
        assert_eq!(column_number_to_letter(52), "AZ");
        assert_eq!(column_number_to_letter(53), "BA");
        assert_eq!(column_number_to_letter(702), "ZZ");
        assert_eq!(column_number_to_letter(703), "AAA");
        assert_eq!(column_number_to_letter(0), "");
    }

    #[test]
    fn column_letters_round_trip_through_numbers() {
        for n in [1, 2, 26, 27, 52, 53, 702, 703, MAX_COLUMNS] {
            assert_eq!(column_letter_to_number(&column_number_to_letter(n)), Some(n));
        }
        assert_eq!(column_letter_to_number("xfe"), None);
        assert_eq!(column_letter_to_number("A1"), None);
    }

    #[test]
    fn test_ordering() {
        let a1 = CellAddress::parse("A1").unwrap();
        let b1 = CellAddress::parse("B1").unwrap();
        let a2 = CellAddress::parse("A2").unwrap();
        let aa1 = CellAddress::parse("AA1").unwrap();

        assert!(a1 < b1);
        assert!(b1 < aa1);
        assert!(aa1 < a2);
    }

    #[test]
    fn parses_cell_row_and_column_spans() {
        let r = CellRange::parse("$C$3:A1").unwrap();
        assert_eq!(r.to_a1(), "A1:C3");
        assert_eq!(r.cell_count(), 9);

        let rows = CellRange::parse("5:7").unwrap();
        assert_eq!(rows, CellRange::rows(5, 3));
        assert_eq!(rows.column_count(), MAX_COLUMNS);

        let cols = CellRange::parse("C:E").unwrap();
        assert_eq!(cols, CellRange::columns(3, 3));

        assert!(CellRange::parse("Sheet1!A1").is_none());
        assert!(CellRange::parse("A0").is_none());
        assert!(CellRange::parse("7").is_none());
    }

    #[test]
    fn intersect_clips_to_overlap() {
        let used = CellRange::parse("A1:D10").unwrap();
        let rows = CellRange::rows(5, 3);
        assert_eq!(used.intersect(&rows).unwrap().to_a1(), "A5:D7");
        assert!(used.intersect(&CellRange::rows(20, 1)).is_none());
    }

    #[test]
    fn qualified_addresses_quote_like_excel() {
        let r = CellRange::parse("A1:B2").unwrap();
        assert_eq!(qualified_address("Data", &r), "Data!A1:B2");
        assert_eq!(qualified_address("Q1 Plan", &r), "'Q1 Plan'!A1:B2");
        assert_eq!(qualified_address("Bob's", &r), "'Bob''s'!A1:B2");
        assert_eq!(qualified_address("AB12", &r), "'AB12'!A1:B2");

        let (sheet, rest) = split_sheet_qualified("'Bob''s'!C3");
        assert_eq!(sheet.as_deref(), Some("Bob's"));
        assert_eq!(rest, "C3");
    }

    #[test]
    fn restore_values_prefer_formulas() {
        let merged = to_restore_values(
            &[vec![CellValue::Number(1.0)]],
            &[vec!["=A1+1".to_string()]],
        );
        assert_eq!(merged, vec![vec![CellValue::Text("=A1+1".to_string())]]);

        let merged = to_restore_values(&[vec![CellValue::Number(5.0)]], &[vec![String::new()]]);
        assert_eq!(merged, vec![vec![CellValue::Number(5.0)]]);
    }

    #[test]
    fn grid_extent_reports_widest_row() {
        let grid = vec![vec![1, 2], vec![3, 4, 5], vec![]];
        assert_eq!(grid_extent(&grid), (3, 3));
        assert_eq!(grid_extent::<u8>(&[]), (0, 0));
        assert!(!is_rectangular(&grid, 3, 3));
        assert!(is_rectangular(&[vec![1, 2], vec![3, 4]], 2, 2));
    }

    #[test]
    fn spans_past_the_sheet_edge_are_rejected() {
        assert!(check_span(Axis::Rows, 2, u32::MAX).is_err());
        assert!(check_span(Axis::Rows, 0, 1).is_err());
        assert!(check_span(Axis::Columns, MAX_COLUMNS, 2).is_err());
        assert!(check_span(Axis::Columns, MAX_COLUMNS, 1).is_ok());
        assert!(AxisEdit::new(Axis::Rows, 1, 0, true).is_err());
    }

    #[test]
    fn deletes_shrink_spans_and_inserts_grow_them() {
        let delete = AxisEdit::new(Axis::Rows, 3, 2, false).unwrap();
        assert_eq!(delete.shift_index(2), Some(2));
        assert_eq!(delete.shift_index(4), None);
        assert_eq!(delete.shift_index(7), Some(5));
        assert_eq!(delete.shift_span(1, 4), Some((1, 2)));
        assert_eq!(delete.shift_span(4, 9), Some((3, 7)));
        assert_eq!(delete.shift_span(3, 4), None);

        let insert = AxisEdit::new(Axis::Columns, 2, 3, true).unwrap();
        let range = CellRange::parse("A1:C4").unwrap();
        assert_eq!(insert.shift_range(&range).unwrap().to_a1(), "A1:F4");
        assert_eq!(
            insert.shift_cell(CellAddress::new(2, 9)),
            Some(CellAddress::new(5, 9))
        );

        let edge = AxisEdit::new(Axis::Rows, MAX_ROWS, 1, true).unwrap();
        assert_eq!(edge.shift_index(MAX_ROWS), None);
    }
}
