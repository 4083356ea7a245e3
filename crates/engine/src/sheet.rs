//! Sheets and the named sheet collection.
//!
//! A sheet is a header row plus data rows of text cells, and a per-column
//! validator list that is rebuilt on every recalculation. Only the name, the
//! header and the data rows are persisted.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cell::{Cell, CellPos};
use crate::validation::Validator;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    name: String,
    heads: Vec<Cell>,
    rows: Vec<Vec<Cell>>,
    /// One entry per column once recalculated; `None` = unvalidated column.
    col_validators: Vec<Option<Validator>>,
}

/// Plain serializable form of a sheet: `{ name, heads: [{value}], rows: [[{value}]] }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetRecord {
    pub name: String,
    pub heads: Vec<Cell>,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    /// Create a sheet with no validators attached.
    pub fn new(name: impl Into<String>, heads: Vec<Cell>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            name: name.into(),
            heads,
            rows,
            col_validators: Vec::new(),
        }
    }

    /// Same sheet under another name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn heads(&self) -> &[Cell] {
        &self.heads
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn col_count(&self) -> usize {
        self.heads.len()
    }

    /// Header row followed by the data rows, in `CellPos` row order.
    pub fn all_rows(&self) -> impl Iterator<Item = &[Cell]> + '_ {
        std::iter::once(self.heads.as_slice()).chain(self.rows.iter().map(Vec::as_slice))
    }

    pub fn cell(&self, pos: CellPos) -> Option<&Cell> {
        match pos.data_row() {
            None => self.heads.get(pos.col),
            Some(r) => self.rows.get(r)?.get(pos.col),
        }
    }

    pub fn col_validators(&self) -> &[Option<Validator>] {
        &self.col_validators
    }

    pub fn validator(&self, col: usize) -> Option<&Validator> {
        self.col_validators.get(col)?.as_ref()
    }

    /// Whether the cell at `pos` satisfies its column's validator.
    ///
    /// Header cells and unvalidated columns are always valid; a position
    /// outside the sheet is reported as valid too, since there is nothing to flag.
    pub fn is_cell_valid(&self, pos: CellPos) -> bool {
        if pos.data_row().is_none() {
            return true;
        }
        match (self.cell(pos), self.validator(pos.col)) {
            (Some(cell), Some(validator)) => validator.validate(cell),
            _ => true,
        }
    }

    /// Positions of every data cell that fails its column's validator.
    pub fn invalid_cells(&self) -> Vec<CellPos> {
        let mut invalid = Vec::new();
        for (r, row) in self.rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                if let Some(validator) = self.validator(c) {
                    if !validator.validate(cell) {
                        invalid.push(CellPos::data(r, c));
                    }
                }
            }
        }
        invalid
    }

    /// Pad every row to `col_count` cells and drop trailing all-empty rows.
    ///
    /// Cells beyond `col_count` are dropped so that every row matches the
    /// header width. Empty rows that are followed by a non-empty row stay.
    pub fn normalize(&mut self) {
        let cols = self.col_count();
        for row in &mut self.rows {
            row.resize_with(cols, Cell::empty);
        }

        while self
            .rows
            .last()
            .is_some_and(|row| row.iter().all(Cell::is_empty))
        {
            self.rows.pop();
        }
    }

    /// Append one row of `col_count` empty cells.
    pub fn add_row(&mut self) {
        let cols = self.col_count();
        self.rows.push(vec![Cell::empty(); cols]);
    }

    /// Replace the cell at `pos`. Returns false (and changes nothing) if the
    /// position is outside the sheet.
    pub(crate) fn replace_cell(&mut self, pos: CellPos, cell: Cell) -> bool {
        let slot = match pos.data_row() {
            None => self.heads.get_mut(pos.col),
            Some(r) => self.rows.get_mut(r).and_then(|row| row.get_mut(pos.col)),
        };
        match slot {
            Some(slot) => {
                *slot = cell;
                true
            }
            None => false,
        }
    }

    pub(crate) fn rows_mut(&mut self) -> &mut Vec<Vec<Cell>> {
        &mut self.rows
    }

    pub(crate) fn set_col_validators(&mut self, validators: Vec<Option<Validator>>) {
        self.col_validators = validators;
    }

    // =========================================================================
    // Construction from external forms
    // =========================================================================

    /// Rebuild a sheet from its plain object form.
    ///
    /// Fails soft: missing or mistyped fields become empty collections or empty
    /// strings, numbers and booleans are stringified, and any stored
    /// validators are ignored (validators are always rebuilt).
    pub fn from_value(value: &Value) -> Self {
        let name = value
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let heads = value.get("heads").map(cells_from_value).unwrap_or_default();
        let rows = value
            .get("rows")
            .and_then(Value::as_array)
            .map(|rows| rows.iter().map(cells_from_value).collect())
            .unwrap_or_default();

        Sheet::new(name, heads, rows)
    }

    /// Build a sheet from pasted tab/newline-delimited text.
    ///
    /// The first line becomes the header row. No validators are attached and
    /// rows are not normalized; callers recalculate afterwards.
    pub fn from_paste(name: impl Into<String>, content: &str) -> Self {
        let mut lines = content.trim().split('\n').map(|line| {
            line.strip_suffix('\r')
                .unwrap_or(line)
                .split('\t')
                .map(Cell::new)
                .collect::<Vec<_>>()
        });

        let heads = lines.next().unwrap_or_default();
        let rows = lines.collect();
        Sheet::new(name, heads, rows)
    }

    pub fn to_record(&self) -> SheetRecord {
        SheetRecord {
            name: self.name.clone(),
            heads: self.heads.clone(),
            rows: self.rows.clone(),
        }
    }
}

impl From<SheetRecord> for Sheet {
    fn from(record: SheetRecord) -> Self {
        Sheet::new(record.name, record.heads, record.rows)
    }
}

fn cells_from_value(value: &Value) -> Vec<Cell> {
    value
        .as_array()
        .map(|cells| cells.iter().map(cell_from_value).collect())
        .unwrap_or_default()
}

fn cell_from_value(value: &Value) -> Cell {
    match value.get("value") {
        Some(Value::String(s)) => Cell::new(s.as_str()),
        Some(Value::Number(n)) => Cell::new(n.to_string()),
        Some(Value::Bool(b)) => Cell::new(b.to_string()),
        _ => Cell::empty(),
    }
}

// ============================================================================
// Sheet Collection
// ============================================================================

/// The named sheet collection, in insertion order.
///
/// Names are unique: inserting a sheet whose name already exists replaces the
/// existing sheet in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetMap {
    sheets: Vec<Sheet>,
}

impl SheetMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Insert or replace by name. Returns the replaced sheet, if any.
    pub fn insert(&mut self, sheet: Sheet) -> Option<Sheet> {
        match self.sheets.iter_mut().find(|s| s.name == sheet.name) {
            Some(slot) => Some(std::mem::replace(slot, sheet)),
            None => {
                self.sheets.push(sheet);
                None
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sheet> + '_ {
        self.sheets.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.sheets.iter().map(|s| s.name.as_str())
    }

    pub fn normalize_all(&mut self) {
        for sheet in &mut self.sheets {
            sheet.normalize();
        }
    }

    /// Persisted form: ordered `(name, record)` pairs.
    pub fn records(&self) -> Vec<(String, SheetRecord)> {
        self.sheets
            .iter()
            .map(|s| (s.name.clone(), s.to_record()))
            .collect()
    }
}

impl FromIterator<Sheet> for SheetMap {
    fn from_iter<I: IntoIterator<Item = Sheet>>(iter: I) -> Self {
        let mut map = SheetMap::new();
        for sheet in iter {
            map.insert(sheet);
        }
        map
    }
}

impl IntoIterator for SheetMap {
    type Item = Sheet;
    type IntoIter = std::vec::IntoIter<Sheet>;

    fn into_iter(self) -> Self::IntoIter {
        self.sheets.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(values: &[&str]) -> Vec<Cell> {
        values.iter().map(|v| Cell::new(*v)).collect()
    }

    fn values(sheet: &Sheet) -> Vec<Vec<String>> {
        sheet
            .rows()
            .iter()
            .map(|r| r.iter().map(|c| c.value().to_string()).collect())
            .collect()
    }

    #[test]
    fn test_normalize_pads_and_trims() {
        let mut sheet = Sheet::new(
            "S",
            row(&["A", "B", "C"]),
            vec![row(&["1"]), row(&[]), row(&["2", "x"]), row(&["", " "]), row(&[])],
        );
        sheet.normalize();

        assert_eq!(
            values(&sheet),
            vec![
                vec!["1", "", ""],
                vec!["", "", ""],
                vec!["2", "x", ""],
            ]
        );
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let mut once = Sheet::new(
            "S",
            row(&["A", "B"]),
            vec![row(&["1", "2", "3"]), row(&[""]), row(&["x"]), row(&[""])],
        );
        once.normalize();
        let mut twice = once.clone();
        twice.normalize();

        assert_eq!(once, twice);
        assert!(once.rows().iter().all(|r| r.len() == 2));
    }

    #[test]
    fn test_normalize_keeps_inner_empty_rows() {
        let mut sheet = Sheet::new("S", row(&["A"]), vec![row(&[""]), row(&["x"])]);
        sheet.normalize();
        assert_eq!(sheet.row_count(), 2);
    }

    #[test]
    fn test_normalize_all_empty_sheet() {
        let mut sheet = Sheet::new("S", row(&["A"]), vec![row(&[""]), row(&["  "])]);
        sheet.normalize();
        assert_eq!(sheet.row_count(), 0);
    }

    #[test]
    fn test_add_row() {
        let mut sheet = Sheet::new("S", row(&["A", "B", "C"]), vec![row(&["1", "2", "3"])]);
        sheet.add_row();

        assert_eq!(sheet.row_count(), 2);
        let last = sheet.rows().last().unwrap();
        assert_eq!(last.len(), 3);
        assert!(last.iter().all(Cell::is_empty));
    }

    #[test]
    fn test_from_paste() {
        let sheet = Sheet::from_paste("Item", "Name\tPrice\nSword\t10\r\nShield\t\tx\n\n");

        assert_eq!(sheet.name(), "Item");
        assert_eq!(sheet.heads(), row(&["Name", "Price"]).as_slice());
        // Rows keep their pasted width; normalization happens later.
        assert_eq!(values(&sheet), vec![vec!["Sword", "10"], vec!["Shield", "", "x"]]);
        assert!(sheet.col_validators().is_empty());
    }

    #[test]
    fn test_with_name_keeps_contents() {
        let sheet = Sheet::new("Old", row(&["A"]), vec![row(&["1"])]).with_name("New");
        assert_eq!(sheet.name(), "New");
        assert_eq!(values(&sheet), vec![vec!["1"]]);
    }

    #[test]
    fn test_from_paste_empty_text() {
        let sheet = Sheet::from_paste("Empty", "");
        assert_eq!(sheet.col_count(), 1);
        assert_eq!(sheet.row_count(), 0);
    }

    #[test]
    fn test_from_value_fails_soft() {
        let sheet = Sheet::from_value(&json!({
            "name": "Loot",
            "heads": [{"value": "Date"}, {}, {"value": 3}],
            "rows": [[{"value": "x"}, "oops"], 42],
            "colValidators": [{"min": 1, "max": 2}]
        }));

        assert_eq!(sheet.name(), "Loot");
        assert_eq!(sheet.heads(), row(&["Date", "", "3"]).as_slice());
        assert_eq!(values(&sheet), vec![vec!["x", ""], vec![]]);
        assert!(sheet.col_validators().is_empty());

        let empty = Sheet::from_value(&json!("not an object"));
        assert_eq!(empty, Sheet::default());
    }

    #[test]
    fn test_record_round_trip() {
        let sheet = Sheet::new(
            "Member",
            row(&["Name", "Joined"]),
            vec![row(&["Alice", "2024/01/01"]), row(&["Bob", ""])],
        );

        let json = serde_json::to_value(sheet.to_record()).unwrap();
        let back = Sheet::from_value(&json);

        assert_eq!(back.name(), sheet.name());
        assert_eq!(back.heads(), sheet.heads());
        assert_eq!(back.rows(), sheet.rows());
    }

    #[test]
    fn test_cell_lookup_and_replace() {
        let mut sheet = Sheet::new("S", row(&["A", "B"]), vec![row(&["1", "2"])]);
        assert_eq!(sheet.cell(CellPos::head(1)).unwrap().value(), "B");
        assert_eq!(sheet.cell(CellPos::data(0, 0)).unwrap().value(), "1");
        assert!(sheet.cell(CellPos::data(1, 0)).is_none());

        assert!(sheet.replace_cell(CellPos::data(0, 1), Cell::new("9")));
        assert_eq!(sheet.cell(CellPos::data(0, 1)).unwrap().value(), "9");
        assert!(!sheet.replace_cell(CellPos::new(5, 0), Cell::new("x")));
        assert!(!sheet.replace_cell(CellPos::head(2), Cell::new("x")));
    }

    #[test]
    fn test_invalid_cells_skip_header() {
        let mut sheet = Sheet::new(
            "S",
            row(&["Qty", "Note"]),
            vec![row(&["5", "a"]), row(&["500", "b"])],
        );
        sheet.set_col_validators(vec![Some(Validator::from_int_range(1, 99).unwrap()), None]);

        assert_eq!(sheet.invalid_cells(), vec![CellPos::data(1, 0)]);
        assert!(sheet.is_cell_valid(CellPos::head(0)));
        assert!(!sheet.is_cell_valid(CellPos::data(1, 0)));
    }

    #[test]
    fn test_sheet_map_insert_replaces_in_place() {
        let mut map: SheetMap = ["A", "B", "C"]
            .into_iter()
            .map(|n| Sheet::new(n, vec![], vec![]))
            .collect();

        let replaced = map.insert(Sheet::new("B", row(&["x"]), vec![]));
        assert!(replaced.is_some());
        assert_eq!(map.names().collect::<Vec<_>>(), vec!["A", "B", "C"]);
        assert_eq!(map.get("B").unwrap().col_count(), 1);

        assert!(map.insert(Sheet::new("D", vec![], vec![])).is_none());
        assert_eq!(map.len(), 4);
    }
}
