//! Recalculation: attach validators to sheets and recompute derived content.
//!
//! A pass is total. Bad data never fails it: an aggregation that meets a
//! non-integer quantity writes [`ERROR_VALUE`] into that one cell and the rest
//! of the sheet is still computed.

use std::time::Instant;

use log::{debug, warn};
use rustc_hash::FxHashMap;

use crate::cell::Cell;
use crate::schema::{ColumnRule, DerivedRule, Schema, SheetSchema};
use crate::sheet::{Sheet, SheetMap};
use crate::validation::{parse_strict_int, Validator};

/// In-band marker for an aggregation that could not be computed.
pub const ERROR_VALUE: &str = "#ERROR";

/// Report from a recalculation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecalcReport {
    /// Number of sheets that were recalculated.
    pub sheets_recomputed: usize,
    /// Number of derived cells written.
    pub derived_cells: usize,
    /// Number of derived cells that ended up as `#ERROR`.
    pub error_cells: usize,
    /// Wall time of the pass in microseconds.
    pub duration_us: u64,
}

impl RecalcReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Format as a one-line log entry.
    ///
    /// Format: `[recalc] 6 sheets  14 derived  errors=1  112us`
    pub fn log_line(&self) -> String {
        format!(
            "[recalc] {} sheets  {} derived  errors={}  {}us",
            self.sheets_recomputed, self.derived_cells, self.error_cells, self.duration_us
        )
    }
}

/// Recalculate one sheet in the context of the current collection.
///
/// `sheet` is used as given (it may be a newer snapshot than the one stored
/// in `sheets`); other sheets are read from `sheets`.
pub fn recalculate_sheet(sheet: &Sheet, sheets: &SheetMap, schema: &Schema) -> Sheet {
    let mut report = RecalcReport::new();
    recalculate_into(sheet, sheets, schema, &mut report)
}

/// Recalculate every sheet of the collection in dependency order.
///
/// Each sheet sees the already-recalculated versions of the sheets it reads.
/// Running this twice on the same input gives the same output.
pub fn recalculate_all(sheets: &SheetMap, schema: &Schema) -> (SheetMap, RecalcReport) {
    let start = Instant::now();
    let mut report = RecalcReport::new();
    let mut current = sheets.clone();

    for name in schema.recalc_order(sheets.names()) {
        let Some(sheet) = current.get(name) else {
            continue;
        };
        let next = recalculate_into(sheet, &current, schema, &mut report);
        current.insert(next);
    }

    report.duration_us = start.elapsed().as_micros() as u64;
    debug!("{}", report.log_line());
    (current, report)
}

fn recalculate_into(
    sheet: &Sheet,
    sheets: &SheetMap,
    schema: &Schema,
    report: &mut RecalcReport,
) -> Sheet {
    let mut next = sheet.clone();
    report.sheets_recomputed += 1;

    let Some(sheet_schema) = schema.sheet(sheet.name()) else {
        next.set_col_validators(vec![None; sheet.col_count()]);
        return next;
    };

    next.set_col_validators(build_validators(sheet, sheet_schema, sheets));

    if let Some(rule) = &sheet_schema.derived {
        apply_derived(&mut next, rule, sheets, report);
    }
    next
}

// ============================================================================
// Validators
// ============================================================================

fn build_validators(
    sheet: &Sheet,
    sheet_schema: &SheetSchema,
    sheets: &SheetMap,
) -> Vec<Option<Validator>> {
    // Several columns may draw from the same sheet (Loot reads Member twice).
    let mut value_sets: FxHashMap<&str, Option<Validator>> = FxHashMap::default();

    (0..sheet.col_count())
        .map(|col| match sheet_schema.columns.get(col) {
            None | Some(ColumnRule::Free) => None,
            Some(ColumnRule::Fixed(validator)) => Some(validator.clone()),
            Some(ColumnRule::ValueSet { sheet: source }) => value_sets
                .entry(source.as_str())
                .or_insert_with(|| match sheets.get(source) {
                    Some(src) => Some(Validator::from_value_set(src)),
                    None => {
                        warn!(
                            "sheet {:?} column {} reads missing sheet {:?}; column left unvalidated",
                            sheet.name(),
                            col,
                            source
                        );
                        None
                    }
                })
                .clone(),
        })
        .collect()
}

// ============================================================================
// Derived Content
// ============================================================================

fn apply_derived(sheet: &mut Sheet, rule: &DerivedRule, sheets: &SheetMap, report: &mut RecalcReport) {
    match rule {
        DerivedRule::OwnerTotals {
            source,
            item_column,
            quantity_column,
            owner_column,
        } => {
            let Some(source_sheet) = sheets.get(source) else {
                warn!(
                    "sheet {:?} derives from missing sheet {:?}; derived cells left as-is",
                    sheet.name(),
                    source
                );
                return;
            };
            let columns = OwnerColumns {
                item: *item_column,
                quantity: *quantity_column,
                owner: *owner_column,
            };
            owner_totals(sheet, source_sheet, columns, report);
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct OwnerColumns {
    item: usize,
    quantity: usize,
    owner: usize,
}

/// Fill every owner column of every keyed row with that owner's total.
/// Rows with an empty item key are left untouched.
fn owner_totals(sheet: &mut Sheet, source: &Sheet, columns: OwnerColumns, report: &mut RecalcReport) {
    let owners: Vec<String> = sheet.heads().iter().map(|c| c.value().to_string()).collect();

    for row in sheet.rows_mut() {
        let item = match row.first() {
            Some(cell) if !cell.is_empty() => cell.value().to_string(),
            _ => continue,
        };

        for (c, cell) in row.iter_mut().enumerate().skip(1) {
            let owner = owners.get(c).map(String::as_str).unwrap_or_default();
            let value = match sum_quantities(source, &item, owner, columns) {
                Some(total) if total > 0 => total.to_string(),
                Some(_) => String::new(),
                None => {
                    report.error_cells += 1;
                    ERROR_VALUE.to_string()
                }
            };
            *cell = Cell::new(value);
            report.derived_cells += 1;
        }
    }
}

/// Sum the quantities of `source` rows matching `item` and `owner`.
///
/// Returns None if any matching quantity is not a strict integer, or if the
/// sum overflows.
fn sum_quantities(source: &Sheet, item: &str, owner: &str, columns: OwnerColumns) -> Option<i64> {
    source
        .rows()
        .iter()
        .filter(|r| value_at(r, columns.item) == item && value_at(r, columns.owner) == owner)
        .try_fold(0i64, |acc, r| {
            acc.checked_add(parse_strict_int(value_at(r, columns.quantity))?)
        })
}

fn value_at(row: &[Cell], col: usize) -> &str {
    row.get(col).map(Cell::value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellPos;

    fn row(values: &[&str]) -> Vec<Cell> {
        values.iter().map(|v| Cell::new(*v)).collect()
    }

    fn loot(rows: &[[&str; 8]]) -> Sheet {
        Sheet::new(
            "Loot",
            row(&["Date", "Boss", "Looter", "Item", "Qty", "Recipient", "Priority", "Note"]),
            rows.iter().map(|r| row(r)).collect(),
        )
    }

    fn pocket(rows: &[&[&str]]) -> Sheet {
        Sheet::new(
            "Pocket",
            row(&["Item", "Alice", "Bob"]),
            rows.iter().map(|r| row(r)).collect(),
        )
    }

    fn collection(loot_rows: &[[&str; 8]], pocket_rows: &[&[&str]]) -> SheetMap {
        [
            Sheet::new("Boss", row(&["Name"]), vec![row(&["Dragon"])]),
            Sheet::new("Item", row(&["Name"]), vec![row(&["Sword"]), row(&["Shield"])]),
            Sheet::new(
                "Member",
                row(&["Joined", "Name"]),
                vec![row(&["2024/01/01", "Alice"]), row(&["2024/02/01", "Bob"])],
            ),
            loot(loot_rows),
            pocket(pocket_rows),
        ]
        .into_iter()
        .collect()
    }

    fn values(sheet: &Sheet) -> Vec<Vec<String>> {
        sheet
            .rows()
            .iter()
            .map(|r| r.iter().map(|c| c.value().to_string()).collect())
            .collect()
    }

    const SWORD_3: [&str; 8] = ["2024/03/01", "Dragon", "Bob", "Sword", "3", "Alice", "1", ""];
    const SWORD_2: [&str; 8] = ["2024/03/02", "Dragon", "Bob", "Sword", "2", "Alice", "1", ""];

    #[test]
    fn test_owner_totals_sum() {
        let sheets = collection(&[SWORD_3, SWORD_2], &[&["Sword", "", ""]]);
        let schema = Schema::builtin().unwrap();

        let pocket = recalculate_sheet(sheets.get("Pocket").unwrap(), &sheets, &schema);
        assert_eq!(values(&pocket), vec![vec!["Sword", "5", ""]]);
    }

    #[test]
    fn test_owner_totals_error_poisons_cell() {
        let mut bad = SWORD_2;
        bad[4] = "abc";
        let sheets = collection(&[SWORD_3, bad], &[&["Sword", "", ""], &["Shield", "", "7"]]);
        let schema = Schema::builtin().unwrap();

        let (all, report) = recalculate_all(&sheets, &schema);
        let pocket = all.get("Pocket").unwrap();

        // Only Alice's Sword total is poisoned; Bob has no matching rows.
        assert_eq!(
            values(pocket),
            vec![vec!["Sword", "#ERROR", ""], vec!["Shield", "", ""]]
        );
        assert_eq!(report.error_cells, 1);
        assert_eq!(report.derived_cells, 4);
    }

    #[test]
    fn test_owner_totals_skip_empty_item_rows() {
        let sheets = collection(&[SWORD_3], &[&["", "stale", "9"], &["  ", "x", ""]]);
        let schema = Schema::builtin().unwrap();

        let pocket = recalculate_sheet(sheets.get("Pocket").unwrap(), &sheets, &schema);
        assert_eq!(values(&pocket), vec![vec!["", "stale", "9"], vec!["  ", "x", ""]]);
    }

    #[test]
    fn test_owner_totals_zero_and_negative_are_blank() {
        let mut minus = SWORD_2;
        minus[4] = "-3";
        let sheets = collection(&[SWORD_3, minus], &[&["Sword", "1", ""]]);
        let schema = Schema::builtin().unwrap();

        let pocket = recalculate_sheet(sheets.get("Pocket").unwrap(), &sheets, &schema);
        assert_eq!(values(&pocket), vec![vec!["Sword", "", ""]]);
    }

    #[test]
    fn test_owner_totals_require_strict_integers() {
        let mut padded = SWORD_2;
        padded[4] = "02";
        let sheets = collection(&[padded], &[&["Sword", "", ""]]);
        let schema = Schema::builtin().unwrap();

        let pocket = recalculate_sheet(sheets.get("Pocket").unwrap(), &sheets, &schema);
        assert_eq!(values(&pocket), vec![vec!["Sword", "#ERROR", ""]]);
    }

    #[test]
    fn test_validators_follow_schema() {
        let sheets = collection(&[SWORD_3], &[]);
        let schema = Schema::builtin().unwrap();

        let loot = recalculate_sheet(sheets.get("Loot").unwrap(), &sheets, &schema);
        assert_eq!(loot.col_validators().len(), 8);
        assert!(matches!(loot.validator(0), Some(Validator::Date(_))));
        assert!(loot.validator(7).is_none());

        let members = loot.validator(2).unwrap();
        assert!(members.validate(&Cell::new("Alice")));
        assert!(members.validate(&Cell::new("2024/01/01")));
        assert!(!members.validate(&Cell::new("Carol")));

        assert!(loot.invalid_cells().is_empty());
    }

    #[test]
    fn test_validators_padded_to_column_count() {
        let sheets = collection(&[], &[&["Sword", "", ""]]);
        let schema = Schema::builtin().unwrap();

        let pocket = recalculate_sheet(sheets.get("Pocket").unwrap(), &sheets, &schema);
        assert_eq!(pocket.col_validators().len(), 3);
        assert!(pocket.validator(0).is_some());
        assert!(pocket.validator(1).is_none());
    }

    #[test]
    fn test_unknown_sheet_gets_no_validators() {
        let sheets = collection(&[], &[]);
        let schema = Schema::builtin().unwrap();

        let boss = recalculate_sheet(sheets.get("Boss").unwrap(), &sheets, &schema);
        assert_eq!(boss.col_validators().len(), 1);
        assert!(boss.col_validators().iter().all(Option::is_none));
        assert_eq!(boss.rows(), sheets.get("Boss").unwrap().rows());
    }

    #[test]
    fn test_missing_value_set_source_leaves_column_unvalidated() {
        let sheets: SheetMap = [Sheet::new("Trade", row(&["Date", "Item"]), vec![row(&["", "Anything"])])]
            .into_iter()
            .collect();
        let schema = Schema::builtin().unwrap();

        let trade = recalculate_sheet(sheets.get("Trade").unwrap(), &sheets, &schema);
        assert!(trade.validator(0).is_some());
        assert!(trade.validator(1).is_none());
        assert!(trade.is_cell_valid(CellPos::data(0, 1)));
    }

    #[test]
    fn test_recalculate_all_is_idempotent() {
        let mut bad = SWORD_2;
        bad[4] = "x";
        let sheets = collection(&[SWORD_3, bad], &[&["Sword", "", ""], &["", "", ""], &["Shield", "", ""]]);
        let schema = Schema::builtin().unwrap();

        let (once, _) = recalculate_all(&sheets, &schema);
        let (twice, _) = recalculate_all(&once, &schema);
        assert_eq!(once, twice);
        assert_eq!(once.names().collect::<Vec<_>>(), sheets.names().collect::<Vec<_>>());
    }

    #[test]
    fn test_single_sheet_matches_full_pass() {
        let sheets = collection(&[SWORD_3, SWORD_2], &[&["Sword", "", ""]]);
        let schema = Schema::builtin().unwrap();

        let (all, _) = recalculate_all(&sheets, &schema);
        for sheet in sheets.iter() {
            let single = recalculate_sheet(sheet, &sheets, &schema);
            assert_eq!(&single, all.get(sheet.name()).unwrap(), "sheet {}", sheet.name());
        }
    }

    #[test]
    fn test_report_log_line() {
        let report = RecalcReport {
            sheets_recomputed: 6,
            derived_cells: 14,
            error_cells: 1,
            duration_us: 112,
        };
        assert_eq!(report.log_line(), "[recalc] 6 sheets  14 derived  errors=1  112us");
    }
}
