//! Edit intents and the pure sheet reducer.

use serde::{Deserialize, Serialize};

use crate::cell::{Cell, CellPos};
use crate::recalc::recalculate_sheet;
use crate::schema::Schema;
use crate::sheet::{Sheet, SheetMap};

/// An edit requested against one sheet.
///
/// Serialized with a `type` tag; any unrecognised tag reads as `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EditIntent {
    /// Append one empty row.
    AddRow,
    /// Replace the value of the cell at `pos` (row 0 is the header).
    UpdateCell { pos: CellPos, value: String },
    /// Recalculate the sheet without changing its content.
    Calculate,
    #[serde(other)]
    Unknown,
}

/// Apply `intent` to `sheet`, returning the next snapshot.
///
/// The input is never modified. `sheets` supplies the other sheets that
/// validators and derived content read from.
pub fn reduce(sheet: &Sheet, intent: &EditIntent, sheets: &SheetMap, schema: &Schema) -> Sheet {
    match intent {
        EditIntent::AddRow => {
            let mut next = sheet.clone();
            next.add_row();
            next
        }
        EditIntent::UpdateCell { pos, value } => {
            let mut next = sheet.clone();
            if !next.replace_cell(*pos, Cell::new(value.as_str())) {
                log::debug!("{}: update at {} is outside the sheet", sheet.name(), pos);
            }
            recalculate_sheet(&next, sheets, schema)
        }
        EditIntent::Calculate => recalculate_sheet(sheet, sheets, schema),
        EditIntent::Unknown => sheet.clone(),
    }
}
