//! Sheet model, validation, and recalculation for the guild loot ledger.

pub mod cell;
pub mod error;
pub mod recalc;
pub mod reducer;
pub mod schema;
pub mod sheet;
pub mod validation;
pub mod workbook;

pub use cell::{Cell, CellPos};
pub use error::ConfigError;
pub use recalc::{recalculate_all, recalculate_sheet, RecalcReport, ERROR_VALUE};
pub use reducer::{reduce, EditIntent};
pub use schema::Schema;
pub use sheet::{Sheet, SheetMap, SheetRecord};
pub use validation::Validator;
pub use workbook::Workbook;
