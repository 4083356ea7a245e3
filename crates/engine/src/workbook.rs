use log::debug;

use crate::recalc::{recalculate_all, recalculate_sheet, RecalcReport};
use crate::reducer::{reduce, EditIntent};
use crate::schema::Schema;
use crate::sheet::{Sheet, SheetMap, SheetRecord};

/// Owner of the sheet collection and the schema it is recalculated against.
///
/// Every committed edit goes through here so that sheets reading the edited
/// one, directly or through other sheets, are refreshed in the same step.
#[derive(Debug, Clone)]
pub struct Workbook {
    sheets: SheetMap,
    schema: Schema,
    last_report: RecalcReport,
}

impl Workbook {
    /// Take ownership of `sheets` and run a full recalculation.
    pub fn new(sheets: SheetMap, schema: Schema) -> Self {
        let (sheets, last_report) = recalculate_all(&sheets, &schema);
        Self {
            sheets,
            schema,
            last_report,
        }
    }

    pub fn sheets(&self) -> &SheetMap {
        &self.sheets
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.get(name)
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.names().collect()
    }

    /// Report of the full recalculation run on construction.
    pub fn last_report(&self) -> &RecalcReport {
        &self.last_report
    }

    /// Reduce the named sheet with `intent` and commit the result.
    ///
    /// Returns the committed sheet, or None if no sheet has that name.
    pub fn dispatch(&mut self, name: &str, intent: &EditIntent) -> Option<&Sheet> {
        let current = self.sheets.get(name)?;
        let next = reduce(current, intent, &self.sheets, &self.schema);
        self.sheets.insert(next);

        let refreshed = self.refresh_dependents(name);
        debug!("dispatch {:?} on {}: refreshed {:?}", intent, name, refreshed);
        self.sheets.get(name)
    }

    /// Replace (or create) the named sheet from pasted tab-separated text.
    ///
    /// Returns the number of data rows kept after normalization.
    pub fn import_paste(&mut self, name: &str, text: &str) -> usize {
        let mut sheet = Sheet::from_paste(name, text);
        sheet.normalize();
        let rows = sheet.row_count();

        let next = recalculate_sheet(&sheet, &self.sheets, &self.schema);
        self.sheets.insert(next);

        let refreshed = self.refresh_dependents(name);
        debug!("import into {}: {} rows, refreshed {:?}", name, rows, refreshed);
        rows
    }

    /// Persisted form of the collection.
    pub fn records(&self) -> Vec<(String, SheetRecord)> {
        self.sheets.records()
    }

    /// Recalculate every sheet downstream of `name`, in dependency order.
    fn refresh_dependents(&mut self, name: &str) -> Vec<String> {
        let order = self.schema.recalc_order(self.schema.transitive_dependents(name));
        let mut refreshed = Vec::with_capacity(order.len());

        for dependent in order {
            let Some(sheet) = self.sheets.get(dependent) else {
                continue;
            };
            let next = recalculate_sheet(sheet, &self.sheets, &self.schema);
            self.sheets.insert(next);
            refreshed.push(dependent.to_string());
        }
        refreshed
    }
}
