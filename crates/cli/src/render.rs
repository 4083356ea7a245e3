// Plain-text rendering of sheets

use guildloot_engine::{CellPos, Sheet, SheetMap};

/// Marker appended to cells that fail their column's validator.
pub const INVALID_MARKER: &str = " !";

/// Render a sheet as tab-separated lines, header first.
///
/// Invalid data cells carry [`INVALID_MARKER`]. If any cell is invalid, a
/// blank line and one line per violation follow.
pub fn render_sheet(sheet: &Sheet) -> String {
    let mut out = String::new();

    for (r, row) in sheet.all_rows().enumerate() {
        let line: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(c, cell)| {
                if sheet.is_cell_valid(CellPos::new(r, c)) {
                    cell.value().to_string()
                } else {
                    format!("{}{}", cell.value(), INVALID_MARKER)
                }
            })
            .collect();
        out.push_str(&line.join("\t"));
        out.push('\n');
    }

    let violations = violation_lines(sheet);
    if !violations.is_empty() {
        out.push('\n');
        for line in violations {
            out.push_str(&line);
            out.push('\n');
        }
    }
    out
}

/// One line per invalid cell: `R2C4 "150": <message>`.
pub fn violation_lines(sheet: &Sheet) -> Vec<String> {
    sheet
        .invalid_cells()
        .into_iter()
        .map(|pos| {
            let value = sheet.cell(pos).map(|c| c.value()).unwrap_or_default();
            let message = sheet.validator(pos.col).map(|v| v.message()).unwrap_or_default();
            format!("{} {:?}: {}", pos, value, message)
        })
        .collect()
}

/// One line per sheet: name, data rows, columns.
pub fn render_sheet_list(sheets: &SheetMap) -> String {
    let width = sheets.names().map(str::len).max().unwrap_or(0);
    sheets
        .iter()
        .map(|s| {
            format!(
                "{:<width$}  {} rows  {} cols\n",
                s.name(),
                s.row_count(),
                s.col_count(),
                width = width
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use guildloot_engine::{Cell, EditIntent, Schema, Workbook};

    fn row(values: &[&str]) -> Vec<Cell> {
        values.iter().map(|v| Cell::new(*v)).collect()
    }

    fn member_workbook() -> Workbook {
        let sheets: SheetMap = [Sheet::new(
            "Member",
            row(&["Joined", "Name"]),
            vec![row(&["2024/01/01", "Aria"]), row(&["2024/02/30", "Borin"])],
        )]
        .into_iter()
        .collect();
        Workbook::new(sheets, Schema::builtin().unwrap())
    }

    #[test]
    fn test_render_marks_invalid_cells() {
        let wb = member_workbook();
        let text = render_sheet(wb.sheet("Member").unwrap());

        assert_eq!(
            text,
            "Joined\tName\n\
             2024/01/01\tAria\n\
             2024/02/30 !\tBorin\n\
             \n\
             R2C0 \"2024/02/30\": Value violates the column's validation rule\n"
        );
    }

    #[test]
    fn test_render_valid_sheet_has_no_footer() {
        let mut wb = member_workbook();
        let fix = EditIntent::UpdateCell {
            pos: CellPos::data(1, 0),
            value: "2024/02/29".into(),
        };
        let member = wb.dispatch("Member", &fix).unwrap();

        assert_eq!(render_sheet(member), "Joined\tName\n2024/01/01\tAria\n2024/02/29\tBorin\n");
        assert!(violation_lines(member).is_empty());
    }

    #[test]
    fn test_render_sheet_list() {
        let wb = member_workbook();
        assert_eq!(render_sheet_list(wb.sheets()), "Member  2 rows  2 cols\n");
    }
}
