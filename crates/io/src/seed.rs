// Seed collection used when nothing has been stored yet

use guildloot_engine::{Cell, Sheet, SheetMap};

fn cells(values: &[&str]) -> Vec<Cell> {
    values.iter().map(|v| Cell::new(*v)).collect()
}

fn sheet(name: &str, heads: &[&str], rows: &[&[&str]]) -> Sheet {
    Sheet::new(name, cells(heads), rows.iter().map(|r| cells(r)).collect())
}

/// The collection a fresh install starts with.
///
/// Sheet order is the display order: `Loot`, `Trade`, `Pocket`, `Member`,
/// `Boss`, `Item`. Every seeded value passes its column's validator.
pub fn seed_sheet_map() -> SheetMap {
    [
        sheet(
            "Loot",
            &["Date", "Boss", "Looter", "Item", "Quantity", "Owner", "Priority", "Note"],
            &[
                &["2024/05/03", "Ancient Dragon", "Aria", "Dragon Scale", "2", "Aria", "1", ""],
                &["2024/05/03", "Ancient Dragon", "Borin", "Healing Potion", "5", "Borin", "2", "split later"],
                &["2024/05/10", "Frost Giant", "Aria", "Giant's Axe", "1", "Cael", "1", ""],
            ],
        ),
        sheet(
            "Trade",
            &["Date", "Item", "Quantity", "Price", "Seller", "Note"],
            &[&["2024/05/12", "Healing Potion", "3", "450", "Borin", ""]],
        ),
        sheet(
            "Pocket",
            &["Item", "Aria", "Borin", "Cael"],
            &[
                &["Dragon Scale", "", "", ""],
                &["Giant's Axe", "", "", ""],
                &["Healing Potion", "", "", ""],
            ],
        ),
        sheet(
            "Member",
            &["Joined", "Name", "Class"],
            &[
                &["2024/01/15", "Aria", "Ranger"],
                &["2024/02/02", "Borin", "Cleric"],
                &["2024/04/20", "Cael", "Warrior"],
            ],
        ),
        sheet("Boss", &["Name"], &[&["Ancient Dragon"], &["Frost Giant"]]),
        sheet(
            "Item",
            &["Name"],
            &[&["Dragon Scale"], &["Giant's Axe"], &["Healing Potion"]],
        ),
    ]
    .into_iter()
    .collect()
}
