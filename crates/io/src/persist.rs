// Sheet collection blob: a JSON array of [name, sheet] pairs

use log::{debug, warn};
use serde_json::Value;

use guildloot_engine::{Sheet, SheetMap};

use crate::error::{Result, StoreError};
use crate::seed::seed_sheet_map;
use crate::store::KeyValueStore;

/// Key the collection is stored under.
pub const SHEET_MAP_KEY: &str = "guildLoot_sheetMap";

/// Serialize the collection as `[[name, {name, heads, rows}], ...]`.
///
/// Validators are never written; they are rebuilt on load.
pub fn encode_sheet_map(sheets: &SheetMap) -> Result<String> {
    Ok(serde_json::to_string(&sheets.records())?)
}

/// Parse a stored blob.
///
/// The blob must be a JSON array. Entries that are not `[name, object]`
/// pairs are skipped; malformed fields inside a sheet fall back to empty
/// values. The pair's name wins over the name stored inside the sheet.
pub fn decode_sheet_map(blob: &str) -> Result<SheetMap> {
    let value: Value =
        serde_json::from_str(blob).map_err(|e| StoreError::Corrupt(e.to_string()))?;
    let entries = value.as_array().ok_or_else(|| {
        StoreError::Corrupt("expected an array of [name, sheet] pairs".to_string())
    })?;

    let mut sheets = SheetMap::new();
    for (i, entry) in entries.iter().enumerate() {
        match entry.as_array().map(Vec::as_slice) {
            Some([Value::String(name), body @ Value::Object(_), ..]) => {
                sheets.insert(Sheet::from_value(body).with_name(name.as_str()));
            }
            _ => warn!("skipping malformed sheet entry #{i} in stored collection"),
        }
    }
    Ok(sheets)
}

/// Load the collection stored under `key`, or the seed collection if
/// nothing is stored. Every sheet is normalized.
pub fn load_sheet_map(store: &dyn KeyValueStore, key: &str) -> Result<SheetMap> {
    let mut sheets = match store.get(key)? {
        Some(blob) if !blob.trim().is_empty() => decode_sheet_map(&blob)?,
        _ => {
            debug!("no stored collection under {key:?}; using seed");
            seed_sheet_map()
        }
    };
    sheets.normalize_all();
    Ok(sheets)
}

pub fn save_sheet_map(store: &mut dyn KeyValueStore, key: &str, sheets: &SheetMap) -> Result<()> {
    let blob = encode_sheet_map(sheets)?;
    store.set(key, &blob)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FileStore, MemoryStore};
    use guildloot_engine::{Cell, CellPos};
    use serde_json::json;
    use tempfile::tempdir;

    fn row(values: &[&str]) -> Vec<Cell> {
        values.iter().map(|v| Cell::new(*v)).collect()
    }

    fn sample() -> SheetMap {
        [
            Sheet::new("Item", row(&["Name"]), vec![row(&["Sword"]), row(&["Shield"])]),
            Sheet::new("Boss", row(&["Name", "Zone"]), vec![row(&["Dragon", "Peak"])]),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_encoded_shape() {
        let blob = encode_sheet_map(&sample()).unwrap();
        let value: Value = serde_json::from_str(&blob).unwrap();

        assert_eq!(
            value[1],
            json!(["Boss", {
                "name": "Boss",
                "heads": [{"value": "Name"}, {"value": "Zone"}],
                "rows": [[{"value": "Dragon"}, {"value": "Peak"}]]
            }])
        );
    }

    #[test]
    fn test_memory_round_trip() {
        let mut store = MemoryStore::new();
        save_sheet_map(&mut store, SHEET_MAP_KEY, &sample()).unwrap();

        let loaded = load_sheet_map(&store, SHEET_MAP_KEY).unwrap();
        assert_eq!(loaded, sample());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempdir().unwrap();
        let mut store = FileStore::new(dir.path());
        save_sheet_map(&mut store, SHEET_MAP_KEY, &sample()).unwrap();
        assert!(dir.path().join("guildLoot_sheetMap.json").exists());

        let reopened = FileStore::new(dir.path());
        let loaded = load_sheet_map(&reopened, SHEET_MAP_KEY).unwrap();
        assert_eq!(loaded.names().collect::<Vec<_>>(), vec!["Item", "Boss"]);
        assert_eq!(loaded, sample());
    }

    #[test]
    fn test_first_load_uses_seed() {
        let store = MemoryStore::new();
        let loaded = load_sheet_map(&store, SHEET_MAP_KEY).unwrap();
        assert_eq!(loaded.len(), 6);
        assert!(loaded.contains("Loot"));
    }

    #[test]
    fn test_empty_blob_uses_seed() {
        let mut store = MemoryStore::new();
        store.set(SHEET_MAP_KEY, "  ").unwrap();
        let loaded = load_sheet_map(&store, SHEET_MAP_KEY).unwrap();
        assert_eq!(loaded.len(), 6);
    }

    #[test]
    fn test_load_normalizes() {
        let mut store = MemoryStore::new();
        let blob = json!([["Item", {
            "name": "Item",
            "heads": [{"value": "Name"}, {"value": "Note"}],
            "rows": [[{"value": "Sword"}], [{"value": ""}, {"value": " "}]]
        }]]);
        store.set(SHEET_MAP_KEY, &blob.to_string()).unwrap();

        let loaded = load_sheet_map(&store, SHEET_MAP_KEY).unwrap();
        let item = loaded.get("Item").unwrap();
        assert_eq!(item.row_count(), 1);
        assert_eq!(item.cell(CellPos::data(0, 1)).unwrap().value(), "");
    }

    #[test]
    fn test_corrupt_blobs() {
        assert!(matches!(decode_sheet_map("{not json"), Err(StoreError::Corrupt(_))));
        assert!(matches!(decode_sheet_map(r#"{"Item": {}}"#), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn test_malformed_entries_fail_soft() {
        let blob = json!([
            "stray",
            ["NoBody"],
            [42, {"name": "x"}],
            ["Item", {"name": "Old", "heads": [{"value": 7}], "rows": [[{"value": true}]]}]
        ]);
        let sheets = decode_sheet_map(&blob.to_string()).unwrap();

        assert_eq!(sheets.len(), 1);
        let item = sheets.get("Item").unwrap();
        assert_eq!(item.name(), "Item");
        assert_eq!(item.heads()[0].value(), "7");
        assert_eq!(item.rows()[0][0].value(), "true");
    }
}
