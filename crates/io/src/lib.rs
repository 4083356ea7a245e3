// Persistence for the sheet collection

pub mod error;
pub mod persist;
pub mod seed;
pub mod store;

pub use error::StoreError;
pub use persist::{decode_sheet_map, encode_sheet_map, load_sheet_map, save_sheet_map, SHEET_MAP_KEY};
pub use store::{FileStore, KeyValueStore, MemoryStore};
