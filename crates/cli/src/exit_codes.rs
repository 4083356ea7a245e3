//! CLI Exit Code Registry
//!
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! | Code | Meaning                                            |
//! |------|----------------------------------------------------|
//! | 0    | Success                                            |
//! | 1    | General error, or `check` found invalid cells      |
//! | 2    | Usage error (bad args, unknown sheet, bad address) |
//! | 3    | Storage error (unreadable or corrupt store)        |

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// `check` found at least one cell that violates its column's rule.
/// Like `diff(1)`, exit 1 means "something to look at".
pub const EXIT_INVALID_CELLS: u8 = 1;

/// Usage error - bad arguments, unknown sheet, cell outside the sheet.
pub const EXIT_USAGE: u8 = 2;

/// The store could not be read, decoded, or written.
pub const EXIT_STORAGE: u8 = 3;
