// Guild loot ledger CLI - view, edit and validate the sheet collection

mod exit_codes;
mod render;

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::debug;

use guildloot_config::Settings;
use guildloot_engine::{CellPos, EditIntent, Schema, Sheet, Workbook};
use guildloot_io::{encode_sheet_map, load_sheet_map, save_sheet_map, FileStore, StoreError};

use exit_codes::{EXIT_ERROR, EXIT_INVALID_CELLS, EXIT_STORAGE, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "guildloot")]
#[command(about = "Guild loot ledger: sheets of loot, trades and members with validated columns")]
#[command(version)]
struct Cli {
    /// Directory holding the stored sheet collection (overrides storage.dir)
    #[arg(long, global = true, env = "GUILDLOOT_DATA_DIR", value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Settings file to read instead of the default location
    #[arg(long, global = true, env = "GUILDLOOT_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List sheets with their row and column counts
    Sheets,

    /// Print a sheet as tab-separated text, marking invalid cells with " !"
    Show {
        /// Sheet name
        sheet: String,
    },

    /// Set one cell and save
    #[command(after_help = "\
Rows are counted with the header as row 0, so row 1 is the first data row.
Columns start at 0.

Examples:
  guildloot set Loot 1 4 3
  guildloot set Member 0 2 Role")]
    Set {
        /// Sheet name
        sheet: String,
        /// Row (0 = header)
        row: usize,
        /// Column (0-based)
        col: usize,
        /// New value
        value: String,
    },

    /// Append an empty row and save
    AddRow {
        /// Sheet name
        sheet: String,
    },

    /// Replace (or create) a sheet from tab-separated text and save
    Import {
        /// Sheet name
        sheet: String,
        /// Input file, or - for stdin
        file: PathBuf,
    },

    /// List every invalid cell; exits 1 if there is any
    Check,

    /// Print the stored JSON blob
    Export,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };
    init_logging(&settings);

    let result = match cli.command {
        Commands::Sheets => Ledger::open(&settings, cli.data_dir).and_then(|l| cmd_sheets(&l)),
        Commands::Show { sheet } => Ledger::open(&settings, cli.data_dir).and_then(|l| cmd_show(&l, &sheet)),
        Commands::Set { sheet, row, col, value } => Ledger::open(&settings, cli.data_dir)
            .and_then(|mut l| cmd_set(&mut l, &sheet, CellPos::new(row, col), value)),
        Commands::AddRow { sheet } => {
            Ledger::open(&settings, cli.data_dir).and_then(|mut l| cmd_add_row(&mut l, &sheet))
        }
        Commands::Import { sheet, file } => {
            Ledger::open(&settings, cli.data_dir).and_then(|mut l| cmd_import(&mut l, &sheet, file))
        }
        Commands::Check => Ledger::open(&settings, cli.data_dir).and_then(|l| cmd_check(&l)),
        Commands::Export => Ledger::open(&settings, cli.data_dir).and_then(|l| cmd_export(&l)),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

/// `RUST_LOG` wins over the `log.filter` setting.
fn init_logging(settings: &Settings) {
    let env = env_logger::Env::default().default_filter_or(settings.log_filter.as_str());
    env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .init();
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    pub fn store(err: StoreError) -> Self {
        let hint = match &err {
            StoreError::Corrupt(_) => Some("move the stored file aside to start from the seed sheets".to_string()),
            _ => None,
        };
        Self { code: EXIT_STORAGE, message: err.to_string(), hint }
    }

    pub fn unknown_sheet(name: &str, known: &[&str]) -> Self {
        Self::args(format!("unknown sheet '{}'", name))
            .with_hint(format!("known sheets: {}", known.join(", ")))
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

// ============================================================================
// Ledger: store + workbook for one invocation
// ============================================================================

struct Ledger {
    store: FileStore,
    key: String,
    workbook: Workbook,
}

impl Ledger {
    fn open(settings: &Settings, data_dir: Option<PathBuf>) -> Result<Self, CliError> {
        let dir = data_dir.unwrap_or_else(|| settings.effective_storage_dir());
        let store = FileStore::new(dir);
        debug!("store: {}", store.path_for(&settings.storage_key).display());

        let sheets = load_sheet_map(&store, &settings.storage_key).map_err(CliError::store)?;
        let schema = Schema::builtin().map_err(|e| CliError::io(e.to_string()))?;

        Ok(Self {
            store,
            key: settings.storage_key.clone(),
            workbook: Workbook::new(sheets, schema),
        })
    }

    fn sheet(&self, name: &str) -> Result<&Sheet, CliError> {
        self.workbook
            .sheet(name)
            .ok_or_else(|| CliError::unknown_sheet(name, &self.workbook.sheet_names()))
    }

    fn dispatch(&mut self, name: &str, intent: &EditIntent) -> Result<&Sheet, CliError> {
        self.sheet(name)?;
        self.workbook.dispatch(name, intent);
        self.save()?;
        self.sheet(name)
    }

    fn save(&mut self) -> Result<(), CliError> {
        save_sheet_map(&mut self.store, &self.key, self.workbook.sheets()).map_err(CliError::store)
    }
}

fn write_out(text: &str) -> Result<(), CliError> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(text.as_bytes())
        .map_err(|e| CliError::io(e.to_string()))
}

// ============================================================================
// Commands
// ============================================================================

fn cmd_sheets(ledger: &Ledger) -> Result<(), CliError> {
    write_out(&render::render_sheet_list(ledger.workbook.sheets()))
}

fn cmd_show(ledger: &Ledger, name: &str) -> Result<(), CliError> {
    write_out(&render::render_sheet(ledger.sheet(name)?))
}

fn cmd_set(ledger: &mut Ledger, name: &str, pos: CellPos, value: String) -> Result<(), CliError> {
    let sheet = ledger.sheet(name)?;
    if sheet.cell(pos).is_none() {
        return Err(CliError::args(format!(
            "cell {} is outside sheet '{}' ({} data rows, {} cols)",
            pos,
            name,
            sheet.row_count(),
            sheet.col_count()
        ))
        .with_hint("row 0 is the header; use add-row to append rows"));
    }

    let sheet = ledger.dispatch(name, &EditIntent::UpdateCell { pos, value })?;
    let stored = sheet.cell(pos).map(|c| c.value()).unwrap_or_default();
    if sheet.is_cell_valid(pos) {
        write_out(&format!("{} {} = {}\n", name, pos, stored))
    } else {
        let message = sheet.validator(pos.col).map(|v| v.message()).unwrap_or_default();
        write_out(&format!("{} {} = {}{}\n", name, pos, stored, render::INVALID_MARKER))?;
        eprintln!("warning: {} {:?}: {}", pos, stored, message);
        Ok(())
    }
}

fn cmd_add_row(ledger: &mut Ledger, name: &str) -> Result<(), CliError> {
    let sheet = ledger.dispatch(name, &EditIntent::AddRow)?;
    write_out(&format!("{}: {} rows\n", name, sheet.row_count()))
}

fn cmd_import(ledger: &mut Ledger, name: &str, file: PathBuf) -> Result<(), CliError> {
    let text = if file.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| CliError::io(format!("reading stdin: {}", e)))?;
        buf
    } else {
        fs::read_to_string(&file)
            .map_err(|e| CliError::args(format!("{}: {}", file.display(), e)))?
    };

    let rows = ledger.workbook.import_paste(name, &text);
    ledger.save()?;
    write_out(&format!("imported {} rows into {}\n", rows, name))
}

fn cmd_check(ledger: &Ledger) -> Result<(), CliError> {
    let mut out = String::new();
    let mut count = 0;
    for sheet in ledger.workbook.sheets().iter() {
        for line in render::violation_lines(sheet) {
            out.push_str(&format!("{}\t{}\n", sheet.name(), line));
            count += 1;
        }
    }
    write_out(&out)?;

    if count == 0 {
        return Ok(());
    }
    Err(CliError {
        code: EXIT_INVALID_CELLS,
        message: format!("{} invalid cell{}", count, if count == 1 { "" } else { "s" }),
        hint: None,
    })
}

fn cmd_export(ledger: &Ledger) -> Result<(), CliError> {
    let blob = encode_sheet_map(ledger.workbook.sheets()).map_err(CliError::store)?;
    write_out(&format!("{}\n", blob))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_set() {
        let cli = Cli::try_parse_from(["guildloot", "set", "Loot", "1", "4", "3"]).unwrap();
        match cli.command {
            Commands::Set { sheet, row, col, value } => {
                assert_eq!((sheet.as_str(), row, col, value.as_str()), ("Loot", 1, 4, "3"));
            }
            _ => panic!("expected set"),
        }
    }

    #[test]
    fn test_unknown_sheet_error() {
        let err = CliError::unknown_sheet("Nope", &["Loot", "Item"]);
        assert_eq!(err.code, EXIT_USAGE);
        assert_eq!(err.hint.as_deref(), Some("known sheets: Loot, Item"));
    }
}
