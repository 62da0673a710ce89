// tgrid - terminal grid viewer/editor for CSV files

mod exit_codes;
mod tui;
mod util;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use exit_codes::{
    config_exit_code, grid_exit_code, EXIT_DATA_IO, EXIT_DATA_PARSE, EXIT_SUCCESS, EXIT_USAGE,
};
use tabgrid_config::{ConfigError, ModePreference, Settings, ThemeRegistry};
use tabgrid_engine::column::column_letters;
use tabgrid_engine::style::tags;
use tabgrid_engine::{Column, GridController, GridError, Mode, Precedence, StyleResolver};
use tui::data::{self, Table};

#[derive(Parser)]
#[command(name = "tgrid")]
#[command(about = "Tabular data grid for the terminal")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a CSV/TSV file in the interactive grid
    #[command(after_help = "\
Examples:
  tgrid view sales.csv --headers
  tgrid view sales.csv --headers --lock Id --lock Created
  tgrid view notes.tsv --theme pure-amber --mode light
  tgrid view wide.csv --fill

Keys: arrows move, Enter edits/commits, Esc cancels, s saves, t cycles
themes, m toggles light/dark, q quits, ? shows all keys.")]
    View {
        /// File to open (.tsv/.tab are tab-separated)
        file: PathBuf,

        /// First row is headers
        #[arg(long)]
        headers: bool,

        /// Theme name (overrides settings)
        #[arg(long)]
        theme: Option<String>,

        /// Light/dark mode (overrides settings)
        #[arg(long)]
        mode: Option<ModeArg>,

        /// Column that may not be edited (header name or letter). Repeatable.
        #[arg(long, value_name = "COL")]
        lock: Vec<String>,

        /// Stretch the last column over the remaining width
        #[arg(long)]
        fill: bool,
    },

    /// Print a CSV/TSV file as an aligned plain-text table
    #[command(after_help = "\
Examples:
  tgrid print sales.csv --headers
  tgrid print big.csv --max-rows 20")]
    Print {
        file: PathBuf,

        /// First row is headers
        #[arg(long)]
        headers: bool,

        /// Stop after this many rows (0 = all)
        #[arg(long, default_value_t = 0)]
        max_rows: usize,
    },

    /// Stylesheet tools
    #[command(subcommand)]
    Style(StyleCommands),

    /// List available themes
    Themes {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum StyleCommands {
    /// Parse and compile a stylesheet, then show what tags resolve to
    #[command(after_help = "\
Examples:
  tgrid style check mytheme.tgss
  tgrid style check mytheme.tgss --tag header --tag dirty --mode light
  tgrid style check mytheme.tgss --json")]
    Check {
        file: PathBuf,

        /// Tag to resolve. Repeatable. Defaults to the built-in grid tags.
        #[arg(long)]
        tag: Vec<String>,

        /// Mode to resolve in (both when omitted)
        #[arg(long)]
        mode: Option<ModeArg>,

        /// Rule precedence when a tag has mode-specific and shared rules
        #[arg(long, value_enum, default_value_t = PrecedenceArg::ModeSpecific)]
        precedence: PrecedenceArg,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Auto,
    Light,
    Dark,
}

impl From<ModeArg> for ModePreference {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Auto => ModePreference::Auto,
            ModeArg::Light => ModePreference::Light,
            ModeArg::Dark => ModePreference::Dark,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum PrecedenceArg {
    ModeSpecific,
    DeclarationOrder,
}

impl From<PrecedenceArg> for Precedence {
    fn from(arg: PrecedenceArg) -> Self {
        match arg {
            PrecedenceArg::ModeSpecific => Precedence::ModeSpecific,
            PrecedenceArg::DeclarationOrder => Precedence::DeclarationOrder,
        }
    }
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (",
        env!("TGRID_COMMIT"),
        ")",
        "\nengine:  tabgrid-engine ",
        env!("CARGO_PKG_VERSION"),
    )
}

/// Log to a file so the TUI is not disturbed. `TGRID_LOG_FILE` overrides
/// the location; `RUST_LOG` sets the filter (default `warn`).
fn init_logging() {
    let log_path = std::env::var_os("TGRID_LOG_FILE").map(PathBuf::from).unwrap_or_else(|| {
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("tabgrid")
            .join("tgrid.log")
    });
    if let Some(parent) = log_path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let Ok(log_file) = fs::File::create(&log_path) else {
        return;
    };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .format_timestamp_secs()
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let result = match cli.command {
        Commands::View { file, headers, theme, mode, lock, fill } => cmd_view(file, headers, theme, mode, lock, fill),
        Commands::Print { file, headers, max_rows } => cmd_print(file, headers, max_rows),
        Commands::Style(StyleCommands::Check { file, tag, mode, precedence, json }) => {
            cmd_style_check(file, tag, mode, precedence, json)
        }
        Commands::Themes { json } => cmd_themes(json),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            log::error!("{}", message);
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

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn args(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::new(EXIT_DATA_IO, msg)
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::new(EXIT_DATA_PARSE, msg)
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<GridError> for CliError {
    fn from(err: GridError) -> Self {
        Self::new(grid_exit_code(&err), err.to_string())
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        let error = Self::new(config_exit_code(&err), err.to_string());
        match err {
            ConfigError::UnknownTheme(_) => error.with_hint("run `tgrid themes` to list available themes"),
            _ => error,
        }
    }
}

fn load_table(file: &Path, headers: bool) -> Result<Table, CliError> {
    if !file.exists() {
        return Err(CliError::io(format!("file not found: {}", file.display())));
    }
    data::load_csv(file, data::delimiter_for(file), headers).map_err(CliError::parse)
}

// ============================================================================
// view
// ============================================================================

/// Column index for `name`: a header label (case-insensitive) or a column letter.
fn resolve_column(name: &str, columns: &[Column]) -> Result<usize, CliError> {
    columns
        .iter()
        .position(|c| c.label.eq_ignore_ascii_case(name))
        .or_else(|| (0..columns.len()).find(|&i| column_letters(i).eq_ignore_ascii_case(name)))
        .ok_or_else(|| {
            let available: Vec<&str> = columns.iter().map(|c| c.label.as_str()).collect();
            CliError::args(format!("unknown column in --lock: \"{}\"", name))
                .with_hint(format!("available columns: {}", available.join(", ")))
        })
}

fn cmd_view(
    file: PathBuf,
    headers: bool,
    theme: Option<String>,
    mode: Option<ModeArg>,
    lock: Vec<String>,
    fill: bool,
) -> Result<(), CliError> {
    let mut settings = Settings::load();
    if let Some(mode) = mode {
        settings.mode = mode.into();
    }

    let table = load_table(&file, headers)?;
    let mut columns = table.infer_columns();
    for name in &lock {
        let col = resolve_column(name, &columns)?;
        columns[col] = columns[col].clone().read_only();
    }
    if fill {
        if let Some(last) = columns.pop() {
            columns.push(last.flexible());
        }
    }
    let values = table.values(&columns);

    let mut themes = ThemeRegistry::discover();
    let explicit = theme.is_some();
    let theme_name = theme.unwrap_or_else(|| settings.theme.clone());
    if let Err(e) = themes.select(&theme_name) {
        // A stale name in settings is not worth refusing to start over.
        if explicit {
            return Err(e.into());
        }
        log::warn!("{}; using {}", e, themes.active_name());
    }

    let resolver = StyleResolver::with_precedence(settings.precedence);
    themes.apply(&resolver)?;

    let mut grid = GridController::new(columns, table.num_rows(), resolver, settings.grid_options());
    grid.load_rows(values)?;
    log::info!("viewing {} in {:?} mode", file.display(), grid.mode());

    let session = tui::ViewSession { path: &file, table, themes, settings };
    tui::run(grid, session).map_err(|e| CliError::new(exit_codes::EXIT_ERROR, e))
}

// ============================================================================
// print
// ============================================================================

fn cmd_print(file: PathBuf, headers: bool, max_rows: usize) -> Result<(), CliError> {
    let table = load_table(&file, headers)?;
    let columns = table.infer_columns();
    tui::print_plain(&table, &columns, max_rows).map_err(CliError::io)
}

// ============================================================================
// style check
// ============================================================================

const CHECK_TAGS: &[&str] = &[
    tags::CELL,
    tags::HEADER,
    tags::SELECTED_HEADER,
    tags::SELECTED_ROW,
    tags::SELECTED_COLUMN,
    tags::SELECTED_CELL,
    tags::DIRTY,
    tags::EDITING,
    tags::INVALID,
];

fn cmd_style_check(
    file: PathBuf,
    tag_args: Vec<String>,
    mode: Option<ModeArg>,
    precedence: PrecedenceArg,
    json: bool,
) -> Result<(), CliError> {
    let text = fs::read_to_string(&file).map_err(|e| CliError::io(format!("{}: {}", file.display(), e)))?;

    let resolver = StyleResolver::with_precedence(precedence.into());
    resolver.load_document(&text).map_err(|e| {
        let code = grid_exit_code(&e);
        CliError::new(code, format!("{}: {}", file.display(), e))
    })?;

    let tag_list: Vec<&str> = if tag_args.is_empty() {
        CHECK_TAGS.to_vec()
    } else {
        tag_args.iter().map(String::as_str).collect()
    };
    let modes: Vec<Mode> = match mode.map(ModePreference::from) {
        Some(ModePreference::Auto) => vec![ModePreference::Auto.resolve()],
        Some(ModePreference::Light) => vec![Mode::Light],
        Some(ModePreference::Dark) => vec![Mode::Dark],
        None => vec![Mode::Light, Mode::Dark],
    };

    if json {
        let mut resolved = serde_json::Map::new();
        for mode in &modes {
            let mut by_tag = serde_json::Map::new();
            for tag in &tag_list {
                let style = serde_json::to_value(resolver.resolve(tag, *mode))
                    .map_err(|e| CliError::new(exit_codes::EXIT_ERROR, e.to_string()))?;
                by_tag.insert(tag.to_string(), style);
            }
            let key = serde_json::to_value(mode)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default();
            resolved.insert(key, serde_json::Value::Object(by_tag));
        }
        let output = serde_json::json!({
            "file": file.display().to_string(),
            "rules": resolver.rule_count(),
            "selectors": resolver.selectors(),
            "resolved": resolved,
        });
        let pretty = serde_json::to_string_pretty(&output)
            .map_err(|e| CliError::new(exit_codes::EXIT_ERROR, e.to_string()))?;
        println!("{}", pretty);
        return Ok(());
    }

    println!("{}: ok ({} rules)", file.display(), resolver.rule_count());
    for mode in &modes {
        println!();
        println!("[{:?}]", mode);
        for tag in &tag_list {
            let style = resolver.resolve(tag, *mode);
            let marker = if resolver.has_rule(tag, *mode) { "" } else { "  (defaults)" };
            let attrs: Vec<String> = style.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
            println!("  {:<16} {}{}", tag, attrs.join("; "), marker);
        }
    }
    Ok(())
}

// ============================================================================
// themes
// ============================================================================

fn cmd_themes(json: bool) -> Result<(), CliError> {
    let settings = Settings::load();
    let mut themes = ThemeRegistry::discover();
    if themes.select(&settings.theme).is_err() {
        log::warn!("configured theme '{}' not found", settings.theme);
    }

    if json {
        let entries: Vec<serde_json::Value> = themes
            .entries()
            .iter()
            .map(|entry| {
                let origin = match &entry.origin {
                    tabgrid_config::theme::ThemeOrigin::BuiltIn(_) => "builtin".to_string(),
                    tabgrid_config::theme::ThemeOrigin::File(path) => path.display().to_string(),
                };
                serde_json::json!({
                    "name": entry.name,
                    "origin": origin,
                    "active": entry.name == themes.active_name(),
                })
            })
            .collect();
        let pretty = serde_json::to_string_pretty(&entries)
            .map_err(|e| CliError::new(exit_codes::EXIT_ERROR, e.to_string()))?;
        println!("{}", pretty);
        return Ok(());
    }

    for entry in themes.entries() {
        let marker = if entry.name == themes.active_name() { "*" } else { " " };
        match &entry.origin {
            tabgrid_config::theme::ThemeOrigin::BuiltIn(_) => println!("{} {}", marker, entry.name),
            tabgrid_config::theme::ThemeOrigin::File(path) => {
                println!("{} {}  ({})", marker, entry.name, path.display())
            }
        }
    }
    Ok(())
}
