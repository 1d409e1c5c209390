//! MergeResolver command-line tool.
//!
//! Runs the MergeResolver commands against files on disk: inspecting and
//! resolving conflict blocks, jumping to the next conflict marker, toggling
//! Markdown checkboxes, and navigating between related C/C++ files. Also
//! generates and validates configuration files.
//!
//! Line numbers on the command line and in output are 1-based.

mod style;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use serde_json::json;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use mergeresolver_core::buffer::{LineBuffer, LineRange, Selection, TextDocument};
use mergeresolver_core::commands::{self, CommandOutcome, CommandRegistry, EditorContext};
use mergeresolver_core::config::AppConfig;
use mergeresolver_core::conflict::{ConflictBlock, ConflictLocator};
use mergeresolver_core::navigator::normalize_path;

/// Exit status when a command ran but only produced a warning.
const EXIT_WARNING: u8 = 2;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// MergeResolver command-line tool.
#[derive(Parser, Debug)]
#[command(
    name = "mergeresolver",
    version,
    about = "Locate and resolve merge-conflict blocks in text files"
)]
struct Cli {
    /// Path to the TOML configuration file.
    /// Defaults to <config dir>/mergeresolver/config.toml when present.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured log level.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// A file plus the line the cursor is on.
#[derive(Args, Debug)]
struct Cursor {
    /// File to operate on.
    file: PathBuf,

    /// Cursor line.
    #[arg(short, long)]
    line: usize,
}

/// Options shared by every command that edits a file.
#[derive(Args, Debug)]
struct EditArgs {
    #[command(flatten)]
    cursor: Cursor,

    /// Print the edited document instead of writing it back.
    #[arg(long)]
    dry_run: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the conflict block enclosing a line.
    Locate {
        #[command(flatten)]
        cursor: Cursor,

        /// Emit JSON.
        #[arg(long)]
        json: bool,
    },

    /// List every conflict block in a file.
    List {
        /// File to scan.
        file: PathBuf,

        /// Emit JSON.
        #[arg(long)]
        json: bool,
    },

    /// Keep the side of the conflict under the cursor or selection.
    Accept {
        #[command(flatten)]
        edit: EditArgs,

        /// Last line of the selection, when more than the cursor line is selected.
        #[arg(long)]
        to_line: Option<usize>,
    },

    /// Drop the side of the conflict under the cursor or selection.
    Reject {
        #[command(flatten)]
        edit: EditArgs,

        /// Last line of the selection, when more than the cursor line is selected.
        #[arg(long)]
        to_line: Option<usize>,
    },

    /// Keep both sides of the conflict, current first.
    AcceptBoth {
        #[command(flatten)]
        edit: EditArgs,
    },

    /// Remove the whole conflict block.
    RejectBoth {
        #[command(flatten)]
        edit: EditArgs,
    },

    /// Find the next conflict marker, in the file first and then the repository.
    Next {
        /// File to search first.
        file: Option<PathBuf>,

        /// Line to search after.
        #[arg(short, long, default_value = "1")]
        line: usize,

        /// Repository root for the project-wide search.
        #[arg(long)]
        root: Option<PathBuf>,
    },

    /// Toggle the Markdown checkbox on a line.
    ToggleCheck {
        #[command(flatten)]
        edit: EditArgs,
    },

    /// Print the nearest build file above a source file.
    BuildFile {
        /// Source file to start from.
        file: PathBuf,

        /// Workspace root the search may not leave.
        #[arg(long)]
        root: Option<PathBuf>,
    },

    /// Print the header for a source file, or the source for a header.
    HeaderSource {
        /// Header or source file.
        file: PathBuf,
    },

    /// List the registered command identifiers.
    Commands,

    /// Generate a default configuration file.
    Init {
        /// Output path for the generated config file.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate a configuration file.
    Validate,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Init { output } => return cmd_init(output),
        Commands::Validate => return cmd_validate(cli.config),
        _ => {}
    }

    let config = load_config(cli.config.as_deref())?;
    init_logging(cli.log_level.as_deref().unwrap_or(&config.general.log_level));

    let locator = ConflictLocator::new(config.conflict.divider);
    let mut registry = CommandRegistry::with_defaults(&config);

    let result = match cli.command {
        Commands::Locate { cursor, json } => cmd_locate(&locator, &cursor, json),
        Commands::List { file, json } => cmd_list(&locator, &file, json),
        Commands::Accept { edit, to_line } => {
            cmd_edit(&registry, commands::ACCEPT_CONFLICT_SIDE, &edit, to_line).await
        }
        Commands::Reject { edit, to_line } => {
            cmd_edit(&registry, commands::REJECT_CONFLICT_SIDE, &edit, to_line).await
        }
        Commands::AcceptBoth { edit } => {
            cmd_edit(&registry, commands::ACCEPT_BOTH_SIDES, &edit, None).await
        }
        Commands::RejectBoth { edit } => {
            cmd_edit(&registry, commands::REJECT_BOTH_SIDES, &edit, None).await
        }
        Commands::ToggleCheck { edit } => {
            cmd_edit(&registry, commands::TOGGLE_CHECKMARK, &edit, None).await
        }
        Commands::Next { file, line, root } => cmd_next(&registry, file, line, root).await,
        Commands::BuildFile { file, root } => {
            cmd_navigate(&registry, commands::GO_BUILD_FILE, &file, root).await
        }
        Commands::HeaderSource { file } => {
            cmd_navigate(&registry, commands::TOGGLE_HEADER_SOURCE, &file, None).await
        }
        Commands::Commands => cmd_commands(&registry),
        Commands::Init { .. } | Commands::Validate => unreachable!(),
    };

    registry.dispose();
    result
}

// ---------------------------------------------------------------------------
// Config & logging helpers
// ---------------------------------------------------------------------------

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("mergeresolver").join("config.toml"))
}

/// An explicit `--config` must exist; the default location is optional.
fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = explicit {
        return AppConfig::load_and_validate(path).context("failed to load configuration file");
    }
    match default_config_path() {
        Some(path) if path.exists() => AppConfig::load_and_validate(&path)
            .with_context(|| format!("failed to load {}", path.display())),
        _ => Ok(AppConfig::default()),
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

// ---------------------------------------------------------------------------
// Path & line helpers
// ---------------------------------------------------------------------------

/// Convert a 1-based line number to a 0-based index.
fn to_index(line: usize) -> Result<usize> {
    if line == 0 {
        anyhow::bail!("line numbers start at 1");
    }
    Ok(line - 1)
}

/// Absolute form of `path` with `.` and `..` resolved.
fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(normalize_path(path));
    }
    let cwd = std::env::current_dir().context("failed to read current directory")?;
    Ok(normalize_path(&cwd.join(path)))
}

/// The explicit root, or the nearest ancestor of `file` holding `.git`,
/// or the current directory.
fn workspace_root(file: Option<&Path>, explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(root) = explicit {
        return absolutize(&root);
    }
    let cwd = std::env::current_dir().context("failed to read current directory")?;
    let start = match file {
        Some(f) => absolutize(f)?,
        None => cwd.clone(),
    };
    let root = start
        .ancestors()
        .find(|dir| dir.join(".git").exists())
        .map(Path::to_path_buf)
        .unwrap_or(cwd);
    debug!(root = %root.display(), "using workspace root");
    Ok(root)
}

fn read_document(path: &Path) -> Result<TextDocument> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(TextDocument::from_text(&text))
}

// ---------------------------------------------------------------------------
// Output helpers
// ---------------------------------------------------------------------------

/// Print an outcome and pick the exit status for it.
///
/// Status lines go to stderr when stdout carries the edited document.
fn report(outcome: &CommandOutcome, file: Option<&Path>, to_stderr: bool) -> ExitCode {
    let (message, code) = match outcome {
        CommandOutcome::Edited { description } => (style::success(description), ExitCode::SUCCESS),
        CommandOutcome::Reveal { line } => {
            let location = match file {
                Some(path) => format!("{}:{}", path.display(), line + 1),
                None => format!("line {}", line + 1),
            };
            (location, ExitCode::SUCCESS)
        }
        CommandOutcome::Open { path, line } => {
            let location = match line {
                Some(line) => format!("{}:{}", path.display(), line + 1),
                None => path.display().to_string(),
            };
            (location, ExitCode::SUCCESS)
        }
        CommandOutcome::Info(msg) => (style::info(msg), ExitCode::SUCCESS),
        CommandOutcome::Warning(msg) => (style::warn(msg), ExitCode::from(EXIT_WARNING)),
    };

    if to_stderr {
        eprintln!("{}", message);
    } else {
        println!("{}", message);
    }
    code
}

fn block_json(doc: &TextDocument, locator: &ConflictLocator, block: &ConflictBlock) -> serde_json::Value {
    let markers = locator.markers();
    json!({
        "start": block.start() + 1,
        "divider": block.divider() + 1,
        "end": block.end() + 1,
        "current_label": doc.line(block.start()).and_then(|l| markers.label(l)),
        "incoming_label": doc.line(block.end()).and_then(|l| markers.label(l)),
        "current_lines": block.current_side().map_or(0, |r| r.len()),
        "incoming_lines": block.incoming_side().map_or(0, |r| r.len()),
    })
}

/// 1-based body range of one side, without the marker lines.
fn body_lines(side: Option<LineRange>) -> String {
    match side {
        Some(r) if r.start == r.end => format!("line {}", r.start + 1),
        Some(r) => format!("lines {}-{}", r.start + 1, r.end + 1),
        None => "empty".to_string(),
    }
}

fn side_summary(label: Option<&str>, lines: usize) -> String {
    let noun = if lines == 1 { "line" } else { "lines" };
    format!("{} ({} {})", label.unwrap_or("-"), lines, noun)
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

fn cmd_locate(locator: &ConflictLocator, cursor: &Cursor, json: bool) -> Result<ExitCode> {
    let doc = read_document(&cursor.file)?;
    let index = to_index(cursor.line)?;

    let Some(block) = locator.locate(&doc, index) else {
        if json {
            println!("null");
        } else {
            println!("{}", style::info("No conflict found at cursor."));
        }
        return Ok(ExitCode::FAILURE);
    };

    if json {
        let value = block_json(&doc, locator, &block);
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(ExitCode::SUCCESS);
    }

    let markers = locator.markers();
    println!("{}", style::header(&format!("Conflict at {}:{}", cursor.file.display(), block.start() + 1)));
    println!(
        "  Current  : {} {}",
        style::current_label(doc.line(block.start()).and_then(|l| markers.label(l)).unwrap_or("-")),
        style::dim(&body_lines(block.current_side())),
    );
    println!(
        "  Incoming : {} {}",
        style::incoming_label(doc.line(block.end()).and_then(|l| markers.label(l)).unwrap_or("-")),
        style::dim(&body_lines(block.incoming_side())),
    );
    Ok(ExitCode::SUCCESS)
}

fn cmd_list(locator: &ConflictLocator, file: &Path, json: bool) -> Result<ExitCode> {
    let doc = read_document(file)?;
    let blocks = locator.find_all(&doc);

    if json {
        let values: Vec<_> = blocks.iter().map(|b| block_json(&doc, locator, b)).collect();
        println!("{}", serde_json::to_string_pretty(&values)?);
        return Ok(ExitCode::SUCCESS);
    }

    if blocks.is_empty() {
        println!("{}", style::info("No conflict markers found."));
        return Ok(ExitCode::SUCCESS);
    }

    let markers = locator.markers();
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["#", "Start", "Divider", "End", "Current", "Incoming"]);

    for (i, block) in blocks.iter().enumerate() {
        let current = side_summary(
            doc.line(block.start()).and_then(|l| markers.label(l)),
            block.current_side().map_or(0, |r| r.len()),
        );
        let incoming = side_summary(
            doc.line(block.end()).and_then(|l| markers.label(l)),
            block.incoming_side().map_or(0, |r| r.len()),
        );
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(block.start() + 1),
            Cell::new(block.divider() + 1),
            Cell::new(block.end() + 1),
            Cell::new(current),
            Cell::new(incoming),
        ]);
    }

    println!("{}", table);
    println!("{} conflict(s) in {}", blocks.len(), file.display());
    Ok(ExitCode::SUCCESS)
}

async fn cmd_edit(
    registry: &CommandRegistry,
    id: &str,
    edit: &EditArgs,
    to_line: Option<usize>,
) -> Result<ExitCode> {
    let path = absolutize(&edit.cursor.file)?;
    let mut doc = read_document(&path)?;
    let cursor = to_index(edit.cursor.line)?;
    let selection = match to_line {
        Some(to) => Selection::lines(cursor, to_index(to)?),
        None => Selection::caret(cursor),
    };
    let root = workspace_root(Some(&path), None)?;

    let mut ctx = EditorContext::new(&mut doc, cursor)
        .with_selection(selection)
        .with_file_path(&path)
        .with_workspace_root(root);
    let outcome = registry.execute(id, &mut ctx).await?;

    if outcome.is_edit() {
        if edit.dry_run {
            print!("{}", doc.to_text());
        } else {
            std::fs::write(&path, doc.to_text())
                .with_context(|| format!("failed to write {}", path.display()))?;
        }
    }
    Ok(report(&outcome, Some(&path), edit.dry_run))
}

async fn cmd_next(
    registry: &CommandRegistry,
    file: Option<PathBuf>,
    line: usize,
    root: Option<PathBuf>,
) -> Result<ExitCode> {
    let path = file.as_deref().map(absolutize).transpose()?;
    let mut doc = match &path {
        Some(p) => read_document(p)?,
        None => TextDocument::default(),
    };
    let root = workspace_root(path.as_deref(), root)?;

    let mut ctx = EditorContext::new(&mut doc, to_index(line)?).with_workspace_root(root);
    if let Some(p) = &path {
        ctx = ctx.with_file_path(p);
    }
    let outcome = registry.execute(commands::GO_NEXT_CONFLICT, &mut ctx).await?;
    Ok(report(&outcome, path.as_deref(), false))
}

async fn cmd_navigate(
    registry: &CommandRegistry,
    id: &str,
    file: &Path,
    root: Option<PathBuf>,
) -> Result<ExitCode> {
    let path = absolutize(file)?;
    let root = workspace_root(Some(&path), root)?;
    let mut doc = TextDocument::default();

    let mut ctx = EditorContext::new(&mut doc, 0)
        .with_file_path(&path)
        .with_workspace_root(root);
    let outcome = registry.execute(id, &mut ctx).await?;
    Ok(report(&outcome, Some(&path), false))
}

fn cmd_commands(registry: &CommandRegistry) -> Result<ExitCode> {
    println!("{}", style::header("Registered commands"));
    for id in registry.command_ids() {
        println!("  {}", id);
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_init(output: Option<PathBuf>) -> Result<ExitCode> {
    let output = output
        .or_else(default_config_path)
        .context("no output path given and no platform config directory")?;

    if output.exists() {
        anyhow::bail!(
            "file already exists: {}. Remove it first or choose a different path.",
            output.display()
        );
    }
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    std::fs::write(&output, AppConfig::default_template())
        .with_context(|| format!("failed to write config to {}", output.display()))?;

    println!("{}", style::success(&format!("Configuration written to {}", output.display())));
    Ok(ExitCode::SUCCESS)
}

fn cmd_validate(config: Option<PathBuf>) -> Result<ExitCode> {
    let path = config
        .or_else(default_config_path)
        .context("no config path given and no platform config directory")?;

    println!("Validating configuration: {}", path.display());
    println!();

    let config = AppConfig::load_from_file(&path).context("failed to parse configuration")?;
    println!("  [OK] TOML structure is valid");

    match config.validate() {
        Ok(()) => println!("  [OK] All fields are valid"),
        Err(e) => {
            println!("  [FAIL] Validation error: {}", e);
            anyhow::bail!("configuration validation failed");
        }
    }

    let nav = &config.navigation;
    println!();
    println!("Configuration summary:");
    println!("  Log level     : {}", config.general.log_level);
    println!("  Divider       : {}", config.conflict.divider);
    println!("  Build files   : {}", nav.build_file_names.join(", "));
    println!("  Headers       : {}", nav.header_extensions.join(", "));
    println!("  Sources       : {}", nav.source_extensions.join(", "));
    println!("  Git binary    : {}", config.search.git_binary);
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_accept_with_selection() {
        let cli = Cli::parse_from([
            "mergeresolver",
            "accept",
            "src/lib.rs",
            "--line",
            "3",
            "--to-line",
            "4",
            "--dry-run",
        ]);
        match cli.command {
            Commands::Accept { edit, to_line } => {
                assert_eq!(edit.cursor.file, PathBuf::from("src/lib.rs"));
                assert_eq!(edit.cursor.line, 3);
                assert!(edit.dry_run);
                assert_eq!(to_line, Some(4));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_to_index() {
        assert_eq!(to_index(1).unwrap(), 0);
        assert_eq!(to_index(10).unwrap(), 9);
        assert!(to_index(0).is_err());
    }

    #[test]
    fn test_workspace_root_finds_git_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        std::fs::create_dir_all(dir.path().join("a/b")).unwrap();
        let file = dir.path().join("a/b/c.cc");

        let root = workspace_root(Some(&file), None).unwrap();
        assert_eq!(root, dir.path());

        let explicit = workspace_root(Some(&file), Some(dir.path().join("a"))).unwrap();
        assert_eq!(explicit, dir.path().join("a"));
    }

    #[test]
    fn test_workspace_root_is_normalized() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("ws/pkg/a.cc");
        let root = workspace_root(Some(&file), Some(dir.path().join("ws/pkg/../"))).unwrap();
        assert_eq!(root, dir.path().join("ws"));
        assert_eq!(absolutize(&dir.path().join("ws/./pkg/a.cc")).unwrap(), file);
    }

    #[tokio::test]
    async fn test_build_file_with_dotted_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("ws/pkg")).unwrap();
        std::fs::write(dir.path().join("ws/BUILD"), "").unwrap();
        std::fs::write(dir.path().join("ws/pkg/a.cc"), "").unwrap();

        let file = absolutize(&dir.path().join("ws/pkg/a.cc")).unwrap();
        let root = workspace_root(Some(&file), Some(dir.path().join("ws/pkg/../"))).unwrap();
        let registry = CommandRegistry::with_defaults(&AppConfig::default()).without_project_search();
        let mut doc = TextDocument::default();
        let mut ctx = EditorContext::new(&mut doc, 0)
            .with_file_path(&file)
            .with_workspace_root(root);
        let outcome = registry
            .execute(commands::GO_BUILD_FILE, &mut ctx)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            CommandOutcome::Open {
                path: dir.path().join("ws/BUILD"),
                line: None
            }
        );
    }

    #[test]
    fn test_body_lines_exclude_markers() {
        let block = ConflictBlock::new(1, 3, 6).unwrap();
        assert_eq!(body_lines(block.current_side()), "line 3");
        assert_eq!(body_lines(block.incoming_side()), "lines 5-6");
        let empty = ConflictBlock::new(0, 1, 2).unwrap();
        assert_eq!(body_lines(empty.current_side()), "empty");
    }

    #[test]
    fn test_load_config_explicit_missing_is_error() {
        assert!(load_config(Some(Path::new("/nonexistent/mergeresolver.toml"))).is_err());
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf/config.toml");

        cmd_init(Some(path.clone())).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(AppConfig::from_toml(&written).is_ok());

        assert!(cmd_init(Some(path)).is_err());
    }

    #[test]
    fn test_block_json_uses_one_based_lines() {
        let doc = TextDocument::from_lines([
            "x",
            "<<<<<<< HEAD",
            "foo",
            "=======",
            ">>>>>>> feature",
        ]);
        let locator = ConflictLocator::default();
        let block = locator.locate(&doc, 2).unwrap();
        let value = block_json(&doc, &locator, &block);
        assert_eq!(value["start"], 2);
        assert_eq!(value["end"], 5);
        assert_eq!(value["current_label"], "HEAD");
        assert_eq!(value["incoming_label"], "feature");
        assert_eq!(value["current_lines"], 1);
        assert_eq!(value["incoming_lines"], 0);
    }

    #[tokio::test]
    async fn test_edit_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.md");
        std::fs::write(&path, "# plan\n- [ ] ship\n").unwrap();

        let registry = CommandRegistry::with_defaults(&AppConfig::default()).without_project_search();
        let edit = EditArgs {
            cursor: Cursor {
                file: path.clone(),
                line: 2,
            },
            dry_run: false,
        };
        cmd_edit(&registry, commands::TOGGLE_CHECKMARK, &edit, None)
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# plan\n- [x] ship\n");
    }
}
