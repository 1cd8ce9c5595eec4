//! cascade - recursive copy, move, delete, chmod and chown for the console.
//!
//! Usage:
//!   cascade copy SRC... DEST      Copy files and directories
//!   cascade move SRC... DEST      Move files and directories
//!   cascade delete PATH...        Delete recursively
//!   cascade chmod MODE PATH...    Change permission bits
//!   cascade chown OWNER PATH...   Change owner and group
//!   cascade scan PATH...          List what an operation would touch
//!   cascade --help                Show help

mod args;
mod console;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use cascade_core::{Listing, LocalVfs, OperationConfig};
use cascade_ops::{
    FileOperation, OperationComplete, OperationExecutor, OperationUi, OverwriteRule, Selection,
    UnattendedUi,
};
use cascade_scan::{Prescanner, ScanProgress};
use clap::{Args, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result, bail};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::console::ConsoleUi;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "CASCADE_LOG";

#[derive(Parser)]
#[command(
    name = "cascade",
    version,
    about = "Recursive file operations with conflict dialogs",
    long_about = "cascade copies, moves, deletes and changes attributes of whole trees.\n\n\
                  Press Esc or q to abort a running operation and s to skip the current file."
)]
struct Cli {
    #[command(flatten)]
    options: GlobalOptions,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct GlobalOptions {
    /// Load operation settings from a JSON file
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Resolve every conflict with this rule instead of asking
    #[arg(long, global = true, value_name = "RULE")]
    overwrite: Option<OverwriteRule>,

    /// Never ask: skip failures and existing destinations
    #[arg(short, long, global = true)]
    yes: bool,

    /// Output format of the final report
    #[arg(short, long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Copy the targets of symbolic links instead of the links
    #[arg(short = 'L', long, global = true)]
    follow_symlinks: bool,

    /// Start without listing the selection first
    #[arg(long, global = true)]
    no_prescan: bool,

    /// Copy owner and group onto the destination
    #[arg(long, global = true)]
    preserve_owner: bool,

    /// Do not copy mode bits and times onto the destination
    #[arg(long, global = true)]
    no_preserve: bool,

    /// Copy buffer size in bytes
    #[arg(long, global = true, value_name = "BYTES")]
    buffer_size: Option<usize>,
}

#[derive(Subcommand)]
enum Command {
    /// Copy files and directories
    Copy {
        /// Sources followed by the destination
        #[arg(required = true, num_args = 2..)]
        paths: Vec<PathBuf>,
    },

    /// Move files and directories
    Move {
        /// Sources followed by the destination
        #[arg(required = true, num_args = 2..)]
        paths: Vec<PathBuf>,
    },

    /// Delete files and directories recursively
    Delete {
        #[arg(required = true)]
        targets: Vec<PathBuf>,
    },

    /// Change permission bits (octal like 755 or symbolic like u+x,go-w)
    Chmod {
        mode: String,

        #[arg(required = true)]
        targets: Vec<PathBuf>,

        /// Only change the named entries
        #[arg(long)]
        no_recursive: bool,
    },

    /// Change owner and group (UID, UID:GID or :GID)
    Chown {
        owner: String,

        #[arg(required = true)]
        targets: Vec<PathBuf>,

        /// Only change the named entries
        #[arg(long)]
        no_recursive: bool,
    },

    /// List the selection and print its totals
    Scan {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    init_logging();

    let cli = Cli::parse();
    let config = load_config(&cli.options)?;

    let operation = match cli.command {
        Command::Scan { paths } => {
            run_scan(&paths, &config, cli.options.format)?;
            return Ok(ExitCode::SUCCESS);
        }
        Command::Copy { paths } => {
            let (sources, destination) = split_destination(paths)?;
            FileOperation::Copy {
                sources,
                destination,
            }
        }
        Command::Move { paths } => {
            let (sources, destination) = split_destination(paths)?;
            FileOperation::Move {
                sources,
                destination,
            }
        }
        Command::Delete { targets } => FileOperation::Delete { targets },
        Command::Chmod {
            mode,
            targets,
            no_recursive,
        } => FileOperation::Chmod {
            targets,
            spec: args::parse_mode(&mode)?,
            recursive: !no_recursive,
        },
        Command::Chown {
            owner,
            targets,
            no_recursive,
        } => {
            let (uid, gid) = args::parse_owner(&owner)?;
            FileOperation::Chown {
                targets,
                uid,
                gid,
                recursive: !no_recursive,
            }
        }
    };

    let complete = run_operation(&operation, config, &cli.options)?;
    report(&complete, cli.options.format)?;

    Ok(if complete.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Settings from `--config`, then flag overrides.
fn load_config(options: &GlobalOptions) -> Result<OperationConfig> {
    let mut config = match &options.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Cannot read config file {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Invalid config file {}", path.display()))?
        }
        None => OperationConfig::default(),
    };

    if options.follow_symlinks {
        config.follow_symlinks = true;
    }
    if options.no_prescan {
        config.prescan = false;
    }
    if options.preserve_owner {
        config.preserve_owner = true;
    }
    if options.no_preserve {
        config.preserve_attributes = false;
    }
    if let Some(size) = options.buffer_size {
        if size == 0 {
            bail!("Buffer size cannot be zero");
        }
        config.buffer_size = size;
    }
    if config.buffer_size == 0 {
        bail!("Buffer size cannot be zero");
    }

    Ok(config)
}

fn split_destination(mut paths: Vec<PathBuf>) -> Result<(Vec<PathBuf>, PathBuf)> {
    match paths.pop() {
        Some(destination) if !paths.is_empty() => Ok((paths, destination)),
        _ => bail!("Expected at least one source and a destination"),
    }
}

fn run_operation(
    operation: &FileOperation,
    config: OperationConfig,
    options: &GlobalOptions,
) -> Result<OperationComplete> {
    let mut executor = OperationExecutor::new(LocalVfs, config);
    if let Some(rule) = options.overwrite {
        executor = executor.with_resolution(rule);
    }

    let mut ui: Box<dyn OperationUi> = if options.yes {
        Box::new(UnattendedUi {
            on_conflict: options.overwrite.unwrap_or(OverwriteRule::None),
            ..UnattendedUi::default()
        })
    } else {
        Box::new(ConsoleUi::new().context("Cannot set up the terminal")?)
    };

    let complete = executor
        .execute(ui.as_mut(), operation)
        .context("Operation failed")?;
    // restore the terminal before printing the report
    drop(ui);

    Ok(complete)
}

fn report(complete: &OperationComplete, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            println!("{}", complete.summary());
            for error in &complete.errors {
                eprintln!("  {error}");
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(complete)?);
        }
    }
    Ok(())
}

/// List `paths` the way an operation would before starting.
fn run_scan(paths: &[PathBuf], config: &OperationConfig, format: OutputFormat) -> Result<()> {
    let selection = Selection::from_paths(paths)?;

    eprintln!("Scanning {}...", selection.base().display());

    let listing = Prescanner::new(&LocalVfs)
        .follow_symlinks(config.follow_symlinks)
        .on_progress(1024, print_scan_progress)
        .scan(selection.base(), selection.names())
        .context("Scan failed")?;
    eprint!("\r\x1b[K");

    match format {
        OutputFormat::Text => print_listing(&listing, selection.base()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&listing)?),
    }
    Ok(())
}

fn print_scan_progress(progress: &ScanProgress) {
    eprint!(
        "\r\x1b[K{} entries, {}",
        progress.total_items(),
        format_size(progress.bytes_scanned)
    );
}

fn print_listing(listing: &Listing, base: &Path) {
    println!();
    println!("{}", "─".repeat(60));
    println!(
        " {} - {}",
        base.display(),
        format_size(listing.totals.byte_count)
    );
    println!(
        " {} files, {} directories",
        listing.totals.file_count, listing.totals.dir_count
    );
    println!(" Scanned in {:.2}s", listing.scan_duration.as_secs_f64());
    println!("{}", "─".repeat(60));

    for node in &listing.roots {
        let totals = node.totals();
        let suffix = if node.is_dir() { "/" } else { "" };
        println!(
            " {:>10}  {:>6} files  {}{}",
            format_size(totals.byte_count),
            totals.file_count,
            node.name,
            suffix
        );
    }
}

/// Format bytes as human-readable size.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}
