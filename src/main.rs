//! jlcmgr: project-local JLC component libraries for KiCad
//!
//! Tracks the JLC/LCSC parts a KiCad project uses in `jlcproject.toml` and
//! regenerates their symbols, footprints and 3D models on demand.

use std::error::Error as _;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use thiserror::Error;
use tracing::{debug, Level};
use tracing_subscriber::EnvFilter;

use kicad_jlc_manager::config::{self, Config};
use kicad_jlc_manager::engine::{
    AddOutcome, CommandGenerator, DescriptionSource, Engine, EngineSettings, InitOptions,
    InitReport, LcscClient, ListedComponent, Offline, StatusReport, SyncReport,
};
use kicad_jlc_manager::error::ManagerError;
use kicad_jlc_manager::kicad::TableUpdate;

/// Project-local JLC component library manager for KiCad.
///
/// Keeps a declarative list of JLC/LCSC parts in `jlcproject.toml` and
/// generates the matching KiCad libraries with `JLC2KiCadLib`.
#[derive(Parser, Debug)]
#[command(name = "jlcmgr")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Directory to start the project search from
    #[arg(short = 'C', long, global = true, value_name = "DIR")]
    project_dir: Option<PathBuf>,

    /// Skip part description lookups
    #[arg(long, global = true)]
    offline: bool,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Set up the project for JLC component management
    Init {
        /// Library directory relative to the project root
        #[arg(long)]
        lib_dir: Option<String>,

        /// Library name registered in the KiCad library tables
        #[arg(long)]
        lib_name: Option<String>,
    },
    /// Generate a part and track it in the manifest
    Add {
        /// Part identifier, e.g. C194349
        identifier: String,
    },
    /// Show tracked parts
    List {
        /// Include part detail links
        #[arg(short, long)]
        detailed: bool,

        /// Output format
        #[arg(long, value_enum, default_value_t = ListFormat::Text)]
        format: ListFormat,
    },
    /// Rebuild the library directory from the manifest
    Sync,
    /// Stop tracking a part
    Remove {
        /// Part identifier
        identifier: String,
    },
    /// Compare the manifest with the generated library
    Status,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ListFormat {
    Text,
    Json,
    Csv,
}

#[derive(Error, Debug)]
enum CliError {
    #[error(transparent)]
    Manager(#[from] ManagerError),

    #[error("failed to render {format} output")]
    Render {
        format: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "warn" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN,
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber for logging.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn description_source(args: &Args, cfg: &Config) -> Box<dyn DescriptionSource> {
    if args.offline || !cfg.api.enabled {
        Box::new(Offline)
    } else {
        Box::new(LcscClient::from_config(&cfg.api))
    }
}

/// Entry point for jlcmgr.
fn main() -> ExitCode {
    let args = Args::parse();

    let config_path = args.config.as_deref();
    let cfg = match config::load_config(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            if let Some(source) = e.source() {
                eprintln!("  caused by: {source}");
            }
            return ExitCode::FAILURE;
        }
    };

    init_tracing(get_log_level(args.verbose, args.quiet, &cfg.logging.level));
    debug!(version = env!("CARGO_PKG_VERSION"), command = ?args.command, "Starting jlcmgr");

    let engine = Engine::new(
        CommandGenerator::from_config(&cfg.generator),
        description_source(&args, &cfg),
        EngineSettings::from_config(&cfg),
    );

    match run(&args, &engine) {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Manager(e)) if e.is_user_error() => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {e}");
            let mut source = e.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

fn run<D: DescriptionSource>(
    args: &Args,
    engine: &Engine<CommandGenerator, D>,
) -> Result<(), CliError> {
    let start = args
        .project_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));

    match &args.command {
        Command::Init { lib_dir, lib_name } => {
            let options = InitOptions {
                lib_dir: lib_dir.clone(),
                lib_name: lib_name.clone(),
            };
            print_init(&engine.init(&start, &options)?);
        }
        Command::Add { identifier } => match engine.add(&start, identifier)? {
            AddOutcome::Added(entry) => match entry.description() {
                Some(description) => {
                    println!("Added {} ({description})", entry.identifier());
                }
                None => println!("Added {}", entry.identifier()),
            },
            AddOutcome::AlreadyTracked => {
                println!("{} is already tracked", identifier.trim());
            }
        },
        Command::List { detailed, format } => {
            let listed = engine.list(&start)?;
            match format {
                ListFormat::Text => print!("{}", render_text(&listed, *detailed)),
                ListFormat::Json => println!("{}", render_json(&listed)?),
                ListFormat::Csv => print!("{}", render_csv(&listed)?),
            }
        }
        Command::Sync => print_sync(&engine.sync(&start)?),
        Command::Remove { identifier } => {
            let entry = engine.remove(&start, identifier)?;
            println!(
                "Removed {}. Run `jlcmgr sync` to delete its generated files.",
                entry.identifier()
            );
        }
        Command::Status => print_status(&engine.status(&start)?),
    }
    Ok(())
}

fn table_note(update: TableUpdate) -> &'static str {
    match update {
        TableUpdate::Created => "created",
        TableUpdate::Appended => "entry added",
        TableUpdate::Replaced => "entry updated",
        TableUpdate::Unchanged => "unchanged",
    }
}

fn print_init(report: &InitReport) {
    if report.bootstrapped {
        println!("Created KiCad project '{}'", report.project_name);
    }
    println!(
        "Initialised JLC library '{}' for project '{}'",
        report.lib_name, report.project_name
    );
    println!("  Library directory: {}", report.lib_dir.display());
    println!("  sym-lib-table: {}", table_note(report.symbol_table));
    println!("  fp-lib-table: {}", table_note(report.footprint_table));
    if report.ignore_updated {
        println!("  .gitignore: entry added");
    }
}

fn render_text(listed: &[ListedComponent], detailed: bool) -> String {
    if listed.is_empty() {
        return "No components tracked.\n".to_string();
    }

    let mut out = format!("Tracked components ({}):\n", listed.len());
    for item in listed {
        match &item.description {
            Some(description) => {
                out.push_str(&format!("  • {}  ({description})\n", item.identifier));
            }
            None => out.push_str(&format!("  • {}\n", item.identifier)),
        }
        if detailed {
            out.push_str(&format!("      {}\n", item.part_url));
        }
    }
    out
}

fn render_json(listed: &[ListedComponent]) -> Result<String, CliError> {
    serde_json::to_string_pretty(listed).map_err(|e| CliError::Render {
        format: "JSON",
        source: Box::new(e),
    })
}

fn render_csv(listed: &[ListedComponent]) -> Result<String, CliError> {
    let render_error = |source: csv::Error| CliError::Render {
        format: "CSV",
        source: Box::new(source),
    };

    let mut writer = csv::Writer::from_writer(Vec::new());
    for item in listed {
        writer.serialize(item).map_err(render_error)?;
    }
    if listed.is_empty() {
        writer
            .write_record(["identifier", "description", "part_url"])
            .map_err(render_error)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| render_error(csv::Error::from(e.into_error())))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn print_sync(report: &SyncReport) {
    if report.total() == 0 {
        println!("Manifest is empty; library directory reset.");
        return;
    }

    println!(
        "Generated {} of {} components",
        report.succeeded.len(),
        report.total()
    );
    if !report.is_complete() {
        println!("Failed:");
        for failure in &report.failed {
            println!("  ✗ {}: {}", failure.identifier, failure.error);
        }
    }
}

fn print_status(report: &StatusReport) {
    println!("Tracked components: {}", report.tracked);
    if !report.lib_dir_exists {
        println!("Library directory is missing. Run `jlcmgr sync`.");
        return;
    }
    if report.is_in_sync() {
        println!("Library is in sync with the manifest.");
        return;
    }
    if !report.missing.is_empty() {
        println!("Not generated: {}", report.missing.join(", "));
    }
    if !report.untracked.is_empty() {
        println!("Not in manifest: {}", report.untracked.join(", "));
    }
    println!("Run `jlcmgr sync` to rebuild the library.");
}
