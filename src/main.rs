//! `glyph`: load a glyph vault, list it, activate glyphs and inspect the substrate.

use std::error::Error;
use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use glyph_core::config::MAX_TRACE_ENTRIES;
use glyph_core::{
    selftest, InterpreterConfig, Interpreter, LoadReport, Registry, Substrate, Vault,
};

type DynError = Box<dyn Error>;

type Result<T> = std::result::Result<T, DynError>;

#[derive(Parser)]
#[command(author, version, about = "Glyph interpreter and field-state substrate driver")]
struct Cli {
    /// Load every `.gdf` file from this directory
    #[arg(long, global = true, value_hint = ValueHint::DirPath)]
    vault: Option<PathBuf>,

    /// Load a single glyph definition file (repeatable)
    #[arg(long = "file", global = true, action = ArgAction::Append, value_hint = ValueHint::FilePath)]
    files: Vec<PathBuf>,

    /// Log at debug level (overrides RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Do not record or print the activation trace
    #[arg(long = "no-trace", global = true)]
    no_trace: bool,

    /// Maximum trace entries kept
    #[arg(long, global = true, default_value_t = MAX_TRACE_ENTRIES)]
    trace_capacity: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List loaded glyphs
    List,

    /// Activate glyphs and project them into a fresh substrate
    Activate {
        /// Glyph ids, activated in the order given
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Activate every loaded glyph, project it and print substrate status
    Status,

    /// Run the built-in diagnostic suite
    Selftest,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if let Err(err) = try_main(&cli) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr);
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

fn try_main(cli: &Cli) -> Result<()> {
    match &cli.command {
        Command::Selftest => run_selftest(),
        Command::List => {
            let registry = load_registry(cli)?;
            print_list(&registry);
            Ok(())
        }
        Command::Activate { ids } => {
            let registry = load_registry(cli)?;
            run_activate(cli, &registry, ids)
        }
        Command::Status => {
            let registry = load_registry(cli)?;
            run_status(cli, &registry)
        }
    }
}

fn load_registry(cli: &Cli) -> Result<Registry> {
    let vault = Vault::default();
    let mut registry = Registry::new();
    if let Some(dir) = &cli.vault {
        let report = vault.load_dir(dir, &mut registry)?;
        print_rejections(&report);
    }
    for file in &cli.files {
        let report = vault.load_file(file, &mut registry)?;
        print_rejections(&report);
    }
    Ok(registry)
}

fn print_rejections(report: &LoadReport) {
    for rejection in &report.rejected {
        let kind = if rejection.error.is_security() {
            "security"
        } else {
            "rejected"
        };
        eprintln!("{kind}: {}: {}", rejection.path.display(), rejection.error);
    }
}

fn interpreter_config(cli: &Cli) -> InterpreterConfig {
    InterpreterConfig {
        trace_enabled: !cli.no_trace,
        trace_capacity: cli.trace_capacity,
        ..InterpreterConfig::default()
    }
}

fn print_list(registry: &Registry) {
    println!("{} glyph(s) loaded", registry.len());
    for def in registry.iter() {
        let parents = if def.parent_glyphs.is_empty() {
            "-".to_string()
        } else {
            def.parent_glyphs.join(",")
        };
        let resonance = def
            .resonance_freq
            .map_or_else(|| "-".to_string(), |r| format!("{r:.2}Hz"));
        println!(
            "{:<16} parents={:<24} resonance={:<12} script={}",
            def.glyph_id, parents, resonance, def.activation_simulation
        );
    }
}

fn run_activate(cli: &Cli, registry: &Registry, ids: &[String]) -> Result<()> {
    let mut interpreter = Interpreter::with_config(registry, interpreter_config(cli))?;
    let mut substrate = Substrate::new();
    let mut failures = 0usize;

    for (id, result) in interpreter.activate_batch(ids) {
        match result {
            Ok(activation) => {
                let cell = activation.project(&mut substrate)?;
                println!(
                    "{id}: {} -> cell {} (mag={:.3} phase={:.3} coh={:.1})",
                    activation.state,
                    activation.home_cell(),
                    cell.magnitude,
                    cell.phase,
                    cell.coherence
                );
            }
            Err(err) => {
                failures += 1;
                eprintln!("{id}: activation failed: {err}");
            }
        }
    }

    if !cli.no_trace {
        print!("{}", interpreter.trace());
    }
    substrate.sync()?;

    if failures > 0 {
        return Err(format!("{failures} of {} activation(s) failed", ids.len()).into());
    }
    Ok(())
}

fn run_status(cli: &Cli, registry: &Registry) -> Result<()> {
    let mut interpreter = Interpreter::with_config(registry, interpreter_config(cli))?;
    let mut substrate = Substrate::new();
    let ids = registry.ids();
    let mut projected = 0usize;
    for (id, result) in interpreter.activate_batch(&ids) {
        match result {
            Ok(activation) => {
                activation.project(&mut substrate)?;
                projected += 1;
            }
            Err(err) => eprintln!("{id}: activation failed: {err}"),
        }
    }
    println!("Glyphs projected: {projected}/{}", ids.len());
    println!("{}", substrate.status());
    substrate.sync()?;
    println!("Parity: OK");
    Ok(())
}

fn run_selftest() -> Result<()> {
    let report = selftest::run();
    println!("{report}");
    if report.is_success() {
        Ok(())
    } else {
        Err(format!("{} self-test check(s) failed", report.failed()).into())
    }
}
