//! nixkit-build
//!
//! Compiles a package from a recipe module to a Nix expression and builds
//! it with `nix-build`, or prints the expression with `--eval-only`.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use nixkit_codegen::{BuildOptions, CompilationOptions, OutLink};
use nixkit_core::YamlModule;

mod commands;
mod settings;

/// Build a package from a nixkit recipe module
#[derive(Parser)]
#[command(name = "nixkit-build")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Recipe module (YAML) defining the package
    recipe: Option<PathBuf>,

    /// Package to build (dotted attribute path)
    #[arg(short = 'A', long = "attr", value_name = "NAME")]
    attr: Option<String>,

    /// Show detailed error traces from nix-build
    #[arg(long)]
    show_trace: bool,

    /// Keep the generated expression and nix-build's failed build directories
    #[arg(short = 'K', long)]
    keep_failed: bool,

    /// Name of the result symlink
    #[arg(short = 'o', long, value_name = "FILE")]
    out_link: Option<PathBuf>,

    /// Do not create a result symlink
    #[arg(long)]
    no_out_link: bool,

    /// Print the generated expression instead of building it
    #[arg(long)]
    eval_only: bool,

    /// Accept packages defined asynchronously
    #[arg(long = "async")]
    asynchronous: bool,

    /// Pretty-print the generated expression
    #[arg(long)]
    format: bool,

    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// nix-build executable
    #[arg(long, value_name = "PROGRAM", env = "NIXKIT_NIX_BUILD")]
    nix_build: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version go to stdout and succeed; anything else is a usage error.
            let code = if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
            let _ = e.print();
            return code;
        }
    };

    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let Some(recipe) = cli.recipe else {
        bail!("No recipe module is specified!");
    };
    let Some(attr) = cli.attr else {
        bail!("No package has been selected!");
    };
    let out_link = OutLink::from_flags(cli.out_link, cli.no_out_link)?;

    let config = settings::load_config(cli.config.as_deref())?;
    let orchestrator = settings::orchestrator(&config, cli.nix_build)?;

    let compilation = CompilationOptions::new(&attr)?
        .pretty(cli.format || config.format)
        .asynchronous(cli.asynchronous);

    let module = YamlModule::load(&recipe)
        .with_context(|| format!("Failed to load recipe module {}", recipe.display()))?;

    if cli.eval_only {
        return commands::eval::run(&orchestrator, &module, &compilation);
    }

    let options = BuildOptions::new(compilation)
        .show_trace(cli.show_trace)
        .keep_failed(cli.keep_failed)
        .out_link(out_link);
    commands::build::run(&orchestrator, &module, &options).await
}
