use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;
mod packer;
mod utils;

use cmd::{BuildArgs, CatalogArgs, CheckArgs, RunArgs};

/// Packy - build and run Nuitka packaging commands.
///
/// Command layout:
///   packy build   <MAIN> [options] [--json]
///   packy run     <MAIN> [options] [--skip-preflight] [--direct | --shell PROGRAM] [--json]
///   packy check   [--tool CMD] [--index-url URL]
///   packy catalog [plugins|modes|python-flags|excludes] [--json]
///
/// Global flags / env:
///   -v / -vv          Increase verbosity (RUST_LOG overrides)
///   -q / --quiet      Errors only
///   PACKY_TOOL        Packaging tool invocation (default: nuitka)
///   PACKY_INDEX_URL   Package index used when the tool has to be installed
///
/// Examples:
///   packy build app/main.py --plugin pyside6 --mode onefile --icon app/icon.ico
///   packy run app/main.py --include-dir assets --auto-tempdir
///   packy run --preset release.yaml --json
///   packy catalog plugins
#[derive(Parser, Debug)]
#[command(
    name = "packy",
    version,
    author,
    about = "Packy - build and run Nuitka packaging commands",
    propagate_version = true,
    disable_help_subcommand = true
)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Silence all non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the packaging command for a selection
    Build(BuildArgs),

    /// Build the command, check the tool, and run it with live output
    Run(RunArgs),

    /// Check that the packaging tool is available (install once if not)
    Check(CheckArgs),

    /// List selectable plugins, modes, python flags and exclusions
    Catalog(CatalogArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = utils::derive_level(cli.verbose, cli.quiet);
    utils::init_logging(level);

    match cli.command {
        Commands::Build(args) => cmd::execute_build(args),
        Commands::Run(args) => cmd::execute_run(args),
        Commands::Check(args) => cmd::execute_check(args),
        Commands::Catalog(args) => cmd::execute_catalog(args),
    }
}
