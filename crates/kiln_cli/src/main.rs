//! Kiln CLI: the command-line interface for the cluster installer.
//!
//! Provides `kiln create` for generating an installer target into an asset
//! directory, `kiln destroy` for removing generated files, `kiln graph` for
//! printing the asset dependency graph, and `kiln version`.
//!
//! Only one `kiln` process may work on a given asset directory at a time.

#![warn(missing_docs)]

mod create;
mod destroy;
mod graph;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use kiln_assets::Target;
use tracing_subscriber::EnvFilter;

/// Version recorded in the state cache. State written by any other version
/// is regenerated.
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Kiln: generates everything needed to install a cluster.
#[derive(Parser, Debug)]
#[command(name = "kiln", version, about = "Kiln cluster installer")]
pub struct Cli {
    /// Asset directory to read the install config from and write into.
    #[arg(long, global = true, default_value = ".")]
    pub dir: PathBuf,

    /// Minimum level of log messages to print.
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a target and everything it depends on.
    Create {
        /// One of: install-config, manifests, ignition-configs, cluster.
        target: Target,
    },
    /// Remove generated files and cached state.
    Destroy(DestroyArgs),
    /// Print the asset dependency graph in Graphviz DOT format.
    Graph,
    /// Print the tool version.
    Version,
}

/// Arguments for the `kiln destroy` subcommand.
#[derive(Parser, Debug)]
pub struct DestroyArgs {
    /// Assets to remove (e.g., `--asset metadata`). Removes everything when
    /// omitted.
    #[arg(long, num_args = 1..)]
    pub asset: Vec<String>,
}

/// Log verbosity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// Everything, including cache decisions.
    Debug,
    /// Progress messages.
    Info,
    /// Warnings and errors only.
    Warn,
    /// Errors only.
    Error,
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// The asset directory.
    pub dir: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(cli.log_level.directive()))
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let global = GlobalArgs { dir: cli.dir };

    let result = match cli.command {
        Command::Create { target } => create::run(target, &global),
        Command::Destroy(ref args) => destroy::run(args, &global),
        Command::Graph => graph::run(),
        Command::Version => {
            println!("kiln {TOOL_VERSION}");
            Ok(0)
        }
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}
