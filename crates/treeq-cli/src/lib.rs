use std::io::{Read, Write};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

pub mod commands;

use commands::eval::{EvalArgs, Mode};

/// Environment variable holding a `tracing` filter directive.
pub const LOG_ENV: &str = "TREEQ_LOG";

#[derive(Parser, Debug)]
#[command(name = "treeq", version, about = "Query and transform YAML documents with path expressions")]
pub struct Cli {
    /// Log debug output to stderr (overridden by TREEQ_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Evaluate the expression against each document, one at a time.
    Eval(EvalArgs),
    /// Load every document first, then evaluate the expression once over all of them.
    EvalAll(EvalArgs),
}

pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let stdout = std::io::stdout();
    let stdin = std::io::stdin();
    execute(cli, &mut stdout.lock(), &mut stdin.lock())
}

/// Run a parsed command line against the given output and standard input.
pub fn execute(cli: Cli, out: &mut dyn Write, stdin: &mut dyn Read) -> anyhow::Result<()> {
    match cli.command {
        Command::Eval(args) => commands::eval::run(&args, Mode::Stream, out, stdin),
        Command::EvalAll(args) => commands::eval::run(&args, Mode::AllAtOnce, out, stdin),
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
    // an embedding host may already own the global subscriber
    if let Err(error) = installed {
        tracing::debug!(%error, "keeping the existing tracing subscriber");
    }
}
