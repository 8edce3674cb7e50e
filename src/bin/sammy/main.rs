//! sammy CLI - workspace manager for SJSU-Dev2 firmware projects

use anyhow::Result;
use clap::Parser;
use miette::Diagnostic;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use sammy::util::{GlobalContext, Shell};
use sammy::SammyError;

fn main() {
    let cli = Cli::parse();
    let shell = Shell::from_flags(cli.quiet, cli.verbose, cli.color);

    if let Err(e) = run(cli, shell) {
        eprintln!("error: {:#}", e);
        if let Some(help) = e.downcast_ref::<SammyError>().and_then(|d| d.help()) {
            eprintln!("help: {}", help);
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli, shell: Shell) -> Result<()> {
    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("sammy=debug")
    } else {
        EnvFilter::new("sammy=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let ctx = GlobalContext::new(shell)?;

    // Execute command
    match cli.command {
        Commands::Project(args) => commands::project::execute(args, &ctx),
        Commands::Build(args) => commands::build::execute(args, &ctx),
        Commands::BuildTest(args) => commands::build_test::execute(args, &ctx),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
