//! `sammy completions` command

use anyhow::Result;
use clap::CommandFactory;
use clap_complete::generate;

use crate::cli::{Cli, CompletionsArgs};

/// Print a completion script for `args.shell` to stdout.
pub fn execute(args: CompletionsArgs) -> Result<()> {
    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    let mut stdout = std::io::stdout().lock();
    generate(args.shell, &mut cmd, bin_name, &mut stdout);
    Ok(())
}
