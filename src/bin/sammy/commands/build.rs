//! `sammy build` command

use anyhow::Result;

use crate::cli::BuildArgs;
use sammy::builder::ProcessExecutor;
use sammy::ops::{build, BuildOptions};
use sammy::util::GlobalContext;

pub fn execute(args: BuildArgs, ctx: &GlobalContext) -> Result<()> {
    let opts = BuildOptions {
        source: args.source,
        optimization: args.optimization,
        platform: args.platform,
        linker_script: args.linker_script,
        toolchain: args.toolchain,
        compiler: args.compiler,
    };

    build(ctx, &opts, &mut ProcessExecutor)?;
    Ok(())
}
