//! `sammy project` commands

use anyhow::Result;

use crate::cli::{InstallArgs, ProjectArgs, ProjectCommands, RemoveArgs, StartArgs};
use sammy::core::package_ref::PackageRef;
use sammy::ops::{
    install_package, list_packages, local_repository, remove_package, start_project,
    PackageSources, StartOptions,
};
use sammy::sources::{registry_from_config, static_entries, GitFetcher};
use sammy::util::config::RegistryConfig;
use sammy::util::GlobalContext;

pub fn execute(args: ProjectArgs, ctx: &GlobalContext) -> Result<()> {
    match args.command {
        ProjectCommands::Start(start) => execute_start(start, ctx),
        ProjectCommands::Install(install) => execute_install(install, ctx),
        ProjectCommands::Remove(remove) => execute_remove(remove, ctx),
        ProjectCommands::List => execute_list(ctx),
    }
}

/// Run `f` with the package sources described by `config`.
fn with_sources<T>(
    config: &RegistryConfig,
    f: impl FnOnce(&PackageSources<'_>) -> Result<T>,
) -> Result<T> {
    let registry = registry_from_config(config)?;
    let overrides = static_entries(config);
    tracing::debug!("using {}", registry.describe());
    f(&PackageSources {
        registry: registry.as_ref(),
        overrides: &overrides,
    })
}

fn execute_start(args: StartArgs, ctx: &GlobalContext) -> Result<()> {
    let config = ctx.config(None);
    let opts = StartOptions {
        packages: config.project.default_packages(),
        no_install: args.no_install,
    };
    let path = ctx.resolve_path(&args.name);

    with_sources(&config.registry, |sources| {
        start_project(ctx.shell(), &path, &opts, sources, &GitFetcher)
    })?;
    Ok(())
}

fn execute_install(args: InstallArgs, ctx: &GlobalContext) -> Result<()> {
    let ws = ctx.locate_workspace(&args.dir)?;
    let config = ctx.config(Some(&ws));
    let library = match local_repository(ctx.cwd(), &args.library) {
        Some(path) => path.to_string_lossy().into_owned(),
        None => args.library,
    };
    let package = PackageRef::new(library, args.tag);

    with_sources(&config.registry, |sources| {
        install_package(ctx.shell(), &ws, &package, sources, &GitFetcher)
    })?;
    Ok(())
}

fn execute_remove(args: RemoveArgs, ctx: &GlobalContext) -> Result<()> {
    let ws = ctx.locate_workspace(&args.dir)?;
    remove_package(ctx.shell(), &ws, &args.library)
}

fn execute_list(ctx: &GlobalContext) -> Result<()> {
    // Project settings apply when run inside a project
    let ws = ctx.locate_workspace(std::path::Path::new(".")).ok();
    let config = ctx.config(ws.as_ref());

    let index = with_sources(&config.registry, list_packages)?;
    if index.is_empty() {
        ctx.shell().warn("the registry lists no packages");
        return Ok(());
    }
    let width = index.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    for (name, url) in index.iter() {
        println!("{:<width$}  {}", name, url, width = width);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::cli::{Cli, Commands, ProjectCommands};
    use clap::Parser;
    use std::path::Path;

    fn parse_project(args: &[&str]) -> ProjectCommands {
        let mut argv = vec!["sammy", "project"];
        argv.extend_from_slice(args);
        match Cli::parse_from(argv).command {
            Commands::Project(project) => project.command,
            _ => panic!("expected a project command"),
        }
    }

    #[test]
    fn test_start_args() {
        match parse_project(&["start", "blinky"]) {
            ProjectCommands::Start(args) => {
                assert_eq!(args.name, Path::new("blinky"));
                assert!(!args.no_install);
            }
            _ => panic!("expected start"),
        }
        match parse_project(&["start", "blinky", "--no-install"]) {
            ProjectCommands::Start(args) => assert!(args.no_install),
            _ => panic!("expected start"),
        }
    }

    #[test]
    fn test_install_defaults() {
        match parse_project(&["install", "libcore"]) {
            ProjectCommands::Install(args) => {
                assert_eq!(args.library, "libcore");
                assert_eq!(args.dir, Path::new("."));
                assert_eq!(args.tag, "main");
            }
            _ => panic!("expected install"),
        }
    }

    #[test]
    fn test_install_with_tag_and_dir() {
        match parse_project(&[
            "install",
            "git@github.com:SJSU-Dev2/libcore.git",
            "-t",
            "v2.0",
            "-d",
            "firmware/app",
        ]) {
            ProjectCommands::Install(args) => {
                assert_eq!(args.library, "git@github.com:SJSU-Dev2/libcore.git");
                assert_eq!(args.tag, "v2.0");
                assert_eq!(args.dir, Path::new("firmware/app"));
            }
            _ => panic!("expected install"),
        }
    }

    #[test]
    fn test_remove_args() {
        match parse_project(&["remove", "libcore", "--dir", "app"]) {
            ProjectCommands::Remove(args) => {
                assert_eq!(args.library, "libcore");
                assert_eq!(args.dir, Path::new("app"));
            }
            _ => panic!("expected remove"),
        }
    }

    #[test]
    fn test_list_takes_no_arguments() {
        assert!(matches!(parse_project(&["list"]), ProjectCommands::List));
        assert!(Cli::try_parse_from(["sammy", "project", "list", "extra"]).is_err());
    }
}
