//! Implementation of `sammy project start`.

use std::path::Path;

use anyhow::{bail, Result};

use crate::core::package_ref::PackageRef;
use crate::core::workspace::{Workspace, MARKER_DIR, MARKER_FILE};
use crate::ops::sammy_install::{install_packages, PackageSources};
use crate::sources::git::Fetcher;
use crate::util::fs;
use crate::util::shell::{Shell, Status};

/// Application source every new project starts from.
pub const STARTER_MAIN_CPP: &str = r#"#include <libcore/utility/log.hpp>

int main()
{
  for (int i = 0; i < 15; i++)
  {
    sjsu::log::Print("Hello World!\n");
    sjsu::Delay(1s);
  }

  return 0;
}
"#;

/// Options for creating a new project.
#[derive(Debug, Clone, Default)]
pub struct StartOptions {
    /// Packages to install after the skeleton is written
    pub packages: Vec<PackageRef>,

    /// Only write the skeleton
    pub no_install: bool,
}

/// Create a project skeleton at `path`, then install its default packages.
pub fn start_project(
    shell: &Shell,
    path: &Path,
    opts: &StartOptions,
    sources: &PackageSources<'_>,
    fetcher: &dyn Fetcher,
) -> Result<Workspace> {
    let ws = create_skeleton(shell, path)?;

    if opts.no_install {
        shell.status(Status::Skipped, "package installation (--no-install)");
    } else {
        install_packages(shell, &ws, &opts.packages, sources, fetcher)?;
    }

    shell.status(
        Status::Finished,
        format!("project `{}`", path.display()),
    );
    Ok(ws)
}

/// Write the marker, the package directories and `main.cpp`.
pub fn create_skeleton(shell: &Shell, path: &Path) -> Result<Workspace> {
    if path.exists() {
        bail!(
            "destination `{}` already exists\n\
             \n\
             Choose another project name or remove the existing directory.",
            path.display()
        );
    }

    shell.status(Status::Creating, format!("project `{}`", path.display()));
    let ws = Workspace::create(path)?;
    for created in [
        Path::new(MARKER_DIR).join(MARKER_FILE),
        "library".into(),
        "packages".into(),
    ] {
        shell.status(Status::Created, path.join(created).display());
    }

    let main = ws.root().join("main.cpp");
    fs::write_string(&main, STARTER_MAIN_CPP)?;
    shell.status(Status::Created, main.display());

    Ok(ws)
}
