/*!
Command dispatcher module.

Layout:
  src/cmd/
    mod.rs      (this file)
    options.rs  (SelectionArgs: flags + preset -> OptionSelection)
    build.rs    (BuildArgs   + execute_build)
    run.rs      (RunArgs     + execute_run)
    check.rs    (CheckArgs   + execute_check, PreflightArgs)
    catalog.rs  (CatalogArgs + execute_catalog)
    shared.rs   (JSON / error output helpers)
    format.rs   (color / box / table styling)

Conventions:
  - Each subcommand module exposes one public `execute_*` function returning
    `anyhow::Result<()>`.
  - Argument structs derive `clap::Args`.
  - Nothing under `crate::packer` prints; presentation lives here.
*/

pub mod build;
pub mod catalog;
pub mod check;
pub mod format;
pub mod options;
pub mod run;
pub mod shared;

pub use build::{BuildArgs, execute_build};
pub use catalog::{CatalogArgs, execute_catalog};
pub use check::{CheckArgs, execute_check};
pub use run::{RunArgs, execute_run};
