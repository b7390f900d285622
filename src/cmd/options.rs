/*!
options.rs - selection flags shared by `build` and `run`.

Resolves CLI flags + optional preset file + defaults into one immutable
`OptionSelection`.

Precedence (per field): CLI flag > preset file > built-in defaults.
For catalogs, naming any entry on the CLI replaces that whole catalog;
`--no-defaults` starts from an empty selection. `--drop-*` flags remove
entries from whatever the merge produced (e.g. `--drop-mode onefile` keeps
the other defaults).

Preset files (JSON, or YAML by `.yaml`/`.yml` extension) are read-only input.
Catalog names inside them are matched by key, label or flag; unknown names
are skipped with a warning.
*/

use anyhow::{Context, Result};
use clap::Args;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::packer::catalog::{CatalogEntry, ExcludeRule, PackagingMode, Plugin, PythonFlag};
use crate::packer::command::{CommandBuilder, DEFAULT_TOOL};
use crate::packer::selection::{OptionSelection, Selected, clamp_jobs};
use crate::utils::tempdir;

/* ---- CLI Arguments ---- */

#[derive(Args, Debug, Clone)]
pub struct SelectionArgs {
    /// Main Python script (may come from --preset instead)
    #[arg(value_name = "MAIN")]
    pub main: Option<String>,

    /// Windows icon (.ico)
    #[arg(long, value_name = "PATH")]
    pub icon: Option<String>,

    /// Output file name (default app.exe; pass "" to omit)
    #[arg(long, value_name = "NAME")]
    pub output_filename: Option<String>,

    /// Onefile temp directory spec, e.g. "{TEMP}/myapp"
    #[arg(long, value_name = "SPEC", conflicts_with = "auto_tempdir")]
    pub tempdir_spec: Option<String>,

    /// Generate "{TEMP}/<timestamp>_<main stem>" as temp directory spec
    #[arg(long)]
    pub auto_tempdir: bool,

    /// Folder to bundle as data (repeatable, order kept)
    #[arg(long = "include-dir", value_name = "DIR")]
    pub include_dirs: Vec<String>,

    /// Plugin to enable (repeatable; replaces default anti-bloat)
    #[arg(long = "plugin", value_enum, value_name = "PLUGIN")]
    pub plugins: Vec<Plugin>,

    /// Packaging mode (repeatable; replaces default standalone+onefile)
    #[arg(long = "mode", value_enum, value_name = "MODE")]
    pub modes: Vec<PackagingMode>,

    /// Python flag (repeatable)
    #[arg(long = "python-flag", value_enum, value_name = "FLAG")]
    pub python_flags: Vec<PythonFlag>,

    /// Module exclusion rule (repeatable)
    #[arg(long = "exclude", value_enum, value_name = "RULE")]
    pub excludes: Vec<ExcludeRule>,

    /// Remove a plugin from the merged selection (repeatable)
    #[arg(long = "drop-plugin", value_enum, value_name = "PLUGIN")]
    pub drop_plugins: Vec<Plugin>,

    /// Remove a packaging mode from the merged selection (repeatable)
    #[arg(long = "drop-mode", value_enum, value_name = "MODE")]
    pub drop_modes: Vec<PackagingMode>,

    /// Remove a folder added by a preset (repeatable)
    #[arg(long = "drop-include-dir", value_name = "DIR")]
    pub drop_include_dirs: Vec<String>,

    /// Use the MinGW64 compiler backend
    #[arg(long)]
    pub mingw64: bool,

    /// Disable link-time optimization
    #[arg(long)]
    pub no_lto: bool,

    /// Parallel compile jobs (clamped to available CPUs)
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub jobs: Option<u32>,

    /// Start from an empty selection instead of the defaults
    #[arg(long)]
    pub no_defaults: bool,

    /// Read selection values from a JSON/YAML preset file
    #[arg(long, value_name = "FILE")]
    pub preset: Option<PathBuf>,

    /// Packaging tool invocation
    #[arg(long, env = "PACKY_TOOL", default_value = DEFAULT_TOOL, value_name = "CMD")]
    pub tool: String,
}

impl SelectionArgs {
    pub fn builder(&self) -> CommandBuilder {
        CommandBuilder::new(self.tool.trim())
    }

    /// Merge flags, preset and defaults into an immutable snapshot.
    pub fn resolve(&self) -> Result<OptionSelection> {
        let preset = match &self.preset {
            Some(path) => load_preset(path)?,
            None => Preset::default(),
        };

        let mut sel = if self.no_defaults {
            OptionSelection::empty()
        } else {
            OptionSelection::default()
        };

        sel.main_file = self
            .main
            .clone()
            .or(preset.main)
            .unwrap_or_default()
            .trim()
            .to_string();
        if let Some(icon) = self.icon.clone().or(preset.icon) {
            sel.icon = icon;
        }
        if let Some(name) = self.output_filename.clone().or(preset.output_filename) {
            sel.output_filename = name;
        }

        if self.auto_tempdir {
            sel.tempdir_spec = tempdir::generate_spec(&sel.main_file)?;
            debug!(spec = %sel.tempdir_spec, "generated temp dir spec");
        } else if let Some(spec) = self.tempdir_spec.clone().or(preset.tempdir_spec) {
            sel.tempdir_spec = spec;
        }

        for dir in preset.include_dirs.iter().chain(&self.include_dirs) {
            let dir = dir.trim();
            if dir.is_empty() {
                continue;
            }
            if !sel.add_include_dir(dir) {
                warn!(folder = %dir, "folder already added, skipping duplicate");
            }
        }

        sel.plugins = pick(&self.plugins, preset.plugins.as_deref(), sel.plugins);
        sel.modes = pick(&self.modes, preset.modes.as_deref(), sel.modes);
        sel.python_flags = pick(
            &self.python_flags,
            preset.python_flags.as_deref(),
            sel.python_flags,
        );
        sel.excludes = pick(&self.excludes, preset.excludes.as_deref(), sel.excludes);

        for plugin in &self.drop_plugins {
            sel.plugins.remove(*plugin);
        }
        for mode in &self.drop_modes {
            sel.modes.remove(*mode);
        }
        for dir in &self.drop_include_dirs {
            if !sel.remove_include_dir(dir.trim()) {
                debug!(folder = %dir, "folder to drop was not selected");
            }
        }

        sel.mingw64 = self.mingw64 || preset.mingw64.unwrap_or(sel.mingw64);
        sel.lto = !self.no_lto && preset.lto.unwrap_or(sel.lto);

        if let Some(requested) = self.jobs.or(preset.jobs) {
            sel.jobs = clamp_jobs(requested);
            if sel.jobs != requested {
                warn!(requested, using = sel.jobs, "job count clamped to available CPUs");
            }
        }

        if sel.modes.is_empty() {
            debug!("no packaging mode selected, the tool will use its own defaults");
        }
        debug!(
            plugins = sel.plugins.len(),
            modes = sel.modes.len(),
            folders = sel.include_dirs.len(),
            jobs = sel.jobs,
            "selection resolved"
        );
        Ok(sel)
    }
}

fn pick<E: CatalogEntry>(cli: &[E], preset: Option<&[String]>, fallback: Selected<E>) -> Selected<E> {
    if !cli.is_empty() {
        return cli.iter().copied().collect();
    }
    match preset {
        Some(names) => resolve_names(names),
        None => fallback,
    }
}

/// Resolve preset names against a catalog, skipping unknown ones.
pub fn resolve_names<E: CatalogEntry>(names: &[String]) -> Selected<E> {
    let mut out = Selected::new();
    for name in names {
        match E::from_label(name) {
            Some(entry) => out.insert(entry),
            None => warn!(
                name = %name,
                catalog = std::any::type_name::<E>().rsplit("::").next().unwrap_or("catalog"),
                "unknown catalog entry in preset, skipped"
            ),
        }
    }
    out
}

/* ---- Preset Files ---- */

/// On-disk preset shape. Unknown keys are ignored.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Preset {
    pub main: Option<String>,
    pub icon: Option<String>,
    pub output_filename: Option<String>,
    pub tempdir_spec: Option<String>,
    pub include_dirs: Vec<String>,
    pub plugins: Option<Vec<String>>,
    pub modes: Option<Vec<String>>,
    pub python_flags: Option<Vec<String>>,
    pub excludes: Option<Vec<String>>,
    pub mingw64: Option<bool>,
    pub lto: Option<bool>,
    pub jobs: Option<u32>,
}

pub fn load_preset(path: &Path) -> Result<Preset> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read preset file: {}", path.display()))?;
    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));

    let preset = if is_yaml {
        serde_yaml::from_str(&raw).context("failed to parse YAML preset")?
    } else {
        serde_json::from_str(&raw).context("failed to parse JSON preset")?
    };
    debug!(path = %path.display(), "loaded preset");
    Ok(preset)
}

/* ---- Tests ---- */
