/*!
`catalog.rs`

Implements `packy catalog [plugins|modes|python-flags|excludes]`: list the
selectable entries with their flag and help text. Rows come from the same
enum tables the builder uses, so what is listed is exactly what can be built.

JSON Output Shape:
{
  "status": "ok",
  "catalogs": [
    { "name": "plugins", "entries": [
        { "key": "anti-bloat", "label": "Reduce size",
          "flag": "--enable-plugin=anti-bloat", "help": "...", "default": true } ] }
  ]
}
*/

use anyhow::Result;
use clap::Args;

use crate::cmd::format::{Role, StyleOptions, box_header, color, table};
use crate::cmd::shared::print_json;
use crate::packer::catalog::{
    CatalogEntry, CatalogKind, Descriptor, ExcludeRule, PackagingMode, Plugin, PythonFlag,
};
use crate::packer::selection::OptionSelection;

#[derive(Args, Debug)]
pub struct CatalogArgs {
    /// Catalog to show (all when omitted)
    pub kind: Option<CatalogKind>,

    /// Output JSON instead of tables
    #[arg(long)]
    pub json: bool,
}

pub fn execute_catalog(args: CatalogArgs) -> Result<()> {
    let kinds: Vec<CatalogKind> = match args.kind {
        Some(k) => vec![k],
        None => CatalogKind::variants().to_vec(),
    };
    let defaults = OptionSelection::default();

    if args.json {
        let catalogs: Vec<_> = kinds
            .iter()
            .map(|kind| {
                let entries: Vec<_> = kind
                    .descriptors()
                    .iter()
                    .map(|d| {
                        serde_json::json!({
                            "key": d.key,
                            "label": d.label,
                            "flag": d.flag,
                            "help": d.help,
                            "default": is_default(&defaults, *kind, d),
                        })
                    })
                    .collect();
                serde_json::json!({ "name": kind.to_string(), "entries": entries })
            })
            .collect();
        print_json(&serde_json::json!({ "status": "ok", "catalogs": catalogs }));
        return Ok(());
    }

    let style = StyleOptions::detect();
    for (i, kind) in kinds.iter().enumerate() {
        if i > 0 {
            println!();
        }
        let rows = rows_for(&defaults, *kind);
        println!(
            "{}",
            box_header(
                kind.title(),
                Some(format!("{} entries • --{}", rows.len(), cli_flag(*kind))),
                &style
            )
        );
        println!("{}", table(&["KEY", "FLAG", "LABEL", "HELP"], &rows, &style));
    }
    println!(
        "\n{}",
        color(Role::Dim, "* enabled by default", &style)
    );
    Ok(())
}

fn rows_for(defaults: &OptionSelection, kind: CatalogKind) -> Vec<Vec<String>> {
    kind.descriptors()
        .iter()
        .map(|d| {
            let marker = if is_default(defaults, kind, d) { "*" } else { "" };
            vec![
                format!("{}{marker}", d.key),
                d.flag.to_string(),
                d.label.to_string(),
                d.help.to_string(),
            ]
        })
        .collect()
}

/// CLI option that selects entries of this catalog.
fn cli_flag(kind: CatalogKind) -> &'static str {
    match kind {
        CatalogKind::Plugins => "plugin",
        CatalogKind::Modes => "mode",
        CatalogKind::PythonFlags => "python-flag",
        CatalogKind::Excludes => "exclude",
    }
}

fn is_default(defaults: &OptionSelection, kind: CatalogKind, d: &Descriptor) -> bool {
    match kind {
        CatalogKind::Plugins => Plugin::from_label(d.key).is_some_and(|e| defaults.plugins.contains(e)),
        CatalogKind::Modes => {
            PackagingMode::from_label(d.key).is_some_and(|e| defaults.modes.contains(e))
        }
        CatalogKind::PythonFlags => {
            PythonFlag::from_label(d.key).is_some_and(|e| defaults.python_flags.contains(e))
        }
        CatalogKind::Excludes => {
            ExcludeRule::from_label(d.key).is_some_and(|e| defaults.excludes.contains(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_markers() {
        let defaults = OptionSelection::default();
        let rows = rows_for(&defaults, CatalogKind::Plugins);
        assert_eq!(rows.len(), Plugin::ALL.len());
        assert_eq!(rows[0][0], "anti-bloat*");
        assert_eq!(rows[1][0], "tk-inter");

        let modes = rows_for(&defaults, CatalogKind::Modes);
        let marked: Vec<_> = modes.iter().filter(|r| r[0].ends_with('*')).collect();
        assert_eq!(marked.len(), 2);
        assert!(rows_for(&defaults, CatalogKind::Excludes)
            .iter()
            .all(|r| !r[0].ends_with('*')));
    }

    #[test]
    fn rows_carry_exact_flags() {
        let rows = rows_for(&OptionSelection::default(), CatalogKind::Excludes);
        let flags: Vec<_> = rows.iter().map(|r| r[1].as_str()).collect();
        assert_eq!(
            flags,
            vec![
                "--noinclude-setuptools-mode=error",
                "--noinclude-pydoc-mode=warning",
                "--noinclude-IPython-mode=error"
            ]
        );
    }

    #[test]
    fn execute_catalog_all_and_single() {
        assert!(execute_catalog(CatalogArgs { kind: None, json: true }).is_ok());
        assert!(execute_catalog(CatalogArgs {
            kind: Some(CatalogKind::Modes),
            json: false
        })
        .is_ok());
    }
}
