//! Command builder: OptionSelection -> ordered CommandLine.
//!
//! Token order is fixed (some packaging flags are cumulative or positional):
//! tool, plugins, modes, icon, data dirs, mingw64, lto, jobs, python flags,
//! exclusions, temp dir spec, output filename, main file.

use std::fmt;
use std::path::Path;

use super::catalog::CatalogEntry;
use super::error::{PackError, PackResult};
use super::selection::OptionSelection;

/// Default invocation token for the packaging tool.
pub const DEFAULT_TOOL: &str = "nuitka";

/// An ordered, deterministic list of command-line tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    tokens: Vec<String>,
}

impl CommandLine {
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// The single string shown to the user and handed to the runner.
    pub fn render(&self) -> String {
        self.tokens.join(" ")
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Turns selections into command lines for one packaging tool invocation.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    tool: String,
}

impl Default for CommandBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_TOOL)
    }
}

impl CommandBuilder {
    /// `tool` is emitted verbatim as the first token (e.g. `nuitka` or
    /// `python -m nuitka`).
    pub fn new(tool: impl Into<String>) -> Self {
        Self { tool: tool.into() }
    }

    pub fn build(&self, sel: &OptionSelection) -> PackResult<CommandLine> {
        let main_file = sel.main_file.trim();
        if main_file.is_empty() {
            return Err(PackError::MissingRequiredField("main file"));
        }

        let mut tokens = vec![self.tool.trim().to_string()];

        tokens.extend(sel.plugins.in_catalog_order().map(|p| p.flag().to_string()));
        tokens.extend(sel.modes.in_catalog_order().map(|m| m.flag().to_string()));

        if let Some(icon) = non_blank(&sel.icon) {
            tokens.push(format!("--windows-icon-from-ico={icon}"));
        }

        for dir in &sel.include_dirs {
            tokens.push(include_dir_token(dir));
        }

        if sel.mingw64 {
            tokens.push("--mingw64".to_string());
        }
        tokens.push(format!("--lto={}", if sel.lto { "yes" } else { "no" }));
        tokens.push(format!("--jobs={}", sel.jobs));

        tokens.extend(
            sel.python_flags
                .in_catalog_order()
                .map(|f| f.flag().to_string()),
        );
        tokens.extend(sel.excludes.in_catalog_order().map(|e| e.flag().to_string()));

        if let Some(spec) = non_blank(&sel.tempdir_spec) {
            tokens.push(format!("--onefile-tempdir-spec=\"{spec}\""));
        }
        if let Some(name) = non_blank(&sel.output_filename) {
            tokens.push(format!("--output-filename={name}"));
        }

        tokens.push(quote_if_spaced(main_file));

        Ok(CommandLine { tokens })
    }
}

/// `--include-data-dir="<src>=<base>"`
pub fn include_dir_token(source: &str) -> String {
    format!("--include-data-dir=\"{}\"", include_dir_payload(source))
}

/// `<src>=<last path component of src>`; falls back to `src` when the path
/// has no final component (e.g. `/`).
pub fn include_dir_payload(source: &str) -> String {
    let base = Path::new(source)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| source.to_string());
    format!("{source}={base}")
}

fn non_blank(s: &str) -> Option<&str> {
    let t = s.trim();
    (!t.is_empty()).then_some(t)
}

fn quote_if_spaced(path: &str) -> String {
    if path.chars().any(char::is_whitespace) {
        format!("\"{path}\"")
    } else {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packer::catalog::{ExcludeRule, PackagingMode, Plugin, PythonFlag};

    fn selection(main: &str) -> OptionSelection {
        OptionSelection {
            main_file: main.to_string(),
            jobs: 4,
            ..OptionSelection::empty()
        }
    }

    fn pos(tokens: &[String], needle: &str) -> usize {
        tokens
            .iter()
            .position(|t| t == needle)
            .unwrap_or_else(|| panic!("token {needle} missing from {tokens:?}"))
    }

    #[test]
    fn minimal_command() {
        let cmd = CommandBuilder::default().build(&selection("main.py")).unwrap();
        assert_eq!(cmd.render(), "nuitka --lto=yes --jobs=4 main.py");
    }

    #[test]
    fn full_command_in_fixed_order() {
        let mut sel = selection("app/main.py");
        sel.plugins = [Plugin::PySide6, Plugin::AntiBloat].into_iter().collect();
        sel.modes = [PackagingMode::Onefile, PackagingMode::Standalone]
            .into_iter()
            .collect();
        sel.icon = "app/icon.ico".into();
        sel.include_dirs = vec!["/a/b/myassets".into(), "data".into()];
        sel.mingw64 = true;
        sel.lto = false;
        sel.python_flags = [PythonFlag::StaticHashes, PythonFlag::NoAsserts]
            .into_iter()
            .collect();
        sel.excludes = [ExcludeRule::IPython, ExcludeRule::Setuptools]
            .into_iter()
            .collect();
        sel.tempdir_spec = "{TEMP}/demo".into();
        sel.output_filename = "demo.exe".into();

        let cmd = CommandBuilder::default().build(&sel).unwrap();
        let expected = [
            "nuitka",
            "--enable-plugin=anti-bloat",
            "--enable-plugin=pyside6",
            "--standalone",
            "--onefile",
            "--windows-icon-from-ico=app/icon.ico",
            "--include-data-dir=\"/a/b/myassets=myassets\"",
            "--include-data-dir=\"data=data\"",
            "--mingw64",
            "--lto=no",
            "--jobs=4",
            "--python-flag=no_asserts",
            "--python-flag=static_hashes",
            "--noinclude-setuptools-mode=error",
            "--noinclude-IPython-mode=error",
            "--onefile-tempdir-spec=\"{TEMP}/demo\"",
            "--output-filename=demo.exe",
            "app/main.py",
        ];
        assert_eq!(cmd.tokens(), expected);
    }

    #[test]
    fn toggle_order_does_not_matter() {
        let mut a = selection("main.py");
        a.plugins.insert(Plugin::Numpy);
        a.plugins.insert(Plugin::TkInter);
        a.modes.insert(PackagingMode::RemoveOutput);

        let mut b = selection("main.py");
        b.modes.insert(PackagingMode::RemoveOutput);
        b.plugins.insert(Plugin::TkInter);
        b.plugins.insert(Plugin::Numpy);

        let builder = CommandBuilder::default();
        let ta = builder.build(&a).unwrap();
        let tb = builder.build(&b).unwrap();
        assert_eq!(ta, tb);

        let t = ta.tokens();
        let p1 = pos(t, "--enable-plugin=tk-inter");
        let p2 = pos(t, "--enable-plugin=numpy");
        let m1 = pos(t, "--remove-output");
        let main = pos(t, "main.py");
        assert!(p1 < p2 && p2 < m1 && m1 < main);
    }

    #[test]
    fn building_is_deterministic() {
        let sel = OptionSelection {
            main_file: "main.py".into(),
            ..OptionSelection::default()
        };
        let builder = CommandBuilder::default();
        assert_eq!(builder.build(&sel).unwrap(), builder.build(&sel).unwrap());
    }

    #[test]
    fn blank_optional_fields_are_omitted() {
        let mut sel = selection("main.py");
        sel.icon = "   ".into();
        sel.tempdir_spec = "".into();
        sel.output_filename = "\t".into();
        let rendered = CommandBuilder::default().build(&sel).unwrap().render();
        assert!(!rendered.contains("--windows-icon-from-ico"));
        assert!(!rendered.contains("--onefile-tempdir-spec"));
        assert!(!rendered.contains("--output-filename"));
        assert!(!rendered.contains("--enable-plugin"));
        assert!(!rendered.contains("--mingw64"));
    }

    #[test]
    fn missing_main_file_is_rejected() {
        let builder = CommandBuilder::default();
        for main in ["", "   ", "\n\t"] {
            let err = builder.build(&selection(main)).unwrap_err();
            assert_eq!(err, PackError::MissingRequiredField("main file"));
        }
    }

    #[test]
    fn main_file_with_spaces_is_quoted() {
        let cmd = CommandBuilder::default()
            .build(&selection("  /home/me/my app/main.py "))
            .unwrap();
        assert_eq!(
            cmd.tokens().last().map(String::as_str),
            Some("\"/home/me/my app/main.py\"")
        );
    }

    #[test]
    fn include_dir_payload_uses_base_name() {
        assert_eq!(include_dir_payload("/a/b/myassets"), "/a/b/myassets=myassets");
        assert_eq!(include_dir_payload("/a/b/myassets/"), "/a/b/myassets/=myassets");
        assert_eq!(include_dir_payload("/"), "/=/");
    }

    #[test]
    fn custom_tool_token_leads() {
        let cmd = CommandBuilder::new("python -m nuitka")
            .build(&selection("main.py"))
            .unwrap();
        assert!(cmd.render().starts_with("python -m nuitka --lto=yes"));
        assert_eq!(cmd.to_string(), cmd.render());
    }
}
