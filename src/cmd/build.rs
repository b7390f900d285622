/*!
`build.rs`

Implements `packy build`: resolve the selection, build the command line and
print it without running anything.

JSON Output Shape:
{
  "status": "ok",
  "command": "nuitka --enable-plugin=anti-bloat ... main.py",
  "tokens": ["nuitka", "--enable-plugin=anti-bloat", ...],
  "elapsed_ms": 0
}

The printed string is exactly what `packy run` hands to the interpreter.
*/

use anyhow::Result;
use clap::Args;
use std::time::Instant;
use tracing::debug;

use crate::cmd::format::{Role, StyleOptions, box_header, color, emoji};
use crate::cmd::options::SelectionArgs;
use crate::cmd::shared::{output_error, print_json};
use crate::packer::CommandLine;

#[derive(Args, Debug)]
pub struct BuildArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Output JSON instead of human-readable text
    #[arg(long)]
    pub json: bool,
}

pub fn execute_build(args: BuildArgs) -> Result<()> {
    let started = Instant::now();
    let command = match build_command_line(&args.selection) {
        Ok(c) => c,
        Err(e) => return output_error(args.json, "Build Error", &format!("{e:#}")),
    };
    let elapsed_ms = started.elapsed().as_millis();
    debug!(tokens = command.len(), "command built");

    if args.json {
        print_json(&serde_json::json!({
            "status": "ok",
            "command": command.render(),
            "tokens": command.tokens(),
            "elapsed_ms": elapsed_ms,
        }));
    } else {
        let style = StyleOptions::detect();
        println!(
            "{}",
            box_header(
                format!("{} Generated command", emoji("spark", &style)),
                Some(format!("{} tokens • {elapsed_ms} ms", command.len())),
                &style,
            )
        );
        println!("{}", color(Role::Success, command.render(), &style));
    }
    Ok(())
}

/// Selection flags -> snapshot -> command line. Shared with `run`.
pub fn build_command_line(selection: &SelectionArgs) -> Result<CommandLine> {
    let snapshot = selection.resolve()?;
    Ok(selection.builder().build(&snapshot)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packer::PackError;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(flatten)]
        args: BuildArgs,
    }

    fn args(argv: &[&str]) -> BuildArgs {
        let mut full = vec!["packy"];
        full.extend_from_slice(argv);
        TestCli::try_parse_from(full).unwrap().args
    }

    #[test]
    fn builds_from_flags() {
        let a = args(&[
            "main.py",
            "--tool",
            "nuitka",
            "--jobs",
            "1",
            "--include-dir",
            "/a/b/myassets",
        ]);
        let cmd = build_command_line(&a.selection).unwrap();
        assert_eq!(
            cmd.render(),
            "nuitka --enable-plugin=anti-bloat --standalone --onefile \
             --include-data-dir=\"/a/b/myassets=myassets\" --lto=yes --jobs=1 \
             --output-filename=app.exe main.py"
        );
    }

    #[test]
    fn missing_main_file_surfaces_typed_error() {
        let a = args(&["--tool", "nuitka"]);
        let err = build_command_line(&a.selection).unwrap_err();
        assert_eq!(
            err.downcast_ref::<PackError>(),
            Some(&PackError::MissingRequiredField("main file"))
        );
        assert!(execute_build(BuildArgs { json: true, ..a }).is_err());
    }

    #[test]
    fn execute_build_succeeds_in_json_mode() {
        let a = args(&["main.py", "--json"]);
        assert!(a.json);
        assert!(execute_build(a).is_ok());
    }
}
