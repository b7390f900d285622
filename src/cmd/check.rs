/*!
`check.rs`

Implements `packy check`: run only the preflight (version query, one install
attempt, re-query). `PreflightArgs` is shared with `packy run`.

JSON Output Shape:
{ "status": "ok", "tool": "nuitka", "version": "2.4.1", "installed": false }
*/

use anyhow::{Context, Result};
use clap::Args;
use url::Url;

use crate::cmd::format::{Role, StyleOptions, box_header, color, emoji};
use crate::cmd::shared::{output_error, print_json};
use crate::packer::command::DEFAULT_TOOL;
use crate::packer::preflight::{
    DEFAULT_PACKAGE, DEFAULT_PYTHON, PreflightConfig, PreflightOutcome, ensure_available,
};

/// Knobs for the install step of the preflight.
#[derive(Args, Debug, Clone)]
pub struct PreflightArgs {
    /// Alternate package index for the install step
    #[arg(long, env = "PACKY_INDEX_URL", value_name = "URL")]
    pub index_url: Option<Url>,

    /// Python interpreter used to run pip
    #[arg(long, default_value = DEFAULT_PYTHON, value_name = "PYTHON")]
    pub python: String,

    /// Package name to install when the tool is missing
    #[arg(long, default_value = DEFAULT_PACKAGE, value_name = "NAME")]
    pub package: String,
}

impl PreflightArgs {
    pub fn config(&self, tool: &str) -> Result<PreflightConfig> {
        Ok(PreflightConfig::for_tool(
            tool,
            &self.python,
            &self.package,
            self.index_url.as_ref(),
        )?)
    }
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Packaging tool invocation
    #[arg(long, env = "PACKY_TOOL", default_value = DEFAULT_TOOL, value_name = "CMD")]
    pub tool: String,

    #[command(flatten)]
    pub preflight: PreflightArgs,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

pub fn execute_check(args: CheckArgs) -> Result<()> {
    let cfg = args.preflight.config(&args.tool)?;
    let rt = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    let outcome = match rt.block_on(ensure_available(&cfg)) {
        Ok(o) => o,
        Err(e) => return output_error(args.json, "Preflight Failed", &e.to_string()),
    };
    print_outcome(&cfg.tool, &outcome, args.json);
    Ok(())
}

pub fn print_outcome(tool: &str, outcome: &PreflightOutcome, json: bool) {
    let installed = matches!(outcome, PreflightOutcome::Installed { .. });
    if json {
        print_json(&serde_json::json!({
            "status": "ok",
            "tool": tool,
            "version": outcome.version(),
            "installed": installed,
        }));
        return;
    }
    let style = StyleOptions::detect();
    let subtitle = if installed {
        "installed just now"
    } else {
        "already present"
    };
    println!(
        "{}",
        box_header(
            format!(
                "{} {tool} {}",
                emoji("success", &style),
                color(Role::Success, outcome.version(), &style)
            ),
            Some(subtitle),
            &style,
        )
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(flatten)]
        args: CheckArgs,
    }

    #[test]
    fn index_url_is_validated() {
        let ok = TestCli::try_parse_from([
            "packy",
            "--index-url",
            "https://pypi.example.org/simple",
        ])
        .unwrap();
        let cfg = ok.args.preflight.config("nuitka").unwrap();
        assert_eq!(cfg.install_argv.last().unwrap(), "https://pypi.example.org/simple");

        assert!(TestCli::try_parse_from(["packy", "--index-url", "not a url"]).is_err());
    }

    #[test]
    fn config_uses_tool_invocation() {
        let cli = TestCli::try_parse_from(["packy", "--tool", "python3 -m nuitka"]).unwrap();
        let cfg = cli.args.preflight.config(&cli.args.tool).unwrap();
        assert_eq!(cfg.version_argv, vec!["python3", "-m", "nuitka", "--version"]);
    }

    #[cfg(unix)]
    #[test]
    fn check_succeeds_for_present_tool() {
        let cli = TestCli::try_parse_from(["packy", "--tool", "echo", "--json"]).unwrap();
        assert!(execute_check(cli.args).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn check_fails_when_install_fails() {
        let cli = TestCli::try_parse_from([
            "packy",
            "--tool",
            "packy-definitely-not-a-real-binary",
            "--python",
            "false",
            "--json",
        ])
        .unwrap();
        assert!(execute_check(cli.args).is_err());
    }
}
