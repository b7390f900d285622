//! Preflight: make sure the packaging tool answers a version query.
//!
//! query -> (on failure) install once -> query again. A failed install, or a
//! second failed query, is terminal (`ToolUnavailable`).
//!
//! Both commands go through the same `Interpreter` as the packaging run, so
//! launcher scripts the shell can resolve (`nuitka.cmd`) are found.

use std::process::Stdio;

use tracing::{debug, info, warn};
use url::Url;

use super::command::DEFAULT_TOOL;
use super::error::{PackError, PackResult};
use super::runner::{Interpreter, is_cmd_shell};

/// Package installed when the tool is missing.
pub const DEFAULT_PACKAGE: &str = "nuitka";
pub const DEFAULT_PYTHON: &str = "python";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreflightConfig {
    /// Display name used in messages
    pub tool: String,
    pub version_argv: Vec<String>,
    pub install_argv: Vec<String>,
    pub interpreter: Interpreter,
}

impl Default for PreflightConfig {
    fn default() -> Self {
        Self {
            tool: DEFAULT_TOOL.to_string(),
            version_argv: vec![DEFAULT_TOOL.to_string(), "--version".to_string()],
            install_argv: pip_install_argv(DEFAULT_PYTHON, DEFAULT_PACKAGE, None),
            interpreter: Interpreter::default(),
        }
    }
}

impl PreflightConfig {
    /// Derive the version query from a tool invocation (`nuitka`,
    /// `python -m nuitka`, ...) and install through pip.
    pub fn for_tool(
        tool: &str,
        python: &str,
        package: &str,
        index_url: Option<&Url>,
    ) -> PackResult<Self> {
        let mut version_argv = shell_words::split(tool).map_err(|e| PackError::ToolUnavailable {
            tool: tool.to_string(),
            reason: format!("cannot parse tool invocation: {e}"),
        })?;
        version_argv.push("--version".to_string());
        Ok(Self {
            tool: tool.trim().to_string(),
            version_argv,
            install_argv: pip_install_argv(python, package, index_url),
            interpreter: Interpreter::default(),
        })
    }

    pub fn with_interpreter(mut self, interpreter: Interpreter) -> Self {
        self.interpreter = interpreter;
        self
    }
}

/// `<python> -m pip install <package> [-i <index>]`
pub fn pip_install_argv(python: &str, package: &str, index_url: Option<&Url>) -> Vec<String> {
    let mut argv: Vec<String> = [python, "-m", "pip", "install", package]
        .iter()
        .map(|s| s.to_string())
        .collect();
    if let Some(url) = index_url {
        argv.push("-i".to_string());
        argv.push(url.to_string());
    }
    argv
}

/// What the preflight had to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreflightOutcome {
    /// Tool answered right away
    Present { version: String },
    /// Tool answered after one install
    Installed { version: String },
}

impl PreflightOutcome {
    pub fn version(&self) -> &str {
        match self {
            PreflightOutcome::Present { version } | PreflightOutcome::Installed { version } => {
                version
            }
        }
    }
}

pub async fn ensure_available(cfg: &PreflightConfig) -> PackResult<PreflightOutcome> {
    let first = match query_version(&cfg.interpreter, &cfg.version_argv).await {
        Ok(version) => {
            debug!(tool = %cfg.tool, %version, "packaging tool present");
            return Ok(PreflightOutcome::Present { version });
        }
        Err(reason) => reason,
    };

    warn!(tool = %cfg.tool, reason = %first, "packaging tool not found, installing");
    if let Err(reason) = run_install(&cfg.interpreter, &cfg.install_argv).await {
        return Err(unavailable(cfg, format!("install failed: {reason}")));
    }
    info!(tool = %cfg.tool, "install finished, re-checking");

    match query_version(&cfg.interpreter, &cfg.version_argv).await {
        Ok(version) => Ok(PreflightOutcome::Installed { version }),
        Err(reason) => Err(unavailable(
            cfg,
            format!("still unavailable after install: {reason}"),
        )),
    }
}

fn unavailable(cfg: &PreflightConfig, reason: String) -> PackError {
    PackError::ToolUnavailable {
        tool: cfg.tool.clone(),
        reason,
    }
}

/// First non-empty stdout line of a successful version query.
async fn query_version(interpreter: &Interpreter, argv: &[String]) -> Result<String, String> {
    let output = run_captured(interpreter, argv).await?;
    if !output.status.success() {
        return Err(describe_failure(&output));
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(stdout
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("unknown")
        .to_string())
}

async fn run_install(interpreter: &Interpreter, argv: &[String]) -> Result<(), String> {
    let output = run_captured(interpreter, argv).await?;
    for line in String::from_utf8_lossy(&output.stdout).lines() {
        debug!(target: "packy::install", "{line}");
    }
    if output.status.success() {
        Ok(())
    } else {
        Err(describe_failure(&output))
    }
}

async fn run_captured(
    interpreter: &Interpreter,
    argv: &[String],
) -> Result<std::process::Output, String> {
    let program = argv.first().ok_or_else(|| "empty command".to_string())?;
    let mut cmd = interpreter.command(&render_argv(interpreter, argv))?;
    cmd.stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| format!("{program}: {e}"))
}

/// Join an argv into a line the interpreter splits back into the same argv.
fn render_argv(interpreter: &Interpreter, argv: &[String]) -> String {
    match interpreter {
        Interpreter::Shell { program, .. } if is_cmd_shell(program) => argv
            .iter()
            .map(|a| {
                if a.contains(char::is_whitespace) {
                    format!("\"{a}\"")
                } else {
                    a.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(" "),
        _ => shell_words::join(argv),
    }
}

fn describe_failure(output: &std::process::Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let last = stderr.lines().rev().map(str::trim).find(|l| !l.is_empty());
    match (output.status.code(), last) {
        (Some(code), Some(msg)) => format!("exit code {code}: {msg}"),
        (Some(code), None) => format!("exit code {code}"),
        (None, Some(msg)) => format!("terminated: {msg}"),
        (None, None) => "terminated by signal".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: impl AsRef<str>) -> Vec<String> {
        vec!["sh".into(), "-c".into(), script.as_ref().to_string()]
    }

    fn cfg(version: Vec<String>, install: Vec<String>) -> PreflightConfig {
        PreflightConfig {
            tool: "nuitka".into(),
            version_argv: version,
            install_argv: install,
            interpreter: Interpreter::system_shell(),
        }
    }

    #[test]
    fn install_argv_with_and_without_index() {
        assert_eq!(
            pip_install_argv("python", "nuitka", None),
            vec!["python", "-m", "pip", "install", "nuitka"]
        );
        let url = Url::parse("https://pypi.example.org/simple").unwrap();
        assert_eq!(
            pip_install_argv("python3", "nuitka", Some(&url)),
            vec![
                "python3",
                "-m",
                "pip",
                "install",
                "nuitka",
                "-i",
                "https://pypi.example.org/simple"
            ]
        );
    }

    #[test]
    fn for_tool_splits_invocation() {
        let c = PreflightConfig::for_tool("python -m nuitka", "python", "nuitka", None).unwrap();
        assert_eq!(c.version_argv, vec!["python", "-m", "nuitka", "--version"]);
        assert_eq!(c.tool, "python -m nuitka");
        assert!(PreflightConfig::for_tool("\"broken", "python", "nuitka", None).is_err());
    }

    #[test]
    fn default_config_queries_nuitka() {
        let c = PreflightConfig::default();
        assert_eq!(c.version_argv, vec!["nuitka", "--version"]);
        assert_eq!(c.install_argv[..3], ["python", "-m", "pip"]);
    }

    #[test]
    fn argv_is_rendered_for_the_interpreter() {
        let argv: Vec<String> = vec!["python".into(), "-m".into(), "pip".into(), "a b".into()];
        assert_eq!(
            render_argv(&Interpreter::shell("cmd", "/C"), &argv),
            "python -m pip \"a b\""
        );
        assert_eq!(
            render_argv(&Interpreter::shell("sh", "-c"), &argv),
            "python -m pip 'a b'"
        );
        assert_eq!(
            shell_words::split(&render_argv(&Interpreter::Direct, &argv)).unwrap(),
            argv
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn version_query_runs_through_the_interpreter() {
        let c = cfg(vec!["nuitka".into(), "--version".into()], sh("exit 1"))
            .with_interpreter(Interpreter::shell("echo", "via"));
        let outcome = ensure_available(&c).await.unwrap();
        assert_eq!(outcome.version(), "via nuitka --version");
        assert!(matches!(outcome, PreflightOutcome::Present { .. }));
    }

    #[tokio::test]
    async fn empty_version_command_is_unavailable() {
        let err = ensure_available(&cfg(vec![], vec![])).await.unwrap_err();
        assert!(matches!(err, PackError::ToolUnavailable { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn present_tool_skips_install() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("installed");
        let c = cfg(
            sh("echo '2.4.1'"),
            sh(format!("touch '{}'", marker.display())),
        );
        let outcome = ensure_available(&c).await.unwrap();
        assert_eq!(
            outcome,
            PreflightOutcome::Present {
                version: "2.4.1".into()
            }
        );
        assert!(!marker.exists(), "install must not run");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn missing_tool_is_installed_once_then_rechecked() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("installed");
        let m = marker.display();
        let c = cfg(
            sh(format!("test -f '{m}' && echo '1.0'")),
            sh(format!("touch '{m}'")),
        );
        let outcome = ensure_available(&c).await.unwrap();
        assert_eq!(outcome.version(), "1.0");
        assert!(matches!(outcome, PreflightOutcome::Installed { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failed_install_is_terminal() {
        let dir = tempfile::tempdir().unwrap();
        let count = dir.path().join("count");
        let c = cfg(
            sh("exit 1"),
            sh(format!("echo x >> '{}'; echo 'no network' 1>&2; exit 2", count.display())),
        );
        let err = ensure_available(&c).await.unwrap_err();
        match err {
            PackError::ToolUnavailable { tool, reason } => {
                assert_eq!(tool, "nuitka");
                assert!(reason.contains("install failed"), "{reason}");
                assert!(reason.contains("no network"), "{reason}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        let attempts = std::fs::read_to_string(&count).unwrap();
        assert_eq!(attempts.lines().count(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn install_that_does_not_help_is_terminal() {
        let c = cfg(sh("exit 1"), sh("exit 0"));
        let err = ensure_available(&c).await.unwrap_err();
        assert!(err.to_string().contains("still unavailable after install"));
    }
}
