/*!
`run.rs`

Implements `packy run`: build the command, run the preflight, then execute
the command and relay its output as it arrives.

Flow:
  1. Resolve selection + build command (MissingRequiredField aborts here)
  2. Preflight (skipped with --skip-preflight; ToolUnavailable aborts here)
  3. Session::start -> ProcessRun; events are printed in arrival order
  4. Ctrl-C cancels the run (process tree killed, Finished still reported);
     a second Ctrl-C stops waiting and aborts

Exit status: success only when the child exits with code 0.

JSON mode prints one object per event (JSON lines):
  {"event":"command","command":"nuitka ..."}
  {"event":"preflight","tool":"nuitka","version":"2.4.1","installed":false}
  {"event":"line","text":"..."}
  {"event":"drain","text":"..."}
  {"event":"fault","error":"..."}
  {"event":"finished","code":0}
*/

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::cmd::build::build_command_line;
use crate::cmd::check::PreflightArgs;
use crate::cmd::format::{Role, StyleOptions, box_header, color, emoji};
use crate::cmd::options::SelectionArgs;
use crate::cmd::shared::{describe_finish, output_error};
use crate::packer::preflight::{PreflightOutcome, ensure_available};
use crate::packer::runner::{DEFAULT_EVENT_BUFFER, is_cmd_shell};
use crate::packer::{Interpreter, ProcessRunner, RunEvent, Session};

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    #[command(flatten)]
    pub preflight: PreflightArgs,

    /// Shell used to run the command (default: sh, or cmd on Windows)
    #[arg(long, value_name = "PROGRAM", conflicts_with = "direct")]
    pub shell: Option<String>,

    /// Flag passing the command string to --shell (default -c, or /C for cmd)
    #[arg(long, value_name = "FLAG", requires = "shell")]
    pub shell_flag: Option<String>,

    /// Split the command with shell-word rules and exec it without a shell
    #[arg(long)]
    pub direct: bool,

    /// Directory the packaging command runs in (default: current directory)
    #[arg(long, value_name = "DIR")]
    pub working_dir: Option<PathBuf>,

    /// Do not check for (or install) the packaging tool first
    #[arg(long)]
    pub skip_preflight: bool,

    /// Capacity of the output event channel
    #[arg(long, value_name = "N", default_value_t = DEFAULT_EVENT_BUFFER)]
    pub buffer: usize,

    /// Emit JSON lines instead of human-readable text
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    pub fn interpreter(&self) -> Interpreter {
        if self.direct {
            return Interpreter::Direct;
        }
        match &self.shell {
            Some(program) => {
                let flag = self
                    .shell_flag
                    .clone()
                    .unwrap_or_else(|| default_shell_flag(program).to_string());
                Interpreter::shell(program.clone(), flag)
            }
            None => Interpreter::system_shell(),
        }
    }
}

fn default_shell_flag(program: &str) -> &'static str {
    if is_cmd_shell(program) { "/C" } else { "-c" }
}

pub fn execute_run(args: RunArgs) -> Result<()> {
    let command = match build_command_line(&args.selection) {
        Ok(c) => c,
        Err(e) => return output_error(args.json, "Run Aborted", &format!("{e:#}")),
    };
    let rendered = command.render();

    let rt = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    let code = rt.block_on(drive(&args, &rendered))?;

    match code {
        Some(0) => Ok(()),
        other => anyhow::bail!("packaging failed ({})", describe_finish(other)),
    }
}

/// Preflight + one session-gated run. Returns the child's exit code.
async fn drive(args: &RunArgs, rendered: &str) -> Result<Option<i32>> {
    let style = StyleOptions::detect();
    let json = args.json;

    if json {
        emit_json(serde_json::json!({ "event": "command", "command": rendered }));
    } else {
        println!(
            "{}",
            box_header(
                format!("{} Generated command", emoji("spark", &style)),
                None::<&str>,
                &style
            )
        );
        println!("{rendered}\n");
    }

    if args.skip_preflight {
        info!("preflight skipped");
    } else {
        let cfg = args
            .preflight
            .config(&args.selection.tool)?
            .with_interpreter(args.interpreter());
        match ensure_available(&cfg).await {
            Ok(outcome) => report_preflight(&cfg.tool, &outcome, json, &style),
            Err(e) => return output_error(json, "Preflight Failed", &e.to_string()),
        }
    }

    let mut runner = ProcessRunner::new(args.interpreter()).with_buffer(args.buffer);
    if let Some(dir) = &args.working_dir {
        runner = runner.with_working_dir(dir);
    }
    debug!(interpreter = ?runner.interpreter(), "runner ready");

    let mut session = Session::new();
    let mut run = session.start(&runner, rendered)?;
    debug!(run = session.runs_started(), command = %run.command(), "run started");
    if !json {
        println!(
            "{} {}\n",
            emoji("rocket", &style),
            color(Role::Accent, "Packaging started...", &style)
        );
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupts = 0u8;
    let mut exit_code = None;
    let mut fault = None;

    loop {
        tokio::select! {
            ev = run.next_event() => {
                let Some(ev) = ev else { break };
                session.observe(&ev);
                render_event(&ev, json, &style);
                if let Some(err) = ev.as_fault() {
                    fault = Some(err);
                }
                if let RunEvent::Finished { code } = ev {
                    exit_code = code;
                }
            }
            _ = &mut ctrl_c => {
                ctrl_c.set(tokio::signal::ctrl_c());
                interrupts += 1;
                if interrupts > 1 {
                    anyhow::bail!("interrupted twice, packaging run abandoned");
                }
                warn!("interrupt received, stopping packaging run (press Ctrl-C again to abort)");
                run.cancel();
            }
        }
    }
    run.join().await;
    debug!(state = ?session.state(), "session settled");
    debug_assert!(session.can_trigger());

    if !json {
        println!(
            "\n{} {}",
            emoji("done", &style),
            color(Role::Dim, "Packaging flow ended", &style)
        );
    }

    if let Some(err) = fault {
        return Err(err.into());
    }
    Ok(exit_code)
}

fn report_preflight(tool: &str, outcome: &PreflightOutcome, json: bool, style: &StyleOptions) {
    let installed = matches!(outcome, PreflightOutcome::Installed { .. });
    if json {
        emit_json(serde_json::json!({
            "event": "preflight",
            "tool": tool,
            "version": outcome.version(),
            "installed": installed,
        }));
    } else if installed {
        println!(
            "{} {}",
            emoji("success", style),
            color(
                Role::Success,
                format!("{tool} installed ({})", outcome.version()),
                style
            )
        );
    } else {
        println!(
            "{} {}",
            emoji("info", style),
            color(Role::Dim, format!("{tool} {}", outcome.version()), style)
        );
    }
}

fn render_event(ev: &RunEvent, json: bool, style: &StyleOptions) {
    if json {
        emit_json(event_json(ev));
        return;
    }
    match ev {
        RunEvent::Line(text) => println!("{text}"),
        RunEvent::Drain(text) => println!("{}", text.trim_end()),
        RunEvent::Fault(msg) => eprintln!(
            "{} {}",
            emoji("error", style),
            color(Role::Error, format!("error: {msg}"), style)
        ),
        RunEvent::Finished { code } => {
            let role = if *code == Some(0) {
                Role::Success
            } else {
                Role::Warning
            };
            println!(
                "\n{} {}",
                emoji(if *code == Some(0) { "success" } else { "warn" }, style),
                color(
                    role,
                    format!("Packaging complete, {}", describe_finish(*code)),
                    style
                )
            );
        }
    }
}

pub fn event_json(ev: &RunEvent) -> serde_json::Value {
    match ev {
        RunEvent::Line(text) => serde_json::json!({ "event": "line", "text": text }),
        RunEvent::Drain(text) => serde_json::json!({ "event": "drain", "text": text }),
        RunEvent::Fault(msg) => serde_json::json!({ "event": "fault", "error": msg }),
        RunEvent::Finished { code } => serde_json::json!({ "event": "finished", "code": code }),
    }
}

fn emit_json(value: serde_json::Value) {
    println!("{value}");
}
