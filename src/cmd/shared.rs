/*!
shared.rs - output helpers shared by subcommands.

  - print_json: pretty JSON on stdout (falls back to compact form)
  - output_error: boxed red error (human) or {"status":"error"} (JSON), then bail
  - describe_finish: "exit code N" / "terminated" text for a finished run
*/

use anyhow::Result;

use crate::cmd::format::{Role, StyleOptions, box_header, color, emoji};

pub fn print_json(value: &serde_json::Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
    );
}

/// Report an error the way the active output mode expects, then return it so
/// `main` exits non-zero.
pub fn output_error<T>(json: bool, context: &str, msg: &str) -> Result<T> {
    if json {
        print_json(&serde_json::json!({ "status": "error", "error": msg }));
    } else {
        let style = StyleOptions::detect();
        let title = format!("{} {context}", emoji("error", &style));
        let boxed = box_header(title, Some(color(Role::Error, msg, &style)), &style);
        eprintln!("{boxed}");
    }
    anyhow::bail!(msg.to_string())
}

pub fn describe_finish(code: Option<i32>) -> String {
    match code {
        Some(c) => format!("exit code {c}"),
        None => "terminated".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finish_descriptions() {
        assert_eq!(describe_finish(Some(0)), "exit code 0");
        assert_eq!(describe_finish(Some(2)), "exit code 2");
        assert_eq!(describe_finish(None), "terminated");
    }

    #[test]
    fn output_error_always_fails() {
        let err = output_error::<()>(true, "Build Error", "missing required field: main file")
            .unwrap_err();
        assert_eq!(err.to_string(), "missing required field: main file");
    }
}
