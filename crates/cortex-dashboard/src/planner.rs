//! Install phase A: the planner contract (§4.6, §6). `Planner` is a
//! capability trait so the Operation Engine can be driven by a fake in
//! tests; `InterpreterPlanner` is the real subprocess-based implementation.

use std::sync::OnceLock;

use anyhow::{bail, Context, Result};
use regex::Regex;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub commands: Vec<String>,
}

#[derive(Deserialize)]
struct PlanResponse {
    success: bool,
    #[serde(default)]
    commands: Vec<String>,
    #[serde(default)]
    error: Option<String>,
}

#[async_trait::async_trait]
pub trait Planner: Send + Sync {
    async fn plan(&self, package: &str) -> Result<Plan>;
}

/// Invokes the external LLM-backed interpreter with
/// `(package, dry_run=true, execute=false, json_output=true)` and parses its
/// single JSON object from stdout.
pub struct InterpreterPlanner {
    pub interpreter_path: String,
}

impl InterpreterPlanner {
    pub fn new(interpreter_path: impl Into<String>) -> Self {
        Self {
            interpreter_path: interpreter_path.into(),
        }
    }
}

#[async_trait::async_trait]
impl Planner for InterpreterPlanner {
    async fn plan(&self, package: &str) -> Result<Plan> {
        let output = tokio::process::Command::new(&self.interpreter_path)
            .arg(package)
            .arg("--dry-run")
            .arg("--json-output")
            .env("CORTEX_SILENT_OUTPUT", "1")
            .output()
            .await
            .context("failed to spawn interpreter")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(cortex_core::text::clean_message(&stderr));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let parsed: PlanResponse =
            serde_json::from_str(stdout.trim()).context("interpreter returned malformed JSON")?;

        if !parsed.success {
            let message = parsed.error.unwrap_or_else(|| "planner reported failure".to_string());
            bail!(cortex_core::text::clean_message(&message));
        }

        Ok(Plan {
            commands: parsed.commands,
        })
    }
}

static PACKAGE_NAME_PATTERN: OnceLock<Regex> = OnceLock::new();

/// `^[A-Za-z0-9._-]+$` — the identifier format a package name must match
/// before the planner is ever invoked (§4.6 step A.1).
pub fn is_valid_package_name(name: &str) -> bool {
    let pattern = PACKAGE_NAME_PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9._-]+$").unwrap());
    pattern.is_match(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_typical_package_names() {
        assert!(is_valid_package_name("nginx"));
        assert!(is_valid_package_name("python3.11"));
        assert!(is_valid_package_name("lib_foo-bar.2"));
    }

    #[test]
    fn rejects_spaces_and_shell_metacharacters() {
        assert!(!is_valid_package_name("bad name!"));
        assert!(!is_valid_package_name("pkg;rm -rf /"));
        assert!(!is_valid_package_name(""));
    }

    #[test]
    fn parses_successful_plan_response() {
        let json = r#"{"success":true,"commands":["sudo apt-get update","sudo apt-get install -y nginx"]}"#;
        let parsed: PlanResponse = serde_json::from_str(json).unwrap();
        assert!(parsed.success);
        assert_eq!(parsed.commands.len(), 2);
    }
}
