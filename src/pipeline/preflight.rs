//! Pre-flight Tool Checks
//!
//! Confirms every configured external tool can be launched before a build
//! spends time on units that would fail at their first invocation.

use std::time::Instant;
use tracing::{debug, info, warn};

use super::tool::{ToolInvocation, ToolRunner, run_checked};
use crate::config::ToolsConfig;

/// Pre-flight check results
#[derive(Debug, Clone, Default)]
pub struct PreflightResult {
    /// Individual check results
    pub checks: Vec<CheckResult>,
    /// Hints for failed checks
    pub recommendations: Vec<String>,
}

impl PreflightResult {
    /// All checks passed
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &CheckResult> {
        self.checks.iter().filter(|c| !c.passed)
    }
}

/// Individual check result
#[derive(Debug, Clone)]
pub struct CheckResult {
    /// Role of the tool (latex, dvisvgm, pandoc)
    pub name: String,
    /// Configured program
    pub program: String,
    pub passed: bool,
    /// First line of the version banner, or the failure reason
    pub message: String,
    pub duration_ms: u64,
}

pub struct PreflightCheck<'a> {
    runner: &'a dyn ToolRunner,
}

impl<'a> PreflightCheck<'a> {
    pub fn new(runner: &'a dyn ToolRunner) -> Self {
        Self { runner }
    }

    /// Run `<tool> --version` for each configured tool
    pub async fn check_tools(&self, tools: &ToolsConfig) -> PreflightResult {
        let mut result = PreflightResult::default();

        info!("Running pre-flight checks...");

        for (name, program) in [
            ("latex", &tools.latex),
            ("dvisvgm", &tools.dvisvgm),
            ("pandoc", &tools.pandoc),
        ] {
            let check = self.check_tool(name, program).await;
            if !check.passed {
                result.recommendations.push(format!(
                    "Install {} or set tools.{} (env: SLIDEPRESS_TOOLS__{})",
                    name,
                    name,
                    name.to_uppercase()
                ));
            }
            result.checks.push(check);
        }

        if result.passed() {
            info!("Pre-flight checks passed ({} checks)", result.checks.len());
        } else {
            warn!(
                "Pre-flight checks failed: {} of {} tools unavailable",
                result.failures().count(),
                result.checks.len()
            );
        }

        result
    }

    async fn check_tool(&self, name: &str, program: &str) -> CheckResult {
        let start = Instant::now();
        let invocation = ToolInvocation::new(format!("{} --version", name), program).arg("--version");

        let (passed, message) = match run_checked(self.runner, &invocation).await {
            Ok(output) => {
                let banner = output
                    .stdout
                    .lines()
                    .chain(output.stderr.lines())
                    .map(str::trim)
                    .find(|l| !l.is_empty())
                    .unwrap_or("(no version banner)")
                    .to_string();
                debug!("{}: {}", name, banner);
                (true, banner)
            }
            Err(e) => (false, e.to_string().lines().next().unwrap_or_default().to_string()),
        };

        CheckResult {
            name: name.to_string(),
            program: program.to_string(),
            passed,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }
}
