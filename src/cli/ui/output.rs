use console::style;

use crate::pipeline::{BuildReport, CleanReport, PreflightResult, UnitOutcome};

/// Styled terminal output for command results.
///
/// Logging covers progress; this prints the summaries a user reads at the end.
/// Quiet mode keeps only errors.
pub struct Output {
    quiet: bool,
}

impl Output {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    pub fn success(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("✓").green(), message);
        }
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red(), message);
    }

    pub fn warning(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("⚠").yellow(), message);
        }
    }

    pub fn info(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("ℹ").blue(), message);
        }
    }

    pub fn section(&self, message: &str) {
        if !self.quiet {
            println!("\n{}", style(message).bold());
            println!("{}", "─".repeat(40));
        }
    }

    /// Captured tool output, indented and dimmed
    pub fn diagnostic(&self, text: &str) {
        for line in text.lines() {
            eprintln!("    {}", style(line).dim());
        }
    }

    fn unit(&self, outcome: &UnitOutcome) {
        if outcome.succeeded() {
            let mut detail = format!(
                "{} ({} diagram(s), {} reused, {:.1}s)",
                outcome.name,
                outcome.diagrams,
                outcome.reused,
                outcome.elapsed.as_secs_f64()
            );
            let warnings = outcome.warning_count();
            if warnings > 0 {
                detail.push_str(&format!(", {} warning(s)", warnings));
            }
            self.success(&detail);
            return;
        }

        let Some(err) = &outcome.error else {
            self.error(&format!("{} ({})", outcome.name, outcome.state));
            return;
        };
        let mut stage = outcome
            .failed_after
            .map(|s| format!(" after {}", s))
            .unwrap_or_default();
        if let Some(ordinal) = outcome.failed_diagram {
            stage.push_str(&format!(" (diagram {})", ordinal));
        }
        let headline = err.to_string();
        self.error(&format!(
            "{}{} [{}]: {}",
            outcome.name,
            stage,
            err.kind(),
            headline.lines().next().unwrap_or_default()
        ));
        if let Some(diagnostic) = err.diagnostic() {
            self.diagnostic(&diagnostic);
        }
    }

    pub fn build_report(&self, report: &BuildReport) {
        for name in &report.missing {
            self.warning(&format!("Unit not found: {}", name));
        }
        if report.is_empty() {
            self.warning("No units matched; nothing to build");
            return;
        }

        self.section("Build Summary");
        for outcome in &report.outcomes {
            self.unit(outcome);
            if !self.quiet {
                for warning in &outcome.include_warnings {
                    println!("    {}", style(warning).yellow());
                }
            }
        }

        let failed = report.failed().count();
        let line = format!(
            "{} built, {} failed in {:.1}s",
            report.succeeded().count(),
            failed,
            report.elapsed.as_secs_f64()
        );
        if failed == 0 {
            self.success(&line);
        } else {
            self.error(&line);
        }
    }

    pub fn clean_report(&self, report: &CleanReport) {
        for name in &report.missing {
            self.warning(&format!("Unit not found: {}", name));
        }
        for (name, janitor) in &report.units {
            let line = format!("{}: removed {} file(s)", name, janitor.removed.len());
            if janitor.is_clean() {
                self.success(&line);
                continue;
            }
            self.warning(&line);
            for (path, reason) in &janitor.failures {
                self.warning(&format!("  could not remove {}: {}", path.display(), reason));
            }
        }
        for page in &report.removed_pages {
            self.info(&format!("Removed {}", page.display()));
        }
        for (page, reason) in &report.failures {
            self.warning(&format!("Could not remove {}: {}", page.display(), reason));
        }
    }

    pub fn preflight(&self, result: &PreflightResult) {
        self.section("External Tools");
        for check in &result.checks {
            let line = format!(
                "{:<8} {} ({}, {}ms)",
                check.name, check.message, check.program, check.duration_ms
            );
            if check.passed {
                self.success(&line);
            } else {
                self.error(&line);
            }
        }
        for hint in &result.recommendations {
            self.info(hint);
        }
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new(false)
    }
}
