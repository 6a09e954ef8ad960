//! Build Command
//!
//! Builds every unit under the root, or only the requested ones.
//!
//! Usage:
//!   slidepress [UNIT]... [--only LIST]
//!   slidepress build [UNIT]... [--only LIST]

use tracing::warn;

use crate::cli::ui::Output;
use crate::cli::util::CommandContext;
use crate::pipeline::PreflightCheck;
use crate::types::Result;

/// Run a build. Failed units are reported, not returned as errors; only a
/// missing root (or invalid configuration) fails the command.
pub async fn run(ctx: &CommandContext, targets: Option<Vec<String>>, out: &Output) -> Result<()> {
    let preflight = PreflightCheck::new(ctx.runner.as_ref())
        .check_tools(&ctx.config.tools)
        .await;
    if !preflight.passed() {
        for check in preflight.failures() {
            warn!("{} unavailable: {}", check.program, check.message);
        }
        out.warning("Some external tools are unavailable; affected units will fail");
    }

    let report = ctx.orchestrator().run(targets.as_deref()).await?;
    out.build_report(&report);
    Ok(())
}
