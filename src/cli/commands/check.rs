//! Check Command
//!
//! Verifies that latex, dvisvgm and pandoc can be launched.

use crate::cli::ui::Output;
use crate::cli::util::CommandContext;
use crate::pipeline::PreflightCheck;

/// Returns whether every tool is available
pub async fn run(ctx: &CommandContext, out: &Output) -> bool {
    let result = PreflightCheck::new(ctx.runner.as_ref())
        .check_tools(&ctx.config.tools)
        .await;
    out.preflight(&result);
    result.passed()
}
