//! Clean Command
//!
//! Removes diagram byproducts left behind by failed or interrupted builds.
//! With `--outputs`, final SVGs and generated pages go too.

use crate::cli::ui::Output;
use crate::cli::util::CommandContext;
use crate::types::Result;

pub async fn run(
    ctx: &CommandContext,
    targets: Option<Vec<String>>,
    outputs: bool,
    out: &Output,
) -> Result<()> {
    let report = ctx.orchestrator().clean(targets.as_deref(), outputs).await?;
    out.clean_report(&report);
    Ok(())
}
