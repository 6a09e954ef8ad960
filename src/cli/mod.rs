pub mod commands;
pub mod targets;
pub mod ui;
pub mod util;

pub use targets::parse_targets;
pub use ui::Output;
pub use util::{CommandContext, Overrides};
