pub mod deploy;
pub mod ls;
pub mod prefix;
pub mod synth;
pub mod validate;

use crate::StackArgs;
use anyhow::Context;
use stackflow_core::{NamingConfig, Stack};

/// Build the selected stack with naming taken from the environment
pub fn build_stack(args: &StackArgs) -> anyhow::Result<Stack> {
    let naming = NamingConfig::from_env();
    tracing::debug!(prefix = %naming.prefix(), variant = %args.variant, "Building stack");
    args.variant
        .build(&args.stack_name, &naming)
        .with_context(|| format!("failed to declare stack '{}'", args.stack_name))
}
