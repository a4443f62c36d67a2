use crate::StackArgs;
use anyhow::Context;

pub fn handle(args: &StackArgs, compact: bool) -> anyhow::Result<()> {
    let stack = super::build_stack(args)?;
    let template = stackflow_core::synthesize(&stack);

    let json = if compact {
        template.to_json()
    } else {
        template.to_json_pretty()
    }
    .context("failed to serialize template")?;

    println!("{}", json);
    Ok(())
}
