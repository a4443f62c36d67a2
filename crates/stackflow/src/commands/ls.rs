use crate::StackArgs;
use colored::Colorize;

pub fn handle(args: &StackArgs) -> anyhow::Result<()> {
    let stack = super::build_stack(args)?;

    if stack.is_empty() {
        println!("{}", format!("{} has no resources", stack.name()).yellow());
        return Ok(());
    }

    let width = stack
        .iter()
        .map(|(id, _)| id.as_str().len())
        .max()
        .unwrap_or(0);
    for (id, resource) in stack.iter() {
        let padded = format!("{:<width$}", id.as_str(), width = width);
        println!("{}  {}", padded.cyan(), resource.kind());
    }
    Ok(())
}
