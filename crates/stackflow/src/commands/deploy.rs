use crate::StackArgs;
use anyhow::Context;
use colored::Colorize;
use stackflow_engine::{AssemblyDirectory, CloudAssembly, ProvisioningEngine};
use std::path::PathBuf;

pub async fn handle(args: &StackArgs, out: Option<PathBuf>) -> anyhow::Result<()> {
    let stack = super::build_stack(args)?;

    let engine = match out {
        Some(dir) => AssemblyDirectory::new(dir),
        None => {
            let cwd = std::env::current_dir().context("failed to read current directory")?;
            AssemblyDirectory::from_env(cwd)
        }
    };

    let status = engine.check_ready().await?;
    if !status.ready {
        anyhow::bail!(
            "{} is not ready: {}",
            engine.display_name(),
            status.error.unwrap_or_default()
        );
    }

    let assembly = CloudAssembly::new()
        .with_stack(&stack)
        .context("failed to assemble stack")?;

    println!(
        "{} {} → {}",
        "Deploying".blue(),
        stack.name().cyan(),
        engine.display_name()
    );

    let submission = engine
        .submit(&assembly)
        .await
        .with_context(|| format!("{} rejected the assembly", engine.name()))?;

    for submitted in &submission.stacks {
        println!(
            "  {} {} ({} resources)",
            "✓".green(),
            submitted.location,
            submitted.resources
        );
    }
    println!(
        "{}",
        format!(
            "Handed {} resources to {} in {}ms",
            submission.total_resources(),
            submission.engine,
            submission.duration_ms
        )
        .green()
        .bold()
    );
    Ok(())
}
