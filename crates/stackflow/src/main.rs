mod commands;

use clap::{Parser, Subcommand};
use stackflow_core::StackVariant;
use std::path::PathBuf;

pub const DEFAULT_STACK_NAME: &str = "CdkSampleTsStack";

#[derive(Parser)]
#[command(name = "stackflow")]
#[command(about = "Declare a VPC, compute and load balancer stack, then hand it off", long_about = None)]
struct Cli {
    #[command(flatten)]
    target: StackArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Which stack to build
#[derive(clap::Args, Debug, Clone)]
pub struct StackArgs {
    /// Stack variant (full, empty)
    #[arg(
        short = 'v',
        long,
        env = "STACKFLOW_VARIANT",
        default_value_t = StackVariant::Full,
        global = true
    )]
    pub variant: StackVariant,

    /// Stack name
    #[arg(short = 's', long = "stack", env = "STACKFLOW_STACK", default_value = DEFAULT_STACK_NAME, global = true)]
    pub stack_name: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the synthesized template
    Synth {
        /// Single-line JSON instead of pretty output
        #[arg(long)]
        compact: bool,
    },
    /// Build the stack and check every invariant
    Validate,
    /// List declared resources
    Ls,
    /// Print the name prefix derived from the environment
    Prefix,
    /// Write the cloud assembly for the provisioning engine
    Deploy {
        /// Output directory (default: stack.out)
        #[arg(short, long, env = "STACKFLOW_OUT_DIR")]
        out: Option<PathBuf>,
    },
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdout carries templates, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Version => {
            println!("stackflow {}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Prefix => commands::prefix::handle(),
        Commands::Synth { compact } => commands::synth::handle(&cli.target, compact)?,
        Commands::Validate => commands::validate::handle(&cli.target),
        Commands::Ls => commands::ls::handle(&cli.target)?,
        Commands::Deploy { out } => commands::deploy::handle(&cli.target, out).await?,
    }

    Ok(())
}
