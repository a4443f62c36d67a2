use crate::StackArgs;
use colored::Colorize;
use stackflow_core::{NamingConfig, ResourceKind};

pub fn handle(args: &StackArgs) {
    println!("{}", "Validating stack...".blue());

    let naming = NamingConfig::from_env();
    println!("Name prefix: {}", naming.prefix().cyan());

    let stack = match args.variant.build(&args.stack_name, &naming) {
        Ok(stack) => stack,
        Err(e) => {
            eprintln!();
            eprintln!("{}", "✗ Stack declaration failed".red().bold());
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = stack.validate() {
        eprintln!();
        eprintln!("{}", "✗ Stack graph is invalid".red().bold());
        eprintln!("  {}", e);
        std::process::exit(1);
    }

    let template = stackflow_core::synthesize(&stack);

    println!("{}", "✓ Stack is valid".green().bold());
    println!();
    println!("Summary ({}):", stack.name().cyan());
    println!("  Declared resources: {}", stack.len());
    for kind in ResourceKind::ALL {
        let count = stack.count(kind);
        if count > 0 {
            println!("    - {} x{}", kind.to_string().cyan(), count);
        }
    }
    println!("  Template resources: {}", template.len());
}
