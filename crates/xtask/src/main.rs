//! Project automation tasks for the news workspace

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use std::process::Command;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Project automation tasks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all tests
    Test {
        /// Only test this package
        #[arg(short, long)]
        package: Option<String>,
    },
    /// Run clippy lints, failing on warnings
    Lint,
    /// Check formatting
    Fmt {
        /// Rewrite files instead of checking
        #[arg(long)]
        fix: bool,
    },
    /// Format check, lints and tests in sequence
    Ci,
}

fn cargo(args: &[&str]) -> anyhow::Result<()> {
    println!("$ cargo {}", args.join(" "));
    let status = Command::new(std::env::var("CARGO").unwrap_or_else(|_| "cargo".to_string()))
        .args(args)
        .status()
        .context("Failed to launch cargo")?;
    if !status.success() {
        bail!("cargo {} failed with {status}", args[0]);
    }
    Ok(())
}

fn test(package: Option<&str>) -> anyhow::Result<()> {
    match package {
        Some(name) => cargo(&["test", "-p", name]),
        None => cargo(&["test", "--workspace"]),
    }
}

fn lint() -> anyhow::Result<()> {
    cargo(&["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"])
}

fn fmt(fix: bool) -> anyhow::Result<()> {
    if fix {
        cargo(&["fmt", "--all"])
    } else {
        cargo(&["fmt", "--all", "--", "--check"])
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Test { package } => test(package.as_deref()),
        Commands::Lint => lint(),
        Commands::Fmt { fix } => fmt(fix),
        Commands::Ci => {
            fmt(false)?;
            lint()?;
            test(None)
        }
    }
}
