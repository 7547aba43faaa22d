use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process::Command;

#[derive(Parser)]
#[command(name = "xtask", about = "Workspace automation for skilltree")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run fmt, clippy, tests, then a smoke verify of the CLI
    Check,
    /// Run cargo fmt --check on all crates
    Fmt,
    /// Run clippy on all crates
    Clippy,
    /// Run all tests
    Test,
    /// Run the reveal benchmark in release mode
    Bench,
    /// Walk and verify a few worlds through skilltree-cli
    Smoke {
        /// Reveals per world
        #[arg(long, default_value = "200")]
        steps: usize,
    },
}

/// World seeds exercised by the smoke run.
const SMOKE_SEEDS: [u64; 4] = [0, 1, 1337, (1 << 31) - 1];

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check => {
            run_fmt()?;
            run_clippy()?;
            run_tests()?;
            run_smoke(100)?;
        }
        Commands::Fmt => run_fmt()?,
        Commands::Clippy => run_clippy()?,
        Commands::Test => run_tests()?,
        Commands::Bench => cargo(
            &["bench", "-p", "skilltree-kernel", "--bench", "bench_reveal"],
            "cargo bench",
        )?,
        Commands::Smoke { steps } => run_smoke(steps)?,
    }

    Ok(())
}

/// Run cargo with `args`, failing with `label` on a non-zero exit.
fn cargo(args: &[&str], label: &str) -> Result<()> {
    println!("==> Running {label}");
    let status = Command::new("cargo").args(args).status()?;
    if !status.success() {
        anyhow::bail!("{label} failed");
    }
    Ok(())
}

fn run_fmt() -> Result<()> {
    cargo(&["fmt", "--all", "--", "--check"], "cargo fmt check")
}

fn run_clippy() -> Result<()> {
    cargo(
        &[
            "clippy",
            "--workspace",
            "--all-targets",
            "--",
            "-D",
            "warnings",
        ],
        "cargo clippy",
    )
}

fn run_tests() -> Result<()> {
    cargo(&["test", "--workspace"], "cargo test")
}

fn run_smoke(steps: usize) -> Result<()> {
    let steps = steps.to_string();
    for seed in SMOKE_SEEDS {
        let seed = seed.to_string();
        cargo(
            &[
                "run",
                "-q",
                "-p",
                "skilltree-cli",
                "--",
                "--seed",
                &seed,
                "verify",
                "--steps",
                &steps,
            ],
            &format!("smoke verify (seed {seed})"),
        )?;
    }
    Ok(())
}
