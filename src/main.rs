// src/main.rs

use anyhow::{Context, Result};
use cgowrap::{CompilerExecutor, Config, Wrapper};
use clap::Parser;
use std::ffi::OsString;
use tracing::debug;

/// Stands in for the C compiler: `CC=cgowrap go build`
#[derive(Parser)]
#[command(name = "cgowrap")]
#[command(
    about = "Caching C compiler wrapper for cgo",
    long_about = None,
    disable_help_flag = true,
    disable_version_flag = true
)]
struct Cli {
    /// Compiler arguments, passed through unchanged even when not UTF-8
    #[arg(
        trailing_var_arg = true,
        allow_hyphen_values = true,
        num_args = 0..,
        value_parser = clap::value_parser!(OsString)
    )]
    args: Vec<OsString>,
}

fn init_tracing(config: &Config) {
    // Compiler stderr is part of the output; stay silent unless asked
    let Some(filter) = config.effective_log_filter() else {
        return;
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(&filter)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;
    init_tracing(&config);

    let cwd = std::env::current_dir().context("Failed to read the working directory")?;
    debug!("Using compiler {} in {}", config.cc, cwd.display());

    let executor = CompilerExecutor::new(config.cc.clone());
    let wrapper = Wrapper::new(config, cli.args, cwd.display().to_string(), executor);
    let outcome = wrapper.run()?;

    outcome.output.print().context("Failed to write compiler output")?;
    std::process::exit(outcome.output.status);
}
