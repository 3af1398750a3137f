//! `churn` command-line entry point.

use std::process::ExitCode;

use clap::Parser;

use churn::cli::{execute, Cli};
use churn::util::init_tracing;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_format);
    execute(cli).await
}
