use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use cgmes_assembling_lib::RunOptions;

/// Assemble CGMES profiles into cases and import them into the case server.
#[derive(Debug, Parser)]
#[command(name = "cgmes-assembling", version, about)]
struct Cli {
    /// Job configuration file (TOML)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Require every referenced boundary, never fall back to the latest set
    #[arg(long)]
    strict: bool,

    /// Run a single pass and exit, ignoring any configured schedule
    #[arg(long)]
    once: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let options = RunOptions {
        config_path: cli.config,
        strict: cli.strict,
        once: cli.once,
    };

    match cgmes_assembling_lib::run(options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Job execution error");
            ExitCode::FAILURE
        }
    }
}
