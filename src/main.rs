use avbridge::cli::{Action, Cli};
use avbridge::commands;

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let plugin = cli.engine.to_config().map(|c| c.name).unwrap_or_default();
    let path = match cli.action() {
        Ok(Action::Scan(path)) => path.display().to_string(),
        _ => String::new(),
    };

    match commands::run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(
                plugin = %plugin,
                category = %e.category(),
                component = e.component(),
                path = %path,
                error = %e,
                "Fatal error"
            );
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
