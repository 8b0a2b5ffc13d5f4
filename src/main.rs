//! soqlx - SOQL/SOSL autocompletion and record export
//!
//! Entry point; the logic lives in the library modules.

use anyhow::{Context, Result};
use clap::Parser;
use futures::future::AbortHandle;
use soqlx::cli::{self, Args, Command, CommandOutput};
use soqlx::config::{Settings, load_settings, load_settings_from};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("soqlx=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let settings = read_settings(&args)?;

    let output = match &args.command {
        Command::Complete(complete) => cli::run_complete(complete, settings).await?,
        Command::Export(export) => {
            let (handle, registration) = AbortHandle::new_pair();
            let watcher = tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("interrupt received, stopping export");
                    handle.abort();
                }
            });
            let output = cli::run_export_command(export, settings, Some(registration)).await;
            watcher.abort();
            output?
        }
    };

    print_output(&output);
    if output.failed {
        std::process::exit(1);
    }
    Ok(())
}

fn read_settings(args: &Args) -> Result<Settings> {
    match &args.config {
        Some(path) => load_settings_from(path)
            .with_context(|| format!("failed to load settings from {}", path.display())),
        None => load_settings().context("failed to load settings"),
    }
}

fn print_output(output: &CommandOutput) {
    print!("{}", output.stdout);
    for line in &output.status {
        eprintln!("{line}");
    }
}
