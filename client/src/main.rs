mod cli;
mod config;
mod diagnostics;
mod engine;
mod signals;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tdl_core::{EngineError, Logger, OrchestratorError, Settings, logf, orchestrator};

use crate::cli::Args;
use crate::engine::RqbitEngine;

#[tokio::main]
async fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            // --help and --version are not failures.
            let code = if err.use_stderr() { 1 } else { 0 };
            let _ = err.print();
            return ExitCode::from(code);
        }
    };

    let settings = match config::resolve(&args) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let logger = match Logger::open(&settings.log_file) {
        Ok(logger) => logger,
        Err(err) => {
            eprintln!("Failed to initialize logger: {err}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = diagnostics::init(&logger) {
        logf!(logger, "Warning: {err:#}");
    }

    ExitCode::from(run(&args, &settings, &logger).await)
}

async fn run(args: &Args, settings: &Settings, logger: &Logger) -> u8 {
    let prepared = signals::listen_for_interrupt()
        .map_err(OrchestratorError::Signals)
        .and_then(|interrupt| {
            let source = config::classify_source(&args.source)
                .map_err(|err| OrchestratorError::TransferAdd(err.into()))?;
            Ok((source, interrupt))
        });

    let connect = |download_dir: PathBuf| async move {
        RqbitEngine::new(&download_dir)
            .await
            .map_err(|err| EngineError::from(format!("{err:#}")))
    };

    match orchestrator::launch(logger, settings, prepared, connect).await {
        Ok(outcome) => outcome.exit_code(),
        Err(err) => {
            logf!(logger, "{err}");
            1
        }
    }
}
