mod config;

use std::process::ExitCode;

use anyhow::Context;
use catalog_core::Catalog;
use log::LevelFilter;
use stream_engine::{write_catalog, EngineContext, FailureKind, RunOutcome, StreamEngine};
use stream_logging::{stream_error, stream_info, stream_warn, LogDestination};

use crate::config::{AppConfig, SourceKind};

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            stream_error!("{:#}", err);
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<ExitCode> {
    let config = AppConfig::from_env().context("invalid configuration")?;

    let destination = match &config.log_file {
        Some(path) => LogDestination::Both(path.clone()),
        None => LogDestination::Terminal,
    };
    if !stream_logging::initialize(destination, LevelFilter::Info) {
        eprintln!("Warning: logger could not be initialized, continuing without log output");
    }

    stream_info!("Starting stream catalog run");
    stream_info!("Source ({:?}): {}", config.kind, config.source_url);
    stream_info!("Output file: {}", config.output_file.display());
    stream_info!("Max workers: {}", config.workers);

    let ctx = EngineContext::new(config.engine_config()).context("failed to build HTTP client")?;
    let engine = StreamEngine::new(ctx);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let outcome = runtime.block_on(async {
        match config.kind {
            SourceKind::Playlist => engine.run_playlist(&config.source_url).await,
            SourceKind::Page => engine.run_page(&config.source_url).await,
        }
    });

    finish(&config, outcome)
}

fn finish(config: &AppConfig, outcome: RunOutcome) -> anyhow::Result<ExitCode> {
    let RunOutcome { catalog, failure } = outcome;

    if config.kind == SourceKind::Playlist && catalog.is_empty() {
        stream_error!("No channels were processed");
        return Ok(ExitCode::FAILURE);
    }

    write_catalog(&config.output_file, &catalog, config.kind.form())
        .with_context(|| format!("failed to write {}", config.output_file.display()))?;
    print_summary(&catalog);

    match failure {
        Some(err) if err.kind != FailureKind::ExtractionEmpty => {
            stream_error!("Source could not be read: {}", err);
            Ok(ExitCode::FAILURE)
        }
        Some(_) => {
            stream_warn!("No entries found on {}", config.source_url);
            Ok(ExitCode::SUCCESS)
        }
        None => {
            stream_info!("Run completed successfully");
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn print_summary(catalog: &Catalog) {
    println!("\nSUMMARY:");
    println!("Total entries: {}", catalog.total());
    println!("Working streams: {}", catalog.working());
    println!("Success rate: {:.1}%", catalog.success_rate());
}
