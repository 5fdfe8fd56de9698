mod app;
mod cli;
mod config;
mod effects;
mod render;

use std::path::Path;

use anyhow::Result;
use clap::Parser;
use docflow_core::{sample_catalog, ExtractionParams, Operation};
use engine_logging::{engine_info, LogDestination};
use log::LevelFilter;

use app::{InputSource, RunRequest};
use cli::{Cli, Command, InputArgs};

const LOG_FILENAME: &str = "docflow.log";

fn main() -> Result<()> {
    let cli = Cli::parse();
    let loaded = config::load_file_config(cli.global.config.as_deref())?;
    let config_path = loaded.path.clone();
    let mut app_config = config::resolve(loaded.file, |key| std::env::var(key).ok(), &cli.global);

    let level = if cli.global.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    if let Some(destination) = log_destination(app_config.log_to_file, cli.global.quiet) {
        engine_logging::initialize(destination, level, Path::new(LOG_FILENAME));
    }
    if let Some(path) = &config_path {
        engine_info!("Loaded config from {:?}", path);
    }

    let (operation, input, params) = match cli.command {
        Command::Samples => {
            for line in render::sample_lines(sample_catalog()) {
                println!("{line}");
            }
            return Ok(());
        }
        Command::Extract {
            input,
            threshold,
            no_corrector,
        } => (
            Operation::Extraction,
            input,
            Some(ExtractionParams {
                threshold,
                use_corrector: !no_corrector,
            }),
        ),
        Command::Convert { input } => (Operation::Conversion, input, None),
        Command::Textlayer { input } => (Operation::TextLayer, input, None),
    };

    if let Some(out) = &input.out {
        app_config.output_dir = out.clone();
    }
    engine_info!(
        "Using backend {} for {}",
        app_config.engine.api.base_url,
        operation
    );

    let summary = app::run(
        app_config,
        RunRequest {
            operation,
            source: input_source(input),
            params,
        },
    )?;

    for line in render::result_lines(&summary.view) {
        println!("{line}");
    }
    for path in &summary.saved {
        println!("Saved {}", path.display());
    }
    engine_info!("Finished at {}", summary.finished_at.to_rfc3339());
    Ok(())
}

fn log_destination(log_to_file: bool, quiet: bool) -> Option<LogDestination> {
    match (log_to_file, quiet) {
        (true, true) => Some(LogDestination::File),
        (true, false) => Some(LogDestination::Both),
        (false, false) => Some(LogDestination::Terminal),
        (false, true) => None,
    }
}

fn input_source(input: InputArgs) -> Option<InputSource> {
    match (input.file, input.sample) {
        (Some(file), _) => Some(InputSource::File(file)),
        (None, Some(sample)) => Some(InputSource::Sample(sample)),
        (None, None) => None,
    }
}
