mod cli;
mod config;
mod error;
mod processing;

use clap::Parser;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::cli::{
    Args,
    BuildArgs,
    Commands,
    WriteTemplateArgs,
};
use crate::config::Config;
use crate::error::CliError;

fn main_build(args: BuildArgs) -> Result<(), CliError> {
    let config = Config::with_cli_args(&args)?;
    info!("Parsed configuration: {:#?}", config);
    processing::build_library(&config)
}

fn main_write_template(args: WriteTemplateArgs) -> Result<(), CliError> {
    let template = serde_json::to_string_pretty(&Config::template())?;
    std::fs::write(&args.output_path, template).map_err(|e| CliError::Io {
        source: e,
        path: args.output_path.to_string_lossy().to_string(),
    })?;
    info!("Wrote template config to {}", args.output_path.display());
    Ok(())
}

fn main() -> Result<(), CliError> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        ) // This uses RUST_LOG environment variable
        .init();

    let args = Args::parse();

    match args.command {
        Some(Commands::Build(args)) => main_build(args)?,
        Some(Commands::WriteTemplate(args)) => main_write_template(args)?,
        None => {
            println!("No command provided");
        }
    }
    Ok(())
}
