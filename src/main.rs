//! phishnet - Main Entry Point

use clap::Parser;
use phishnet::cli::{cmd_predict, cmd_train, cmd_validate, Cli, Commands};
use phishnet::utils::logging::init_logging;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Held until exit so the file writer flushes
    let _guard = init_logging(Some(&cli.log_dir))?;

    match cli.command {
        Commands::Train { data, config } => {
            cmd_train(&data, config.as_deref())?;
        }
        Commands::Validate { train, test, config } => {
            cmd_validate(&train, &test, config.as_deref())?;
        }
        Commands::Predict { model, data, output } => {
            cmd_predict(&model, &data, output.as_deref())?;
        }
    }

    Ok(())
}
