mod cli;

use crate::cli::{Command, CLI};
use clap::Parser;
use flakegen::IdGenerator;
use std::io::{self, Write};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let config = CLI::parse();

    let stdout = io::stdout();
    run(config, &mut stdout.lock())
}

fn run(config: CLI, out: &mut impl Write) -> Result<(), Box<dyn std::error::Error>> {
    match config.command {
        Command::Generate { count } => {
            let settings = config.generator.settings();
            info!(
                count,
                worker_id = settings.worker_id,
                datacenter_id = settings.datacenter_id,
                epoch = %settings.epoch,
                "generating ids"
            );
            let mut generator = IdGenerator::new(settings)?;
            for _ in 0..count {
                writeln!(out, "{}", generator.next_id()?)?;
            }
        }
        Command::Decode { ids } => {
            let decoder = config.generator.decoder()?;
            for id in &ids {
                let decoded = decoder.decode_str(id)?;
                writeln!(out, "{}", serde_json::to_string(&decoded)?)?;
            }
        }
    }

    Ok(())
}
