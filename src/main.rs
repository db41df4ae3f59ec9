//! Fuel station simulation CLI
//!
//! ```bash
//! # run with ./config.json
//! fuelsim
//!
//! # shorter run, JSON snapshot instead of the text report
//! fuelsim --config my_station.json --length 10 --json
//! ```

use clap::Parser;
use fuelsim::{report, Simulation, SimulationConfig};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "fuelsim")]
#[command(version, about = "Simulate cars competing for fuel stations and cash registers", long_about = None)]
struct Args {
    /// Path to the JSON configuration
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Override the simulation length in seconds
    #[arg(short, long)]
    length: Option<f64>,

    /// Print the final statistics as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match SimulationConfig::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            log::error!("Cannot load {}: {}", args.config.display(), e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(length) = args.length {
        config = config.with_simulation_length(length);
    }

    let simulation = match Simulation::new(config) {
        Ok(simulation) => simulation,
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let snapshot = simulation.run().await;

    if args.json {
        match serde_json::to_string_pretty(&snapshot) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                log::error!("Cannot serialize statistics: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        print!("{}", report::render(&snapshot));
    }
    ExitCode::SUCCESS
}
