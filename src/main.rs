//! OverwatchLooker binary.
//!
//! No argument: listen for the trigger gesture until Ctrl+C.
//! One image path: analyse that file once and exit.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use overwatch_looker::config::Config;
use overwatch_looker::delivery::print_error;

#[derive(Debug, Parser)]
#[command(name = "overwatch-looker", version, about = "Overwatch 2 scoreboard analyzer")]
struct Cli {
    /// Image file to analyse instead of listening for the trigger gesture
    image: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            print_error(&e.to_string());
            return ExitCode::from(2);
        }
    };
    log::info!("[CONFIG] {:?}", config);

    match cli.image {
        Some(path) => ExitCode::from(overwatch_looker::run_file_input(&config, path).await),
        None => match overwatch_looker::run_hotkey_mode(&config).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                print_error(&e.to_string());
                ExitCode::FAILURE
            }
        },
    }
}
