use caw_bin::{
    cli::{Cli, Command},
    commands,
};
use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let _log_guard = match caw_log::init(caw_log::LogConfig::from_env(cli.log_file.clone())) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: Failed to initialize logging: {e}");
            None
        },
    };

    let result = match cli.command {
        Command::Replay { events } => commands::replay::handle(&events, cli.config.as_deref()).await,
    };

    if let Err(e) = result {
        eprintln!("Command failed: {e:#}");
        std::process::exit(1);
    }
}
