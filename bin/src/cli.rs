use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "caw")]
#[command(about = "Code Awareness line mark tools", long_about = None)]
pub struct Cli {
    #[arg(long, global = true, help = "Config file to use instead of the discovered one")]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        env = "CAW_LOG_FILE",
        help = "Log file, or directory for the default log file name"
    )]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Parser)]
pub enum Command {
    #[command(about = "Replay a recorded event stream and print the resulting marks")]
    Replay {
        #[arg(help = "JSON lines file with one event per line")]
        events: PathBuf,
    },
}
