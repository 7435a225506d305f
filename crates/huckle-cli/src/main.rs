use clap::{Parser, Subcommand};

mod commands;
mod file_backend;
mod logging;
mod render;

#[derive(Parser)]
#[command(name = "huckle", version, about = "Time since the last feeding")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Live monitor fed by a JSON-lines feed file
    Watch(commands::watch::WatchArgs),
    /// Compute the countdown windows for a feeding time
    Windows(commands::windows::WindowsArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Watch(args) => commands::watch::run(args),
        Commands::Windows(args) => commands::windows::run(args),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
