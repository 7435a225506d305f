use clap::Subcommand;
use huckle_core::Config;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the whole configuration (password redacted)
    Show,
    /// Get a config value
    Get {
        /// Dot-separated key (e.g. "connection.heartbeat_timeout_secs")
        key: String,
    },
    /// Print the config file location
    Path,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Show => {
            let config = Config::load()?;
            let text = toml::to_string_pretty(&config.redacted())?;
            print!("{text}");
        }
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            match config.get(&key) {
                Some(value) => println!("{value}"),
                None => return Err(format!("unknown key: {key}").into()),
            }
        }
        ConfigAction::Path => {
            println!("{}", Config::path()?.display());
        }
    }
    Ok(())
}
