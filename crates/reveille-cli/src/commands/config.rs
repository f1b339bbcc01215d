use std::error::Error;

use clap::Subcommand;

use reveille_core::storage::{data_dir, Config};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Print the configuration file path
    Path,
    /// Write the default configuration to disk
    Init,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn Error>> {
    match action {
        ConfigAction::Show => {
            let config = Config::load()?;
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        ConfigAction::Path => {
            println!("{}", data_dir()?.join("config.toml").display());
            Ok(())
        }
        ConfigAction::Init => {
            let config = Config::default();
            config.save()?;
            println!("wrote {}", data_dir()?.join("config.toml").display());
            Ok(())
        }
    }
}
