//! Configuration view and validation commands (`retroquest config`).

use anyhow::Result;

use retroquest_sync::retro_config::{ENV_BASE_URL, ENV_TEAM, ENV_TOKEN, RetroConfig, RetroToml};

use super::super::ConfigCommands;

fn mask(token: &str) -> String {
    let visible: String = token.chars().take(4).collect();
    format!("{}…", visible)
}

pub fn cmd_config(config: &RetroConfig, command: Option<ConfigCommands>) -> Result<()> {
    let config_path = &config.path;

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("RetroQuest Configuration");
            println!("========================");
            println!();

            if config_path.exists() {
                println!("Config file: {}", config_path.display());
            } else {
                println!("No retroquest.toml found at {}", config_path.display());
                println!("Using defaults. Run 'retroquest config init' to create one.");
            }
            println!();

            let toml = &config.toml;
            println!("[server]");
            println!("  base_url = \"{}\"", toml.server.base_url);
            println!();
            println!("[session]");
            if let Some(team) = &toml.session.team {
                println!("  team = \"{}\"", team);
            }
            if let Some(token) = &toml.session.token {
                println!("  token = \"{}\"", mask(token));
            }
            println!();
            println!("[logging]");
            println!("  format = \"{}\"", toml.logging.format);
            println!("  level = \"{}\"", toml.logging.level);
            println!();

            println!("Effective values (with env/CLI overrides):");
            let urls = config.urls();
            println!("  base_url = \"{}\"", urls);
            println!("  websocket = \"{}\"", urls.websocket());
            match config.team() {
                Some(team) => println!("  team = \"{}\"", team),
                None => println!("  team = (unset, use --team or {})", ENV_TEAM),
            }
            match config.token() {
                Some(token) => println!("  token = \"{}\"", mask(&token)),
                None => println!("  token = (unset, use --token or {})", ENV_TOKEN),
            }
            println!("  ({} overrides server.base_url)", ENV_BASE_URL);
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if !config_path.exists() {
                println!("No retroquest.toml found. Using defaults (valid).");
                return Ok(());
            }

            let toml = RetroToml::load(config_path)?;
            let warnings = toml.validate();

            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init { force }) => {
            if config_path.exists() && !force {
                println!("retroquest.toml already exists at {}", config_path.display());
                println!("Pass --force to overwrite it.");
                return Ok(());
            }

            let mut toml = RetroToml::default();
            toml.server.base_url = config.base_url();
            toml.session.team = config.team();
            toml.save(config_path)?;

            println!("Created retroquest.toml at {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [server] base_url");
            println!("  - [session] team, token");
            println!("  - [logging] format, level");
            println!();
        }
    }

    Ok(())
}
