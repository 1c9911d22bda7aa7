//! Routing inspection: `retroquest destination` and `retroquest topics`.

use anyhow::{Result, anyhow};

use retroquest_sync::bus::OutgoingAction;
use retroquest_sync::destination::Destinations;
use retroquest_sync::items::ItemKind;
use retroquest_sync::retro_config::RetroConfig;

pub fn cmd_destination(config: &RetroConfig, kind: &str, action: &str, id: i64) -> Result<()> {
    let team = config.require_team()?;
    let kind: ItemKind = kind.parse().map_err(|e: String| anyhow!(e))?;
    let action: OutgoingAction = action.parse().map_err(|e: String| anyhow!(e))?;

    let destination = Destinations::new(&team).outgoing_for(kind, id, action);
    if destination.is_empty() {
        anyhow::bail!("No destination: {} does not support {}", kind, action);
    }
    println!("{}", destination);
    Ok(())
}

pub fn cmd_topics(config: &RetroConfig) -> Result<()> {
    let team = config.require_team()?;
    for topic in Destinations::new(&team).subscriptions() {
        println!("{}", topic);
    }
    Ok(())
}
