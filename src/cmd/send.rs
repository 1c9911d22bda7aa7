//! One-shot mutations (`retroquest send`).

use anyhow::{Result, anyhow};
use chrono::Local;
use tracing::info;

use retroquest_sync::bus::{BusItem, Buses, OutgoingAction};
use retroquest_sync::destination::Destinations;
use retroquest_sync::items::{ActionItem, Column, Item, ItemKind, Thought, Topic};
use retroquest_sync::retro_config::RetroConfig;

use super::super::SendCommands;
use super::{close_session, open_session};

fn parse_topic(topic: &str) -> Result<Topic> {
    topic.parse().map_err(|e: String| anyhow!(e))
}

fn publish<T: BusItem>(buses: &Buses, team: &str, item: &T, action: OutgoingAction) -> Result<()> {
    let destination = Destinations::new(team).outgoing(item, action);
    if destination.is_empty() {
        anyhow::bail!("{} does not support {}", T::KIND, action);
    }
    info!(destination = %destination, "Publishing {} {}", T::KIND, action);
    buses.bus::<T>().publish_outgoing(Some(item), action);
    println!("{}", destination);
    Ok(())
}

pub async fn cmd_send(config: &RetroConfig, command: SendCommands) -> Result<()> {
    let team = config.require_team()?;
    let buses = Buses::new();
    let session = open_session(config, buses.clone()).await?;

    let result = match command {
        SendCommands::Thought { message, topic } => {
            let thought = Thought::unsaved(message, parse_topic(&topic)?, team.as_str());
            publish(&buses, &team, &thought, OutgoingAction::Create)
        }
        SendCommands::ActionItem { entry } => {
            let item = ActionItem::from_entry(&entry, team.as_str(), Local::now().naive_local());
            publish(&buses, &team, &item, OutgoingAction::Create)
        }
        SendCommands::ColumnTitle { id, topic, title } => {
            let column = Column::new(id, parse_topic(&topic)?, title, team.as_str());
            publish(&buses, &team, &column, OutgoingAction::Edit)
        }
        SendCommands::Delete { kind, id } => match kind.parse::<ItemKind>().map_err(|e| anyhow!(e))? {
            ItemKind::Thought => publish(&buses, &team, &Thought::tombstone(id, &team), OutgoingAction::Delete),
            ItemKind::ActionItem => {
                publish(&buses, &team, &ActionItem::tombstone(id, &team), OutgoingAction::Delete)
            }
            ItemKind::ColumnTitle => Err(anyhow!("Column titles cannot be deleted")),
        },
    };

    close_session(session).await;
    result
}
