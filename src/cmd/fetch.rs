//! Initial board load (`retroquest fetch`).

use std::sync::{Arc, PoisonError};

use anyhow::{Context, Result, anyhow};
use serde_json::{Map, Value, json};

use retroquest_sync::bus::Buses;
use retroquest_sync::fetch::{HttpItemFetcher, ItemsService};
use retroquest_sync::items::{ActionItem, Column, ItemKind, Thought};
use retroquest_sync::retro_config::RetroConfig;
use retroquest_sync::store::{self, Ordered, SharedStore};

fn snapshot<T: Ordered>(store: &SharedStore<T>) -> Result<Value> {
    let guard = store.lock().unwrap_or_else(PoisonError::into_inner);
    serde_json::to_value(guard.items()).context("Failed to serialize items")
}

/// Fetch the board (or one collection) for the configured team, publishing
/// through the buses into sorted stores.
pub async fn fetch_board(config: &RetroConfig, buses: &Buses, kind: Option<ItemKind>) -> Result<Value> {
    let team = config.require_team()?;
    let fetcher = HttpItemFetcher::new(config.urls(), config.token_store());
    let service = ItemsService::new(Arc::new(fetcher), buses.clone());

    let (thoughts, thoughts_sub) = store::track(&buses.thoughts);
    let (action_items, action_items_sub) = store::track(&buses.action_items);
    let (columns, columns_sub) = store::track(&buses.columns);

    let mut board = Map::new();
    if kind.is_none_or(|k| k == ItemKind::Thought) {
        service.refresh::<Thought>(&team).await?;
        board.insert("thoughts".into(), snapshot(&thoughts)?);
    }
    if kind.is_none_or(|k| k == ItemKind::ActionItem) {
        service.refresh::<ActionItem>(&team).await?;
        board.insert("actionItems".into(), snapshot(&action_items)?);
    }
    if kind.is_none_or(|k| k == ItemKind::ColumnTitle) {
        service.refresh::<Column>(&team).await?;
        board.insert("columns".into(), snapshot(&columns)?);
    }

    thoughts_sub.cancel();
    action_items_sub.cancel();
    columns_sub.cancel();

    Ok(json!({ "team": team, "board": board }))
}

pub async fn cmd_fetch(config: &RetroConfig, kind: Option<&str>) -> Result<()> {
    let kind = kind
        .map(|k| k.parse::<ItemKind>().map_err(|e| anyhow!(e)))
        .transpose()?;

    let board = fetch_board(config, &Buses::new(), kind).await?;
    println!("{}", serde_json::to_string_pretty(&board)?);
    Ok(())
}
