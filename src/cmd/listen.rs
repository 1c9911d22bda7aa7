//! Live change feed (`retroquest listen`).

use std::time::Duration;

use anyhow::Result;
use serde_json::json;
use tracing::{info, warn};

use retroquest_sync::bus::{BusItem, Buses};
use retroquest_sync::items::{ActionItem, Column, Item, Thought};
use retroquest_sync::realtime::ConnectionState;
use retroquest_sync::retro_config::RetroConfig;

use super::fetch::fetch_board;
use super::{POLL_INTERVAL, close_session, open_session};

/// Print every incoming item on `bus` as one JSON line.
fn echo<T: BusItem>(buses: &Buses) {
    buses.bus::<T>().subscribe_incoming(|item: Option<&T>| {
        let Some(item) = item else {
            return;
        };
        let change = if item.is_deletion() { "delete" } else { "put" };
        let line = if item.is_deletion() {
            json!({ "kind": T::KIND.as_str(), "change": change, "id": item.id() })
        } else {
            json!({ "kind": T::KIND.as_str(), "change": change, "item": item })
        };
        println!("{}", line);
    });
}

pub async fn cmd_listen(config: &RetroConfig, seconds: Option<u64>, fetch: bool) -> Result<()> {
    let buses = Buses::new();
    if fetch {
        let board = fetch_board(config, &buses, None).await?;
        println!("{}", serde_json::to_string(&board)?);
    }

    echo::<Thought>(&buses);
    echo::<ActionItem>(&buses);
    echo::<Column>(&buses);

    let session = open_session(config, buses).await?;
    info!(team = %session.adapter().team(), "Listening for changes");

    {
        let deadline = async {
            match seconds {
                Some(s) => tokio::time::sleep(Duration::from_secs(s)).await,
                None => std::future::pending::<()>().await,
            }
        };
        let dropped = async {
            while session.state() != ConnectionState::Disconnected {
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("Interrupted"),
            _ = deadline => info!("Listen time elapsed"),
            _ = dropped => warn!("Connection closed by server"),
        }
    }

    close_session(session).await;
    Ok(())
}
