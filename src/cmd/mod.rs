//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module        | Commands handled           |
//! |---------------|----------------------------|
//! | `destination` | `Destination`, `Topics`    |
//! | `fetch`       | `Fetch`                    |
//! | `listen`      | `Listen`                   |
//! | `send`        | `Send`                     |
//! | `config`      | `Config`                   |

pub mod config;
pub mod destination;
pub mod fetch;
pub mod listen;
pub mod send;

pub use config::cmd_config;
pub use destination::{cmd_destination, cmd_topics};
pub use fetch::cmd_fetch;
pub use listen::cmd_listen;
pub use send::cmd_send;

use std::time::Duration;

use anyhow::Result;

use retroquest_sync::bus::Buses;
use retroquest_sync::lifecycle::{LifecycleEvent, SyncSession};
use retroquest_sync::realtime::ConnectionState;
use retroquest_sync::retro_config::RetroConfig;
use retroquest_sync::stomp::StompSession;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Log in with the configured team and wait until the broker confirms.
pub(crate) async fn open_session(config: &RetroConfig, buses: Buses) -> Result<SyncSession<StompSession>> {
    let team = config.require_team()?;
    if config.token().is_none() {
        anyhow::bail!("No token configured for team '{}'. Pass --token or set RETROQUEST_TOKEN", team);
    }

    let session = SyncSession::open(config.urls(), config.token_store(), buses);
    session.handle(LifecycleEvent::LoggedIn { team: team.clone() });

    if !wait_for(&session, ConnectionState::Connected, CONNECT_TIMEOUT).await {
        anyhow::bail!("Could not connect to {} as team '{}'", config.urls().websocket(), team);
    }
    Ok(session)
}

/// Poll until the session reaches `target` or `timeout` elapses.
pub(crate) async fn wait_for(
    session: &SyncSession<StompSession>,
    target: ConnectionState,
    timeout: Duration,
) -> bool {
    let poll = async {
        loop {
            let state = session.state();
            if state == target {
                return true;
            }
            // A failed open falls straight back to Disconnected.
            if target == ConnectionState::Connected && state == ConnectionState::Disconnected {
                return false;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    };
    tokio::time::timeout(timeout, poll).await.unwrap_or(false)
}

/// Log out and wait for the socket to close.
pub(crate) async fn close_session(session: SyncSession<StompSession>) {
    session.handle(LifecycleEvent::LoggedOut);
    wait_for(&session, ConnectionState::Disconnected, CONNECT_TIMEOUT).await;
}
