//! Initial board load over HTTP.
//!
//! The realtime channel only carries changes, so a board is first populated
//! by fetching each collection and publishing it on the incoming side of the
//! matching bus.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::bus::{BusItem, Buses};
use crate::credentials::TokenStore;
use crate::destination::normalize_team;
use crate::errors::SyncError;
use crate::items::{ActionItem, Column, ItemKind, Thought};
use crate::urls::ServerUrls;

/// Path segment under the team URL for each collection.
pub fn collection_segment(kind: ItemKind) -> &'static str {
    match kind {
        ItemKind::Thought => "thoughts",
        ItemKind::ActionItem => "action-items",
        ItemKind::ColumnTitle => "columns",
    }
}

/// Source of raw collection bodies for a team.
#[async_trait]
pub trait ItemFetcher: Send + Sync {
    async fn fetch(&self, team: &str, kind: ItemKind) -> Result<String, SyncError>;
}

/// [`ItemFetcher`] backed by the RetroQuest REST API.
pub struct HttpItemFetcher {
    client: reqwest::Client,
    urls: ServerUrls,
    tokens: Arc<dyn TokenStore>,
}

impl HttpItemFetcher {
    pub fn new(urls: ServerUrls, tokens: Arc<dyn TokenStore>) -> Self {
        Self {
            client: reqwest::Client::new(),
            urls,
            tokens,
        }
    }

    /// `{base}api/team/{normalized team}/{collection}`
    pub fn collection_url(&self, team: &str, kind: ItemKind) -> String {
        format!(
            "{}/{}",
            self.urls.team(&normalize_team(team)),
            collection_segment(kind)
        )
    }
}

#[async_trait]
impl ItemFetcher for HttpItemFetcher {
    async fn fetch(&self, team: &str, kind: ItemKind) -> Result<String, SyncError> {
        // The token is stored under the team path as the user typed it.
        let team_url = self.urls.team(team);
        let token = self
            .tokens
            .token_for(&team_url)
            .ok_or(SyncError::MissingToken { url: team_url })?;

        let path = self.collection_url(team, kind);
        let fetch_err = |message: String| SyncError::Fetch {
            path: path.clone(),
            message,
        };

        let response = self
            .client
            .get(&path)
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await
            .map_err(|e| fetch_err(e.to_string()))?;

        let status = response.status();
        info!(kind = %kind, status = status.as_u16(), "Team query returned");
        if !status.is_success() {
            return Err(fetch_err(format!("server returned {}", status)));
        }

        response.text().await.map_err(|e| fetch_err(e.to_string()))
    }
}

/// Fetches collections and publishes them on the buses.
pub struct ItemsService {
    fetcher: Arc<dyn ItemFetcher>,
    buses: Buses,
}

impl ItemsService {
    pub fn new(fetcher: Arc<dyn ItemFetcher>, buses: Buses) -> Self {
        Self { fetcher, buses }
    }

    /// Load one collection and publish it item by item.
    ///
    /// A missing token publishes nothing. Any other failure publishes the
    /// empty-list signal before returning the error, as does an empty or
    /// `null` body on success.
    pub async fn refresh<I: BusItem>(&self, team: &str) -> Result<Vec<I>, SyncError> {
        let bus = I::bus_of(&self.buses);
        let body = match self.fetcher.fetch(team, I::KIND).await {
            Ok(body) => body,
            Err(e @ SyncError::MissingToken { .. }) => return Err(e),
            Err(e) => {
                warn!(kind = %I::KIND, error = %e, "Fetch failed");
                bus.publish_incoming_list(&[]);
                return Err(e);
            }
        };

        let items = match decode_list::<I>(&body) {
            Ok(items) => items,
            Err(e) => {
                warn!(kind = %I::KIND, error = %e, "Unable to decode response from server");
                bus.publish_incoming_list(&[]);
                return Err(e);
            }
        };

        debug!(kind = %I::KIND, count = items.len(), "Publishing fetched items");
        bus.publish_incoming_list(&items);
        Ok(items)
    }

    /// Load thoughts, action items and column titles in that order.
    pub async fn refresh_board(&self, team: &str) -> Result<(), SyncError> {
        self.refresh::<Thought>(team).await?;
        self.refresh::<ActionItem>(team).await?;
        self.refresh::<Column>(team).await?;
        Ok(())
    }
}

fn decode_list<I: BusItem>(body: &str) -> Result<Vec<I>, SyncError> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str::<Option<Vec<I>>>(body)
        .map(Option::unwrap_or_default)
        .map_err(|source| SyncError::Decode {
            kind: I::KIND.as_str(),
            source,
        })
}
