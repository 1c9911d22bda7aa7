//! Transport paths for the realtime channel.
//!
//! Outgoing destinations follow the backend's routing contract, which is
//! deliberately asymmetric: creates never carry an id, thought deletes use a
//! versioned path, deletes carry the id only in the body, and column titles
//! can only be edited. An empty destination means "nothing to send".

use crate::bus::OutgoingAction;
use crate::items::{Item, ItemKind};

pub const HEARTBEAT_PING: &str = "/app/heartbeat/ping";
pub const HEARTBEAT_PONG_TOPIC: &str = "/topic/heartbeat/pong";

/// Replace spaces with hyphens and lowercase the result.
pub fn normalize_team(team: &str) -> String {
    team.replace(' ', "-").to_lowercase()
}

/// Resolve the outgoing path for `item`, routed by the item's own team.
pub fn resolve_destination<T: Item>(item: &T, action: OutgoingAction) -> String {
    Destinations::new(item.team_id()).outgoing(item, action)
}

/// All transport paths for one team, normalized once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destinations {
    team: String,
}

impl Destinations {
    pub fn new(team: &str) -> Self {
        Self {
            team: normalize_team(team),
        }
    }

    /// The normalized team token used in every path.
    pub fn team(&self) -> &str {
        &self.team
    }

    pub fn thoughts_topic(&self) -> String {
        format!("/topic/{}/thoughts", self.team)
    }

    pub fn action_items_topic(&self) -> String {
        format!("/topic/{}/action-items", self.team)
    }

    pub fn column_titles_topic(&self) -> String {
        format!("/topic/{}/column-titles", self.team)
    }

    pub fn heartbeat_topic(&self) -> &'static str {
        HEARTBEAT_PONG_TOPIC
    }

    /// Topics to subscribe after connecting, in subscription order.
    pub fn subscriptions(&self) -> [String; 4] {
        [
            self.thoughts_topic(),
            self.action_items_topic(),
            self.column_titles_topic(),
            self.heartbeat_topic().to_string(),
        ]
    }

    pub fn outgoing<T: Item>(&self, item: &T, action: OutgoingAction) -> String {
        self.outgoing_for(T::KIND, item.id(), action)
    }

    pub fn outgoing_for(&self, kind: ItemKind, id: i64, action: OutgoingAction) -> String {
        match (kind, action) {
            (ItemKind::ColumnTitle, OutgoingAction::Create | OutgoingAction::Delete) => String::new(),
            (ItemKind::Thought, OutgoingAction::Delete) => {
                format!("/app/v2/{}/{}/{}", self.team, kind, action)
            }
            (ItemKind::ActionItem, OutgoingAction::Delete) => {
                format!("/app/{}/{}/{}", self.team, kind, action)
            }
            _ => {
                let id_segment = match action {
                    OutgoingAction::Create => String::new(),
                    _ => format!("/{}", id),
                };
                format!("/app/{}/{}{}/{}", self.team, kind, id_segment, action)
            }
        }
    }
}
