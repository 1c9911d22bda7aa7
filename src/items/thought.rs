use serde::{Deserialize, Serialize};

use super::{Item, ItemKind, Topic, UNSAVED_ID};

/// A card posted into one of the three retro columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thought {
    pub id: i64,
    pub message: String,
    pub hearts: u32,
    pub topic: Topic,
    pub discussed: bool,
    pub team_id: String,
    #[serde(skip)]
    pub deletion: bool,
}

/// Field overrides for [`Thought::with_changes`]. `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct ThoughtChanges {
    pub id: Option<i64>,
    pub message: Option<String>,
    pub hearts: Option<u32>,
    pub topic: Option<Topic>,
    pub discussed: Option<bool>,
    pub team_id: Option<String>,
}

impl Thought {
    pub fn new(
        id: i64,
        message: impl Into<String>,
        hearts: u32,
        topic: Topic,
        discussed: bool,
        team_id: impl Into<String>,
    ) -> Self {
        Self {
            id,
            message: message.into(),
            hearts,
            topic,
            discussed,
            team_id: team_id.into(),
            deletion: false,
        }
    }

    /// A fresh thought awaiting a server-assigned id.
    pub fn unsaved(message: impl Into<String>, topic: Topic, team_id: impl Into<String>) -> Self {
        Self::new(UNSAVED_ID, message, 0, topic, false, team_id)
    }

    pub fn with_changes(&self, changes: ThoughtChanges) -> Self {
        Self {
            id: changes.id.unwrap_or(self.id),
            message: changes.message.unwrap_or_else(|| self.message.clone()),
            hearts: changes.hearts.unwrap_or(self.hearts),
            topic: changes.topic.unwrap_or(self.topic),
            discussed: changes.discussed.unwrap_or(self.discussed),
            team_id: changes.team_id.unwrap_or_else(|| self.team_id.clone()),
            deletion: false,
        }
    }

    /// Adds one heart.
    pub fn starred(&self) -> Self {
        self.with_changes(ThoughtChanges {
            hearts: Some(self.hearts.saturating_add(1)),
            ..Default::default()
        })
    }
}

impl Item for Thought {
    const KIND: ItemKind = ItemKind::Thought;

    fn id(&self) -> i64 {
        self.id
    }

    fn team_id(&self) -> &str {
        &self.team_id
    }

    fn is_deletion(&self) -> bool {
        self.deletion
    }

    fn tombstone(id: i64, team_id: &str) -> Self {
        Self {
            id,
            message: String::new(),
            hearts: 0,
            topic: Topic::default(),
            discussed: false,
            team_id: team_id.to_string(),
            deletion: true,
        }
    }
}
