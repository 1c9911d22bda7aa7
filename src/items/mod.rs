//! Board items that travel over the realtime channel.
//!
//! Every synchronized entity implements [`Item`]: a stable integer id, the
//! owning team, and a tombstone form used to push deletions through a bus
//! without payload. Values are immutable; edits go through each type's
//! `with_changes`, which always returns a fresh value.

pub mod action_item;
pub mod column;
pub mod thought;

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub use action_item::{ActionItem, ActionItemChanges};
pub use column::{Column, ColumnChanges};
pub use thought::{Thought, ThoughtChanges};

/// Id carried by items built locally that the server has not yet persisted.
pub const UNSAVED_ID: i64 = -1;

/// Routing discriminator for an item type. Never serialized as a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Thought,
    ActionItem,
    ColumnTitle,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Thought => "thought",
            Self::ActionItem => "action-item",
            Self::ColumnTitle => "column-title",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "thought" => Ok(Self::Thought),
            "action-item" => Ok(Self::ActionItem),
            "column-title" => Ok(Self::ColumnTitle),
            _ => Err(format!("Invalid item kind: {}", s)),
        }
    }
}

/// One of the three fixed retro columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    #[default]
    Happy,
    Confused,
    Sad,
}

impl Topic {
    /// Board display order, left to right.
    pub const DISPLAY_ORDER: [Topic; 3] = [Topic::Happy, Topic::Confused, Topic::Sad];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Happy => "happy",
            Self::Confused => "confused",
            Self::Sad => "sad",
        }
    }

    /// Position of this topic in [`Topic::DISPLAY_ORDER`].
    pub fn display_index(&self) -> usize {
        match self {
            Self::Happy => 0,
            Self::Confused => 1,
            Self::Sad => 2,
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Topic {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "happy" => Ok(Self::Happy),
            "confused" => Ok(Self::Confused),
            "sad" => Ok(Self::Sad),
            _ => Err(format!("Invalid topic: {}", s)),
        }
    }
}

/// Capability shared by every synchronized board item.
pub trait Item: Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    const KIND: ItemKind;

    fn id(&self) -> i64;

    fn team_id(&self) -> &str;

    /// True for tombstones built by [`Item::tombstone`].
    fn is_deletion(&self) -> bool;

    /// A deletion marker carrying only `id` and `team_id`.
    fn tombstone(id: i64, team_id: &str) -> Self;

    fn is_unsaved(&self) -> bool {
        self.id() == UNSAVED_ID
    }
}
