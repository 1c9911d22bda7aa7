use serde::{Deserialize, Serialize};

use super::{Item, ItemKind, Topic};

/// Display title for one of the fixed retro columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub id: i64,
    pub topic: Topic,
    pub title: String,
    pub team_id: String,
    #[serde(skip)]
    pub deletion: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ColumnChanges {
    pub id: Option<i64>,
    pub topic: Option<Topic>,
    pub title: Option<String>,
    pub team_id: Option<String>,
}

impl Column {
    pub fn new(id: i64, topic: Topic, title: impl Into<String>, team_id: impl Into<String>) -> Self {
        Self {
            id,
            topic,
            title: title.into(),
            team_id: team_id.into(),
            deletion: false,
        }
    }

    pub fn with_changes(&self, changes: ColumnChanges) -> Self {
        Self {
            id: changes.id.unwrap_or(self.id),
            topic: changes.topic.unwrap_or(self.topic),
            title: changes.title.unwrap_or_else(|| self.title.clone()),
            team_id: changes.team_id.unwrap_or_else(|| self.team_id.clone()),
            deletion: false,
        }
    }
}

impl Item for Column {
    const KIND: ItemKind = ItemKind::ColumnTitle;

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
            topic: Topic::default(),
            title: String::new(),
            team_id: team_id.to_string(),
            deletion: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_wire_format() {
        let column = Column::new(5, Topic::Happy, "Slappy", "test_team");
        assert_eq!(
            serde_json::to_string(&column).unwrap(),
            r#"{"id":5,"topic":"happy","title":"Slappy","teamId":"test_team"}"#
        );
    }

    #[test]
    fn test_rename_title() {
        let column = Column::new(3, Topic::Sad, "Sad", "team");
        let renamed = column.with_changes(ColumnChanges {
            title: Some("Meh".into()),
            ..Default::default()
        });
        assert_eq!(renamed.title, "Meh");
        assert_eq!(renamed.topic, Topic::Sad);
        assert_eq!(column.title, "Sad");
    }
}
