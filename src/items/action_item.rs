use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::{Item, ItemKind, UNSAVED_ID};

/// Timestamp layout used for `dateCreated` on locally created action items.
pub const DATE_CREATED_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A follow-up task agreed during the retro.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionItem {
    pub id: i64,
    pub task: String,
    pub completed: bool,
    pub team_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_created: Option<String>,
    #[serde(skip)]
    pub deletion: bool,
}

/// Field overrides for [`ActionItem::with_changes`]. `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct ActionItemChanges {
    pub id: Option<i64>,
    pub task: Option<String>,
    pub completed: Option<bool>,
    pub team_id: Option<String>,
    pub assignee: Option<String>,
    pub date_created: Option<String>,
}

impl ActionItem {
    pub fn new(
        id: i64,
        task: impl Into<String>,
        completed: bool,
        team_id: impl Into<String>,
        assignee: Option<String>,
        date_created: Option<String>,
    ) -> Self {
        Self {
            id,
            task: task.into(),
            completed,
            team_id: team_id.into(),
            assignee,
            date_created,
            deletion: false,
        }
    }

    /// Build an unsaved action item from free text typed by a user.
    ///
    /// An `@name` token becomes the assignee: the text before it is kept as
    /// the task and whatever follows the name is appended to it.
    pub fn from_entry(entry: &str, team_id: impl Into<String>, now: NaiveDateTime) -> Self {
        let (task, assignee) = match entry.find('@') {
            Some(at) => {
                let prefix = &entry[..at];
                let rest = &entry[at + 1..];
                let mut blocks = rest.splitn(2, ' ');
                let name = blocks.next().unwrap_or_default();
                let mut task = prefix.to_string();
                if let Some(tail) = blocks.next() {
                    task.push_str(tail);
                }
                let assignee = (!name.is_empty()).then(|| name.to_string());
                (task, assignee)
            }
            None => (entry.to_string(), None),
        };

        Self::new(
            UNSAVED_ID,
            task,
            false,
            team_id,
            assignee,
            Some(now.format(DATE_CREATED_FORMAT).to_string()),
        )
    }

    pub fn with_changes(&self, changes: ActionItemChanges) -> Self {
        Self {
            id: changes.id.unwrap_or(self.id),
            task: changes.task.unwrap_or_else(|| self.task.clone()),
            completed: changes.completed.unwrap_or(self.completed),
            team_id: changes.team_id.unwrap_or_else(|| self.team_id.clone()),
            assignee: changes.assignee.or_else(|| self.assignee.clone()),
            date_created: changes.date_created.or_else(|| self.date_created.clone()),
            deletion: false,
        }
    }
}

impl Item for ActionItem {
    const KIND: ItemKind = ItemKind::ActionItem;

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
            task: String::new(),
            completed: false,
            team_id: team_id.to_string(),
            assignee: None,
            date_created: None,
            deletion: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2018, 1, 1)
            .unwrap()
            .and_hms_opt(12, 30, 5)
            .unwrap()
    }

    #[test]
    fn test_serializes_optional_fields_only_when_present() {
        let full = ActionItem::new(
            5,
            "do stuff",
            false,
            "test_team",
            Some("swift developer".into()),
            Some("2018-01-01".into()),
        );
        assert_eq!(
            serde_json::to_string(&full).unwrap(),
            r#"{"id":5,"task":"do stuff","completed":false,"teamId":"test_team","assignee":"swift developer","dateCreated":"2018-01-01"}"#
        );

        let bare = ActionItem::new(5, "do stuff", true, "t", None, None);
        let json = serde_json::to_string(&bare).unwrap();
        assert!(!json.contains("assignee"));
        assert!(!json.contains("dateCreated"));
    }

    #[test]
    fn test_decodes_without_optional_fields() {
        let item: ActionItem =
            serde_json::from_str(r#"{"id":1,"task":"t","completed":true,"teamId":"x"}"#).unwrap();
        assert_eq!(item.assignee, None);
        assert_eq!(item.date_created, None);
        assert!(item.completed);
    }

    #[test]
    fn test_from_entry_extracts_assignee() {
        let item = ActionItem::from_entry("fix the build @sam by friday", "team", noon());
        assert_eq!(item.assignee.as_deref(), Some("sam"));
        assert_eq!(item.task, "fix the build by friday");
        assert_eq!(item.id, UNSAVED_ID);
        assert_eq!(item.date_created.as_deref(), Some("2018-01-01T12:30:05"));
    }

    #[test]
    fn test_from_entry_without_assignee() {
        let item = ActionItem::from_entry("write docs", "team", noon());
        assert_eq!(item.task, "write docs");
        assert_eq!(item.assignee, None);
    }

    #[test]
    fn test_from_entry_with_trailing_at() {
        let item = ActionItem::from_entry("ping ops @", "team", noon());
        assert_eq!(item.task, "ping ops ");
        assert_eq!(item.assignee, None);
    }

    #[test]
    fn test_with_changes_marks_completed() {
        let item = ActionItem::new(2, "t", false, "team", Some("a".into()), None);
        let done = item.with_changes(ActionItemChanges {
            completed: Some(true),
            ..Default::default()
        });
        assert!(done.completed);
        assert!(!item.completed);
        assert_eq!(done.assignee.as_deref(), Some("a"));
    }

    #[test]
    fn test_tombstone_has_no_payload() {
        let tomb = ActionItem::tombstone(9, "team");
        assert!(tomb.is_deletion());
        assert!(tomb.task.is_empty());
        assert_eq!(tomb.assignee, None);
    }
}
