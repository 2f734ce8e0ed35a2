use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{GroupId, LeafItemId};

//
// ─── GROUP STATE ───────────────────────────────────────────────────────────────
//

/// Progress state the platform reports for a group, from the viewer's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupState {
    Locked,
    Unlocked,
    Started,
    Completed,
    #[serde(other)]
    Unknown,
}

impl GroupState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            GroupState::Locked => "locked",
            GroupState::Unlocked => "unlocked",
            GroupState::Started => "started",
            GroupState::Completed => "completed",
            GroupState::Unknown => "unknown",
        }
    }
}

//
// ─── LEAF ITEMS ────────────────────────────────────────────────────────────────
//

/// One trackable item inside a group.
///
/// `completed` is only meaningful when the item carries a requirement; the
/// platform leaves it unset otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafItem {
    pub id: LeafItemId,
    pub title: String,
    pub kind: String,
    pub requirement_kind: Option<String>,
    pub completed: Option<bool>,
    pub due_at: Option<DateTime<Utc>>,
    pub url: Option<String>,
}

impl LeafItem {
    #[must_use]
    pub fn has_requirement(&self) -> bool {
        self.requirement_kind.is_some()
    }

    /// True only for requirement-bearing items explicitly marked complete.
    #[must_use]
    pub fn counts_as_completed(&self) -> bool {
        self.has_requirement() && self.completed == Some(true)
    }
}

//
// ─── GROUPS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub state: Option<GroupState>,
    pub items: Vec<LeafItem>,
}

impl Group {
    #[must_use]
    pub fn progress(&self) -> GroupProgress {
        GroupProgress::from_items(&self.items)
    }
}

/// Completion counts over the requirement-bearing items of a group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupProgress {
    completed: usize,
    total: usize,
}

impl GroupProgress {
    #[must_use]
    pub fn from_items(items: &[LeafItem]) -> Self {
        items.iter().filter(|item| item.has_requirement()).fold(
            Self::default(),
            |acc, item| Self {
                completed: acc.completed + usize::from(item.counts_as_completed()),
                total: acc.total + 1,
            },
        )
    }

    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    /// Rounded completion percentage, half away from zero. Empty groups are 0.
    #[must_use]
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        let done = self.completed.min(self.total);
        let rounded = (200 * done + self.total) / (2 * self.total);
        u8::try_from(rounded.min(100)).unwrap_or(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: u64, requirement: Option<&str>, completed: Option<bool>) -> LeafItem {
        LeafItem {
            id: LeafItemId::from(id),
            title: format!("Item {id}"),
            kind: "Assignment".into(),
            requirement_kind: requirement.map(str::to_owned),
            completed,
            due_at: None,
            url: None,
        }
    }

    #[test]
    fn percent_is_zero_without_requirements() {
        let items = vec![item(1, None, None), item(2, None, Some(true))];
        let progress = GroupProgress::from_items(&items);
        assert_eq!(progress.total(), 0);
        assert_eq!(progress.percent(), 0);
    }

    #[test]
    fn percent_rounds_half_up() {
        let items = vec![
            item(1, Some("must_submit"), Some(true)),
            item(2, Some("must_view"), Some(true)),
            item(3, Some("must_view"), Some(false)),
        ];
        assert_eq!(GroupProgress::from_items(&items).percent(), 67);

        let halves = vec![
            item(1, Some("must_view"), Some(true)),
            item(2, Some("must_view"), None),
            item(3, Some("must_view"), Some(false)),
            item(4, Some("must_view"), Some(false)),
            item(5, Some("must_view"), Some(false)),
            item(6, Some("must_view"), Some(false)),
            item(7, Some("must_view"), Some(false)),
            item(8, Some("must_view"), Some(false)),
        ];
        // 1/8 = 12.5%
        assert_eq!(GroupProgress::from_items(&halves).percent(), 13);
    }

    #[test]
    fn unset_and_false_both_count_as_incomplete() {
        let items = vec![
            item(1, Some("must_view"), None),
            item(2, Some("must_view"), Some(false)),
        ];
        let progress = GroupProgress::from_items(&items);
        assert_eq!(progress.completed(), 0);
        assert_eq!(progress.total(), 2);
    }

    #[test]
    fn completed_without_requirement_is_ignored() {
        let items = vec![item(1, None, Some(true)), item(2, Some("must_view"), Some(true))];
        let progress = GroupProgress::from_items(&items);
        assert_eq!((progress.completed(), progress.total()), (1, 1));
        assert_eq!(progress.percent(), 100);
    }

    #[test]
    fn unknown_state_deserializes() {
        let state: GroupState = serde_json::from_str("\"archived\"").unwrap();
        assert_eq!(state, GroupState::Unknown);
        let state: GroupState = serde_json::from_str("\"started\"").unwrap();
        assert_eq!(state, GroupState::Started);
    }
}
