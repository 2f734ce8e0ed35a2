use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::group::GroupState;
use crate::model::ids::{EntityId, GroupId, LeafItemId};

/// Per (entity, group) progress line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub entity_id: EntityId,
    pub entity_name: String,
    pub external_id: Option<String>,
    pub group_id: GroupId,
    pub group_name: String,
    pub group_state: Option<GroupState>,
    pub progress_pct: u8,
}

impl SummaryRow {
    /// External id when present, otherwise the entity id.
    #[must_use]
    pub fn external_id_or_id(&self) -> &str {
        self.external_id
            .as_deref()
            .unwrap_or_else(|| self.entity_id.as_str())
    }
}

/// Per (entity, group, item) line. Emitted for every item, requirement or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailRow {
    pub entity_id: EntityId,
    pub entity_name: String,
    pub external_id: Option<String>,
    pub group_id: GroupId,
    pub group_name: String,
    pub group_state: Option<GroupState>,
    pub item_id: LeafItemId,
    pub item_title: String,
    pub item_kind: String,
    pub requirement_kind: Option<String>,
    pub completed: Option<bool>,
    pub due_at: Option<DateTime<Utc>>,
    pub url: Option<String>,
}
