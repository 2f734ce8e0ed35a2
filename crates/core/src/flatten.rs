//! Turns one entity's fetched groups into summary and detail rows.

use crate::model::{DetailRow, Entity, Group, SummaryRow};

/// Name of the administrative syllabus group that carries no coursework.
pub const DEFAULT_EXCLUDED_GROUP: &str = "Programa del Curso";

/// Group names that are dropped before any row is produced.
///
/// Matching is exact: no trimming, no case folding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionRule {
    names: Vec<String>,
}

impl ExclusionRule {
    #[must_use]
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// A rule that keeps every group.
    #[must_use]
    pub fn none() -> Self {
        Self { names: Vec::new() }
    }

    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub fn excludes(&self, group: &Group) -> bool {
        self.names.iter().any(|name| *name == group.name)
    }
}

impl Default for ExclusionRule {
    fn default() -> Self {
        Self::new([DEFAULT_EXCLUDED_GROUP])
    }
}

/// Row streams produced for one or more entities, in emission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityRows {
    pub summary: Vec<SummaryRow>,
    pub detail: Vec<DetailRow>,
}

impl EntityRows {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.summary.is_empty() && self.detail.is_empty()
    }

    pub fn append(&mut self, other: EntityRows) {
        self.summary.extend(other.summary);
        self.detail.extend(other.detail);
    }
}

/// Flatten the groups fetched for `entity`, preserving group and item order.
#[must_use]
pub fn flatten_entity(entity: &Entity, groups: &[Group], rule: &ExclusionRule) -> EntityRows {
    let mut rows = EntityRows::default();

    for group in groups.iter().filter(|group| !rule.excludes(group)) {
        rows.summary.push(SummaryRow {
            entity_id: entity.id().clone(),
            entity_name: entity.display_name().to_owned(),
            external_id: entity.external_id().map(str::to_owned),
            group_id: group.id.clone(),
            group_name: group.name.clone(),
            group_state: group.state,
            progress_pct: group.progress().percent(),
        });

        rows.detail.extend(group.items.iter().map(|item| DetailRow {
            entity_id: entity.id().clone(),
            entity_name: entity.display_name().to_owned(),
            external_id: entity.external_id().map(str::to_owned),
            group_id: group.id.clone(),
            group_name: group.name.clone(),
            group_state: group.state,
            item_id: item.id.clone(),
            item_title: item.title.clone(),
            item_kind: item.kind.clone(),
            requirement_kind: item.requirement_kind.clone(),
            completed: item.completed,
            due_at: item.due_at,
            url: item.url.clone(),
        }));
    }

    rows
}
