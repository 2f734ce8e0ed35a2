use std::collections::HashMap;
use std::collections::hash_map::Entry;

use indexmap::IndexMap;

use crate::model::{EntityId, GroupId, GroupState, SummaryRow};
use crate::pivot::export::{ExportRow, ExportTable, MISSING_CELL};
use crate::pivot::natural::{SortOrder, natural_cmp};

/// Default prefix for generated column labels ("Module 0", "Module 1", ...).
pub const DEFAULT_LABEL_PREFIX: &str = "Module";

/// Produces the short display label for the n-th distinct column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLabeler {
    prefix: String,
}

impl ColumnLabeler {
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    #[must_use]
    pub fn label(&self, index: usize) -> String {
        format!("{} {index}", self.prefix)
    }
}

impl Default for ColumnLabeler {
    fn default() -> Self {
        Self::new(DEFAULT_LABEL_PREFIX)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PivotKey {
    pub entity: EntityId,
    pub group: GroupId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PivotCell {
    pub percent: u8,
    pub state: Option<GroupState>,
}

impl PivotCell {
    #[must_use]
    pub fn render(&self) -> String {
        format!("{}%", self.percent)
    }
}

/// Row dimension. `external_id` is already resolved against the entity id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PivotEntity {
    pub id: EntityId,
    pub display_name: String,
    pub external_id: String,
}

/// Column dimension. `index` and `label` are fixed at first sight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PivotColumn {
    pub id: GroupId,
    pub name: String,
    pub index: usize,
    pub label: String,
}

/// Dense entity × group matrix.
///
/// Both dimensions keep first-seen order from the summary row stream. Column
/// labels are handed out while scanning, so the same input order always yields
/// the same labels no matter how many entities share a group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PivotTable {
    entities: IndexMap<EntityId, PivotEntity>,
    columns: IndexMap<GroupId, PivotColumn>,
    cells: HashMap<PivotKey, PivotCell>,
    duplicates_ignored: usize,
}

impl PivotTable {
    /// Fold summary rows into the matrix.
    ///
    /// A second row for an already-filled (entity, group) pair is ignored; the
    /// first one wins.
    #[must_use]
    pub fn build(rows: &[SummaryRow], labeler: &ColumnLabeler) -> Self {
        let mut table = Self::default();

        for row in rows {
            table
                .entities
                .entry(row.entity_id.clone())
                .or_insert_with(|| PivotEntity {
                    id: row.entity_id.clone(),
                    display_name: row.entity_name.clone(),
                    external_id: row.external_id_or_id().to_owned(),
                });

            let next_index = table.columns.len();
            table
                .columns
                .entry(row.group_id.clone())
                .or_insert_with(|| PivotColumn {
                    id: row.group_id.clone(),
                    name: row.group_name.clone(),
                    index: next_index,
                    label: labeler.label(next_index),
                });

            let key = PivotKey {
                entity: row.entity_id.clone(),
                group: row.group_id.clone(),
            };
            match table.cells.entry(key) {
                Entry::Vacant(slot) => {
                    slot.insert(PivotCell {
                        percent: row.progress_pct,
                        state: row.group_state,
                    });
                }
                Entry::Occupied(_) => table.duplicates_ignored += 1,
            }
        }

        table
    }

    /// Entities in first-seen order.
    pub fn entities(&self) -> impl Iterator<Item = &PivotEntity> {
        self.entities.values()
    }

    /// Columns in first-seen order.
    pub fn columns(&self) -> impl Iterator<Item = &PivotColumn> {
        self.columns.values()
    }

    #[must_use]
    pub fn column(&self, group: &GroupId) -> Option<&PivotColumn> {
        self.columns.get(group)
    }

    #[must_use]
    pub fn cell(&self, entity: &EntityId, group: &GroupId) -> Option<&PivotCell> {
        self.cells.get(&PivotKey {
            entity: entity.clone(),
            group: group.clone(),
        })
    }

    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn duplicates_ignored(&self) -> usize {
        self.duplicates_ignored
    }

    /// Row-major export, rows ordered by external id (natural, stable).
    #[must_use]
    pub fn export(&self, order: SortOrder) -> ExportTable {
        let mut entities: Vec<&PivotEntity> = self.entities.values().collect();
        entities.sort_by(|a, b| order.apply(natural_cmp(&a.external_id, &b.external_id)));

        let rows = entities
            .into_iter()
            .map(|entity| ExportRow {
                external_id: entity.external_id.clone(),
                name: entity.display_name.clone(),
                cells: self
                    .columns
                    .values()
                    .map(|column| {
                        self.cell(&entity.id, &column.id)
                            .map_or_else(|| MISSING_CELL.to_owned(), PivotCell::render)
                    })
                    .collect(),
            })
            .collect();

        ExportTable::new(
            self.columns.values().map(|column| column.label.clone()).collect(),
            rows,
        )
    }
}
