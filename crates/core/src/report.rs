use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ExportError;
use crate::flatten::EntityRows;
use crate::model::{CollectionId, DetailRow, EntityId, SummaryRow};
use crate::pivot::{ColumnLabeler, ExportTable, PivotTable, SortOrder};

/// An entity whose secondary fetch failed and whose rows are therefore empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityFailure {
    pub entity_id: EntityId,
    pub display_name: String,
    pub reason: String,
}

/// Immutable result of one aggregation run over a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSnapshot {
    collection: CollectionId,
    generated_at: DateTime<Utc>,
    entity_count: usize,
    rows: EntityRows,
    pivot: PivotTable,
    failures: Vec<EntityFailure>,
}

impl ReportSnapshot {
    /// Build the pivot from `rows.summary` and freeze everything together.
    #[must_use]
    pub fn assemble(
        collection: CollectionId,
        generated_at: DateTime<Utc>,
        entity_count: usize,
        rows: EntityRows,
        failures: Vec<EntityFailure>,
        labeler: &ColumnLabeler,
    ) -> Self {
        let pivot = PivotTable::build(&rows.summary, labeler);
        Self {
            collection,
            generated_at,
            entity_count,
            rows,
            pivot,
            failures,
        }
    }

    #[must_use]
    pub fn collection(&self) -> &CollectionId {
        &self.collection
    }

    #[must_use]
    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    /// Roster size, including entities that degraded to empty.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entity_count
    }

    #[must_use]
    pub fn summary(&self) -> &[SummaryRow] {
        &self.rows.summary
    }

    #[must_use]
    pub fn detail(&self) -> &[DetailRow] {
        &self.rows.detail
    }

    #[must_use]
    pub fn pivot(&self) -> &PivotTable {
        &self.pivot
    }

    #[must_use]
    pub fn failures(&self) -> &[EntityFailure] {
        &self.failures
    }

    #[must_use]
    pub fn export(&self, order: SortOrder) -> ExportTable {
        self.pivot.export(order)
    }

    /// # Errors
    ///
    /// Returns `ExportError` if the CSV writer fails.
    pub fn csv(&self, order: SortOrder) -> Result<String, ExportError> {
        self.export(order).to_csv()
    }
}
