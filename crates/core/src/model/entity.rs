use serde::{Deserialize, Serialize};

use crate::model::ids::EntityId;

/// A roster member of a collection, as returned by the remote platform.
///
/// `external_id` is the institution-facing identifier (SIS id). It is often
/// missing for test or guest accounts, in which case the platform id stands in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    id: EntityId,
    display_name: String,
    external_id: Option<String>,
}

impl Entity {
    #[must_use]
    pub fn new(
        id: EntityId,
        display_name: impl Into<String>,
        external_id: Option<String>,
    ) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            external_id: external_id.filter(|value| !value.trim().is_empty()),
        }
    }

    #[must_use]
    pub fn id(&self) -> &EntityId {
        &self.id
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    #[must_use]
    pub fn external_id(&self) -> Option<&str> {
        self.external_id.as_deref()
    }

    /// External id when present, otherwise the platform id.
    #[must_use]
    pub fn external_id_or_id(&self) -> &str {
        self.external_id().unwrap_or_else(|| self.id.as_str())
    }
}
