use serde::{Deserialize, Serialize};

use crate::model::ids::CollectionId;

/// Headline information about a collection (course).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionDetails {
    pub id: CollectionId,
    pub name: String,
    pub code: Option<String>,
}
