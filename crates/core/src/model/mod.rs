mod collection;
mod entity;
mod group;
mod ids;
mod rows;

pub use collection::CollectionDetails;
pub use entity::Entity;
pub use group::{Group, GroupProgress, GroupState, LeafItem};
pub use ids::{CollectionId, EntityId, GroupId, LeafItemId};
pub use rows::{DetailRow, SummaryRow};
