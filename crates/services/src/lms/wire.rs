//! JSON shapes returned by the platform, mapped onto domain types.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use progress_core::model::{
    CollectionDetails, CollectionId, Entity, EntityId, Group, GroupId, GroupState, LeafItem,
    LeafItemId,
};

#[derive(Debug, Deserialize)]
pub(crate) struct EnrollmentDto {
    user: UserDto,
    #[serde(default)]
    sis_user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserDto {
    id: EntityId,
    name: String,
    #[serde(default)]
    sis_user_id: Option<String>,
}

impl From<EnrollmentDto> for Entity {
    fn from(dto: EnrollmentDto) -> Self {
        let external_id = dto.user.sis_user_id.or(dto.sis_user_id);
        Entity::new(dto.user.id, dto.user.name, external_id)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ModuleDto {
    id: GroupId,
    name: String,
    #[serde(default)]
    state: Option<GroupState>,
    #[serde(default)]
    items: Option<Vec<ModuleItemDto>>,
}

#[derive(Debug, Deserialize)]
struct ModuleItemDto {
    id: LeafItemId,
    #[serde(default)]
    title: String,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    completion_requirement: Option<CompletionRequirementDto>,
    #[serde(default)]
    content_details: Option<ContentDetailsDto>,
    #[serde(default)]
    html_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionRequirementDto {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    completed: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct ContentDetailsDto {
    #[serde(default)]
    due_at: Option<DateTime<Utc>>,
}

impl From<ModuleDto> for Group {
    fn from(dto: ModuleDto) -> Self {
        Group {
            id: dto.id,
            name: dto.name,
            state: dto.state,
            items: dto
                .items
                .unwrap_or_default()
                .into_iter()
                .map(LeafItem::from)
                .collect(),
        }
    }
}

impl From<ModuleItemDto> for LeafItem {
    fn from(dto: ModuleItemDto) -> Self {
        let (requirement_kind, completed) = match dto.completion_requirement {
            Some(requirement) => (Some(requirement.kind), requirement.completed),
            None => (None, None),
        };
        LeafItem {
            id: dto.id,
            title: dto.title,
            kind: dto.kind,
            requirement_kind,
            completed,
            due_at: dto.content_details.and_then(|details| details.due_at),
            url: dto.html_url,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CourseDto {
    id: CollectionId,
    name: String,
    #[serde(default)]
    course_code: Option<String>,
}

impl From<CourseDto> for CollectionDetails {
    fn from(dto: CourseDto) -> Self {
        CollectionDetails {
            id: dto.id,
            name: dto.name,
            code: dto.course_code,
        }
    }
}
