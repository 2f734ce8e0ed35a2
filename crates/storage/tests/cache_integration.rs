use std::sync::Arc;

use progress_core::model::{
    CollectionId, Entity, EntityId, Group, GroupId, GroupState, LeafItem, LeafItemId,
};
use progress_core::time::fixed_now;
use progress_core::{ColumnLabeler, ExclusionRule, ReportSnapshot, flatten_entity};
use storage::{CacheEntry, FailureRecord, InMemoryReportRepository, ReportRepository};

fn build_snapshot(collection: &str) -> Arc<ReportSnapshot> {
    let entity = Entity::new(EntityId::from(1), "Ana", Some("A1".into()));
    let groups = vec![Group {
        id: GroupId::from(10),
        name: "Unidad 1".into(),
        state: Some(GroupState::Completed),
        items: vec![LeafItem {
            id: LeafItemId::from(100),
            title: "Quiz".into(),
            kind: "Quiz".into(),
            requirement_kind: Some("must_submit".into()),
            completed: Some(true),
            due_at: None,
            url: None,
        }],
    }];
    let rows = flatten_entity(&entity, &groups, &ExclusionRule::default());
    Arc::new(ReportSnapshot::assemble(
        CollectionId::from(collection),
        fixed_now(),
        1,
        rows,
        Vec::new(),
        &ColumnLabeler::default(),
    ))
}

#[tokio::test]
async fn clones_share_one_cache_through_the_trait_object() {
    let repo = InMemoryReportRepository::new();
    let shared: Arc<dyn ReportRepository> = Arc::new(repo.clone());
    let snapshot = build_snapshot("7");

    shared.store_ready(Arc::clone(&snapshot)).await.unwrap();

    match repo.get_entry(&CollectionId::from(7)).await.unwrap() {
        Some(CacheEntry::Ready(cached)) => {
            assert!(Arc::ptr_eq(&cached, &snapshot));
            assert_eq!(cached.summary()[0].progress_pct, 100);
        }
        other => panic!("unexpected entry: {other:?}"),
    }
}

#[tokio::test]
async fn collections_are_cached_independently() {
    let repo = InMemoryReportRepository::new();
    repo.store_ready(build_snapshot("1")).await.unwrap();
    repo.store_failure(
        &CollectionId::from(2),
        FailureRecord {
            reason: "roster fetch failed".into(),
            failed_at: fixed_now(),
        },
    )
    .await
    .unwrap();

    assert!(matches!(
        repo.get_entry(&CollectionId::from(1)).await.unwrap(),
        Some(CacheEntry::Ready(_))
    ));
    assert!(matches!(
        repo.get_entry(&CollectionId::from(2)).await.unwrap(),
        Some(CacheEntry::Failed(_))
    ));
    assert!(repo.get_entry(&CollectionId::from(3)).await.unwrap().is_none());

    assert!(repo.invalidate(&CollectionId::from(1)).await.unwrap());
    assert!(matches!(
        repo.get_entry(&CollectionId::from(2)).await.unwrap(),
        Some(CacheEntry::Failed(_))
    ));
}
