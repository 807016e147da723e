/// Integration tests for the membership store
///
/// These tests require a running PostgreSQL server (see tests/common/mod.rs).
/// Run with: cargo test -p segmenter-shared --test store_tests

mod common;

use common::{seed_users, TestDb};
use segmenter_shared::db::migrations::{get_migration_status, missing_tables, run_migrations};
use segmenter_shared::db::pool::{get_pool_stats, health_check};
use segmenter_shared::error::{ErrorKind, StoreError};

#[tokio::test]
async fn test_migrations_create_schema_and_are_idempotent() {
    let Some(db) = TestDb::new().await else { return };

    health_check(&db.pool).await.unwrap();
    assert!(missing_tables(&db.pool).await.unwrap().is_empty());

    let before = get_migration_status(&db.pool).await.unwrap();
    assert!(before.applied_migrations > 0);

    run_migrations(&db.pool).await.unwrap();
    let after = get_migration_status(&db.pool).await.unwrap();
    assert_eq!(before, after);

    assert!(get_pool_stats(&db.pool).total_connections > 0);

    db.cleanup().await;
}

#[tokio::test]
async fn test_create_user_is_idempotent() {
    let Some(db) = TestDb::new().await else { return };

    let first = db.store.create_user(15230).await.unwrap();
    assert!(first.created);
    assert_eq!(first.record.id, 15230);

    let second = db.store.create_user(15230).await.unwrap();
    assert!(!second.created);
    assert_eq!(second.record.id, 15230);

    assert_eq!(db.store.all_users().await.unwrap().len(), 1);

    db.cleanup().await;
}

#[tokio::test]
async fn test_create_segment_is_idempotent() {
    let Some(db) = TestDb::new().await else { return };

    let first = db.store.create_segment("MAIL_GPT").await.unwrap();
    assert!(first.created);

    let second = db.store.create_segment("MAIL_GPT").await.unwrap();
    assert!(!second.created);
    assert_eq!(first.record.id, second.record.id);
    assert_eq!(second.record.name, "MAIL_GPT");

    assert_eq!(db.store.all_segments().await.unwrap().len(), 1);

    db.cleanup().await;
}

#[tokio::test]
async fn test_add_membership_is_idempotent() {
    let Some(db) = TestDb::new().await else { return };

    db.store.create_user(15230).await.unwrap();
    db.store.create_segment("MAIL_GPT").await.unwrap();

    assert!(db.store.add_membership(15230, "MAIL_GPT").await.unwrap());
    assert!(!db.store.add_membership(15230, "MAIL_GPT").await.unwrap());

    assert_eq!(db.store.users_of("MAIL_GPT").await.unwrap(), vec![15230]);
    assert_eq!(
        db.store.segments_of(15230).await.unwrap(),
        vec!["MAIL_GPT".to_string()]
    );

    db.cleanup().await;
}

#[tokio::test]
async fn test_add_then_remove_restores_membership() {
    let Some(db) = TestDb::new().await else { return };

    seed_users(&db.store, 15230, 3).await;
    db.store.create_segment("CLOUD_DISCOUNT_30").await.unwrap();
    db.store.add_membership(15231, "CLOUD_DISCOUNT_30").await.unwrap();

    let before = db.store.users_of("CLOUD_DISCOUNT_30").await.unwrap();

    db.store.add_membership(15232, "CLOUD_DISCOUNT_30").await.unwrap();
    assert!(db.store.remove_membership(15232, "CLOUD_DISCOUNT_30").await.unwrap());

    assert_eq!(db.store.users_of("CLOUD_DISCOUNT_30").await.unwrap(), before);

    db.cleanup().await;
}

#[tokio::test]
async fn test_remove_missing_membership_is_noop() {
    let Some(db) = TestDb::new().await else { return };

    db.store.create_user(15230).await.unwrap();
    db.store.create_segment("MAIL_GPT").await.unwrap();

    assert!(!db.store.remove_membership(15230, "MAIL_GPT").await.unwrap());

    db.cleanup().await;
}

#[tokio::test]
async fn test_membership_requires_both_endpoints() {
    let Some(db) = TestDb::new().await else { return };

    db.store.create_user(15230).await.unwrap();
    db.store.create_segment("MAIL_GPT").await.unwrap();

    let err = db.store.add_membership(99999, "MAIL_GPT").await.unwrap_err();
    assert!(matches!(err, StoreError::UserNotFound(99999)));

    let err = db.store.add_membership(15230, "NOPE").await.unwrap_err();
    assert!(matches!(err, StoreError::SegmentNotFound(ref name) if name == "NOPE"));

    let err = db.store.remove_membership(99999, "MAIL_GPT").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = db.store.remove_membership(15230, "NOPE").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    db.cleanup().await;
}

#[tokio::test]
async fn test_lookups_of_unknown_entities_fail() {
    let Some(db) = TestDb::new().await else { return };

    assert!(db.store.segments_of(1).await.unwrap_err().is_not_found());
    assert!(db.store.users_of("MAIL_GPT").await.unwrap_err().is_not_found());
    assert!(db.store.delete_segment("MAIL_GPT").await.unwrap_err().is_not_found());
    assert!(db.store.delete_user(1).await.unwrap_err().is_not_found());
    assert!(db
        .store
        .rename_segment("MAIL_GPT", "OTHER")
        .await
        .unwrap_err()
        .is_not_found());

    db.cleanup().await;
}

#[tokio::test]
async fn test_user_without_segments_has_empty_list() {
    let Some(db) = TestDb::new().await else { return };

    db.store.create_user(15230).await.unwrap();
    assert!(db.store.segments_of(15230).await.unwrap().is_empty());

    let users = db.store.all_users().await.unwrap();
    assert_eq!(users.len(), 1);
    assert!(users[0].segments.is_empty());

    db.cleanup().await;
}

#[tokio::test]
async fn test_delete_segment_cascades_memberships() {
    let Some(db) = TestDb::new().await else { return };

    seed_users(&db.store, 15230, 3).await;
    for name in ["MAIL_VOICE_MESSAGES", "CLOUD_DISCOUNT_30", "MAIL_GPT"] {
        db.store.create_segment(name).await.unwrap();
        db.store.add_membership(15230, name).await.unwrap();
    }
    db.store.add_membership(15231, "MAIL_GPT").await.unwrap();

    db.store.delete_segment("MAIL_GPT").await.unwrap();

    for user_id in [15230, 15231, 15232] {
        let segments = db.store.segments_of(user_id).await.unwrap();
        assert!(!segments.contains(&"MAIL_GPT".to_string()));
    }
    assert_eq!(
        db.store.segments_of(15230).await.unwrap(),
        vec!["CLOUD_DISCOUNT_30".to_string(), "MAIL_VOICE_MESSAGES".to_string()]
    );

    let segments = db.store.all_segments().await.unwrap();
    assert!(segments.iter().all(|s| s.name != "MAIL_GPT"));

    let orphans: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM user_segments us LEFT JOIN segments s ON s.id = us.segment_id WHERE s.id IS NULL",
    )
    .fetch_one(&db.pool)
    .await
    .unwrap();
    assert_eq!(orphans, 0);

    db.cleanup().await;
}

#[tokio::test]
async fn test_delete_user_cascades_memberships() {
    let Some(db) = TestDb::new().await else { return };

    seed_users(&db.store, 15230, 2).await;
    db.store.create_segment("MAIL_GPT").await.unwrap();
    db.store.add_membership(15230, "MAIL_GPT").await.unwrap();
    db.store.add_membership(15231, "MAIL_GPT").await.unwrap();

    db.store.delete_user(15230).await.unwrap();

    assert_eq!(db.store.users_of("MAIL_GPT").await.unwrap(), vec![15231]);
    assert!(db.store.segments_of(15230).await.unwrap_err().is_not_found());

    db.cleanup().await;
}

#[tokio::test]
async fn test_rename_segment_keeps_memberships() {
    let Some(db) = TestDb::new().await else { return };

    db.store.create_user(15230).await.unwrap();
    let created = db.store.create_segment("MAIL_GPT").await.unwrap();
    db.store.add_membership(15230, "MAIL_GPT").await.unwrap();

    let renamed = db.store.rename_segment("MAIL_GPT", "MAIL_GPT_V2").await.unwrap();
    assert_eq!(renamed.id, created.record.id);
    assert_eq!(renamed.name, "MAIL_GPT_V2");

    assert_eq!(
        db.store.segments_of(15230).await.unwrap(),
        vec!["MAIL_GPT_V2".to_string()]
    );
    assert!(db.store.users_of("MAIL_GPT").await.unwrap_err().is_not_found());

    db.cleanup().await;
}

#[tokio::test]
async fn test_rename_to_taken_name_conflicts() {
    let Some(db) = TestDb::new().await else { return };

    db.store.create_segment("MAIL_GPT").await.unwrap();
    db.store.create_segment("CLOUD_DISCOUNT_30").await.unwrap();

    let err = db
        .store
        .rename_segment("MAIL_GPT", "CLOUD_DISCOUNT_30")
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::SegmentNameTaken(ref name) if name == "CLOUD_DISCOUNT_30"));
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let names: Vec<String> = db
        .store
        .all_segments()
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.name)
        .collect();
    assert_eq!(names, vec!["MAIL_GPT".to_string(), "CLOUD_DISCOUNT_30".to_string()]);

    db.cleanup().await;
}

#[tokio::test]
async fn test_rename_to_same_name_is_noop() {
    let Some(db) = TestDb::new().await else { return };

    let created = db.store.create_segment("MAIL_GPT").await.unwrap();
    let renamed = db.store.rename_segment("MAIL_GPT", "MAIL_GPT").await.unwrap();
    assert_eq!(renamed, created.record);

    db.cleanup().await;
}

#[tokio::test]
async fn test_all_segments_lists_members() {
    let Some(db) = TestDb::new().await else { return };

    seed_users(&db.store, 15230, 3).await;
    db.store.create_segment("MAIL_GPT").await.unwrap();
    db.store.create_segment("EMPTY").await.unwrap();
    db.store.add_membership(15232, "MAIL_GPT").await.unwrap();
    db.store.add_membership(15230, "MAIL_GPT").await.unwrap();

    let segments = db.store.all_segments().await.unwrap();
    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0].name, "MAIL_GPT");
    assert_eq!(segments[0].users, vec![15230, 15232]);
    assert!(segments[1].users.is_empty());

    db.cleanup().await;
}
