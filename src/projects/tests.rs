//! Tests for the project store

use super::models::{ContentPatch, NewProject};
use super::store;
use crate::common::migrations::run_migrations;
use sqlx::SqlitePool;

async fn pool_with_user() -> SqlitePool {
    let pool = SqlitePool::connect(":memory:").await.unwrap();
    run_migrations(&pool).await.unwrap();
    sqlx::query("INSERT INTO users (id, email) VALUES ('u1', 'u1@example.com')")
        .execute(&pool)
        .await
        .unwrap();
    pool
}

fn sample_project(style: &str) -> NewProject {
    NewProject {
        selected_style_id: style.to_string(),
        thumbnail_storage_path: "data:image/png;base64,AAAA".to_string(),
        generated_yt_title: Some("Original Title".to_string()),
        generated_yt_description: Some("Original description".to_string()),
        generated_yt_tags: Some("cooking, pasta, chef".to_string()),
    }
}

#[tokio::test]
async fn insert_and_fetch_round_trips() {
    let pool = pool_with_user().await;
    let project = store::insert_project(&pool, "u1", &sample_project("beast-style"))
        .await
        .unwrap();

    assert_eq!(project.user_id, "u1");
    assert_eq!(project.selected_style_id, "beast-style");
    assert_eq!(project.generated_yt_title.as_deref(), Some("Original Title"));
}

#[tokio::test]
async fn latest_for_style_prefers_newest() {
    let pool = pool_with_user().await;
    store::insert_project(&pool, "u1", &sample_project("beast-style"))
        .await
        .unwrap();
    let mut second = sample_project("beast-style");
    second.generated_yt_title = Some("Second Title".to_string());
    let newest = store::insert_project(&pool, "u1", &second).await.unwrap();

    let latest = store::latest_for_style(&pool, "u1", "beast-style")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(latest.id, newest.id);
}

#[tokio::test]
async fn update_thumbnail_preserves_text_fields() {
    let pool = pool_with_user().await;
    store::insert_project(&pool, "u1", &sample_project("beast-style"))
        .await
        .unwrap();

    let updated = store::update_thumbnail(&pool, "u1", "beast-style", "https://cdn.example.com/new.png")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(updated.thumbnail_storage_path, "https://cdn.example.com/new.png");
    assert_eq!(updated.generated_yt_title.as_deref(), Some("Original Title"));
    assert_eq!(
        updated.generated_yt_tags.as_deref(),
        Some("cooking, pasta, chef")
    );
}

#[tokio::test]
async fn update_thumbnail_without_project_is_none() {
    let pool = pool_with_user().await;
    let result = store::update_thumbnail(&pool, "u1", "beast-style", "https://x.test/a.png")
        .await
        .unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn single_field_patch_leaves_siblings_unchanged() {
    let pool = pool_with_user().await;
    store::insert_project(&pool, "u1", &sample_project("beast-style"))
        .await
        .unwrap();

    let patch = ContentPatch {
        generated_yt_tags: Some("new, tags, only".to_string()),
        ..Default::default()
    };
    let updated = store::update_content(&pool, "u1", "beast-style", &patch)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(updated.generated_yt_tags.as_deref(), Some("new, tags, only"));
    assert_eq!(updated.generated_yt_title.as_deref(), Some("Original Title"));
    assert_eq!(
        updated.generated_yt_description.as_deref(),
        Some("Original description")
    );
}

#[tokio::test]
async fn queries_are_owner_scoped() {
    let pool = pool_with_user().await;
    sqlx::query("INSERT INTO users (id, email) VALUES ('u2', 'u2@example.com')")
        .execute(&pool)
        .await
        .unwrap();
    store::insert_project(&pool, "u1", &sample_project("beast-style"))
        .await
        .unwrap();

    // u2 sees nothing of u1's work.
    assert!(store::latest_for_style(&pool, "u2", "beast-style")
        .await
        .unwrap()
        .is_none());
    assert!(store::list_projects(&pool, "u2").await.unwrap().is_empty());
    assert!(store::update_content(
        &pool,
        "u2",
        "beast-style",
        &ContentPatch {
            generated_yt_title: Some("stolen".to_string()),
            ..Default::default()
        }
    )
    .await
    .unwrap()
    .is_none());
}

#[tokio::test]
async fn list_projects_is_newest_first() {
    let pool = pool_with_user().await;
    store::insert_project(&pool, "u1", &sample_project("beast-style"))
        .await
        .unwrap();
    let newest = store::insert_project(&pool, "u1", &sample_project("cinematic-style"))
        .await
        .unwrap();

    let projects = store::list_projects(&pool, "u1").await.unwrap();
    assert_eq!(projects.len(), 2);
    assert_eq!(projects[0].id, newest.id);
}
