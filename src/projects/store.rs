// src/projects/store.rs
//! Project persistence. Every query is scoped to the owning user.

use sqlx::SqlitePool;
use uuid::Uuid;

use super::models::{ContentPatch, NewProject, Project};

/// Insert a new project row for a completed generation.
pub async fn insert_project(
    pool: &SqlitePool,
    user_id: &str,
    new: &NewProject,
) -> Result<Project, sqlx::Error> {
    let id = Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO projects (
            id, user_id, selected_style_id, thumbnail_storage_path,
            generated_yt_title, generated_yt_description, generated_yt_tags,
            created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, datetime('now'), datetime('now'))
        "#,
    )
    .bind(&id)
    .bind(user_id)
    .bind(&new.selected_style_id)
    .bind(&new.thumbnail_storage_path)
    .bind(&new.generated_yt_title)
    .bind(&new.generated_yt_description)
    .bind(&new.generated_yt_tags)
    .execute(pool)
    .await?;

    fetch_by_id(pool, user_id, &id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
}

pub async fn fetch_by_id(
    pool: &SqlitePool,
    user_id: &str,
    id: &str,
) -> Result<Option<Project>, sqlx::Error> {
    sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

/// The project the "regenerate" paths target: the most recent row for this
/// user and style.
pub async fn latest_for_style(
    pool: &SqlitePool,
    user_id: &str,
    style_id: &str,
) -> Result<Option<Project>, sqlx::Error> {
    sqlx::query_as::<_, Project>(
        r#"
        SELECT * FROM projects
        WHERE user_id = ? AND selected_style_id = ?
        ORDER BY created_at DESC, rowid DESC
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .bind(style_id)
    .fetch_optional(pool)
    .await
}

/// Replace only the thumbnail of the latest project for the style.
/// Returns the updated row, or None when the user has no project for it.
pub async fn update_thumbnail(
    pool: &SqlitePool,
    user_id: &str,
    style_id: &str,
    image_url: &str,
) -> Result<Option<Project>, sqlx::Error> {
    let Some(existing) = latest_for_style(pool, user_id, style_id).await? else {
        return Ok(None);
    };

    sqlx::query(
        r#"
        UPDATE projects
        SET thumbnail_storage_path = ?, updated_at = datetime('now')
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(image_url)
    .bind(&existing.id)
    .bind(user_id)
    .execute(pool)
    .await?;

    fetch_by_id(pool, user_id, &existing.id).await
}

/// Apply a partial content update to the latest project for the style.
/// COALESCE keeps absent fields at their current values.
pub async fn update_content(
    pool: &SqlitePool,
    user_id: &str,
    style_id: &str,
    patch: &ContentPatch,
) -> Result<Option<Project>, sqlx::Error> {
    let Some(existing) = latest_for_style(pool, user_id, style_id).await? else {
        return Ok(None);
    };

    sqlx::query(
        r#"
        UPDATE projects
        SET generated_yt_title = COALESCE(?, generated_yt_title),
            generated_yt_description = COALESCE(?, generated_yt_description),
            generated_yt_tags = COALESCE(?, generated_yt_tags),
            updated_at = datetime('now')
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(&patch.generated_yt_title)
    .bind(&patch.generated_yt_description)
    .bind(&patch.generated_yt_tags)
    .bind(&existing.id)
    .bind(user_id)
    .execute(pool)
    .await?;

    fetch_by_id(pool, user_id, &existing.id).await
}

/// All projects owned by the user, newest first.
pub async fn list_projects(pool: &SqlitePool, user_id: &str) -> Result<Vec<Project>, sqlx::Error> {
    sqlx::query_as::<_, Project>(
        "SELECT * FROM projects WHERE user_id = ? ORDER BY created_at DESC, rowid DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}
