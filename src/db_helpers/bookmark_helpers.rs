use std::collections::HashMap;

use chrono::Utc;
use sqlx::{Sqlite, SqlitePool};

use crate::errors::RequestError;
use crate::models::{Article, Bookmark, Upsert};

use super::get_articles_by_ids;

pub async fn get_bookmark(
    pool: &SqlitePool,
    user_id: i64,
    article_id: i64,
) -> Result<Option<Bookmark>, RequestError> {
    let result = sqlx::query_as::<Sqlite, Bookmark>(
        r#"
        SELECT id, user_id, article_id, created_at FROM bookmarks
        WHERE user_id = $1 AND article_id = $2
        "#,
    )
    .bind(user_id)
    .bind(article_id)
    .fetch_optional(pool)
    .await?;
    Ok(result)
}

/// Creates the (user, article) bookmark, or returns the one that already exists.
pub async fn insert_bookmark_if_absent(
    pool: &SqlitePool,
    user_id: i64,
    article_id: i64,
) -> Result<Upsert<Bookmark>, RequestError> {
    let inserted = sqlx::query_as::<Sqlite, Bookmark>(
        r#"
        INSERT INTO bookmarks (user_id, article_id, created_at)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id, article_id) DO NOTHING
        RETURNING id, user_id, article_id, created_at
        "#,
    )
    .bind(user_id)
    .bind(article_id)
    .bind(Utc::now())
    .fetch_optional(pool)
    .await?;

    if let Some(bookmark) = inserted {
        return Ok(Upsert::Created(bookmark));
    }
    match get_bookmark(pool, user_id, article_id).await? {
        Some(bookmark) => Ok(Upsert::Existing(bookmark)),
        None => Err(RequestError::NotFound("Bookmark not found")),
    }
}

/// Returns whether a row was removed.
pub async fn delete_bookmark(
    pool: &SqlitePool,
    user_id: i64,
    article_id: i64,
) -> Result<bool, RequestError> {
    let result = sqlx::query(
        r#"
        DELETE FROM bookmarks WHERE user_id = $1 AND article_id = $2
        "#,
    )
    .bind(user_id)
    .bind(article_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn bookmark_exists(
    pool: &SqlitePool,
    user_id: i64,
    article_id: i64,
) -> Result<bool, RequestError> {
    Ok(get_bookmark(pool, user_id, article_id).await?.is_some())
}

/// Ids of every article the user has bookmarked.
pub async fn list_bookmarked_article_ids(
    pool: &SqlitePool,
    user_id: i64,
) -> Result<Vec<i64>, RequestError> {
    let result = sqlx::query_scalar::<Sqlite, i64>(
        r#"
        SELECT article_id FROM bookmarks WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(result)
}

/// A user's bookmarks with their articles, most recently bookmarked first.
pub async fn list_bookmarks_with_articles(
    pool: &SqlitePool,
    user_id: i64,
    limit: Option<i64>,
) -> Result<Vec<(Bookmark, Article)>, RequestError> {
    let bookmarks = sqlx::query_as::<Sqlite, Bookmark>(
        r#"
        SELECT id, user_id, article_id, created_at FROM bookmarks
        WHERE user_id = $1
        ORDER BY created_at DESC, id DESC
        LIMIT $2
        "#,
    )
    .bind(user_id)
    // SQLite treats a negative limit as "no limit"
    .bind(limit.unwrap_or(-1))
    .fetch_all(pool)
    .await?;

    let ids = bookmarks.iter().map(|b| b.article_id).collect::<Vec<_>>();
    let mut articles = get_articles_by_ids(pool, &ids)
        .await?
        .into_iter()
        .map(|article| (article.id, article))
        .collect::<HashMap<_, _>>();

    let result = bookmarks
        .into_iter()
        .filter_map(|bookmark| {
            articles
                .remove(&bookmark.article_id)
                .map(|article| (bookmark, article))
        })
        .collect();
    Ok(result)
}
