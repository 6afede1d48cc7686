use chrono::Utc;
use sqlx::{Sqlite, SqlitePool};

use crate::errors::RequestError;
use crate::models::{Interaction, InteractionKind};

// Interactions are append-only.

pub async fn record_interaction(
    pool: &SqlitePool,
    user_id: i64,
    article_id: i64,
    kind: InteractionKind,
) -> Result<Interaction, RequestError> {
    let interaction = sqlx::query_as::<Sqlite, Interaction>(
        r#"
        INSERT INTO interactions (user_id, article_id, kind, timestamp)
        VALUES ($1, $2, $3, $4)
        RETURNING id, user_id, article_id, kind, timestamp
        "#,
    )
    .bind(user_id)
    .bind(article_id)
    .bind(kind)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;
    Ok(interaction)
}

/// A user's interaction history, newest first. Nothing in the request path reads
/// it back yet; it is exported for callers that audit or replay activity.
pub async fn list_interactions_for_user(
    pool: &SqlitePool,
    user_id: i64,
) -> Result<Vec<Interaction>, RequestError> {
    let result = sqlx::query_as::<Sqlite, Interaction>(
        r#"
        SELECT id, user_id, article_id, kind, timestamp FROM interactions
        WHERE user_id = $1
        ORDER BY timestamp DESC, id DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(result)
}
