use chrono::Utc;
use sqlx::{Sqlite, SqlitePool};

use crate::{errors::RequestError, models::Category, models::User};

use super::QueryBuilder;

const USER_COLUMNS: &str = "id, username, email, password, newsletter_subscription, \
                            newsletter_time, bio, avatar, created_at";

/// Inserts a user whose password is already hashed. `None` when the username
/// or email is taken.
pub async fn insert_user(
    pool: &SqlitePool,
    username: &str,
    email: &str,
    password_hash: &str,
) -> Result<Option<User>, RequestError> {
    let query = format!(
        r#"
        INSERT INTO users (username, email, password, created_at)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT DO NOTHING
        RETURNING {USER_COLUMNS}
        "#
    );
    let user = sqlx::query_as::<Sqlite, User>(&query)
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(Utc::now())
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn get_user_by_id(pool: &SqlitePool, id: i64) -> Result<Option<User>, RequestError> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
    let result = sqlx::query_as::<Sqlite, User>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(result)
}

pub async fn get_user_by_email(
    pool: &SqlitePool,
    email: &str,
) -> Result<Option<User>, RequestError> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
    let result = sqlx::query_as::<Sqlite, User>(&query)
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(result)
}

pub async fn update_profile_in_db(
    pool: &SqlitePool,
    id: i64,
    bio: Option<String>,
    avatar: Option<String>,
) -> Result<Option<User>, RequestError> {
    let update = QueryBuilder::new("UPDATE users SET ", ", ")
        .add_param("bio", bio)
        .add_param("avatar", avatar)
        .build(" WHERE id = ?");

    if let Some((query, params)) = update {
        let mut query = sqlx::query(&query);
        for param in params {
            query = query.bind(param);
        }
        query.bind(id).execute(pool).await?;
    }

    get_user_by_id(pool, id).await
}

pub async fn update_newsletter_in_db(
    pool: &SqlitePool,
    id: i64,
    subscribe: bool,
    time: Option<String>,
) -> Result<Option<User>, RequestError> {
    sqlx::query(
        r#"
        UPDATE users
        SET newsletter_subscription = $1,
            newsletter_time = COALESCE($2, newsletter_time)
        WHERE id = $3
        "#,
    )
    .bind(subscribe)
    .bind(time)
    .bind(id)
    .execute(pool)
    .await?;

    get_user_by_id(pool, id).await
}

/// Subscribed users whose preferred delivery time is exactly `time` (`HH:MM`).
pub async fn list_subscribers_at(pool: &SqlitePool, time: &str) -> Result<Vec<User>, sqlx::Error> {
    let query = format!(
        "SELECT {USER_COLUMNS} FROM users WHERE newsletter_subscription = 1 AND newsletter_time = $1 ORDER BY id"
    );
    sqlx::query_as::<Sqlite, User>(&query)
        .bind(time)
        .fetch_all(pool)
        .await
}

pub async fn get_preferences(pool: &SqlitePool, id: i64) -> Result<Vec<Category>, RequestError> {
    let rows = sqlx::query_scalar::<Sqlite, String>(
        r#"
        SELECT category FROM user_preferences WHERE user_id = $1 ORDER BY rowid
        "#,
    )
    .bind(id)
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().filter_map(|c| c.parse().ok()).collect())
}

/// Replaces the user's preferred categories.
pub async fn set_preferences(
    pool: &SqlitePool,
    id: i64,
    categories: &[Category],
) -> Result<(), RequestError> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM user_preferences WHERE user_id = $1")
        .bind(id)
        .execute(&mut tx)
        .await?;
    for category in categories {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO user_preferences (user_id, category)
            VALUES ($1, $2)
            "#,
        )
        .bind(id)
        .bind(category.as_str())
        .execute(&mut tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}
