use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool};

use crate::errors::RequestError;
use crate::models::{Article, ArticleRow, Category, NewArticle, Upsert};

use super::placeholders;

const ARTICLE_SELECT: &str = r#"
            SELECT articles.id                                    AS "id",
                   articles.title                                 AS "title",
                   articles.description                           AS "description",
                   articles.content                               AS "content",
                   articles.url                                   AS "url",
                   articles.url_to_image                          AS "url_to_image",
                   articles.published_at                          AS "published_at",
                   articles.source_name                           AS "source_name",
                   articles.author                                AS "author",
                   articles.summary                               AS "summary",
                   articles.created_at                            AS "created_at",
                   (SELECT Group_concat(article_categories.category, ',')
                    FROM   article_categories
                    WHERE  article_categories.article_id = articles.id) AS "category_list",
                   (SELECT Group_concat(article_tags.tag, char(31))
                    FROM   article_tags
                    WHERE  article_tags.article_id = articles.id)       AS "tag_list"
            FROM   articles
"#;

const NEWEST_FIRST: &str = " ORDER BY articles.published_at DESC, articles.id DESC ";

fn into_articles(rows: Vec<ArticleRow>) -> Vec<Article> {
    rows.into_iter().map(Article::from).collect()
}

pub async fn get_article_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Article>, RequestError> {
    let query = format!("{ARTICLE_SELECT} WHERE articles.id = $1");
    let result = sqlx::query_as::<Sqlite, ArticleRow>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(result.map(Article::from))
}

pub async fn get_article_by_url(
    pool: &SqlitePool,
    url: &str,
) -> Result<Option<Article>, RequestError> {
    let query = format!("{ARTICLE_SELECT} WHERE articles.url = $1");
    let result = sqlx::query_as::<Sqlite, ArticleRow>(&query)
        .bind(url)
        .fetch_optional(pool)
        .await?;
    Ok(result.map(Article::from))
}

pub async fn get_articles_by_ids(
    pool: &SqlitePool,
    ids: &[i64],
) -> Result<Vec<Article>, RequestError> {
    if ids.is_empty() {
        return Ok(vec![]);
    }
    let query = format!(
        "{ARTICLE_SELECT} WHERE articles.id IN ({})",
        placeholders(ids.len())
    );
    let mut result = sqlx::query_as::<Sqlite, ArticleRow>(&query);
    for id in ids {
        result = result.bind(id);
    }
    Ok(into_articles(result.fetch_all(pool).await?))
}

/// One page of articles, newest first. `category = None` lists every category.
pub async fn list_articles_page(
    pool: &SqlitePool,
    category: Option<Category>,
    limit: i64,
    offset: i64,
) -> Result<Vec<Article>, RequestError> {
    let query = format!(
        r#"{ARTICLE_SELECT}
            WHERE ( $1 IS NULL
                    OR EXISTS (SELECT 1
                               FROM   article_categories
                               WHERE  article_categories.article_id = articles.id
                                  AND article_categories.category = $1) )
            {NEWEST_FIRST}
            LIMIT $2 OFFSET $3"#
    );
    let rows = sqlx::query_as::<Sqlite, ArticleRow>(&query)
        .bind(category.map(|c| c.as_str()))
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;
    Ok(into_articles(rows))
}

/// Newest articles whose id is not in `exclude`.
pub async fn list_recent_articles(
    pool: &SqlitePool,
    exclude: &[i64],
    limit: i64,
) -> Result<Vec<Article>, RequestError> {
    let query = if exclude.is_empty() {
        format!("{ARTICLE_SELECT} {NEWEST_FIRST} LIMIT ?")
    } else {
        format!(
            "{ARTICLE_SELECT} WHERE articles.id NOT IN ({}) {NEWEST_FIRST} LIMIT ?",
            placeholders(exclude.len())
        )
    };
    let mut result = sqlx::query_as::<Sqlite, ArticleRow>(&query);
    for id in exclude {
        result = result.bind(id);
    }
    let rows = result.bind(limit).fetch_all(pool).await?;
    Ok(into_articles(rows))
}

/// Articles from any of `sources` or carrying any of `categories`, minus `exclude`.
pub async fn find_articles_matching(
    pool: &SqlitePool,
    sources: &[String],
    categories: &[Category],
    exclude: &[i64],
    limit: i64,
) -> Result<Vec<Article>, RequestError> {
    let mut any_of = vec![];
    if !sources.is_empty() {
        any_of.push(format!(
            "articles.source_name IN ({})",
            placeholders(sources.len())
        ));
    }
    if !categories.is_empty() {
        any_of.push(format!(
            r#"EXISTS (SELECT 1
                       FROM   article_categories
                       WHERE  article_categories.article_id = articles.id
                          AND article_categories.category IN ({}))"#,
            placeholders(categories.len())
        ));
    }
    if any_of.is_empty() {
        return Ok(vec![]);
    }
    let mut query = format!("{ARTICLE_SELECT} WHERE ( {} )", any_of.join(" OR "));
    if !exclude.is_empty() {
        query.push_str(&format!(
            " AND articles.id NOT IN ({})",
            placeholders(exclude.len())
        ));
    }
    query.push_str(NEWEST_FIRST);
    query.push_str(" LIMIT ?");

    let mut result = sqlx::query_as::<Sqlite, ArticleRow>(&query);
    for source in sources {
        result = result.bind(source);
    }
    for category in categories {
        result = result.bind(category.as_str());
    }
    for id in exclude {
        result = result.bind(id);
    }
    let rows = result.bind(limit).fetch_all(pool).await?;
    Ok(into_articles(rows))
}

pub async fn list_articles_published_since(
    pool: &SqlitePool,
    since: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<Article>, sqlx::Error> {
    let query = format!("{ARTICLE_SELECT} WHERE articles.published_at >= $1 {NEWEST_FIRST} LIMIT $2");
    let rows = sqlx::query_as::<Sqlite, ArticleRow>(&query)
        .bind(since)
        .bind(limit)
        .fetch_all(pool)
        .await?;
    Ok(into_articles(rows))
}

/// Stores `article` unless one with the same url already exists.
pub async fn insert_article_if_absent(
    pool: &SqlitePool,
    article: &NewArticle,
) -> Result<Upsert<Article>, RequestError> {
    let mut tx = pool.begin().await?;

    let inserted = sqlx::query_scalar::<Sqlite, i64>(
        r#"
        INSERT INTO articles (title, description, content, url, url_to_image, published_at,
                              source_name, author, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (url) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(&article.title)
    .bind(&article.description)
    .bind(&article.content)
    .bind(&article.url)
    .bind(&article.url_to_image)
    .bind(article.published_at)
    .bind(&article.source_name)
    .bind(&article.author)
    .bind(Utc::now())
    .fetch_optional(&mut tx)
    .await?;

    if let Some(article_id) = inserted {
        for category in &article.categories {
            sqlx::query(
                r#"
            INSERT OR IGNORE INTO article_categories (article_id, category)
            VALUES ($1, $2)
            "#,
            )
            .bind(article_id)
            .bind(category.as_str())
            .execute(&mut tx)
            .await?;
        }
        for tag in &article.tags {
            sqlx::query(
                r#"
            INSERT OR IGNORE INTO article_tags (article_id, tag)
            VALUES ($1, $2)
            "#,
            )
            .bind(article_id)
            .bind(tag)
            .execute(&mut tx)
            .await?;
        }
    }
    tx.commit().await?;

    let result = match inserted {
        Some(id) => get_article_by_id(pool, id).await?.map(Upsert::Created),
        None => get_article_by_url(pool, &article.url)
            .await?
            .map(Upsert::Existing),
    };
    result.ok_or(RequestError::NotFound("Article not found"))
}

pub async fn set_article_summary(
    pool: &SqlitePool,
    id: i64,
    summary: &str,
) -> Result<bool, RequestError> {
    let result = sqlx::query(
        r#"
        UPDATE articles SET summary = $1 WHERE id = $2
        "#,
    )
    .bind(summary)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn count_articles(pool: &SqlitePool) -> Result<i64, RequestError> {
    let count = sqlx::query_scalar::<Sqlite, i64>("SELECT COUNT(*) FROM articles")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
