//! Headline ingestion and the paginated feed.
//!
//! Articles are pulled from the configured [`NewsSource`], deduplicated by url
//! at the storage layer and always served back from storage, never straight
//! from the provider.

use std::collections::HashSet;

use axum::http::StatusCode;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{error, info};

use crate::db_helpers::{insert_article_if_absent, list_articles_page};
use crate::errors::{ClientError, RequestError};
use crate::models::{Article, Category};
use crate::upstream::{NewsSource, MAX_UPSTREAM_PAGE_SIZE};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryFilter {
    All,
    Only(Category),
}

impl CategoryFilter {
    pub fn parse(value: Option<&str>) -> Result<Self, RequestError> {
        match value.map(str::trim) {
            None | Some("") => Ok(CategoryFilter::Only(Category::General)),
            Some(value) if value.eq_ignore_ascii_case("all") => Ok(CategoryFilter::All),
            Some(value) => value
                .parse()
                .map(CategoryFilter::Only)
                .map_err(|_| RequestError::bad_request(format!("Unknown category: {value}"))),
        }
    }

    fn category(&self) -> Option<Category> {
        match self {
            CategoryFilter::All => None,
            CategoryFilter::Only(category) => Some(*category),
        }
    }

    /// Category requested from the provider; "all" has no upstream equivalent.
    fn upstream_category(&self) -> Category {
        self.category().unwrap_or(Category::General)
    }
}

#[derive(Debug, Clone)]
pub struct FeedRequest {
    pub filter: CategoryFilter,
    pub page: u32,
    pub page_size: u32,
    /// Present on a manual refresh.
    pub since: Option<String>,
}

impl FeedRequest {
    pub fn new(filter: CategoryFilter, page: Option<u32>, page_size: Option<u32>, since: Option<String>) -> Self {
        Self {
            filter,
            page: page.unwrap_or(1).max(1),
            page_size: page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
            since: since.filter(|s| !s.trim().is_empty()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewsPage {
    pub articles: Vec<Article>,
    pub has_more: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub fetched: usize,
    pub created: usize,
}

/// Pulls one batch of headlines for `category` and stores the ones not seen before.
pub async fn ingest(
    pool: &SqlitePool,
    source: &dyn NewsSource,
    category: Category,
    batch_size: u32,
) -> Result<IngestReport, RequestError> {
    let items = source
        .top_headlines(category, batch_size)
        .await
        .map_err(map_client_error)?;

    let fetched_at = Utc::now();
    let mut seen = HashSet::new();
    let mut report = IngestReport {
        fetched: items.len(),
        created: 0,
    };
    for item in items {
        let article = match item.into_new_article(category, fetched_at) {
            Some(article) => article,
            None => continue,
        };
        if !seen.insert(article.url.clone()) {
            continue;
        }
        if insert_article_if_absent(pool, &article).await?.was_created() {
            report.created += 1;
        }
    }
    info!(
        %category,
        fetched = report.fetched,
        created = report.created,
        "stored fetched headlines"
    );
    Ok(report)
}

pub async fn list_news(
    pool: &SqlitePool,
    source: &dyn NewsSource,
    request: &FeedRequest,
) -> Result<NewsPage, RequestError> {
    let limit = i64::from(request.page_size);

    if request.since.is_some() {
        ingest(pool, source, request.filter.upstream_category(), MAX_UPSTREAM_PAGE_SIZE).await?;
        let articles = list_articles_page(pool, request.filter.category(), limit, 0).await?;
        return Ok(NewsPage {
            articles,
            has_more: false,
        });
    }

    let offset = i64::from(request.page - 1) * limit;
    let mut articles =
        list_articles_page(pool, request.filter.category(), limit + 1, offset).await?;

    if articles.is_empty() && request.page == 1 {
        ingest(pool, source, request.filter.upstream_category(), MAX_UPSTREAM_PAGE_SIZE).await?;
        articles = list_articles_page(pool, request.filter.category(), limit + 1, 0).await?;
    }

    let has_more = articles.len() > request.page_size as usize;
    articles.truncate(request.page_size as usize);
    Ok(NewsPage { articles, has_more })
}

fn map_client_error(err: ClientError) -> RequestError {
    match err {
        ClientError::MissingKey(_) => {
            RequestError::Configuration(StatusCode::BAD_REQUEST, "NewsAPI key not configured")
        }
        err => {
            error!("Error fetching news: {}", err);
            RequestError::Upstream("Failed to fetch news")
        }
    }
}
