use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use crate::errors::ClientError;
use crate::models::{Category, NewArticle};

/// NewsAPI caps `pageSize` at 100.
pub const MAX_UPSTREAM_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpstreamSource {
    pub name: Option<String>,
}

/// One headline as returned by the provider.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpstreamArticle {
    pub source: UpstreamSource,
    pub author: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub url_to_image: Option<String>,
    pub published_at: Option<String>,
    pub content: Option<String>,
}

impl UpstreamArticle {
    /// Converts to a storable article tagged with `category`. Items without a
    /// url or title, and the provider's "[Removed]" placeholders, yield `None`.
    pub fn into_new_article(self, category: Category, fetched_at: DateTime<Utc>) -> Option<NewArticle> {
        let url = self.url.filter(|url| !url.trim().is_empty())?;
        let title = self
            .title
            .filter(|title| !title.trim().is_empty() && title != "[Removed]")?;
        let published_at = self
            .published_at
            .as_deref()
            .and_then(|value| DateTime::parse_from_rfc3339(value).ok())
            .map(|value| value.with_timezone(&Utc))
            .unwrap_or(fetched_at);
        Some(NewArticle {
            title,
            description: self.description,
            content: self.content,
            url: url.trim().to_string(),
            url_to_image: self.url_to_image,
            published_at,
            source_name: self.source.name,
            author: self.author,
            categories: vec![category],
            tags: vec![],
        })
    }
}

#[axum::async_trait]
pub trait NewsSource: Send + Sync {
    async fn top_headlines(
        &self,
        category: Category,
        page_size: u32,
    ) -> Result<Vec<UpstreamArticle>, ClientError>;
}

#[derive(Debug, Deserialize)]
struct HeadlinesResponse {
    #[serde(default)]
    articles: Vec<UpstreamArticle>,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    message: Option<String>,
}

pub struct NewsApiClient {
    client: Client,
    api_key: Option<String>,
    endpoint: String,
    country: String,
}

impl NewsApiClient {
    pub fn new(api_key: Option<String>, endpoint: String, country: String) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            api_key,
            endpoint,
            country,
        })
    }
}

#[axum::async_trait]
impl NewsSource for NewsApiClient {
    async fn top_headlines(
        &self,
        category: Category,
        page_size: u32,
    ) -> Result<Vec<UpstreamArticle>, ClientError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ClientError::MissingKey("NEWS_API_KEY"))?;
        let page_size = page_size.clamp(1, MAX_UPSTREAM_PAGE_SIZE).to_string();

        info!(%category, "fetching top headlines");
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("category", category.as_str()),
                ("country", self.country.as_str()),
                ("pageSize", page_size.as_str()),
            ])
            .header("X-Api-Key", api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response
                .json::<ProviderError>()
                .await
                .ok()
                .and_then(|e| e.message)
                .unwrap_or_else(|| status.to_string());
            return Err(ClientError::Api(message));
        }

        let body: HeadlinesResponse = response.json().await?;
        info!(%category, count = body.articles.len(), "received headlines");
        Ok(body.articles)
    }
}
