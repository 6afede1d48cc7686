use std::{sync::Arc, time::Duration};

use axum::http::StatusCode;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, error, info};

use crate::cache::SummaryCache;
use crate::db_helpers::{get_article_by_id, set_article_summary};
use crate::errors::{ClientError, RequestError};

const MAX_TOKENS: u32 = 150;
const TEMPERATURE: f32 = 0.3;
const CACHE_KEY_LENGTH: usize = 50;

/// Anything that can turn a prompt into a completion.
#[axum::async_trait]
pub trait SummaryGenerator: Send + Sync {
    /// `Ok(None)` when the provider answered without any text.
    async fn complete(&self, prompt: &str) -> Result<Option<String>, ClientError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// OpenAI-compatible chat completion client, pointed at OpenRouter by default.
pub struct OpenRouterClient {
    client: Client,
    api_key: Option<String>,
    endpoint: String,
    model: String,
}

impl OpenRouterClient {
    pub fn new(api_key: Option<String>, endpoint: String, model: String) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;
        Ok(Self {
            client,
            api_key,
            endpoint,
            model,
        })
    }
}

#[axum::async_trait]
impl SummaryGenerator for OpenRouterClient {
    async fn complete(&self, prompt: &str) -> Result<Option<String>, ClientError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ClientError::MissingKey("OPENROUTER_API_KEY"))?;

        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(ClientError::Api(error_text));
        }

        let body: ChatResponse = response.json().await?;
        Ok(body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryRequest {
    pub title: String,
    pub description: String,
    pub url: Option<String>,
    pub article_id: Option<i64>,
}

pub fn build_prompt(title: &str, description: &str) -> String {
    format!(
        "Please provide a concise 2-3 sentence summary of this news article:\n\n\
         Title: {title}\n\
         Description: {description}\n\n\
         Summary:"
    )
}

/// `summary_` followed by the first 50 characters of the base64 encoded url,
/// title, or `default`, whichever is present first.
pub fn cache_key(url: Option<&str>, title: &str) -> String {
    let source = url
        .filter(|url| !url.is_empty())
        .or(Some(title).filter(|title| !title.is_empty()))
        .unwrap_or("default");
    let encoded = STANDARD.encode(source.as_bytes());
    let end = encoded.len().min(CACHE_KEY_LENGTH);
    format!("summary_{}", &encoded[..end])
}

pub struct Summarizer {
    generator: Arc<dyn SummaryGenerator>,
    cache: Arc<dyn SummaryCache>,
}

impl Summarizer {
    pub fn new(generator: Arc<dyn SummaryGenerator>, cache: Arc<dyn SummaryCache>) -> Self {
        Self { generator, cache }
    }

    pub fn cache(&self) -> &Arc<dyn SummaryCache> {
        &self.cache
    }

    /// Stored summary, then cache, then the generator.
    pub async fn summarize(
        &self,
        pool: &SqlitePool,
        request: &SummaryRequest,
    ) -> Result<String, RequestError> {
        if request.title.trim().is_empty() || request.description.trim().is_empty() {
            return Err(RequestError::bad_request("Title and description are required"));
        }

        if let Some(article_id) = request.article_id {
            if let Some(summary) = get_article_by_id(pool, article_id)
                .await?
                .and_then(|article| article.summary)
                .filter(|summary| !summary.is_empty())
            {
                debug!(article_id, "using stored summary");
                return Ok(summary);
            }
        }

        let key = cache_key(request.url.as_deref(), &request.title);
        if let Some(summary) = self.cache.get(&key) {
            debug!(key, "summary cache hit");
            return Ok(summary);
        }

        let prompt = build_prompt(&request.title, &request.description);
        let completion = self.generator.complete(&prompt).await.map_err(|e| match e {
            ClientError::MissingKey(_) => RequestError::Configuration(
                StatusCode::INTERNAL_SERVER_ERROR,
                "OpenRouter API key not configured",
            ),
            e => {
                error!("Error summarizing article: {}", e);
                RequestError::Upstream("Failed to summarize article")
            }
        })?;

        let summary = match completion.map(|text| text.trim().to_string()) {
            Some(summary) if !summary.is_empty() => summary,
            _ => return Err(RequestError::Generation),
        };

        self.cache.set(&key, summary.clone());
        if let Some(article_id) = request.article_id {
            set_article_summary(pool, article_id, &summary).await?;
        }
        info!(key, "generated summary");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_prefers_url_then_title() {
        let by_url = cache_key(Some("https://example.com/a"), "Title");
        assert_eq!(by_url, format!("summary_{}", STANDARD.encode("https://example.com/a")));
        assert_eq!(cache_key(None, "Title"), format!("summary_{}", STANDARD.encode("Title")));
        assert_eq!(cache_key(Some(""), ""), format!("summary_{}", STANDARD.encode("default")));
    }

    #[test]
    fn cache_key_is_truncated() {
        let long = "https://example.com/".repeat(10);
        let key = cache_key(Some(&long), "t");
        assert_eq!(key.len(), "summary_".len() + CACHE_KEY_LENGTH);
    }

    #[test]
    fn prompt_embeds_title_and_description() {
        let prompt = build_prompt("Rust 2.0", "A new edition");
        assert!(prompt.starts_with("Please provide a concise 2-3 sentence summary"));
        assert!(prompt.contains("Title: Rust 2.0\nDescription: A new edition\n\nSummary:"));
    }
}
