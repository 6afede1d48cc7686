use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Category, NewArticle};

// ----------------- Auth Request -----------------
#[derive(Deserialize, Serialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

// ----------------- News Request -----------------
#[derive(Deserialize, Serialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewsQueryParams {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub since: Option<String>,
}

// ----------------- Bookmark Request -----------------
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookmarkAction {
    Add,
    Remove,
}

#[derive(Deserialize, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkRequest {
    /// Kept as text so an unknown action is a 400 with a message, not a body rejection.
    pub action: String,
    #[serde(default)]
    pub article_data: ArticleData,
}

impl BookmarkRequest {
    pub fn action(&self) -> Option<BookmarkAction> {
        match self.action.as_str() {
            "add" => Some(BookmarkAction::Add),
            "remove" => Some(BookmarkAction::Remove),
            _ => None,
        }
    }
}

/// `source` arrives either as a plain name or as `{ name }`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum SourceField {
    Name(String),
    Object {
        #[serde(default)]
        name: Option<String>,
    },
}

/// `category` arrives as a single name or as a list of names.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum CategoryField {
    One(String),
    Many(Vec<String>),
}

/// Article payload posted by the client when bookmarking.
#[derive(Deserialize, Serialize, Debug, Default, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct ArticleData {
    pub id: Option<i64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub url: Option<String>,
    pub url_to_image: Option<String>,
    pub published_at: Option<String>,
    pub source: Option<SourceField>,
    pub author: Option<String>,
    pub category: Option<CategoryField>,
    pub tags: Vec<String>,
}

impl ArticleData {
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref().map(str::trim).filter(|url| !url.is_empty())
    }

    /// `None` when the payload has no url to identify the article by.
    pub fn to_new_article(&self, now: DateTime<Utc>) -> Option<NewArticle> {
        let url = self.url()?.to_string();
        let title = self
            .title
            .clone()
            .filter(|title| !title.trim().is_empty())
            .unwrap_or_else(|| url.clone());
        let published_at = self
            .published_at
            .as_deref()
            .and_then(|value| DateTime::parse_from_rfc3339(value).ok())
            .map(|value| value.with_timezone(&Utc))
            .unwrap_or(now);
        let source_name = match &self.source {
            Some(SourceField::Name(name)) => Some(name.clone()),
            Some(SourceField::Object { name }) => name.clone(),
            None => None,
        }
        .filter(|name| !name.is_empty());
        let categories = match &self.category {
            Some(CategoryField::One(category)) => Category::parse_set([category]),
            Some(CategoryField::Many(categories)) => Category::parse_set(categories),
            None => vec![Category::General],
        };
        Some(NewArticle {
            title,
            description: self.description.clone(),
            content: self.content.clone().or_else(|| self.description.clone()),
            url,
            url_to_image: self.url_to_image.clone(),
            published_at,
            source_name,
            author: self.author.clone(),
            categories,
            tags: self.tags.clone(),
        })
    }
}

// ----------------- Summary Request -----------------
#[derive(Deserialize, Serialize, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SummarizeRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub article_id: Option<i64>,
}

// ----------------- Newsletter Request -----------------
#[derive(Deserialize, Serialize, Debug)]
pub struct SubscribeRequest {
    pub subscribe: bool,
    #[serde(default)]
    pub time: Option<String>,
}
