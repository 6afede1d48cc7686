use serde::{Deserialize, Serialize};

use crate::models::{Article, Bookmark, Category, User};

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceResponse {
    pub name: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ArticleResponse {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub content: Option<String>,
    pub url: String,
    pub url_to_image: Option<String>,
    pub published_at: String,
    pub source: SourceResponse,
    pub author: Option<String>,
    pub category: Vec<Category>,
    pub summary: Option<String>,
    pub tags: Vec<String>,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_recommended: Option<bool>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkResponse {
    pub id: i64,
    pub user: i64,
    pub article: ArticleResponse,
    pub created_at: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct PreferencesResponse {
    pub categories: Vec<Category>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub bio: String,
    pub avatar: String,
    pub preferences: PreferencesResponse,
    pub newsletter_subscription: bool,
    pub newsletter_time: String,
}

impl ArticleResponse {
    pub fn new(
        Article {
            id,
            title,
            description,
            content,
            url,
            url_to_image,
            published_at,
            source_name,
            author,
            categories,
            summary,
            tags,
            created_at,
        }: Article,
    ) -> Self {
        ArticleResponse {
            id,
            title,
            description,
            content,
            url,
            url_to_image,
            published_at: published_at.to_rfc3339(),
            source: SourceResponse { name: source_name },
            author,
            category: categories,
            summary,
            tags,
            created_at: created_at.to_rfc3339(),
            is_recommended: None,
        }
    }

    pub fn recommended(article: Article) -> Self {
        ArticleResponse {
            is_recommended: Some(true),
            ..ArticleResponse::new(article)
        }
    }
}

impl BookmarkResponse {
    pub fn new(
        Bookmark {
            id,
            user_id,
            created_at,
            ..
        }: Bookmark,
        article: Article,
    ) -> Self {
        BookmarkResponse {
            id,
            user: user_id,
            article: ArticleResponse::new(article),
            created_at: created_at.to_rfc3339(),
        }
    }
}

impl UserResponse {
    pub fn new(
        User {
            id,
            username,
            email,
            bio,
            avatar,
            newsletter_subscription,
            newsletter_time,
            ..
        }: User,
        categories: Vec<Category>,
    ) -> Self {
        UserResponse {
            id,
            username,
            email,
            bio,
            avatar,
            preferences: PreferencesResponse { categories },
            newsletter_subscription,
            newsletter_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use super::*;

    fn article() -> Article {
        let now = Utc::now();
        Article {
            id: 9,
            title: "Title".into(),
            description: Some("Description".into()),
            content: None,
            url: "https://example.com/9".into(),
            url_to_image: None,
            published_at: now,
            source_name: Some("Reuters".into()),
            author: None,
            categories: vec![Category::Technology, Category::Science],
            summary: None,
            tags: vec!["ai".into()],
            created_at: now,
        }
    }

    #[test]
    fn article_serializes_in_camel_case() {
        let value = serde_json::to_value(ArticleResponse::new(article())).unwrap();
        assert_eq!(value["urlToImage"], json!(null));
        assert_eq!(value["source"], json!({ "name": "Reuters" }));
        assert_eq!(value["category"], json!(["technology", "science"]));
        assert!(value.get("publishedAt").is_some());
        assert!(value.get("isRecommended").is_none());
    }

    #[test]
    fn recommended_articles_are_flagged() {
        let value = serde_json::to_value(ArticleResponse::recommended(article())).unwrap();
        assert_eq!(value["isRecommended"], json!(true));
    }
}
