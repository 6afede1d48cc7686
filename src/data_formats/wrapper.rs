use serde::{Deserialize, Serialize};

use super::response::{ArticleResponse, BookmarkResponse, UserResponse};

#[derive(Debug, Deserialize, Serialize)]
pub struct UserWrapper<T> {
    pub user: T,
}

/// Returned by register and login.
#[derive(Debug, Deserialize, Serialize)]
pub struct AuthWrapper {
    pub token: String,
    pub user: UserResponse,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsPageWrapper {
    pub articles: Vec<ArticleResponse>,
    pub has_more: bool,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct MultipleBookmarksWrapper {
    pub bookmarks: Vec<BookmarkResponse>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct BookmarkActionWrapper {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bookmark: Option<BookmarkResponse>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkStatusWrapper {
    pub is_bookmarked: bool,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RecommendationsWrapper {
    pub recommendations: Vec<ArticleResponse>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SummaryWrapper {
    pub summary: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionWrapper {
    pub message: String,
    pub newsletter_subscription: bool,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsletterStatusWrapper {
    pub newsletter_subscription: bool,
    pub newsletter_time: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct MessageWrapper {
    pub message: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct HealthWrapper {
    pub status: String,
    pub timestamp: String,
}

impl<T> UserWrapper<T> {
    pub fn wrap_with_user_data(user: T) -> UserWrapper<T> {
        UserWrapper { user }
    }
}

impl MessageWrapper {
    pub fn new(message: &str) -> Self {
        MessageWrapper {
            message: message.to_string(),
        }
    }
}
