use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    General,
    Business,
    Technology,
    Sports,
    Entertainment,
    Health,
    Science,
    Politics,
    World,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::General,
        Category::Business,
        Category::Technology,
        Category::Sports,
        Category::Entertainment,
        Category::Health,
        Category::Science,
        Category::Politics,
        Category::World,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::General => "general",
            Category::Business => "business",
            Category::Technology => "technology",
            Category::Sports => "sports",
            Category::Entertainment => "entertainment",
            Category::Health => "health",
            Category::Science => "science",
            Category::Politics => "politics",
            Category::World => "world",
        }
    }

    /// Parses a list of category names, dropping unknown ones and duplicates.
    /// An empty result collapses to `[General]`.
    pub fn parse_set<I, S>(values: I) -> Vec<Category>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Vec::new();
        for value in values {
            if let Ok(category) = value.as_ref().parse::<Category>() {
                if !set.contains(&category) {
                    set.push(category);
                }
            }
        }
        if set.is_empty() {
            set.push(Category::General);
        }
        set
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim().to_ascii_lowercase();
        Category::ALL
            .into_iter()
            .find(|category| category.as_str() == value)
            .ok_or(UnknownCategory(value))
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password: String,
    pub newsletter_subscription: bool,
    pub newsletter_time: String,
    pub bio: String,
    pub avatar: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub content: Option<String>,
    pub url: String,
    pub url_to_image: Option<String>,
    pub published_at: DateTime<Utc>,
    pub source_name: Option<String>,
    pub author: Option<String>,
    pub categories: Vec<Category>,
    pub summary: Option<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Row shape of the article queries; categories and tags arrive concatenated.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ArticleRow {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub content: Option<String>,
    pub url: String,
    pub url_to_image: Option<String>,
    pub published_at: DateTime<Utc>,
    pub source_name: Option<String>,
    pub author: Option<String>,
    pub summary: Option<String>,
    pub created_at: DateTime<Utc>,
    pub category_list: Option<String>,
    pub tag_list: Option<String>,
}

pub const TAG_SEPARATOR: char = '\u{1f}';

impl From<ArticleRow> for Article {
    fn from(row: ArticleRow) -> Self {
        let categories = Category::parse_set(
            row.category_list
                .as_deref()
                .unwrap_or_default()
                .split(',')
                .filter(|s| !s.is_empty()),
        );
        let tags = row
            .tag_list
            .as_deref()
            .unwrap_or_default()
            .split(TAG_SEPARATOR)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Article {
            id: row.id,
            title: row.title,
            description: row.description,
            content: row.content,
            url: row.url,
            url_to_image: row.url_to_image,
            published_at: row.published_at,
            source_name: row.source_name,
            author: row.author,
            categories,
            summary: row.summary,
            tags,
            created_at: row.created_at,
        }
    }
}

/// An article that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewArticle {
    pub title: String,
    pub description: Option<String>,
    pub content: Option<String>,
    pub url: String,
    pub url_to_image: Option<String>,
    pub published_at: DateTime<Utc>,
    pub source_name: Option<String>,
    pub author: Option<String>,
    pub categories: Vec<Category>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Bookmark {
    pub id: i64,
    pub user_id: i64,
    pub article_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum InteractionKind {
    View,
    Bookmark,
    Like,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Interaction {
    pub id: i64,
    pub user_id: i64,
    pub article_id: i64,
    pub kind: InteractionKind,
    pub timestamp: DateTime<Utc>,
}

/// Outcome of an insert that must not duplicate an existing row.
#[derive(Debug, Clone, PartialEq)]
pub enum Upsert<T> {
    Created(T),
    Existing(T),
}

impl<T> Upsert<T> {
    pub fn was_created(&self) -> bool {
        matches!(self, Upsert::Created(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            Upsert::Created(value) | Upsert::Existing(value) => value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parsing_is_case_insensitive() {
        assert_eq!("Technology".parse::<Category>(), Ok(Category::Technology));
        assert_eq!(" world ".parse::<Category>(), Ok(Category::World));
        assert!("weather".parse::<Category>().is_err());
    }

    #[test]
    fn category_set_drops_unknown_and_duplicates() {
        let set = Category::parse_set(["sports", "bogus", "SPORTS", "health"]);
        assert_eq!(set, vec![Category::Sports, Category::Health]);
        assert_eq!(Category::parse_set(Vec::<String>::new()), vec![Category::General]);
    }

    #[test]
    fn article_row_splits_lists() {
        let now = Utc::now();
        let row = ArticleRow {
            id: 1,
            title: "t".into(),
            description: None,
            content: None,
            url: "https://example.com/a".into(),
            url_to_image: None,
            published_at: now,
            source_name: None,
            author: None,
            summary: None,
            created_at: now,
            category_list: Some("technology,science".into()),
            tag_list: Some(format!("rust{TAG_SEPARATOR}async, io")),
        };
        let article = Article::from(row);
        assert_eq!(
            article.categories,
            vec![Category::Technology, Category::Science]
        );
        assert_eq!(article.tags, vec!["rust".to_string(), "async, io".to_string()]);
    }
}
