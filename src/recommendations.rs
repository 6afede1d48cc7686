use std::collections::HashMap;
use std::hash::Hash;

use sqlx::SqlitePool;
use tracing::debug;

use crate::db_helpers::{
    find_articles_matching, list_bookmarked_article_ids, list_bookmarks_with_articles,
    list_recent_articles,
};
use crate::errors::RequestError;
use crate::models::{Article, Category};

pub const RECOMMENDATION_LIMIT: usize = 6;
const BOOKMARK_WINDOW: i64 = 20;
const CANDIDATE_LIMIT: i64 = 12;
const TOP_SOURCES: usize = 3;
const TOP_CATEGORIES: usize = 2;
const TOP_TAGS: usize = 5;
const UNKNOWN_SOURCE: &str = "unknown";

/// Counts in first-seen order.
#[derive(Debug)]
struct Tally<K> {
    entries: Vec<(K, usize)>,
    index: HashMap<K, usize>,
}

impl<K: Eq + Hash + Clone> Tally<K> {
    fn new() -> Self {
        Self {
            entries: vec![],
            index: HashMap::new(),
        }
    }

    fn add(&mut self, key: K) {
        match self.index.get(&key) {
            Some(&i) => self.entries[i].1 += 1,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, 1));
            }
        }
    }

    /// Highest counts first; equal counts keep first-seen order.
    fn ranked(&self) -> Vec<(K, usize)> {
        let mut ranked = self.entries.clone();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
    }
}

/// Source, category and tag frequencies over a set of bookmarked articles.
#[derive(Debug, Clone)]
pub struct PreferenceProfile {
    pub sources: Vec<(String, usize)>,
    pub categories: Vec<(Category, usize)>,
    pub tags: Vec<(String, usize)>,
}

impl PreferenceProfile {
    /// `articles` should be ordered most recently bookmarked first; that order
    /// breaks ties between equal counts.
    pub fn from_articles<'a>(articles: impl IntoIterator<Item = &'a Article>) -> Self {
        let mut sources = Tally::new();
        let mut categories = Tally::new();
        let mut tags = Tally::new();
        for article in articles {
            sources.add(
                article
                    .source_name
                    .clone()
                    .filter(|name| !name.is_empty())
                    .unwrap_or_else(|| UNKNOWN_SOURCE.to_string()),
            );
            for category in &article.categories {
                categories.add(*category);
            }
            for tag in &article.tags {
                tags.add(tag.clone());
            }
        }
        Self {
            sources: sources.ranked(),
            categories: categories.ranked(),
            tags: tags.ranked(),
        }
    }

    pub fn top_sources(&self, n: usize) -> Vec<String> {
        self.sources.iter().take(n).map(|(s, _)| s.clone()).collect()
    }

    pub fn top_categories(&self, n: usize) -> Vec<Category> {
        self.categories.iter().take(n).map(|(c, _)| *c).collect()
    }

    pub fn top_tags(&self, n: usize) -> Vec<String> {
        self.tags.iter().take(n).map(|(t, _)| t.clone()).collect()
    }
}

/// Up to [`RECOMMENDATION_LIMIT`] articles the user has not bookmarked,
/// weighted by their most recent bookmarks. Every bookmark, not only the
/// recent ones, is excluded from the result.
pub async fn recommend_for_user(
    pool: &SqlitePool,
    user_id: i64,
) -> Result<Vec<Article>, RequestError> {
    let limit = RECOMMENDATION_LIMIT as i64;
    let bookmarks = list_bookmarks_with_articles(pool, user_id, Some(BOOKMARK_WINDOW)).await?;

    if bookmarks.is_empty() {
        return list_recent_articles(pool, &[], limit).await;
    }

    let profile = PreferenceProfile::from_articles(bookmarks.iter().map(|(_, article)| article));
    debug!(
        user_id,
        sources = ?profile.top_sources(TOP_SOURCES),
        categories = ?profile.top_categories(TOP_CATEGORIES),
        tags = ?profile.top_tags(TOP_TAGS),
        "Built preference profile"
    );
    let bookmarked = list_bookmarked_article_ids(pool, user_id).await?;

    let mut recommendations = find_articles_matching(
        pool,
        &profile.top_sources(TOP_SOURCES),
        &profile.top_categories(TOP_CATEGORIES),
        &bookmarked,
        CANDIDATE_LIMIT,
    )
    .await?;

    if recommendations.len() < RECOMMENDATION_LIMIT {
        let mut exclude = bookmarked;
        exclude.extend(recommendations.iter().map(|article| article.id));
        let padding = list_recent_articles(
            pool,
            &exclude,
            (RECOMMENDATION_LIMIT - recommendations.len()) as i64,
        )
        .await?;
        recommendations.extend(padding);
    }

    recommendations.truncate(RECOMMENDATION_LIMIT);
    Ok(recommendations)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn article(source: Option<&str>, categories: &[Category], tags: &[&str]) -> Article {
        Article {
            id: 0,
            title: "t".into(),
            description: None,
            content: None,
            url: "https://example.com".into(),
            url_to_image: None,
            published_at: Utc::now(),
            source_name: source.map(str::to_string),
            author: None,
            categories: categories.to_vec(),
            summary: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn ranks_by_count_then_first_seen() {
        let articles = vec![
            article(Some("BBC"), &[Category::World], &["elections"]),
            article(Some("CNN"), &[Category::Politics], &[]),
            article(Some("Wired"), &[Category::Technology], &["ai"]),
            article(Some("CNN"), &[Category::Technology], &["ai"]),
            article(None, &[Category::World], &[]),
        ];
        let profile = PreferenceProfile::from_articles(&articles);
        assert_eq!(profile.top_sources(3), vec!["CNN", "BBC", "Wired"]);
        assert_eq!(
            profile.top_categories(2),
            vec![Category::World, Category::Technology]
        );
        assert_eq!(profile.top_tags(1), vec!["ai"]);
        assert!(profile.sources.contains(&("unknown".to_string(), 1)));
    }

    #[test]
    fn multi_category_articles_count_every_category() {
        let articles = vec![
            article(Some("A"), &[Category::Science, Category::Health], &[]),
            article(Some("B"), &[Category::Health], &[]),
        ];
        let profile = PreferenceProfile::from_articles(&articles);
        assert_eq!(
            profile.categories,
            vec![(Category::Health, 2), (Category::Science, 1)]
        );
    }
}
