mod common;

use std::collections::HashSet;

use common::*;
use news_pulse::{
    db_helpers::{count_articles, list_interactions_for_user},
    errors::ErrorMessage,
    models::InteractionKind,
    HealthWrapper, NewsPageWrapper, UserResponse, UserWrapper,
};

async fn page(app: &TestApp, query: &str) -> NewsPageWrapper {
    let response = app.get(&format!("/api/news?{query}")).send().await.unwrap();
    assert_eq!(response.status(), 200);
    response.json().await.unwrap()
}

#[tokio::test]
async fn empty_category_bootstraps_with_one_fetch() {
    let app = spawn_app().await;

    let first = page(&app, "category=technology&page=1").await;
    assert_eq!(app.news.calls(), 1);
    assert_eq!(first.articles.len(), 20);
    assert!(first.has_more);
    assert_eq!(first.articles[0].url, "https://news.example/0");

    let again = page(&app, "category=technology&page=1").await;
    assert_eq!(app.news.calls(), 1);
    assert_eq!(again.articles.len(), 20);
}

#[tokio::test]
async fn consecutive_pages_never_overlap() {
    let app = spawn_app().await;

    let first = page(&app, "pageSize=12&page=1").await;
    let second = page(&app, "pageSize=12&page=2").await;
    let third = page(&app, "pageSize=12&page=3").await;

    assert!(first.has_more);
    assert!(second.has_more);
    assert!(!third.has_more);
    assert_eq!(third.articles.len(), 6);

    let mut seen = HashSet::new();
    for article in first
        .articles
        .iter()
        .chain(&second.articles)
        .chain(&third.articles)
    {
        assert!(seen.insert(article.url.clone()), "{} repeated", article.url);
    }
    assert_eq!(seen.len(), 30);
}

#[tokio::test]
async fn ingestion_never_duplicates_urls() {
    let mut batch = headlines(5);
    batch.push(headline(2, "Wire"));
    batch.push(headline(3, "Other"));
    let app = app().news(FakeNewsSource::with_articles(batch)).spawn().await;

    page(&app, "category=general").await;
    assert_eq!(count_articles(&app.ctx.pool).await.unwrap(), 5);

    let refreshed = page(&app, "category=general&since=2024-05-01T00:00:00Z").await;
    assert!(!refreshed.has_more);
    assert_eq!(refreshed.articles.len(), 5);
    assert_eq!(count_articles(&app.ctx.pool).await.unwrap(), 5);
    assert_eq!(app.news.calls(), 2);
}

#[tokio::test]
async fn refresh_stores_new_headlines() {
    let app = app().news(FakeNewsSource::with_articles(headlines(3))).spawn().await;
    page(&app, "").await;

    app.news.set_articles(headlines(8));
    let refreshed = page(&app, "since=2024-05-01T00:00:00Z&pageSize=5").await;
    assert_eq!(refreshed.articles.len(), 5);
    assert!(!refreshed.has_more);
    assert_eq!(count_articles(&app.ctx.pool).await.unwrap(), 8);
}

#[tokio::test]
async fn skips_removed_and_incomplete_items() {
    let mut batch = headlines(2);
    let mut removed = headline(7, "Wire");
    removed.title = Some("[Removed]".to_string());
    let mut no_url = headline(8, "Wire");
    no_url.url = None;
    batch.extend([removed, no_url]);
    let app = app().news(FakeNewsSource::with_articles(batch)).spawn().await;

    let first = page(&app, "").await;
    assert_eq!(first.articles.len(), 2);
}

#[tokio::test]
async fn missing_news_key_is_a_client_error() {
    let app = app().news(FakeNewsSource::without_key()).spawn().await;

    let response = app.get("/api/news?category=sports").send().await.unwrap();
    assert_eq!(response.status(), 400);
    let body: ErrorMessage = response.json().await.unwrap();
    assert_eq!(body.message, "NewsAPI key not configured");
}

#[tokio::test]
async fn unknown_category_is_rejected() {
    let app = spawn_app().await;

    let response = app.get("/api/news?category=weather").send().await.unwrap();
    assert_eq!(response.status(), 400);
    assert_eq!(app.news.calls(), 0);
}

#[tokio::test]
async fn all_lists_every_category() {
    let app = spawn_app().await;
    page(&app, "category=technology&pageSize=5").await;

    let all = page(&app, "category=all&pageSize=100").await;
    assert_eq!(all.articles.len(), 30);
    let sports = page(&app, "category=sports&pageSize=100").await;
    // stored urls keep the category they were first ingested under
    assert!(sports.articles.is_empty());
}

#[tokio::test]
async fn recording_a_view() {
    let app = spawn_app().await;
    let token = app.register("viewer").await;
    let me: UserWrapper<UserResponse> = app
        .get("/api/auth/me")
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let user_id = me.user.id;
    let first = page(&app, "").await;
    let id = first.articles[0].id;

    let response = app
        .post(&format!("/api/news/{id}/view"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    let response = app
        .post(&format!("/api/news/{id}/view"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: ErrorMessage = response.json().await.unwrap();
    assert_eq!(body.message, "View recorded");

    let interactions = list_interactions_for_user(&app.ctx.pool, user_id)
        .await
        .unwrap();
    assert_eq!(interactions.len(), 1);
    assert_eq!(interactions[0].kind, InteractionKind::View);
    assert_eq!(interactions[0].article_id, id);

    let response = app
        .post("/api/news/999999/view")
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
    let body: ErrorMessage = response.json().await.unwrap();
    assert_eq!(body.message, "Article not found");
    let interactions = list_interactions_for_user(&app.ctx.pool, user_id)
        .await
        .unwrap();
    assert_eq!(interactions.len(), 1);
}

#[tokio::test]
async fn health_and_unknown_routes() {
    let app = spawn_app().await;

    let health: HealthWrapper = app
        .get("/api/health")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health.status, "OK");
    assert!(!health.timestamp.is_empty());

    let response = app.get("/api/nothing-here").send().await.unwrap();
    assert_eq!(response.status(), 404);
    let body: ErrorMessage = response.json().await.unwrap();
    assert_eq!(body.message, "Route not found");
}
