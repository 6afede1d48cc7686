#![allow(dead_code)]

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration as StdDuration,
};

use chrono::{DateTime, Duration, TimeZone, Utc};
use news_pulse::{
    cache::TtlCache,
    clock::{Clock, SystemClock},
    config::Config,
    errors::ClientError,
    get_random_free_port, init_db,
    mailer::{Email, Mailer},
    make_router, run_app,
    summarizer::{Summarizer, SummaryGenerator},
    upstream::{NewsSource, UpstreamArticle, UpstreamSource},
    AppContext, AuthWrapper,
};
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};

pub const JWT_SECRET: &str = "test-secret";

// ----------------- Fakes -----------------
pub struct FakeNewsSource {
    articles: Mutex<Vec<UpstreamArticle>>,
    missing_key: bool,
    calls: AtomicUsize,
}

impl FakeNewsSource {
    pub fn with_articles(articles: Vec<UpstreamArticle>) -> Self {
        Self {
            articles: Mutex::new(articles),
            missing_key: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn without_key() -> Self {
        Self {
            missing_key: true,
            ..Self::with_articles(vec![])
        }
    }

    pub fn set_articles(&self, articles: Vec<UpstreamArticle>) {
        *self.articles.lock().unwrap() = articles;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[axum::async_trait]
impl NewsSource for FakeNewsSource {
    async fn top_headlines(
        &self,
        _category: news_pulse::models::Category,
        page_size: u32,
    ) -> Result<Vec<UpstreamArticle>, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.missing_key {
            return Err(ClientError::MissingKey("NEWS_API_KEY"));
        }
        let articles = self.articles.lock().unwrap();
        Ok(articles.iter().take(page_size as usize).cloned().collect())
    }
}

pub struct FakeGenerator {
    reply: Option<String>,
    missing_key: bool,
    calls: AtomicUsize,
}

impl FakeGenerator {
    pub fn replying(reply: Option<&str>) -> Self {
        Self {
            reply: reply.map(str::to_string),
            missing_key: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn without_key() -> Self {
        Self {
            missing_key: true,
            ..Self::replying(None)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[axum::async_trait]
impl SummaryGenerator for FakeGenerator {
    async fn complete(&self, _prompt: &str) -> Result<Option<String>, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.missing_key {
            return Err(ClientError::MissingKey("OPENROUTER_API_KEY"));
        }
        Ok(self.reply.clone())
    }
}

/// Keeps every mail it is asked to send; fails for the addresses in `reject`.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<Email>>,
    reject: Vec<String>,
}

impl RecordingMailer {
    pub fn rejecting(addresses: &[&str]) -> Self {
        Self {
            sent: Mutex::new(vec![]),
            reject: addresses.iter().map(|a| a.to_string()).collect(),
        }
    }

    pub fn recipients(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|email| email.to.clone())
            .collect()
    }
}

#[axum::async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &Email) -> Result<(), ClientError> {
        if self.reject.contains(&email.to) {
            return Err(ClientError::Api("mailbox unavailable".to_string()));
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

// ----------------- Fixtures -----------------
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

/// Headline `i` is published `i` minutes before [`base_time`], so lower is newer.
pub fn headline(i: usize, source: &str) -> UpstreamArticle {
    UpstreamArticle {
        source: UpstreamSource {
            name: Some(source.to_string()),
        },
        title: Some(format!("Headline {i}")),
        description: Some(format!("Description {i}")),
        url: Some(format!("https://news.example/{i}")),
        published_at: Some((base_time() - Duration::minutes(i as i64)).to_rfc3339()),
        ..Default::default()
    }
}

pub fn headlines(count: usize) -> Vec<UpstreamArticle> {
    (0..count).map(|i| headline(i, "Wire")).collect()
}

// ----------------- App -----------------
pub struct TestApp {
    pub address: String,
    pub client: Client,
    pub ctx: Arc<AppContext>,
    pub news: Arc<FakeNewsSource>,
    pub generator: Arc<FakeGenerator>,
    pub mailer: Arc<RecordingMailer>,
}

pub struct TestAppBuilder {
    news: FakeNewsSource,
    generator: FakeGenerator,
    mailer: RecordingMailer,
}

impl TestAppBuilder {
    pub fn news(mut self, news: FakeNewsSource) -> Self {
        self.news = news;
        self
    }

    pub fn generator(mut self, generator: FakeGenerator) -> Self {
        self.generator = generator;
        self
    }

    pub fn mailer(mut self, mailer: RecordingMailer) -> Self {
        self.mailer = mailer;
        self
    }

    pub async fn spawn(self) -> TestApp {
        let (port, addr) = get_random_free_port();
        let mut config = Config::for_tests(JWT_SECRET);
        config.upload_dir = std::env::temp_dir().join(format!("news_pulse_test_{port}"));

        let pool = init_db(&config.database_url).await.unwrap();
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let news = Arc::new(self.news);
        let generator = Arc::new(self.generator);
        let mailer = Arc::new(self.mailer);
        let cache = TtlCache::new(StdDuration::from_secs(3600), clock.clone());

        let router = make_router(&config.upload_dir);
        let ctx = Arc::new(AppContext {
            pool,
            config,
            news_source: news.clone(),
            summarizer: Summarizer::new(generator.clone(), Arc::new(cache)),
            mailer: mailer.clone(),
            clock,
        });
        tokio::spawn(run_app(router, ctx.clone(), addr));

        let app = TestApp {
            address: format!("http://127.0.0.1:{port}"),
            client: Client::new(),
            ctx,
            news,
            generator,
            mailer,
        };
        app.wait_until_ready().await;
        app
    }
}

pub fn app() -> TestAppBuilder {
    TestAppBuilder {
        news: FakeNewsSource::with_articles(headlines(30)),
        generator: FakeGenerator::replying(Some("  A short summary.  ")),
        mailer: RecordingMailer::default(),
    }
}

pub async fn spawn_app() -> TestApp {
    app().spawn().await
}

impl TestApp {
    async fn wait_until_ready(&self) {
        for _ in 0..100 {
            if self.client.get(self.url("/api/health")).send().await.is_ok() {
                return;
            }
            tokio::time::sleep(StdDuration::from_millis(20)).await;
        }
        panic!("server did not start");
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(self.url(path))
    }

    pub fn post(&self, path: &str) -> RequestBuilder {
        self.client.post(self.url(path))
    }

    pub fn put(&self, path: &str) -> RequestBuilder {
        self.client.put(self.url(path))
    }

    /// Registers `name` and returns its token.
    pub async fn register(&self, name: &str) -> String {
        let response = self
            .post("/api/auth/register")
            .json(&json!({
                "username": name,
                "email": format!("{name}@example.com"),
                "password": "correct horse",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        response.json::<AuthWrapper>().await.unwrap().token
    }

    /// Loads the first page of "general" headlines into storage.
    pub async fn load_news(&self, page_size: u32) -> Value {
        let response = self
            .get(&format!("/api/news?pageSize={page_size}"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        response.json().await.unwrap()
    }

    pub async fn bookmark(&self, token: &str, article: Value) -> Value {
        let response = self
            .post("/api/bookmarks")
            .bearer_auth(token)
            .json(&json!({ "action": "add", "articleData": article }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        response.json().await.unwrap()
    }
}
