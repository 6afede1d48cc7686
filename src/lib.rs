mod authentication;
pub mod cache;
pub mod clock;
pub mod config;
mod data_formats;
pub mod db_helpers;
pub mod errors;
mod handlers;
pub mod mailer;
pub mod models;
pub mod news;
pub mod newsletter;
pub mod recommendations;
pub mod summarizer;
pub mod uploads;
pub mod upstream;

use std::{
    net::{SocketAddr, TcpListener},
    path::Path,
    str::FromStr,
    sync::Arc,
    time::Duration,
};

use anyhow::Context;
pub use anyhow::Result;
use axum::http::StatusCode;
use axum::{extract::DefaultBodyLimit, routing::*, Extension, Json, Router};
pub use data_formats::*;
use handlers::*;
use sqlx::{
    migrate::MigrateDatabase,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Sqlite, SqlitePool,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::info;

use crate::{
    cache::TtlCache,
    clock::{Clock, SystemClock},
    config::Config,
    mailer::{HttpMailer, LogMailer, Mailer},
    summarizer::{OpenRouterClient, Summarizer},
    uploads::MAX_AVATAR_BYTES,
    upstream::{NewsApiClient, NewsSource},
};

pub type JsonResponse<T> = (StatusCode, Json<T>);

/// Everything a request handler needs, shared behind one `Arc`.
pub struct AppContext {
    pub pool: SqlitePool,
    pub config: Config,
    pub news_source: Arc<dyn NewsSource>,
    pub summarizer: Summarizer,
    pub mailer: Arc<dyn Mailer>,
    pub clock: Arc<dyn Clock>,
}

impl AppContext {
    /// Wires the production clients described by `config`.
    pub fn from_config(config: Config, pool: SqlitePool) -> Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let news_source = NewsApiClient::new(
            config.news_api_key.clone(),
            config.news_api_url.clone(),
            config.news_api_country.clone(),
        )
        .context("Failed to build news client")?;
        let generator = OpenRouterClient::new(
            config.openrouter_api_key.clone(),
            config.openrouter_url.clone(),
            config.summary_model.clone(),
        )
        .context("Failed to build summary client")?;
        let cache = TtlCache::new(
            Duration::from_secs(config.summary_cache_ttl_secs),
            clock.clone(),
        );
        let mailer: Arc<dyn Mailer> = match &config.mail_api_url {
            Some(url) => Arc::new(
                HttpMailer::new(
                    url.clone(),
                    config.mail_api_key.clone(),
                    config.mail_from.clone(),
                )
                .context("Failed to build mail client")?,
            ),
            None => Arc::new(LogMailer),
        };

        Ok(Self {
            pool,
            config,
            news_source: Arc::new(news_source),
            summarizer: Summarizer::new(Arc::new(generator), Arc::new(cache)),
            mailer,
            clock,
        })
    }
}

pub async fn run_app(app: Router, ctx: Arc<AppContext>, address: SocketAddr) -> Result<()> {
    let app = app
        .layer(Extension(ctx))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());
    info!("Server started on {}", address);
    axum::Server::bind(&address)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}

fn is_in_memory(db_url: &str) -> bool {
    db_url.contains(":memory:") || db_url.contains("mode=memory")
}

pub async fn init_db(db_url: &str) -> Result<SqlitePool> {
    let in_memory = is_in_memory(db_url);
    if !in_memory {
        if !Sqlite::database_exists(db_url).await.unwrap_or(false) {
            info!("Creating database {}", db_url);
            Sqlite::create_database(db_url)
                .await
                .context("Failed to create database")?;
        } else {
            info!("Database already exists");
        }
    }

    let options = SqliteConnectOptions::from_str(db_url)
        .context("Invalid DATABASE_URL")?
        .foreign_keys(true);
    // Every connection to `:memory:` is its own database, so keep exactly one alive.
    let pool_options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new()
    };
    let pool = pool_options
        .connect_with(options)
        .await
        .context("Failed to connect to database")?;

    info!("Running Migrations");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    info!("Migrations completed");
    Ok(pool)
}

pub fn get_random_free_port() -> (u16, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Could not bind a free port");
    match listener.local_addr() {
        Ok(addr) => (addr.port(), addr),
        Err(_) => panic!("Could not get a free port"),
    }
}

pub fn make_router(upload_dir: &Path) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(register_user))
        .route("/auth/login", post(login_user))
        .route("/auth/me", get(get_current_user))
        .route("/news", get(get_news))
        .route("/news/:article_id/view", post(record_view))
        .route("/bookmarks", get(list_bookmarks).post(toggle_bookmark))
        .route("/bookmarks/check/:article_id", get(check_bookmark))
        .route("/recommendations", get(get_recommendations))
        .route("/summarize", post(summarize_article))
        .route("/newsletter/subscribe", post(subscribe_newsletter))
        .route("/newsletter/status", get(newsletter_status))
        .route(
            "/profile",
            get(get_profile)
                .put(update_profile)
                .layer(DefaultBodyLimit::max(MAX_AVATAR_BYTES + 1024 * 1024)),
        )
        .fallback(not_found);

    Router::new()
        .nest("/api", api)
        .nest_service("/uploads", ServeDir::new(upload_dir))
        .fallback(not_found)
}
