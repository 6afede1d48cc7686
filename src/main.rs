use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use news_pulse::{
    config::Config,
    init_db, make_router,
    newsletter::{spawn_scheduler, NewsletterDispatcher},
    run_app, AppContext,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const CACHE_SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("news_pulse=info,tower_http=info")),
        )
        .init();

    if let Err(error) = start().await {
        error!("Error: {:#}", error);
        std::process::exit(1);
    }
}

async fn start() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let pool = init_db(&config.database_url).await?;
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let router = make_router(&config.upload_dir);
    let interval = Duration::from_secs(config.newsletter_interval_secs.max(1));
    let utc_offset_minutes = config.newsletter_utc_offset_minutes;

    let ctx = Arc::new(AppContext::from_config(config, pool).context("Failed to build app context")?);

    let dispatcher = Arc::new(NewsletterDispatcher::new(
        ctx.pool.clone(),
        ctx.mailer.clone(),
        utc_offset_minutes,
    ));
    spawn_scheduler(dispatcher, ctx.clock.clone(), interval);
    info!(?interval, "newsletter scheduler started");

    let cache = ctx.summarizer.cache().clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(CACHE_SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            let removed = cache.expire();
            if removed > 0 {
                info!(removed, "expired cached summaries");
            }
        }
    });

    run_app(router, ctx, addr).await
}
