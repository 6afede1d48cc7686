//! Daily digest delivery.
//!
//! Every tick compares the current wall-clock minute against each subscriber's
//! preferred `HH:MM` and mails the users that match. The tick takes "now" as a
//! parameter; [`spawn_scheduler`] is the only place that reads a [`Clock`].

use std::{sync::Arc, time::Duration as StdDuration};

use chrono::{DateTime, Duration, FixedOffset, Offset, Timelike, Utc};
use sqlx::SqlitePool;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::clock::Clock;
use crate::db_helpers::{list_articles_published_since, list_subscribers_at};
use crate::errors::RequestError;
use crate::mailer::{digest_email, no_headlines_email, Mailer};

const DIGEST_SIZE: i64 = 10;
const DIGEST_WINDOW_HOURS: i64 = 24;

/// Normalises a user supplied delivery time to zero-padded `HH:MM`.
/// Missing parts default to `08` and `00`.
pub fn normalize_time(input: &str) -> Result<String, RequestError> {
    let mut parts = input.trim().splitn(2, ':');
    let hours = parts.next().map(str::trim).filter(|s| !s.is_empty()).unwrap_or("08");
    let minutes = parts.next().map(str::trim).filter(|s| !s.is_empty()).unwrap_or("00");

    let invalid = || RequestError::bad_request("Time must be in HH:MM format");
    let hours: u32 = hours.parse().map_err(|_| invalid())?;
    let minutes: u32 = minutes.parse().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }
    Ok(format!("{hours:02}:{minutes:02}"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestKind {
    /// Nobody is scheduled for this minute.
    Skipped,
    Digest,
    NoHeadlines,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub time: String,
    pub kind: DigestKind,
    pub recipients: usize,
    pub delivered: usize,
    pub failed: usize,
}

pub struct NewsletterDispatcher {
    pool: SqlitePool,
    mailer: Arc<dyn Mailer>,
    utc_offset: FixedOffset,
}

impl NewsletterDispatcher {
    pub fn new(pool: SqlitePool, mailer: Arc<dyn Mailer>, utc_offset_minutes: i32) -> Self {
        let utc_offset = FixedOffset::east_opt(utc_offset_minutes * 60).unwrap_or_else(|| {
            warn!(utc_offset_minutes, "invalid newsletter offset, using UTC");
            Utc.fix()
        });
        Self {
            pool,
            mailer,
            utc_offset,
        }
    }

    /// `now` as the `HH:MM` stored in users' preferences.
    pub fn minute_of(&self, now: DateTime<Utc>) -> String {
        let local = now.with_timezone(&self.utc_offset);
        format!("{:02}:{:02}", local.hour(), local.minute())
    }

    pub async fn run_tick(&self, now: DateTime<Utc>) -> Result<TickReport, sqlx::Error> {
        let time = self.minute_of(now);
        let recipients = list_subscribers_at(&self.pool, &time).await?;
        if recipients.is_empty() {
            info!(%time, "no users scheduled, skipping newsletter");
            return Ok(TickReport {
                time,
                kind: DigestKind::Skipped,
                recipients: 0,
                delivered: 0,
                failed: 0,
            });
        }

        let since = now - Duration::hours(DIGEST_WINDOW_HOURS);
        let headlines = list_articles_published_since(&self.pool, since, DIGEST_SIZE).await?;
        let kind = if headlines.is_empty() {
            info!(%time, "no recent headlines, sending notice instead");
            DigestKind::NoHeadlines
        } else {
            DigestKind::Digest
        };

        let mut report = TickReport {
            time,
            kind,
            recipients: recipients.len(),
            delivered: 0,
            failed: 0,
        };
        for user in &recipients {
            let email = match kind {
                DigestKind::Digest => digest_email(&user.email, &headlines),
                _ => no_headlines_email(&user.email),
            };
            match self.mailer.send(&email).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    error!(to = %user.email, "Failed to send newsletter: {}", e);
                    report.failed += 1;
                }
            }
        }
        info!(
            time = %report.time,
            delivered = report.delivered,
            failed = report.failed,
            "newsletter tick finished"
        );
        Ok(report)
    }
}

/// Time left until the next multiple of `interval` since the epoch.
pub fn until_next_tick(now: DateTime<Utc>, interval: StdDuration) -> StdDuration {
    let interval_ms = interval.as_millis().max(1) as i64;
    let now_ms = now.timestamp_millis();
    let next = (now_ms.div_euclid(interval_ms) + 1) * interval_ms;
    StdDuration::from_millis((next - now_ms) as u64)
}

/// Runs the dispatcher on every `interval` boundary of `clock`. A minute is
/// never processed twice.
pub fn spawn_scheduler(
    dispatcher: Arc<NewsletterDispatcher>,
    clock: Arc<dyn Clock>,
    interval: StdDuration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut last_run: Option<String> = None;
        loop {
            tokio::time::sleep(until_next_tick(clock.now(), interval)).await;
            let now = clock.now();
            let minute = now.format("%Y-%m-%dT%H:%M").to_string();
            if last_run.as_deref() == Some(minute.as_str()) {
                continue;
            }
            info!("Running scheduled newsletter task...");
            if let Err(e) = dispatcher.run_tick(now).await {
                error!("Error sending newsletter: {}", e);
            }
            last_run = Some(minute);
        }
    })
}
