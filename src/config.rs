use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use anyhow::{Context, Result};
use tracing::{info, warn};

pub const DEFAULT_NEWS_API_URL: &str = "https://newsapi.org/v2/top-headlines";
pub const DEFAULT_OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_SUMMARY_MODEL: &str = "meta-llama/llama-3.2-3b-instruct:free";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub jwt_secret: String,
    pub news_api_key: Option<String>,
    pub news_api_url: String,
    pub news_api_country: String,
    pub openrouter_api_key: Option<String>,
    pub openrouter_url: String,
    pub summary_model: String,
    pub summary_cache_ttl_secs: u64,
    pub mail_api_url: Option<String>,
    pub mail_api_key: Option<String>,
    pub mail_from: String,
    pub upload_dir: PathBuf,
    pub newsletter_interval_secs: u64,
    pub newsletter_utc_offset_minutes: i32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        Ok(Self {
            database_url: try_load("DATABASE_URL", "sqlite://news_pulse.db"),
            port: try_load("PORT", "5000"),
            jwt_secret,
            news_api_key: optional("NEWS_API_KEY"),
            news_api_url: try_load("NEWS_API_URL", DEFAULT_NEWS_API_URL),
            news_api_country: try_load("NEWS_API_COUNTRY", "us"),
            openrouter_api_key: optional("OPENROUTER_API_KEY"),
            openrouter_url: try_load("OPENROUTER_URL", DEFAULT_OPENROUTER_URL),
            summary_model: try_load("SUMMARY_MODEL", DEFAULT_SUMMARY_MODEL),
            summary_cache_ttl_secs: try_load("SUMMARY_CACHE_TTL_SECS", "86400"),
            mail_api_url: optional("MAIL_API_URL"),
            mail_api_key: optional("MAIL_API_KEY"),
            mail_from: try_load("MAIL_FROM", "News Pulse <newsletter@newspulse.local>"),
            upload_dir: PathBuf::from(try_load::<String>("UPLOAD_DIR", "uploads")),
            newsletter_interval_secs: try_load("NEWSLETTER_INTERVAL_SECS", "60"),
            newsletter_utc_offset_minutes: try_load("NEWSLETTER_UTC_OFFSET_MINUTES", "0"),
        })
    }

    /// Settings for tests and local tooling: in-memory database, no providers.
    pub fn for_tests(jwt_secret: &str) -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            port: 0,
            jwt_secret: jwt_secret.to_string(),
            news_api_key: None,
            news_api_url: DEFAULT_NEWS_API_URL.to_string(),
            news_api_country: "us".to_string(),
            openrouter_api_key: None,
            openrouter_url: DEFAULT_OPENROUTER_URL.to_string(),
            summary_model: DEFAULT_SUMMARY_MODEL.to_string(),
            summary_cache_ttl_secs: 86400,
            mail_api_url: None,
            mail_api_key: None,
            mail_from: "News Pulse <newsletter@newspulse.local>".to_string(),
            upload_dir: env::temp_dir().join("news_pulse_uploads"),
            newsletter_interval_secs: 60,
            newsletter_utc_offset_minutes: 0,
        }
    }
}

fn optional(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
        _ => {
            warn!("{key} not set");
            None
        }
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    let value = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    match value.parse() {
        Ok(value) => value,
        Err(e) => {
            warn!("Invalid {key} value: {e}, using default: {default}");
            match default.parse() {
                Ok(value) => value,
                Err(_) => unreachable!("default for {key} must parse"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_numbers_fall_back_to_default() {
        env::set_var("NEWS_PULSE_TEST_PORT", "not-a-port");
        let port: u16 = try_load("NEWS_PULSE_TEST_PORT", "5000");
        assert_eq!(port, 5000);
    }

    #[test]
    fn blank_optional_values_are_none() {
        env::set_var("NEWS_PULSE_TEST_BLANK", "   ");
        assert_eq!(optional("NEWS_PULSE_TEST_BLANK"), None);
    }
}
