use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use tracing::info;

use crate::errors::ClientError;
use crate::models::Article;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[axum::async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> Result<(), ClientError>;
}

/// Delivers mail through an HTTP relay that accepts `{ from, to, subject, html }`.
pub struct HttpMailer {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    from: String,
}

#[derive(Debug, Serialize)]
struct RelayRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

impl HttpMailer {
    pub fn new(endpoint: String, api_key: Option<String>, from: String) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            endpoint,
            api_key,
            from,
        })
    }
}

#[axum::async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, email: &Email) -> Result<(), ClientError> {
        let mut request = self.client.post(&self.endpoint).json(&RelayRequest {
            from: &self.from,
            to: &email.to,
            subject: &email.subject,
            html: &email.html,
        });
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(ClientError::Api(error_text));
        }
        Ok(())
    }
}

/// Used when no relay is configured: mail is written to the log instead.
#[derive(Debug, Default)]
pub struct LogMailer;

#[axum::async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &Email) -> Result<(), ClientError> {
        info!(to = %email.to, subject = %email.subject, "mail relay not configured, skipping delivery");
        Ok(())
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn page(body: &str) -> String {
    format!(
        r#"<html>
  <head>
    <style>
      body {{ font-family: Arial, sans-serif; }}
      h1, h2 {{ color: #333; }}
      p {{ color: #666; }}
      .headline {{ margin-bottom: 20px; }}
      .headline a {{ color: #007bff; text-decoration: none; }}
    </style>
  </head>
  <body>
{body}
    <p>Stay informed with News Pulse!</p>
  </body>
</html>"#
    )
}

pub fn digest_email(to: &str, headlines: &[Article]) -> Email {
    let items = headlines
        .iter()
        .map(|article| {
            format!(
                r#"    <div class="headline">
      <h2>{}</h2>
      <p>{}</p>
      <a href="{}">Read more</a>
    </div>
"#,
                escape_html(&article.title),
                escape_html(
                    article
                        .description
                        .as_deref()
                        .filter(|d| !d.is_empty())
                        .unwrap_or("No description available.")
                ),
                escape_html(&article.url),
            )
        })
        .collect::<String>();
    Email {
        to: to.to_string(),
        subject: "Your Daily News Digest - News Pulse".to_string(),
        html: page(&format!(
            "    <h1>News Pulse Daily Digest</h1>\n    <p>Here are the top headlines from the last 24 hours:</p>\n{items}"
        )),
    }
}

pub fn no_headlines_email(to: &str) -> Email {
    Email {
        to: to.to_string(),
        subject: "News Pulse Daily Digest - No Headlines Today".to_string(),
        html: page(
            "    <h1>News Pulse Daily Digest</h1>\n    \
             <p>We apologize, but no recent headlines were found for today's newsletter.</p>\n    \
             <p>This might be due to a temporary issue with our news sources. We'll try again tomorrow!</p>",
        ),
    }
}

pub fn welcome_email(to: &str, newsletter_time: &str) -> Email {
    Email {
        to: to.to_string(),
        subject: "Welcome to News Pulse Daily Newsletter".to_string(),
        html: page(&format!(
            "    <h1>Welcome to News Pulse Daily Newsletter!</h1>\n    \
             <p>You have successfully subscribed to receive daily top headlines via email.</p>\n    \
             <p>You will receive your first newsletter at {} with the latest news.</p>",
            escape_html(newsletter_time)
        )),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::Category;

    fn headline(title: &str, description: Option<&str>) -> Article {
        Article {
            id: 1,
            title: title.into(),
            description: description.map(str::to_string),
            content: None,
            url: "https://example.com/a?x=1&y=2".into(),
            url_to_image: None,
            published_at: Utc::now(),
            source_name: None,
            author: None,
            categories: vec![Category::General],
            summary: None,
            tags: vec![],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn digest_lists_every_headline_escaped() {
        let email = digest_email(
            "reader@example.com",
            &[headline("<b>Big</b> news", None), headline("Second", Some("Details"))],
        );
        assert_eq!(email.to, "reader@example.com");
        assert!(email.html.contains("&lt;b&gt;Big&lt;/b&gt; news"));
        assert!(email.html.contains("No description available."));
        assert!(email.html.contains("Details"));
        assert!(email.html.contains("https://example.com/a?x=1&amp;y=2"));
    }

    #[test]
    fn escapes_both_quote_styles() {
        assert_eq!(
            escape_html(r#"Editor's "pick" <today>"#),
            "Editor&#39;s &quot;pick&quot; &lt;today&gt;"
        );
    }

    #[test]
    fn welcome_mentions_delivery_time() {
        let email = welcome_email("reader@example.com", "07:30");
        assert!(email.html.contains("07:30"));
        assert_eq!(email.subject, "Welcome to News Pulse Daily Newsletter");
    }
}
