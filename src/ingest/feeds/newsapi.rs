use metrics::{counter, histogram};
use serde::Deserialize;

use crate::ingest::types::{item_id, FeedError, NewsFeed, NewsItem};

#[derive(Debug, Deserialize)]
struct Payload {
    status: Option<String>,
    articles: Option<Vec<Article>>,
}

#[derive(Debug, Deserialize)]
struct Article {
    title: Option<String>,
    description: Option<String>,
    content: Option<String>,
    url: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
}

fn parse_rfc3339_to_unix(ts: &str) -> u64 {
    chrono::DateTime::parse_from_rfc3339(ts)
        .ok()
        .map(|dt| dt.timestamp())
        .and_then(|x| u64::try_from(x).ok())
        .unwrap_or(0)
}

/// NewsAPI top-headlines feed.
pub struct NewsApiFeed {
    mode: Mode,
}

enum Mode {
    #[cfg(feature = "feed-fixtures")]
    Fixture(String),
    #[cfg(feature = "feed-http")]
    Http {
        url: String,
        api_key: String,
        client: reqwest::Client,
    },
}

impl NewsApiFeed {
    #[cfg(feature = "feed-fixtures")]
    pub fn from_fixture_str(s: &str) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
        }
    }

    #[cfg(feature = "feed-http")]
    pub fn from_api_key(api_key: &str) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("newsflow/0.1")
            .connect_timeout(std::time::Duration::from_secs(4))
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("reqwest client");
        Self {
            mode: Mode::Http {
                url: "https://newsapi.org/v2/top-headlines?country=us&pageSize=20".to_string(),
                api_key: api_key.to_string(),
                client,
            },
        }
    }

    fn parse_items_from_str(s: &str) -> Result<Vec<NewsItem>, FeedError> {
        let t0 = std::time::Instant::now();
        let payload: Payload =
            serde_json::from_str(s).map_err(|e| FeedError::InvalidResponse(e.to_string()))?;
        if let Some(status) = payload.status.as_deref() {
            if status != "ok" {
                return Err(FeedError::InvalidResponse(format!("status={status}")));
            }
        }

        let articles = payload.articles.unwrap_or_default();
        let mut out = Vec::with_capacity(articles.len());
        for art in articles {
            // Articles without a URL have no stable identity; skip them.
            let url = match art.url {
                Some(u) if !u.trim().is_empty() => u,
                _ => continue,
            };
            let title = art.title.unwrap_or_default();
            if title.trim().is_empty() {
                continue;
            }
            let body = art
                .description
                .filter(|d| !d.trim().is_empty())
                .or(art.content)
                .unwrap_or_default();

            out.push(NewsItem {
                id: item_id(&url),
                title,
                body,
                published_at: art
                    .published_at
                    .as_deref()
                    .map(parse_rfc3339_to_unix)
                    .unwrap_or(0),
                source_url: url,
            });
        }

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("ingest_parse_ms").record(ms);
        counter!("ingest_feed_articles_total").increment(out.len() as u64);
        Ok(out)
    }
}

#[async_trait::async_trait]
impl NewsFeed for NewsApiFeed {
    async fn fetch_batch(&self) -> Result<Vec<NewsItem>, FeedError> {
        match &self.mode {
            #[cfg(feature = "feed-fixtures")]
            Mode::Fixture(s) => Self::parse_items_from_str(s),

            #[cfg(feature = "feed-http")]
            Mode::Http {
                url,
                api_key,
                client,
            } => {
                let resp = client.get(url).header("X-Api-Key", api_key).send().await?;
                if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    return Err(FeedError::RateLimited);
                }
                if !resp.status().is_success() {
                    return Err(FeedError::InvalidResponse(format!(
                        "http {}",
                        resp.status()
                    )));
                }
                let body = resp.text().await?;
                Self::parse_items_from_str(&body)
            }
        }
    }

    fn name(&self) -> &'static str {
        "NewsAPI"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_articles_and_skips_broken_ones() {
        let json = r#"{
            "status": "ok",
            "articles": [
                {"title": "Fed holds rates", "description": "Steady.", "url": "https://example.com/a", "publishedAt": "2024-05-01T12:00:00Z"},
                {"title": "", "description": "no title", "url": "https://example.com/b"},
                {"title": "No url article", "description": "skipped"}
            ]
        }"#;
        let items = NewsApiFeed::parse_items_from_str(json).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Fed holds rates");
        assert_eq!(items[0].id, item_id("https://example.com/a"));
        assert!(items[0].published_at > 0);
    }

    #[test]
    fn error_status_is_invalid_response() {
        let json = r#"{"status": "error", "articles": []}"#;
        assert!(matches!(
            NewsApiFeed::parse_items_from_str(json),
            Err(FeedError::InvalidResponse(_))
        ));
    }
}
