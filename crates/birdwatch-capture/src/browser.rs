//! HTTP client for the browser-automation service.
//!
//! The service (a browserless-style deployment holding the authenticated
//! session) exposes `/function` for in-page evaluation and `/screenshot`
//! for full-page captures. The timeline collection script runs inside the
//! service and returns raw item nodes; all normalization happens on this
//! side in [`crate::extract`].

use std::time::Duration;

use crate::types::RawTimelineItem;
use crate::CaptureError;

/// In-page collection script. Loads the timeline under the service's saved
/// session, scrolls until the target item count is reached or the page
/// stops yielding new items, and returns the raw item array.
const TIMELINE_COLLECT_JS: &str = r#"
export default async function ({ page, context }) {
  await page.goto(context.url, { waitUntil: "networkidle2" });
  await page.waitForSelector('article[data-testid="tweet"]', { timeout: 30000 });

  const items = new Map();

  const collect = async () => {
    const batch = await page.evaluate(() => {
      const out = [];
      for (const article of document.querySelectorAll('article[data-testid="tweet"]')) {
        const metricText = (testId) => {
          const container = article.querySelector(`[data-testid="${testId}"]`);
          const span = container &&
            container.querySelector('span[data-testid="app-text-transition-container"] span span');
          return span ? span.textContent.trim() : null;
        };
        const viewsText = () => {
          const span = article.querySelector(
            'a[href*="/analytics"] span[data-testid="app-text-transition-container"] span span');
          return span ? span.textContent.trim() : null;
        };

        const textEl = article.querySelector('div[data-testid="tweetText"]');
        const authorEl = article.querySelector('div[data-testid="User-Name"] div:first-child span');
        const handleEl = article.querySelector('div[data-testid="User-Name"] div[dir="ltr"]');
        const timeEl = article.querySelector('time');
        const linkEl = article.querySelector('a[href*="/status/"]');
        const repostEl = article.querySelector('span[data-testid="socialContext"]');

        const media = Array.from(article.querySelectorAll('a[href*="/photo/"], a[href*="/video/"]'))
          .map((a) => a.getAttribute('href'))
          .filter(Boolean)
          .map((href) => (href.startsWith('http') ? href : 'https://twitter.com' + href));
        const links = Array.from(article.querySelectorAll('a[href]'))
          .map((a) => a.getAttribute('href'))
          .filter((href) => href && href.startsWith('http'));

        out.push({
          text: textEl ? textEl.textContent : null,
          author: authorEl ? authorEl.textContent : null,
          author_handle: handleEl ? handleEl.textContent.trim() : null,
          timestamp: timeEl ? timeEl.getAttribute('datetime') : null,
          permalink: linkEl ? linkEl.getAttribute('href') : null,
          repost: Boolean(repostEl && repostEl.textContent.includes('reposted')),
          media_links: media,
          external_links: links,
          metrics: {
            replies: metricText('reply'),
            reposts: metricText('retweet'),
            likes: metricText('like'),
            bookmarks: metricText('bookmark'),
            views: viewsText(),
          },
        });
      }
      return out;
    });

    for (const item of batch) {
      const key = item.permalink || `anon-${items.size}`;
      if (!items.has(key)) items.set(key, item);
    }
  };

  await collect();
  while (items.size < context.target) {
    const before = items.size;
    await page.evaluate(() => window.scrollBy(0, window.innerHeight));
    await new Promise((resolve) => setTimeout(resolve, 10000));
    await collect();
    if (items.size === before) break;
  }

  return {
    data: Array.from(items.values()).slice(0, context.target),
    type: "application/json",
  };
}
"#;

/// Client for the browser-automation service.
///
/// Use [`BrowserClient::new`] with the configured service URL; tests point
/// `base_url` at a mock server.
pub struct BrowserClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl BrowserClient {
    /// Creates a client for the automation service at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        base_url: &str,
        token: Option<&str>,
        timeout_secs: u64,
    ) -> Result<Self, CaptureError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        match &self.token {
            Some(token) => format!("{}{path}?token={token}", self.base_url),
            None => format!("{}{path}", self.base_url),
        }
    }

    /// Runs the timeline collection script and returns the raw item list.
    ///
    /// # Errors
    ///
    /// - [`CaptureError::Http`] on network failure.
    /// - [`CaptureError::Browser`] on a non-2xx response.
    /// - [`CaptureError::Deserialize`] if the item list does not match the
    ///   expected shape.
    pub async fn collect_timeline(
        &self,
        timeline_url: &str,
        target: usize,
    ) -> Result<Vec<RawTimelineItem>, CaptureError> {
        let body = serde_json::json!({
            "code": TIMELINE_COLLECT_JS,
            "context": { "url": timeline_url, "target": target },
        });

        tracing::info!(timeline_url, target, "collecting timeline items");

        let response = self
            .http
            .post(self.endpoint("/function"))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CaptureError::Browser {
                status: status.as_u16(),
                message,
            });
        }

        let raw = response.text().await?;
        serde_json::from_str(&raw).map_err(|e| CaptureError::Deserialize {
            context: "timeline item list".to_string(),
            source: e,
        })
    }

    /// Captures a full-page PNG screenshot of `page_url`.
    ///
    /// # Errors
    ///
    /// - [`CaptureError::Http`] on network failure.
    /// - [`CaptureError::Browser`] on a non-2xx response.
    pub async fn screenshot(&self, page_url: &str) -> Result<Vec<u8>, CaptureError> {
        let body = serde_json::json!({
            "url": page_url,
            "options": { "fullPage": true, "type": "png" },
        });

        let response = self
            .http
            .post(self.endpoint("/screenshot"))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CaptureError::Browser {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str, token: Option<&str>) -> BrowserClient {
        BrowserClient::new(base_url, token, 5).expect("client construction should not fail")
    }

    #[tokio::test]
    async fn collect_timeline_parses_items() {
        let server = MockServer::start().await;
        let body = serde_json::json!([
            {
                "text": "hello",
                "author": "Someone",
                "author_handle": "@someone",
                "timestamp": "2025-03-01T10:00:00.000Z",
                "permalink": "/someone/status/5",
                "repost": false,
                "media_links": [],
                "external_links": [],
                "metrics": { "replies": "3", "likes": "1.2K" }
            }
        ]);

        Mock::given(method("POST"))
            .and(path("/function"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let items = test_client(&server.uri(), None)
            .collect_timeline("https://x.com/home", 10)
            .await
            .expect("should parse items");

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].permalink.as_deref(), Some("/someone/status/5"));
        assert_eq!(items[0].metrics.likes.as_deref(), Some("1.2K"));
        assert!(items[0].metrics.views.is_none());
    }

    #[tokio::test]
    async fn token_is_sent_as_query_param() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/function"))
            .and(query_param("token", "tok-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let items = test_client(&server.uri(), Some("tok-1"))
            .collect_timeline("https://x.com/home", 10)
            .await
            .expect("should succeed");
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn non_success_status_maps_to_browser_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/function"))
            .respond_with(ResponseTemplate::new(500).set_body_string("session crashed"))
            .mount(&server)
            .await;

        let err = test_client(&server.uri(), None)
            .collect_timeline("https://x.com/home", 10)
            .await
            .unwrap_err();
        assert!(
            matches!(err, CaptureError::Browser { status: 500, ref message } if message == "session crashed")
        );
    }

    #[tokio::test]
    async fn screenshot_returns_raw_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/screenshot"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x89, 0x50, 0x4E, 0x47]))
            .mount(&server)
            .await;

        let bytes = test_client(&server.uri(), None)
            .screenshot("https://x.com/home")
            .await
            .expect("should return bytes");
        assert_eq!(bytes, vec![0x89, 0x50, 0x4E, 0x47]);
    }
}
