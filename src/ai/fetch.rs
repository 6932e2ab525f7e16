use super::{FetchedMedia, MediaFetcher};
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;

/// Downloads finished media over HTTP, buffering the full body in memory.
pub struct HttpMediaFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpMediaFetcher {
    pub fn new() -> Self {
        Self::new_with_client(Client::new())
    }

    pub fn new_with_client(client: Client) -> Self {
        Self {
            client,
            timeout: Duration::from_secs(300),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for HttpMediaFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaFetcher for HttpMediaFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedMedia> {
        let mut response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                // reqwest includes the URL in its message, and ours carries the key
                let e = e.without_url();
                tracing::error!("Failed to send media download request: {}", e);
                Error::Download(format!("Failed to fetch video: {}", e))
            })?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        if !status.is_success() {
            tracing::error!("Media download returned status {}", status);
            return Ok(FetchedMedia {
                status: status.as_u16(),
                content_type,
                body: None,
            });
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| {
            Error::Download(format!("Failed to read video body: {}", e.without_url()))
        })? {
            body.extend_from_slice(&chunk);
        }

        tracing::debug!("Downloaded {} bytes of media", body.len());

        Ok(FetchedMedia {
            status: status.as_u16(),
            content_type,
            body: Some(body),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_buffers_body_and_content_type() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1beta/files/abc:download"))
            .and(query_param("alt", "media"))
            .and(query_param("key", "secret"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "video/mp4")
                    .set_body_bytes(vec![1, 2, 3, 4]),
            )
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = HttpMediaFetcher::new();
        let url = format!(
            "{}/v1beta/files/abc:download?alt=media&key=secret",
            server.uri()
        );

        let fetched = fetcher.fetch(&url).await.unwrap();
        assert_eq!(fetched.status, 200);
        assert_eq!(fetched.content_type.as_deref(), Some("video/mp4"));
        assert_eq!(fetched.body, Some(vec![1, 2, 3, 4]));
    }

    #[tokio::test]
    async fn test_fetch_reports_error_status_without_body() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .mount(&server)
            .await;

        let fetched = HttpMediaFetcher::new()
            .fetch(&format!("{}/missing", server.uri()))
            .await
            .unwrap();

        assert_eq!(fetched.status, 404);
        assert!(fetched.body.is_none());
    }

    #[tokio::test]
    async fn test_fetch_empty_body() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let fetched = HttpMediaFetcher::new()
            .fetch(&format!("{}/empty", server.uri()))
            .await
            .unwrap();

        assert_eq!(fetched.body, Some(Vec::new()));
    }

    #[tokio::test]
    async fn test_transport_error_hides_keyed_url() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let err = HttpMediaFetcher::new()
            .with_timeout(Duration::from_millis(50))
            .fetch(&format!("{}/v1beta/files/abc:download?key=secret", server.uri()))
            .await
            .unwrap_err();

        match err {
            Error::Download(msg) => {
                assert!(!msg.contains("key="), "message leaked the key: {}", msg);
                assert!(!msg.contains("secret"), "message leaked the key: {}", msg);
            }
            other => panic!("expected a download error, got {:?}", other),
        }
    }
}
