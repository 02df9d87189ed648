//! Working implementations for textpipe: a reqwest fetch backend, the
//! third-party extraction strategies, and the arbitration pipeline that
//! chooses between them.

use std::collections::BTreeMap;
use std::time::Duration;
use textpipe_core::{Error, FetchBackend, FetchRequest, FetchResponse, Result};

pub mod gate;
pub mod normalize;
pub mod pipeline;
pub mod router;
pub mod stats;
pub mod strategies;

#[cfg(test)]
pub(crate) mod fixtures;

pub use pipeline::ExtractionPipeline;
pub use router::{extract, is_fetchable_scheme, stats_snapshot, SourceRouter};

/// The fetch collaborator: plain HTTP GET with safety-default timeouts, a
/// redirect cap, and a streamed body read bounded by `max_bytes`.
///
/// Retry and cache policy belong here (or above here), never in the
/// extraction pipeline; this implementation has neither.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: reqwest::Client,
}

impl PageFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("textpipe-local/0.1")
            .redirect(reqwest::redirect::Policy::limited(10))
            // Safety defaults: avoid "hang forever" on DNS/TLS/body stalls.
            // Per-request timeouts (FetchRequest.timeout_ms) can still override this.
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Fetch(e.to_string()))?;
        Ok(Self { client })
    }

    fn apply_headers(
        mut rb: reqwest::RequestBuilder,
        headers: &BTreeMap<String, String>,
    ) -> reqwest::RequestBuilder {
        for (k, v) in headers {
            if let (Ok(name), Ok(value)) = (
                reqwest::header::HeaderName::from_bytes(k.as_bytes()),
                reqwest::header::HeaderValue::from_str(v),
            ) {
                rb = rb.header(name, value);
            }
        }
        rb
    }
}

#[async_trait::async_trait]
impl FetchBackend for PageFetcher {
    async fn fetch(&self, req: &FetchRequest) -> Result<FetchResponse> {
        let t0 = std::time::Instant::now();
        let url = url::Url::parse(&req.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;

        let mut rb = self.client.get(url);
        if let Some(to) = req.timeout() {
            rb = rb.timeout(to);
        }
        rb = Self::apply_headers(rb, &req.headers);
        let resp = rb.send().await.map_err(|e| Error::Fetch(e.to_string()))?;

        let final_url = resp.url().to_string();
        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let mut headers = BTreeMap::new();
        for (k, v) in resp.headers().iter() {
            if let Ok(s) = v.to_str() {
                headers.insert(k.as_str().to_string(), s.to_string());
            }
        }

        let max_bytes = req.max_bytes.unwrap_or(u64::MAX) as usize;
        let mut truncated = false;
        let mut bytes = Vec::new();
        let mut stream = resp.bytes_stream();
        use futures_util::StreamExt;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| Error::Fetch(e.to_string()))?;
            if bytes.len().saturating_add(chunk.len()) > max_bytes {
                let can_take = max_bytes.saturating_sub(bytes.len());
                bytes.extend_from_slice(&chunk[..can_take]);
                truncated = true;
                break;
            }
            bytes.extend_from_slice(&chunk);
        }

        let mut timings_ms = BTreeMap::new();
        timings_ms.insert("network_fetch".to_string(), t0.elapsed().as_millis());

        Ok(FetchResponse {
            url: req.url.clone(),
            final_url,
            status,
            content_type,
            headers,
            bytes,
            truncated,
            timings_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::header, routing::get, Router};
    use std::net::SocketAddr;

    async fn serve(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn fetches_a_page_with_metadata() {
        let app = Router::new().route(
            "/",
            get(|| async { ([(header::CONTENT_TYPE, "text/plain")], "hello") }),
        );
        let addr = serve(app).await;

        let fetcher = PageFetcher::new().unwrap();
        let mut req = FetchRequest::for_url(format!("http://{addr}/"));
        req.timeout_ms = Some(2_000);
        let resp = fetcher.fetch(&req).await.unwrap();

        assert_eq!(resp.status, 200);
        assert_eq!(resp.media_type().as_deref(), Some("text/plain"));
        assert_eq!(resp.text_lossy(), "hello");
        assert!(!resp.truncated);
        assert!(resp.timings_ms.contains_key("network_fetch"));
    }

    #[tokio::test]
    async fn body_reads_stop_at_max_bytes() {
        let app = Router::new().route("/big", get(|| async { "x".repeat(10_000) }));
        let addr = serve(app).await;

        let fetcher = PageFetcher::new().unwrap();
        let mut req = FetchRequest::for_url(format!("http://{addr}/big"));
        req.timeout_ms = Some(2_000);
        req.max_bytes = Some(100);
        let resp = fetcher.fetch(&req).await.unwrap();

        assert!(resp.truncated);
        assert_eq!(resp.bytes.len(), 100);
    }

    #[tokio::test]
    async fn invalid_urls_error_before_any_request() {
        let fetcher = PageFetcher::new().unwrap();
        let err = fetcher
            .fetch(&FetchRequest::for_url("::not-a-url::"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }
}
