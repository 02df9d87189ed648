//! Source router: decides whether a fetch is needed, applies the URL-scheme
//! pre-filter, and dispatches into the arbitration pipeline.
//!
//! Transport failures (invalid scheme, network error, non-text payload)
//! propagate unchanged: they mean the pipeline was never reached, and must
//! not be confused with extraction failures.

use crate::pipeline::ExtractionPipeline;
use crate::stats;
use crate::PageFetcher;
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};
use textpipe_core::{Error, ExtractionOutcome, FetchBackend, FetchRequest, FetchResponse, Result};

pub struct SourceRouter {
    fetcher: Arc<dyn FetchBackend>,
    pipeline: Arc<ExtractionPipeline>,
}

impl SourceRouter {
    pub fn new(fetcher: Arc<dyn FetchBackend>, pipeline: Arc<ExtractionPipeline>) -> Self {
        Self { fetcher, pipeline }
    }

    /// Extract the main article text for `url`. When `prefetched` HTML is
    /// supplied the fetch collaborator is never consulted.
    pub async fn extract(
        &self,
        url: &str,
        prefetched: Option<String>,
    ) -> Result<ExtractionOutcome> {
        let html = match prefetched {
            Some(html) => html,
            None => self.fetch_html(url).await?,
        };

        let pipeline = Arc::clone(&self.pipeline);
        let url = url.to_string();
        // Strategy parsing is CPU-bound; keep it off the async workers.
        tokio::task::spawn_blocking(move || pipeline.extract_from_html(&url, &html))
            .await
            .map_err(|e| Error::Internal(format!("extraction task join failed: {e}")))?
    }

    async fn fetch_html(&self, url: &str) -> Result<String> {
        let parsed = url::Url::parse(url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        if !is_fetchable_scheme(parsed.scheme()) {
            // Browser-internal and similar schemes can never be fetched;
            // reject before any network I/O.
            return Err(Error::UnfetchableScheme(format!(
                "{}: {url}",
                parsed.scheme()
            )));
        }

        let resp = self.fetcher.fetch(&FetchRequest::for_url(url)).await?;
        if resp.status >= 400 {
            return Err(Error::Fetch(format!("http status {} for {url}", resp.status)));
        }
        ensure_textual(&resp)?;
        Ok(resp.text_lossy())
    }
}

pub fn is_fetchable_scheme(scheme: &str) -> bool {
    matches!(scheme, "http" | "https")
}

fn ensure_textual(resp: &FetchResponse) -> Result<()> {
    if let Some(media_type) = resp.media_type() {
        let texty = media_type.starts_with("text/")
            || media_type == "application/xhtml+xml"
            || media_type == "application/xml"
            || media_type.ends_with("+xml");
        if !texty {
            return Err(Error::NonText(format!(
                "{media_type} from {}",
                resp.final_url
            )));
        }
        return Ok(());
    }
    // No declared content type: sniff for binary magic.
    if bytes_look_like_pdf(&resp.bytes) || bytes_look_like_image(&resp.bytes) {
        return Err(Error::NonText(format!(
            "binary payload from {}",
            resp.final_url
        )));
    }
    Ok(())
}

fn bytes_look_like_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF-")
}

fn bytes_look_like_image(bytes: &[u8]) -> bool {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        return true;
    }
    if bytes.starts_with(b"\xff\xd8\xff") {
        return true;
    }
    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return true;
    }
    bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP"
}

fn default_router() -> Result<&'static SourceRouter> {
    static DEFAULT: OnceLock<SourceRouter> = OnceLock::new();
    if let Some(router) = DEFAULT.get() {
        return Ok(router);
    }
    let fetcher = Arc::new(PageFetcher::new()?);
    let pipeline = Arc::new(ExtractionPipeline::new(stats::global()));
    Ok(DEFAULT.get_or_init(|| SourceRouter::new(fetcher, pipeline)))
}

/// Primary entry point: extract the main article text for `url`, fetching
/// the page first unless `html` is provided. Uses the process-default
/// fetcher, registry and stats table.
pub async fn extract(url: &str, html: Option<String>) -> Result<ExtractionOutcome> {
    default_router()?.extract(url, html).await
}

/// Point-in-time view of the process-wide per-method success counters,
/// including the `"none"` failure bucket. Safe to call concurrently with
/// ongoing extractions.
pub fn stats_snapshot() -> BTreeMap<String, u64> {
    stats::global().snapshot()
}
