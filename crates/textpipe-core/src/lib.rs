use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    /// URL scheme that can never be fetched (browser-internal, javascript:, ...).
    /// Rejected before any network call is attempted.
    #[error("unfetchable scheme: {0}")]
    UnfetchableScheme(String),
    #[error("fetch failed: {0}")]
    Fetch(String),
    /// The response body is not text/HTML (image, PDF, other binary payload).
    #[error("non-text content: {0}")]
    NonText(String),
    /// Every registered strategy was tried and rejected. Carries the URL.
    #[error("unable to extract article text from {0}")]
    UnableToExtract(String),
    #[error("invalid registry: {0}")]
    InvalidRegistry(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl Error {
    /// True for failures that originate below the extraction pipeline
    /// (the pipeline was never reached).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::InvalidUrl(_) | Error::UnfetchableScheme(_) | Error::Fetch(_) | Error::NonText(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Identifier of one extraction strategy. Stable: the string forms are used
/// as stats keys and as the `method` tag on outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Mozilla-Readability-style DOM extraction (`dom_smoothie`).
    Readability,
    /// arc90 content scoring (`readability` crate).
    Arc90,
    /// Text-mass vs. link-mass container scoring.
    TextDensity,
    /// Paragraph harvest from article/main scopes.
    Paragraphs,
    /// Whole-page tag strip. Guaranteed to produce output; ordered last.
    RawHtml,
}

impl ExtractionMethod {
    /// Canonical registry order. `RawHtml` is last: it is the lowest-quality
    /// guaranteed fallback.
    pub const ALL: [ExtractionMethod; 5] = [
        ExtractionMethod::Readability,
        ExtractionMethod::Arc90,
        ExtractionMethod::TextDensity,
        ExtractionMethod::Paragraphs,
        ExtractionMethod::RawHtml,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::Readability => "readability",
            ExtractionMethod::Arc90 => "arc90",
            ExtractionMethod::TextDensity => "text_density",
            ExtractionMethod::Paragraphs => "paragraphs",
            ExtractionMethod::RawHtml => "raw_html",
        }
    }
}

impl std::fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The result of one successful pipeline run. Immutable once returned;
/// `method` always names the strategy whose attempt passed the quality gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionOutcome {
    pub url: String,
    pub title: Option<String>,
    /// Normalized article text: no markup, no mojibake, collapsed whitespace.
    pub text: String,
    pub method: ExtractionMethod,
    pub text_chars: usize,
    pub warnings: Vec<String>,
    pub timings_ms: BTreeMap<String, u128>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchRequest {
    pub url: String,
    /// Timeout for the operation (network + body read).
    pub timeout_ms: Option<u64>,
    /// Hard cap on bytes read from the response body.
    pub max_bytes: Option<u64>,
    /// Optional headers to add (best-effort; adapter may drop unsafe headers).
    pub headers: BTreeMap<String, String>,
}

impl FetchRequest {
    pub fn for_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout_ms: None,
            max_bytes: None,
            headers: BTreeMap::new(),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResponse {
    pub url: String,
    pub final_url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub bytes: Vec<u8>,
    pub truncated: bool,
    pub timings_ms: BTreeMap<String, u128>,
}

impl FetchResponse {
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.bytes).to_string()
    }

    /// Media type without parameters, lower-cased ("text/html; charset=x" -> "text/html").
    pub fn media_type(&self) -> Option<String> {
        self.content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .map(|s| s.trim().to_ascii_lowercase())
            .filter(|s| !s.is_empty())
    }
}

/// Contract expected of the fetch collaborator. Transport failures (invalid
/// scheme, network error, non-text payload) surface as `Error` values and
/// are propagated by callers unchanged.
#[async_trait::async_trait]
pub trait FetchBackend: Send + Sync {
    async fn fetch(&self, req: &FetchRequest) -> Result<FetchResponse>;
}
