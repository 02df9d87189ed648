//! The extraction strategies: uniform wrappers over independent third-party
//! text-extraction algorithms.
//!
//! Every strategy implements [`Extractor`] and is invoked the same way by the
//! pipeline, regardless of how it works inside. Strategies never error out:
//! internal failures become `succeeded = false` attempts with a warning code.

use serde::Serialize;
use std::io::Cursor;
use textpipe_core::ExtractionMethod;
use url::Url;

/// One strategy invocation's result. Transient: the pipeline discards it
/// after the gate decision unless it is the accepted attempt.
#[derive(Debug, Clone, Serialize)]
pub struct Attempt {
    pub method: ExtractionMethod,
    pub succeeded: bool,
    pub title: Option<String>,
    pub text: String,
    /// Length (chars) of the text as the strategy produced it, before
    /// normalization.
    pub raw_chars: usize,
    pub warnings: Vec<&'static str>,
}

impl Attempt {
    pub fn success(method: ExtractionMethod, title: Option<String>, text: String) -> Self {
        Self {
            method,
            succeeded: true,
            title,
            raw_chars: text.chars().count(),
            text,
            warnings: Vec::new(),
        }
    }

    pub fn failure(method: ExtractionMethod, warning: &'static str) -> Self {
        Self {
            method,
            succeeded: false,
            title: None,
            text: String::new(),
            raw_chars: 0,
            warnings: vec![warning],
        }
    }
}

/// The single capability every strategy exposes. `attempt` must not panic
/// and must not touch shared state; the pipeline treats all implementations
/// uniformly.
pub trait Extractor: Send + Sync {
    fn method(&self) -> ExtractionMethod;
    fn attempt(&self, url: &str, html: &str) -> Attempt;
}

/// The canonical registry: priority order, strongest first, with the
/// guaranteed raw-HTML fallback last.
pub fn default_registry() -> Vec<Box<dyn Extractor>> {
    vec![
        Box::new(ReadabilityExtractor),
        Box::new(Arc90Extractor),
        Box::new(TextDensityExtractor),
        Box::new(ParagraphsExtractor),
        Box::new(RawHtmlExtractor),
    ]
}

fn some_nonempty(s: String) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// Mozilla-Readability-style DOM extraction via `dom_smoothie`.
pub struct ReadabilityExtractor;

impl Extractor for ReadabilityExtractor {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::Readability
    }

    fn attempt(&self, url: &str, html: &str) -> Attempt {
        let mut reader = match dom_smoothie::Readability::new(html, Some(url), None) {
            Ok(r) => r,
            Err(_) => return Attempt::failure(self.method(), "readability_init_failed"),
        };
        match reader.parse() {
            Ok(article) => {
                let text: String = article.text_content.into();
                Attempt::success(self.method(), some_nonempty(article.title), text)
            }
            Err(_) => Attempt::failure(self.method(), "readability_parse_failed"),
        }
    }
}

/// arc90 content scoring via the `readability` crate: an independent second
/// opinion with different container heuristics.
pub struct Arc90Extractor;

impl Extractor for Arc90Extractor {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::Arc90
    }

    fn attempt(&self, url: &str, html: &str) -> Attempt {
        // The extractor wants a base URL for link resolution; any valid URL
        // will do when the caller's one doesn't parse.
        let Ok(base) = Url::parse(url).or_else(|_| Url::parse("https://localhost/")) else {
            return Attempt::failure(self.method(), "arc90_bad_base_url");
        };
        match readability::extractor::extract(&mut html.as_bytes(), &base) {
            Ok(product) => {
                Attempt::success(self.method(), some_nonempty(product.title), product.text)
            }
            Err(_) => Attempt::failure(self.method(), "arc90_failed"),
        }
    }
}

/// Container scoring by text mass vs. link-text mass: prefer the densest
/// non-navigational block.
pub struct TextDensityExtractor;

/// Containers whose class/id carries a structural UI word are skipped
/// outright. Structural words only; no site-specific heuristics.
const BOILERPLATE_MARKERS: [&str; 14] = [
    "nav",
    "navbar",
    "menu",
    "sidebar",
    "footer",
    "header",
    "banner",
    "cookie",
    "consent",
    "ads",
    "advert",
    "promo",
    "subscribe",
    "newsletter",
];

const MAX_SCORED_CONTAINERS: usize = 20_000;

impl Extractor for TextDensityExtractor {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::TextDensity
    }

    fn attempt(&self, _url: &str, html: &str) -> Attempt {
        let doc = html_scraper::Html::parse_document(html);
        match densest_container_text(&doc) {
            Some(text) => Attempt::success(self.method(), document_title(&doc), text),
            None => Attempt::failure(self.method(), "no_dense_container"),
        }
    }
}

fn class_or_id_lc(el: &html_scraper::ElementRef) -> String {
    let mut out = String::new();
    if let Some(c) = el.value().attr("class") {
        out.push_str(c);
        out.push(' ');
    }
    if let Some(i) = el.value().attr("id") {
        out.push_str(i);
    }
    out.to_ascii_lowercase()
}

fn is_boilerplate_container(el: &html_scraper::ElementRef) -> bool {
    let s = class_or_id_lc(el);
    if s.is_empty() {
        return false;
    }
    BOILERPLATE_MARKERS.iter().any(|m| s.contains(m))
}

fn element_text_chars(el: &html_scraper::ElementRef) -> usize {
    el.text().map(|t| t.chars().count()).sum()
}

fn element_link_text_chars(el: &html_scraper::ElementRef) -> usize {
    let Ok(sel) = html_scraper::Selector::parse("a") else {
        return 0;
    };
    el.select(&sel)
        .map(|a| a.text().map(|t| t.chars().count()).sum::<usize>())
        .sum()
}

fn densest_container_text(doc: &html_scraper::Html) -> Option<String> {
    let sel = html_scraper::Selector::parse("article, main, section, div").ok()?;

    let mut seen = 0usize;
    let mut best_score: i64 = 0;
    let mut best_text: Option<String> = None;

    for el in doc.select(&sel) {
        seen += 1;
        if seen > MAX_SCORED_CONTAINERS {
            break;
        }
        if is_boilerplate_container(&el) {
            continue;
        }
        let txt = element_text_chars(&el);
        // Low enough that small single-article pages still qualify; the tag
        // bonuses and link penalties keep nav widgets out.
        if txt < 20 {
            continue;
        }
        let link_txt = element_link_text_chars(&el);
        // Link text is usually navigation, TOCs or tag clouds.
        let mut score = txt as i64 - 2 * (link_txt as i64);
        match el.value().name() {
            "article" => score += 500,
            "main" => score += 300,
            _ => {}
        }
        if link_txt > txt / 2 {
            score -= 500;
        }
        if score > best_score {
            best_score = score;
            let t = el.text().collect::<Vec<_>>().join(" ");
            best_text = Some(t);
        }
    }

    best_text.filter(|t| t.chars().any(|c| !c.is_whitespace()))
}

/// Paragraph harvest: `<p>` blocks scoped to `article`/`main` when present,
/// the whole document otherwise.
pub struct ParagraphsExtractor;

impl Extractor for ParagraphsExtractor {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::Paragraphs
    }

    fn attempt(&self, _url: &str, html: &str) -> Attempt {
        let doc = html_scraper::Html::parse_document(html);
        let paras = collect_paragraphs(&doc, "article p, main p")
            .filter(|p| !p.is_empty())
            .unwrap_or_default();
        let paras = if paras.is_empty() {
            collect_paragraphs(&doc, "p").unwrap_or_default()
        } else {
            paras
        };
        if paras.is_empty() {
            return Attempt::failure(self.method(), "no_paragraphs");
        }
        Attempt::success(self.method(), document_title(&doc), paras.join("\n\n"))
    }
}

fn collect_paragraphs(doc: &html_scraper::Html, selector: &str) -> Option<Vec<String>> {
    let sel = html_scraper::Selector::parse(selector).ok()?;
    let mut out = Vec::new();
    for el in doc.select(&sel) {
        let raw = el.text().collect::<Vec<_>>().join(" ");
        let text = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        if !text.is_empty() {
            out.push(text);
        }
    }
    Some(out)
}

/// Last resort: strip scripts and render the whole page as text. Always
/// reports success so the pipeline is never empty-handed; the gate still
/// rejects it when the page has no usable text.
pub struct RawHtmlExtractor;

const RAW_TEXT_WIDTH: usize = 120;

impl Extractor for RawHtmlExtractor {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::RawHtml
    }

    fn attempt(&self, _url: &str, html: &str) -> Attempt {
        // Strip script/style/noscript blocks first so JS and CSS bodies are
        // not counted as page text.
        let html1 = strip_tag_blocks(html, "script");
        let html2 = strip_tag_blocks(&html1, "style");
        let html = strip_tag_blocks(&html2, "noscript");

        let doc = html_scraper::Html::parse_document(&html);
        let text = html2text::from_read(Cursor::new(html.as_bytes()), RAW_TEXT_WIDTH)
            .unwrap_or_else(|_| html.clone());
        Attempt::success(self.method(), document_title(&doc), text)
    }
}

/// Remove `<tag ...> ... </tag>` blocks, content included. Conservative:
/// only removes when a close tag is found; ASCII-case-insensitive.
fn strip_tag_blocks(html: &str, tag: &str) -> String {
    let tag_lc = tag.to_ascii_lowercase();
    let open_pat = format!("<{}", tag_lc);
    let close_pat = format!("</{}>", tag_lc);

    let mut out = String::new();
    let mut i = 0usize;
    let lower = html.to_ascii_lowercase();
    while let Some(rel_start) = lower[i..].find(&open_pat) {
        let start = i + rel_start;
        let after_open = start + open_pat.len();
        if let Some(rel_end) = lower[after_open..].find(&close_pat) {
            let end = after_open + rel_end + close_pat.len();
            out.push_str(&html[i..start]);
            i = end;
        } else {
            break;
        }
    }
    out.push_str(&html[i..]);
    out
}

/// Title for strategies whose algorithm doesn't produce one:
/// og:title, then `<title>`, then the first `<h1>`.
pub(crate) fn document_title(doc: &html_scraper::Html) -> Option<String> {
    fn first_text(doc: &html_scraper::Html, selector: &str) -> Option<String> {
        let sel = html_scraper::Selector::parse(selector).ok()?;
        let el = doc.select(&sel).next()?;
        let t = el.text().collect::<Vec<_>>().join(" ");
        let t = t.split_whitespace().collect::<Vec<_>>().join(" ");
        (!t.is_empty()).then_some(t)
    }

    fn first_attr(doc: &html_scraper::Html, selector: &str, attr: &str) -> Option<String> {
        let sel = html_scraper::Selector::parse(selector).ok()?;
        let el = doc.select(&sel).next()?;
        let v = el.value().attr(attr)?.trim().to_string();
        (!v.is_empty()).then_some(v)
    }

    first_attr(doc, "meta[property=\"og:title\"]", "content")
        .or_else(|| first_text(doc, "title"))
        .or_else(|| first_text(doc, "h1"))
}
