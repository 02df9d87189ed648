//! Inline HTML fixtures shared by the strategy, pipeline and router tests.

/// A conventional news article: real body text inside `<article>`, plus the
/// usual chrome (nav, footer, scripts, styles) that extraction must drop.
pub(crate) const ARTICLE_HTML: &str = r#"<!doctype html>
<html>
<head>
  <title>Council Approves Riverside Park Expansion - The Daily Ledger</title>
  <meta property="og:title" content="Council Approves Riverside Park Expansion">
  <script>window.dataLayer = window.dataLayer || []; dataLayer.push({"page": "article"});</script>
  <style>.share-buttons { display: none; }</style>
</head>
<body>
  <nav class="navbar"><a href="/">Home</a> <a href="/news">News</a> <a href="/sports">Sports</a></nav>
  <article>
    <h1>Council Approves Riverside Park Expansion</h1>
    <p>The city council voted seven to two on Tuesday to approve a long-debated
    expansion of Riverside Park, setting aside twelve million dollars for new
    trails, a boathouse, and the restoration of the wetland boardwalk that was
    damaged in the floods three years ago.</p>
    <p>Supporters argued the project will reconnect the east side neighborhoods
    with the waterfront for the first time since the highway was built, while
    opponents questioned the financing plan and the decision to close two of
    the parking lots during construction.</p>
    <p>Work is expected to begin in the spring and continue for eighteen
    months, with the first sections of the new trail network opening to the
    public late next year.</p>
  </article>
  <footer class="footer"><a href="/privacy">Privacy</a> <a href="/terms">Terms</a></footer>
  <script src="/js/analytics.js"></script>
</body>
</html>
"#;

pub(crate) const EMPTY_BODY_HTML: &str = "<html><body></body></html>";
