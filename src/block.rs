use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};

use crate::error::Error;

/// Substrings that only show up on anti-automation interstitials.
const DEFAULT_MARKERS: &[&str] = &[
    "cf-browser-verification",
    "cf_chl_opt",
    "/cdn-cgi/challenge-platform/",
    "Attention Required! | Cloudflare",
    "<title>Just a moment...</title>",
    "class=\"g-recaptcha\"",
    "hcaptcha.com/1/api.js",
    "class=\"h-captcha\"",
    "px-captcha",
    "Access to this page has been denied",
    "Please verify you are a human",
    "unusual traffic from your computer network",
    "Incapsula incident ID",
    "<title>Robot Check</title>",
    "Enter the characters you see below",
];

/// Recognizes challenge pages in a fully buffered response body.
///
/// All markers are compiled into one ASCII case-insensitive automaton, so a
/// body is scanned once no matter how many markers are configured. A body
/// that is not UTF-8 is scanned byte-wise.
#[derive(Clone, Debug)]
pub struct BlockDetector {
    markers: Vec<String>,
    matcher: Option<AhoCorasick>,
}

impl BlockDetector {
    pub fn standard() -> Self {
        // The built-in set is small enough that compiling it cannot hit the
        // automaton size limits.
        Self::new(DEFAULT_MARKERS.iter().copied()).unwrap_or_else(|_| Self::disabled())
    }

    /// Replaces the built-in markers. Blank markers are skipped.
    pub fn new<I, S>(markers: I) -> crate::Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let markers: Vec<String> = markers
            .into_iter()
            .map(Into::into)
            .filter(|marker: &String| !marker.trim().is_empty())
            .collect();
        let matcher = compile(&markers)?;
        Ok(Self { markers, matcher })
    }

    pub fn disabled() -> Self {
        Self {
            markers: Vec::new(),
            matcher: None,
        }
    }

    pub fn with_marker(self, marker: impl Into<String>) -> crate::Result<Self> {
        let mut markers = self.markers;
        markers.push(marker.into());
        Self::new(markers)
    }

    pub fn markers(&self) -> &[String] {
        &self.markers
    }

    /// Marker of the leftmost match in `body`.
    pub fn detect(&self, body: &[u8]) -> Option<&str> {
        let matched = self.matcher.as_ref()?.find(body)?;
        self.markers
            .get(matched.pattern().as_usize())
            .map(String::as_str)
    }

    pub fn is_blocked(&self, body: &[u8]) -> bool {
        self.detect(body).is_some()
    }
}

impl Default for BlockDetector {
    fn default() -> Self {
        Self::standard()
    }
}

fn compile(markers: &[String]) -> crate::Result<Option<AhoCorasick>> {
    if markers.is_empty() {
        return Ok(None);
    }
    AhoCorasickBuilder::new()
        .match_kind(MatchKind::LeftmostFirst)
        .ascii_case_insensitive(true)
        .prefilter(true)
        .build(markers)
        .map(Some)
        .map_err(|_| Error::InvalidConfig {
            field: "block_detector",
            message: "challenge markers exceed the matcher size limits",
        })
}
