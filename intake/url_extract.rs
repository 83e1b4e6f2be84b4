/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Pulls the target URL out of the carriers a request may use.
//!
//! Carriers are tried in a fixed order: voice-search results, the custom-tab
//! data URI, the webapp URL extra, then the plain data field. The first
//! non-blank candidate wins and is then passed through the `googlechrome://`
//! indirection if it uses that scheme.

use percent_encoding::percent_decode_str;
use url::Url;

use super::request::{Action, ActivationRequest};
use super::scheme::{
    CONTENT_SCHEME, CUSTOM_TAB_SCHEME, FILE_SCHEME, LAUNCHER_SCHEME, WEBAPP_SCHEME,
    is_http_or_https, sanitize_scheme,
};

pub const GOOGLECHROME_NAVIGATE_PREFIX: &str = "googlechrome://navigate?url=";
pub const HTTP_URL_PREFIX: &str = "http://";
pub const MHTML_INTENT_TYPE_HEADER: &str = "X-Chrome-intent-type";
const OCTET_STREAM_MIME_TYPE: &str = "application/octet-stream";

/// What the extractor found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlExtraction {
    /// No carrier held a non-blank value.
    Absent,
    Found(String),
    /// A `googlechrome://` URL that does not resolve to http(s).
    UnresolvedIndirection,
}

impl UrlExtraction {
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Found(url) => Some(url),
            Self::Absent | Self::UnresolvedIndirection => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, Self::UnresolvedIndirection)
    }
}

#[derive(Debug, Clone)]
pub struct UrlExtractor {
    search_url_template: String,
    test_intents_enabled: bool,
}

impl UrlExtractor {
    pub fn new(search_url_template: &str, test_intents_enabled: bool) -> Self {
        Self {
            search_url_template: search_url_template.to_string(),
            test_intents_enabled,
        }
    }

    pub fn extract(
        &self,
        request: &ActivationRequest,
        full_browser_started: bool,
    ) -> UrlExtraction {
        let Some(raw) = self.raw_candidate(request, full_browser_started) else {
            return UrlExtraction::Absent;
        };
        if !is_launcher_scheme(&raw) {
            return UrlExtraction::Found(raw);
        }
        match resolve_launcher_indirection(&raw) {
            Some(url) => UrlExtraction::Found(url),
            None => UrlExtraction::UnresolvedIndirection,
        }
    }

    fn raw_candidate(
        &self,
        request: &ActivationRequest,
        full_browser_started: bool,
    ) -> Option<String> {
        let candidate = self
            .voice_result_url(request, full_browser_started)
            .or_else(|| custom_tab_url(request))
            .or_else(|| webapp_url(request))
            .or_else(|| request.data().map(str::to_string))?;
        let trimmed = candidate.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }

    /// Only usable once the full browser runtime is up; before that the
    /// request degrades to having no voice URL.
    pub fn voice_result_url(
        &self,
        request: &ActivationRequest,
        full_browser_started: bool,
    ) -> Option<String> {
        if request.action() != Action::VoiceSearchResults {
            return None;
        }
        let extras = request.extras();
        let mut results = extras.voice_results.clone();
        if results.is_none() && self.test_intents_enabled {
            results = extras.voice_result_single.clone().map(|single| vec![single]);
        }
        let query = results?.into_iter().next()?;
        if !full_browser_started {
            return None;
        }

        if let Some(url) = classify_as_url(&query) {
            return Some(url);
        }
        if let Some(first) = extras
            .voice_result_urls
            .as_ref()
            .and_then(|urls| urls.first())
        {
            return Some(first.clone());
        }
        Some(self.search_url_for(&query))
    }

    pub fn search_url_for(&self, query: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
        self.search_url_template.replace("%s", &encoded)
    }
}

impl Default for UrlExtractor {
    fn default() -> Self {
        Self::new("https://www.google.com/search?q=%s", false)
    }
}

/// Trims `candidate` and applies the `googlechrome://` indirection when present.
pub fn extract_url(candidate: &str) -> Option<String> {
    let trimmed = candidate.trim();
    if trimmed.is_empty() {
        return None;
    }
    if is_launcher_scheme(trimmed) {
        return resolve_launcher_indirection(trimmed);
    }
    Some(trimmed.to_string())
}

pub fn is_launcher_scheme(url: &str) -> bool {
    url.split_once(':')
        .is_some_and(|(scheme, _)| scheme == LAUNCHER_SCHEME)
}

/// `googlechrome://navigate?url=<target>` to `<target>`, defaulting to http when
/// the target has no scheme. Anything that is not http(s) afterwards is rejected.
pub fn resolve_launcher_indirection(url: &str) -> Option<String> {
    if !url.to_lowercase().starts_with(GOOGLECHROME_NAVIGATE_PREFIX) {
        return None;
    }
    let mut target = url.get(GOOGLECHROME_NAVIGATE_PREFIX.len()..)?.to_string();
    if !target.is_empty() && sanitize_scheme(&target).is_none() {
        target = format!("{HTTP_URL_PREFIX}{target}");
    }
    is_http_or_https(&target).then_some(target)
}

fn custom_tab_url(request: &ActivationRequest) -> Option<String> {
    let data = Url::parse(request.data()?).ok()?;
    if data.scheme() != CUSTOM_TAB_SCHEME {
        return None;
    }
    // Invalid UTF-8 after decoding counts as no URL.
    let query = data.query()?;
    let decoded = percent_decode_str(query).decode_utf8().ok()?;
    Some(decoded.into_owned())
}

fn webapp_url(request: &ActivationRequest) -> Option<String> {
    let data = Url::parse(request.data()?).ok()?;
    if data.scheme() != WEBAPP_SCHEME {
        return None;
    }
    request.extras().webapp_url.clone()
}

/// A spoken query that already names a page: an absolute http(s) URL or a
/// bare `host.tld[/path]`.
fn classify_as_url(query: &str) -> Option<String> {
    let query = query.trim();
    if query.is_empty() || query.chars().any(char::is_whitespace) {
        return None;
    }
    if let Ok(parsed) = Url::parse(query) {
        return matches!(parsed.scheme(), "http" | "https").then(|| parsed.to_string());
    }
    let host = query.split('/').next().unwrap_or_default();
    let looks_like_host = host.contains('.')
        && !host.starts_with('.')
        && !host.ends_with('.')
        && host
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | ':'));
    if !looks_like_host {
        return None;
    }
    Url::parse(&format!("{HTTP_URL_PREFIX}{query}"))
        .ok()
        .map(|parsed| parsed.to_string())
}

pub fn is_mhtml_mime_type(mime_type: &str) -> bool {
    matches!(mime_type, "multipart/related" | "message/rfc822")
}

/// A `file:` or `content:` URL that should open as a saved web archive.
pub fn is_for_mhtml_file_or_content(url: &str, mime_type: Option<&str>) -> bool {
    let scheme = sanitize_scheme(url);
    let is_content = scheme.as_deref() == Some(CONTENT_SCHEME);
    let is_file = scheme.as_deref() == Some(FILE_SCHEME);
    if !is_content && !is_file {
        return false;
    }
    if mime_type.is_some_and(is_mhtml_mime_type) {
        return true;
    }
    let untyped = match mime_type {
        None | Some("") => true,
        Some(other) => other == OCTET_STREAM_MIME_TYPE,
    };
    if !is_file || !untyped {
        return false;
    }
    matches!(file_extension(url).as_str(), "mhtml" | "mht")
}

/// The type header some content providers need because they misreport MHTML
/// as an octet stream.
pub fn mhtml_content_header(url: &str, mime_type: Option<&str>) -> Option<(String, String)> {
    if sanitize_scheme(url).as_deref() != Some(CONTENT_SCHEME) {
        return None;
    }
    let mime_type = mime_type.filter(|value| is_mhtml_mime_type(value))?;
    Some((MHTML_INTENT_TYPE_HEADER.to_string(), mime_type.to_string()))
}

fn file_extension(url: &str) -> String {
    let last_segment = url.rsplit('/').next().unwrap_or(url);
    match last_segment.rsplit_once('.') {
        Some((_, extension)) => extension.to_lowercase(),
        None => String::new(),
    }
}
