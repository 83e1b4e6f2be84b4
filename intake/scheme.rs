/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Scheme sanitizing and the scheme family table.

use std::collections::HashMap;

pub const HTTP_SCHEME: &str = "http";
pub const HTTPS_SCHEME: &str = "https";
pub const FILE_SCHEME: &str = "file";
pub const CONTENT_SCHEME: &str = "content";
pub const JAVASCRIPT_SCHEME: &str = "javascript";
pub const JAR_SCHEME: &str = "jar";
pub const APP_REFERRER_SCHEME: &str = "android-app";
pub const LAUNCHER_SCHEME: &str = "googlechrome";
pub const CUSTOM_TAB_SCHEME: &str = "customtab";
pub const WEBAPP_SCHEME: &str = "webapp";

/// Extracts the scheme of `url`, lower-cased and stripped of anything outside
/// `[a-z0-9.+-]`. Obfuscated schemes such as `"java  script:"` come out as
/// `javascript`.
pub fn sanitize_scheme(url: &str) -> Option<String> {
    let (head, _) = url.split_once(':')?;
    let lowered = head.to_lowercase();
    let trimmed = lowered.trim();
    if trimmed.chars().all(is_scheme_char) {
        return Some(trimmed.to_string());
    }
    Some(trimmed.chars().filter(|ch| is_scheme_char(*ch)).collect())
}

fn is_scheme_char(ch: char) -> bool {
    ch.is_ascii_lowercase() || ch.is_ascii_digit() || matches!(ch, '.' | '+' | '-')
}

/// Schemes that are dropped whatever the sender's trust.
pub fn is_invalid_scheme(scheme: Option<&str>) -> bool {
    matches!(scheme, Some(JAVASCRIPT_SCHEME) | Some(JAR_SCHEME))
}

pub fn is_http_or_https(url: &str) -> bool {
    matches!(
        sanitize_scheme(url).as_deref(),
        Some(HTTP_SCHEME) | Some(HTTPS_SCHEME)
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemeFamily {
    Web,
    Local,
    Internal,
    Invalid,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemeResolution {
    pub requested_scheme: Option<String>,
    pub family: SchemeFamily,
}

/// Maps sanitized schemes to their family. Unregistered schemes resolve to
/// [`SchemeFamily::Unknown`].
#[derive(Debug, Clone)]
pub struct SchemeRegistry {
    families: HashMap<String, SchemeFamily>,
    internal_allowlist: Vec<String>,
}

impl SchemeRegistry {
    pub fn new() -> Self {
        Self {
            families: HashMap::new(),
            internal_allowlist: Vec::new(),
        }
    }

    pub fn register_scheme(&mut self, scheme: &str, family: SchemeFamily) {
        self.families.insert(scheme.to_ascii_lowercase(), family);
    }

    pub fn allow_internal_url(&mut self, url: &str) {
        self.internal_allowlist.push(url.to_ascii_lowercase());
    }

    pub fn family_of(&self, scheme: &str) -> SchemeFamily {
        self.families
            .get(&scheme.to_ascii_lowercase())
            .copied()
            .unwrap_or(SchemeFamily::Unknown)
    }

    pub fn resolve(&self, url: &str) -> SchemeResolution {
        let requested_scheme = sanitize_scheme(url);
        let family = requested_scheme
            .as_deref()
            .map(|scheme| self.family_of(scheme))
            .unwrap_or(SchemeFamily::Unknown);
        SchemeResolution {
            requested_scheme,
            family,
        }
    }

    /// Internal pages that outside senders may deep-link to.
    pub fn is_allowlisted_internal_url(&self, url: &str) -> bool {
        let lowered = url.to_lowercase();
        self.internal_allowlist.iter().any(|allowed| *allowed == lowered)
    }

    pub fn with_internal_schemes<'a>(
        schemes: impl IntoIterator<Item = &'a str>,
        allowlist: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let mut registry = Self::new();
        registry.register_scheme(HTTP_SCHEME, SchemeFamily::Web);
        registry.register_scheme(HTTPS_SCHEME, SchemeFamily::Web);
        registry.register_scheme(FILE_SCHEME, SchemeFamily::Local);
        registry.register_scheme(CONTENT_SCHEME, SchemeFamily::Local);
        registry.register_scheme(JAVASCRIPT_SCHEME, SchemeFamily::Invalid);
        registry.register_scheme(JAR_SCHEME, SchemeFamily::Invalid);
        for scheme in schemes {
            registry.register_scheme(scheme, SchemeFamily::Internal);
        }
        for url in allowlist {
            registry.allow_internal_url(url);
        }
        registry
    }
}

impl Default for SchemeRegistry {
    fn default() -> Self {
        Self::with_internal_schemes(
            ["chrome", "chrome-native", "about"],
            ["about:blank", "chrome://dino/"],
        )
    }
}
