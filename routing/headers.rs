/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Filtering of the caller-supplied header bundle.

use http::{HeaderName, HeaderValue};

/// Marker header only the app itself may produce.
pub const INTENT_TYPE_HEADER: &str = "x-chrome-intent-type";
pub const INTERNAL_HEADER_PREFIX: &str = "x-chrome-";
pub const CONTENT_TYPE_HEADER: &str = "Content-Type";

const SAFELISTED_VALUE_MAX_LEN: usize = 128;

/// Who sent the bundle, as far as header filtering cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderPolicy {
    pub from_self: bool,
    pub first_party_for_session: bool,
}

/// Returns the headers that survive, in their original order.
pub fn filter_headers(bundle: &[(String, String)], policy: HeaderPolicy) -> Vec<(String, String)> {
    let mut kept = Vec::with_capacity(bundle.len());
    for (name, value) in bundle {
        if HeaderName::from_bytes(name.as_bytes()).is_err()
            || HeaderValue::from_str(value).is_err()
        {
            log::warn!("ignoring forbidden header {} in header bundle", name);
            continue;
        }
        let lowered = name.to_ascii_lowercase();
        if lowered == INTENT_TYPE_HEADER {
            continue;
        }
        if !policy.from_self {
            if lowered.starts_with(INTERNAL_HEADER_PREFIX) {
                log::warn!("ignoring x-chrome header {} in header bundle", name);
                continue;
            }
            if !policy.first_party_for_session && !is_cors_safelisted_header(name, value) {
                log::warn!("ignoring non-CORS-safelisted header {} in header bundle", name);
                continue;
            }
        }
        kept.push((name.clone(), value.clone()));
    }
    kept
}

/// The Fetch standard's CORS-safelisted request headers.
pub fn is_cors_safelisted_header(name: &str, value: &str) -> bool {
    if value.len() > SAFELISTED_VALUE_MAX_LEN {
        return false;
    }
    match name.to_ascii_lowercase().as_str() {
        "accept" => !value.bytes().any(is_cors_unsafe_byte),
        "accept-language" | "content-language" => value.bytes().all(|byte| {
            byte.is_ascii_alphanumeric() || matches!(byte, b' ' | b'*' | b',' | b'-' | b'.' | b';' | b'=')
        }),
        "content-type" => {
            if value.bytes().any(is_cors_unsafe_byte) {
                return false;
            }
            let essence = value
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase();
            matches!(
                essence.as_str(),
                "application/x-www-form-urlencoded" | "multipart/form-data" | "text/plain"
            )
        }
        _ => false,
    }
}

fn is_cors_unsafe_byte(byte: u8) -> bool {
    (byte < 0x20 && byte != b'\t')
        || matches!(
            byte,
            b'"' | b'(' | b')' | b':' | b'<' | b'>' | b'?' | b'@' | b'[' | b'\\' | b']' | b'{'
                | b'}' | 0x7f
        )
}

/// Case-insensitive lookup that keeps the caller's spelling of the value.
pub fn find_header<'a>(bundle: &'a [(String, String)], name: &str) -> Option<&'a str> {
    bundle
        .iter()
        .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}
