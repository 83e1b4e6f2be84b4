/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Assembles the navigation parameters for an admitted request.

use serde::Serialize;

use super::headers::{CONTENT_TYPE_HEADER, HeaderPolicy, filter_headers};
use super::referrer::{Referrer, ReferrerInputs, resolve_referrer};
use super::session::SessionDirectory;
use crate::admission::CorrelationCaches;
use crate::intake::request::ActivationRequest;
use crate::intake::url_extract::mhtml_content_header;
use crate::trust::TrustLevel;

/// Page transition bits as the navigation engine understands them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PageTransition(pub u32);

impl PageTransition {
    pub const LINK: u32 = 0;
    pub const TYPED: u32 = 1;
    pub const FROM_API: u32 = 0x0200_0000;

    /// Tagged as API-originated so the load is never handed back out to
    /// another app.
    pub const DEFAULT: Self = Self(Self::LINK | Self::FROM_API);

    /// TYPED is honoured from anyone; any other non-LINK value only from
    /// trusted senders.
    pub fn from_request(requested: Option<u32>, trust: TrustLevel) -> Self {
        match requested {
            Some(Self::TYPED) => Self(Self::TYPED),
            Some(value) if value != Self::LINK && trust.is_at_least_affiliate() => Self(value),
            _ => Self::DEFAULT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostBody {
    #[serde(with = "body_serde")]
    pub bytes: Vec<u8>,
    pub content_type: String,
}

mod body_serde {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::Serializer;

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UiMetadata {
    /// Bookmark the navigation came from, or -1 for non-normal bookmarks.
    pub bookmark_id: i64,
}

impl UiMetadata {
    /// Accepts `<id>` or `<kind>:<id>`; only `normal` bookmarks keep their id.
    pub fn from_bookmark_extra(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        let (kind, id) = value.split_once(':').unwrap_or(("normal", value));
        let id: i64 = id.trim().parse().ok()?;
        let bookmark_id = if kind.trim().eq_ignore_ascii_case("normal") {
            id
        } else {
            -1
        };
        Some(Self { bookmark_id })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchParameters {
    pub url: String,
    pub referrer: Option<Referrer>,
    pub headers: Vec<(String, String)>,
    pub post_body: Option<PostBody>,
    pub transition: PageTransition,
    pub ui_metadata: Option<UiMetadata>,
    pub user_gesture: bool,
    pub renderer_initiated: bool,
    pub initiator_origin: Option<String>,
    pub intent_received_at_ms: Option<i64>,
}

pub struct LaunchParamsBuilder<'a> {
    pub request: &'a ActivationRequest,
    pub trust: TrustLevel,
    pub caches: &'a CorrelationCaches,
    pub sessions: &'a dyn SessionDirectory,
    pub intent_received_at_ms: Option<i64>,
}

impl LaunchParamsBuilder<'_> {
    pub fn build(&self, url: &str) -> LaunchParameters {
        let request = self.request;
        let extras = request.extras();
        let from_self = self.trust.is_self();

        let referrer = resolve_referrer(&ReferrerInputs {
            request,
            trust: self.trust,
            caches: self.caches,
            sessions: self.sessions,
        });

        let policy = HeaderPolicy {
            from_self,
            first_party_for_session: self.sessions.is_first_party_origin(request),
        };
        let mut headers = extras
            .headers
            .as_deref()
            .map(|bundle| filter_headers(bundle, policy))
            .unwrap_or_default();
        if let Some(header) = mhtml_content_header(url, request.mime_type()) {
            headers.push(header);
        }

        let mut post_body = None;
        let mut ui_metadata = None;
        if from_self {
            if let (Some(content_type), Some(bytes)) =
                (extras.post_data_type.as_deref(), extras.post_data.as_ref())
                && !content_type.is_empty()
                && !bytes.is_empty()
            {
                headers.push((CONTENT_TYPE_HEADER.to_string(), content_type.to_string()));
                post_body = Some(PostBody {
                    bytes: bytes.clone(),
                    content_type: content_type.to_string(),
                });
            }
            ui_metadata = extras
                .transition_bookmark_id
                .as_deref()
                .and_then(UiMetadata::from_bookmark_extra);
        }

        let metadata = request.request_metadata().filter(|_| from_self);
        LaunchParameters {
            url: url.to_string(),
            referrer,
            headers,
            post_body,
            transition: PageTransition::from_request(extras.page_transition_type, self.trust),
            ui_metadata,
            user_gesture: metadata.is_some_and(|m| m.user_gesture),
            renderer_initiated: metadata.is_some_and(|m| m.renderer_initiated),
            initiator_origin: metadata.and_then(|m| m.initiator_origin.clone()),
            intent_received_at_ms: self.intent_received_at_ms,
        }
    }
}
