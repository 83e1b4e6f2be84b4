/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Referrer resolution and acceptance.

use serde::Serialize;
use url::Url;

use super::headers::find_header;
use super::session::SessionDirectory;
use crate::admission::CorrelationCaches;
use crate::intake::request::ActivationRequest;
use crate::intake::scheme::APP_REFERRER_SCHEME;
use crate::trust::TrustLevel;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferrerPolicy {
    Always = 0,
    #[default]
    Default = 1,
    NoReferrerWhenDowngrade = 2,
    Never = 3,
    Origin = 4,
    OriginWhenCrossOrigin = 5,
    StrictOriginWhenCrossOrigin = 6,
    SameOrigin = 7,
    StrictOrigin = 8,
}

impl ReferrerPolicy {
    /// Out-of-range values fall back to [`ReferrerPolicy::Default`].
    pub fn from_extra(value: Option<i64>) -> Self {
        match value {
            Some(0) => Self::Always,
            Some(2) => Self::NoReferrerWhenDowngrade,
            Some(3) => Self::Never,
            Some(4) => Self::Origin,
            Some(5) => Self::OriginWhenCrossOrigin,
            Some(6) => Self::StrictOriginWhenCrossOrigin,
            Some(7) => Self::SameOrigin,
            Some(8) => Self::StrictOrigin,
            _ => Self::Default,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Referrer {
    pub url: String,
    pub policy: ReferrerPolicy,
}

/// `android-app://<package>/...` with a non-empty host. Returns the
/// normalized form.
pub fn valid_app_referrer(referrer: &str) -> Option<String> {
    let parsed = Url::parse(referrer.trim()).ok()?;
    if parsed.scheme() != APP_REFERRER_SCHEME {
        return None;
    }
    parsed.host_str().filter(|host| !host.is_empty())?;
    Some(parsed.to_string())
}

pub struct ReferrerInputs<'a> {
    pub request: &'a ActivationRequest,
    pub trust: TrustLevel,
    pub caches: &'a CorrelationCaches,
    pub sessions: &'a dyn SessionDirectory,
}

/// Candidate referrer before acceptance: the referrer extra (swapped for the
/// pending one when its correlation id matches), then the referrer-name
/// extra, then the session default.
fn candidate(inputs: &ReferrerInputs<'_>) -> Option<String> {
    let extras = inputs.request.extras();
    if let Some(referrer) = extras.referrer.as_deref() {
        let pending = inputs
            .caches
            .get_pending_referrer(extras.referrer_id.unwrap_or(0))
            .filter(|pending| !pending.is_empty());
        return Some(pending.unwrap_or(referrer).to_string());
    }
    if let Some(name) = extras.referrer_name.as_deref() {
        return Some(name.to_string());
    }
    if extras.has_session {
        return inputs.sessions.default_referrer(inputs.request);
    }
    None
}

pub fn resolve_referrer(inputs: &ReferrerInputs<'_>) -> Option<Referrer> {
    let policy = ReferrerPolicy::from_extra(inputs.request.extras().referrer_policy);
    let accepted = candidate(inputs).and_then(|candidate| {
        if let Some(url) = valid_app_referrer(&candidate) {
            return Some(url);
        }
        if inputs.trust.is_at_least_affiliate() {
            return Some(candidate);
        }
        log::warn!("rejecting referrer from untrusted sender");
        None
    });
    let url = accepted.or_else(|| {
        let headers = inputs.request.extras().headers.as_deref()?;
        find_header(headers, "referer").and_then(valid_app_referrer)
    })?;
    Some(Referrer { url, policy })
}
