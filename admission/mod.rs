/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The fail-closed gate every request passes before anything acts on it.

pub mod correlation;
pub mod deferred;

use std::panic::{AssertUnwindSafe, catch_unwind};

use serde::Serialize;

use crate::intake::request::{Action, ActivationRequest};
use crate::intake::scheme::{SchemeFamily, SchemeRegistry, is_invalid_scheme};
use crate::intake::url_extract::UrlExtraction;
use crate::trust::{SenderTrustClassifier, TrustLevel};

pub use correlation::CorrelationCaches;
pub use deferred::DeferredUnlockSlot;

/// Screen and lock state reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeviceState {
    pub interactive: bool,
    pub provisioned: bool,
    pub keyguard_locked: bool,
}

impl DeviceState {
    pub const UNLOCKED: Self = Self {
        interactive: true,
        provisioned: true,
        keyguard_locked: false,
    };

    /// Whether the user would see what a request does right now.
    pub fn is_user_visible(&self) -> bool {
        self.interactive && (!self.provisioned || !self.keyguard_locked)
    }
}

impl Default for DeviceState {
    fn default() -> Self {
        Self::UNLOCKED
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    InvalidUrl,
    IncognitoNotAllowed,
    ReplayedTranslate,
    UnsafeInternalScheme,
    Faulted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum AdmissionVerdict {
    Admit { trust: TrustLevel },
    Ignore { reason: IgnoreReason },
    /// Not visible to the user; hold until unlock.
    Defer,
}

impl AdmissionVerdict {
    pub fn is_ignored(&self) -> bool {
        !matches!(self, Self::Admit { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionError {
    Panicked(String),
}

impl std::fmt::Display for AdmissionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Panicked(message) => write!(f, "admission check panicked: {}", message),
        }
    }
}

impl std::error::Error for AdmissionError {}

/// Everything the filter reads besides the request itself.
pub struct AdmissionContext<'a> {
    pub classifier: &'a SenderTrustClassifier,
    pub caches: &'a CorrelationCaches,
    pub device: DeviceState,
    pub freshly_started: bool,
    pub target_is_isolated_surface: bool,
}

#[derive(Debug, Clone, Default)]
pub struct AdmissionFilter {
    schemes: SchemeRegistry,
}

impl AdmissionFilter {
    pub fn new(schemes: SchemeRegistry) -> Self {
        Self { schemes }
    }

    pub fn schemes(&self) -> &SchemeRegistry {
        &self.schemes
    }

    /// `true` means ignore. Deferred requests are parked in `slot` and
    /// reported as ignored.
    pub fn should_ignore(
        &self,
        request: &ActivationRequest,
        extraction: &UrlExtraction,
        context: &AdmissionContext<'_>,
        slot: &mut DeferredUnlockSlot,
    ) -> bool {
        match self.evaluate(request, extraction, context) {
            AdmissionVerdict::Admit { .. } => false,
            AdmissionVerdict::Defer => {
                slot.defer(request.raw().clone());
                true
            }
            AdmissionVerdict::Ignore { .. } => true,
        }
    }

    /// Never panics. Any fault inside the check becomes an ignore.
    pub fn evaluate(
        &self,
        request: &ActivationRequest,
        extraction: &UrlExtraction,
        context: &AdmissionContext<'_>,
    ) -> AdmissionVerdict {
        match guarded(|| Ok(self.evaluate_unguarded(request, extraction, context))) {
            Ok(verdict) => verdict,
            Err(err) => {
                log::warn!("ignoring request: {}", err);
                AdmissionVerdict::Ignore {
                    reason: IgnoreReason::Faulted,
                }
            }
        }
    }

    fn evaluate_unguarded(
        &self,
        request: &ActivationRequest,
        extraction: &UrlExtraction,
        context: &AdmissionContext<'_>,
    ) -> AdmissionVerdict {
        let url = extraction.url();
        let resolution = url.map(|url| self.schemes.resolve(url));
        let scheme = resolution
            .as_ref()
            .and_then(|resolution| resolution.requested_scheme.as_deref());
        if !extraction.is_valid() || is_invalid_scheme(scheme) {
            log::warn!("ignoring request with invalid url");
            return ignore(IgnoreReason::InvalidUrl);
        }

        let trust = context.classifier.classify(request);

        if request.extras().open_new_incognito_tab
            && !trust.is_self()
            && !context.target_is_isolated_surface
            && !context.caches.matches_pending_incognito(request.data())
        {
            log::warn!("ignoring incognito request from {:?} sender", trust);
            return ignore(IgnoreReason::IncognitoNotAllowed);
        }

        // A launcher tap.
        if url.is_none() && request.action() == Action::Main {
            return AdmissionVerdict::Admit { trust };
        }

        if context.freshly_started && request.action() == Action::TranslateTab {
            return ignore(IgnoreReason::ReplayedTranslate);
        }

        if let (Some(url), Some(resolution)) = (url, resolution.as_ref())
            && !trust.is_at_least_affiliate()
            && resolution.family == SchemeFamily::Internal
            && !self.schemes.is_allowlisted_internal_url(url)
        {
            log::warn!("ignoring internal url from untrustworthy source");
            return ignore(IgnoreReason::UnsafeInternalScheme);
        }

        if trust.is_at_least_affiliate() || context.device.is_user_visible() {
            return AdmissionVerdict::Admit { trust };
        }
        log::info!("deferring request until the device is unlocked");
        AdmissionVerdict::Defer
    }
}

fn ignore(reason: IgnoreReason) -> AdmissionVerdict {
    AdmissionVerdict::Ignore { reason }
}

/// Runs `check`, turning a panic into [`AdmissionError::Panicked`].
pub(crate) fn guarded<F>(check: F) -> Result<AdmissionVerdict, AdmissionError>
where
    F: FnOnce() -> Result<AdmissionVerdict, AdmissionError>,
{
    match catch_unwind(AssertUnwindSafe(check)) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(AdmissionError::Panicked(message))
        }
    }
}
