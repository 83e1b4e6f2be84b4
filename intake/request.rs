/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::extras::{ExtraValue, RequestExtras};
use crate::trust::identity::CapabilityToken;

pub const ACTION_VIEW: &str = "android.intent.action.VIEW";
pub const ACTION_MAIN: &str = "android.intent.action.MAIN";
pub const ACTION_SEARCH: &str = "android.intent.action.SEARCH";
pub const ACTION_MEDIA_SEARCH: &str = "android.intent.action.MEDIA_SEARCH";
pub const ACTION_SEND: &str = "android.intent.action.SEND";
pub const ACTION_SEND_MULTIPLE: &str = "android.intent.action.SEND_MULTIPLE";
pub const ACTION_VOICE_SEARCH_RESULTS: &str = "android.speech.action.VOICE_SEARCH_RESULTS";
pub const ACTION_TRANSLATE_TAB: &str = "org.chromium.chrome.browser.translate.TRANSLATE_TAB";

pub const CATEGORY_LAUNCHER: &str = "android.intent.category.LAUNCHER";
pub const CATEGORY_BROWSABLE: &str = "android.intent.category.BROWSABLE";
pub const CATEGORY_NOTIFICATION_PREFERENCES: &str =
    "android.intent.category.NOTIFICATION_PREFERENCES";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    View,
    Main,
    Search,
    MediaSearch,
    Send,
    SendMultiple,
    VoiceSearchResults,
    TranslateTab,
    Other,
}

impl Action {
    pub fn from_raw(action: &str) -> Self {
        match action {
            ACTION_VIEW => Self::View,
            ACTION_MAIN => Self::Main,
            ACTION_SEARCH => Self::Search,
            ACTION_MEDIA_SEARCH => Self::MediaSearch,
            ACTION_SEND => Self::Send,
            ACTION_SEND_MULTIPLE => Self::SendMultiple,
            ACTION_VOICE_SEARCH_RESULTS => Self::VoiceSearchResults,
            ACTION_TRANSLATE_TAB => Self::TranslateTab,
            _ => Self::Other,
        }
    }

    pub fn is_share(self) -> bool {
        matches!(self, Self::Send | Self::SendMultiple)
    }
}

/// Task/launch flag bitset carried by a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LaunchFlags(pub u32);

impl LaunchFlags {
    pub const SINGLE_TOP: u32 = 0x2000_0000;
    pub const MULTIPLE_TASK: u32 = 0x0800_0000;
    pub const NEW_TASK: u32 = 0x1000_0000;
    pub const CLEAR_TOP: u32 = 0x0400_0000;
    pub const EXCLUDE_FROM_RECENTS: u32 = 0x0080_0000;
    pub const FROM_HISTORY: u32 = 0x0010_0000;
    pub const NEW_DOCUMENT: u32 = 0x0008_0000;

    pub fn contains(self, flag: u32) -> bool {
        self.0 & flag == flag
    }

    pub fn with(self, flag: u32) -> Self {
        Self(self.0 | flag)
    }

    pub fn without(self, flag: u32) -> Self {
        Self(self.0 & !flag)
    }
}

/// Navigation metadata recorded by the sender alongside its request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMetadata {
    #[serde(default)]
    pub user_gesture: bool,
    #[serde(default)]
    pub renderer_initiated: bool,
    #[serde(default)]
    pub initiator_origin: Option<String>,
}

/// A launch request exactly as it arrived from another process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawActivationRequest {
    pub action: String,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub extras: BTreeMap<String, ExtraValue>,
    #[serde(default)]
    pub flags: LaunchFlags,
    #[serde(default)]
    pub categories: BTreeSet<String>,
    #[serde(default)]
    pub capability_token: Option<CapabilityToken>,
    #[serde(default)]
    pub package_hint: Option<String>,
    #[serde(default)]
    pub request_metadata: Option<RequestMetadata>,
}

impl RawActivationRequest {
    pub fn new(action: &str) -> Self {
        Self {
            action: action.to_string(),
            ..Self::default()
        }
    }

    pub fn view(data: &str) -> Self {
        Self::new(ACTION_VIEW).with_data(data)
    }

    pub fn with_data(mut self, data: &str) -> Self {
        self.data = Some(data.to_string());
        self
    }

    pub fn with_mime_type(mut self, mime_type: &str) -> Self {
        self.mime_type = Some(mime_type.to_string());
        self
    }

    pub fn with_extra(mut self, key: &str, value: ExtraValue) -> Self {
        self.extras.insert(key.to_string(), value);
        self
    }

    pub fn with_flags(mut self, flags: u32) -> Self {
        self.flags = LaunchFlags(self.flags.0 | flags);
        self
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.categories.insert(category.to_string());
        self
    }

    pub fn with_package_hint(mut self, package: &str) -> Self {
        self.package_hint = Some(package.to_string());
        self
    }

    pub fn with_metadata(mut self, metadata: RequestMetadata) -> Self {
        self.request_metadata = Some(metadata);
        self
    }

    /// Recents relaunches replay the original request; collapse them to a plain launcher tap.
    pub fn rewrite_from_history(self) -> Self {
        if !self.flags.contains(LaunchFlags::FROM_HISTORY) {
            return self;
        }
        let mut categories = BTreeSet::new();
        categories.insert(CATEGORY_LAUNCHER.to_string());
        Self {
            action: ACTION_MAIN.to_string(),
            flags: self.flags,
            categories,
            capability_token: self.capability_token,
            ..Self::default()
        }
    }

    pub fn decode(self) -> ActivationRequest {
        let extras = RequestExtras::decode(&self.extras);
        let package_hint = self
            .package_hint
            .clone()
            .or_else(|| extras.application_id.clone());
        ActivationRequest {
            action: Action::from_raw(&self.action),
            data: self.data.clone(),
            mime_type: self.mime_type.clone(),
            flags: self.flags,
            categories: self.categories.clone(),
            package_hint,
            extras,
            source: self,
        }
    }
}

/// A decoded request. Nothing downstream mutates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationRequest {
    action: Action,
    data: Option<String>,
    mime_type: Option<String>,
    flags: LaunchFlags,
    categories: BTreeSet<String>,
    package_hint: Option<String>,
    extras: RequestExtras,
    source: RawActivationRequest,
}

impl ActivationRequest {
    pub fn action(&self) -> Action {
        self.action
    }

    pub fn data(&self) -> Option<&str> {
        self.data.as_deref()
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    pub fn flags(&self) -> LaunchFlags {
        self.flags
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.categories.contains(category)
    }

    /// Caller-named app id. Untrusted on its own.
    pub fn package_hint(&self) -> Option<&str> {
        self.package_hint.as_deref()
    }

    /// The application-id extra exactly as sent, without the package hint fallback.
    pub fn application_id(&self) -> Option<&str> {
        self.extras.application_id.as_deref()
    }

    pub fn extras(&self) -> &RequestExtras {
        &self.extras
    }

    pub fn capability_token(&self) -> Option<&CapabilityToken> {
        self.source.capability_token.as_ref()
    }

    pub fn request_metadata(&self) -> Option<&RequestMetadata> {
        self.source.request_metadata.as_ref()
    }

    pub fn raw(&self) -> &RawActivationRequest {
        &self.source
    }

    pub fn into_raw(self) -> RawActivationRequest {
        self.source
    }
}

/// Caller app id lookup used by the tab classifier; the application-id extra wins.
pub(crate) fn caller_app_id(request: &ActivationRequest) -> Option<&str> {
    request.application_id().or(request.package_hint())
}
