/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Typed view over the loosely-typed extras map.
//!
//! Every known key is decoded exactly once, at the boundary. A value of the
//! wrong type, or an integer that does not fit the slot, decodes to "absent"
//! so the classifiers downstream only ever see the most restrictive reading.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::trust::identity::CapabilityToken;

pub const EXTRA_APPLICATION_ID: &str = "com.android.browser.application_id";
pub const EXTRA_CREATE_NEW_TAB: &str = "create_new_tab";
pub const EXTRA_HEADERS: &str = "com.android.browser.headers";
pub const EXTRA_REFERRER: &str = "android.intent.extra.REFERRER";
pub const EXTRA_REFERRER_NAME: &str = "android.intent.extra.REFERRER_NAME";
pub const EXTRA_REFERRER_ID: &str = "org.chromium.chrome.browser.referrer_id";
pub const EXTRA_REFERRER_POLICY: &str = "android.support.browser.extra.referrer_policy";
pub const EXTRA_TAB_ID: &str = "com.android.chrome.tab_id";
pub const EXTRA_OPEN_NEW_INCOGNITO_TAB: &str =
    "com.google.android.apps.chrome.EXTRA_OPEN_NEW_INCOGNITO_TAB";
pub const EXTRA_INCOGNITO_MODE: &str = "org.chromium.chrome.browser.incognito_mode";
pub const EXTRA_INVOKED_FROM_LAUNCH_NEW_INCOGNITO_TAB: &str =
    "org.chromium.chrome.browser.incognito.invoked_from_launch_new_incognito_tab";
pub const EXTRA_INVOKED_FROM_SHORTCUT: &str = "com.android.chrome.invoked_from_shortcut";
pub const EXTRA_INVOKED_FROM_APP_WIDGET: &str = "com.android.chrome.invoked_from_app_widget";
pub const EXTRA_REUSE_URL_MATCHING_TAB_ELSE_NEW_TAB: &str = "REUSE_URL_MATCHING_TAB_ELSE_NEW_TAB";
pub const EXTRA_REUSE_TAB_MATCHING_ID: &str = "REUSE_TAB_MATCHING_ID";
pub const EXTRA_REUSE_TAB_ORIGINAL_URL: &str = "REUSE_TAB_ORIGINAL_URL";
pub const EXTRA_BRING_TAB_TO_FRONT: &str = "BRING_TAB_TO_FRONT";
pub const EXTRA_BRING_TAB_TO_FRONT_SOURCE: &str = "BRING_TAB_TO_FRONT_SOURCE";
pub const EXTRA_PAGE_TRANSITION_TYPE: &str = "com.google.chrome.transition_type";
pub const EXTRA_PAGE_TRANSITION_BOOKMARK_ID: &str = "com.google.chrome.transition_bookmark_id";
pub const EXTRA_POST_DATA: &str = "com.android.chrome.post_data";
pub const EXTRA_POST_DATA_TYPE: &str = "com.android.chrome.post_data_type";
pub const EXTRA_WEBAPP_URL: &str = "org.chromium.chrome.browser.webapp_url";
pub const EXTRA_VOICE_SEARCH_RESULT_STRINGS: &str =
    "android.speech.extras.VOICE_SEARCH_RESULT_STRINGS";
pub const EXTRA_VOICE_SEARCH_RESULT_URLS: &str = "android.speech.extras.VOICE_SEARCH_RESULT_URLS";
pub const EXTRA_SEARCH_QUERY: &str = "query";
pub const EXTRA_TRANSLATE_TARGET_LANGUAGE: &str =
    "org.chromium.chrome.browser.translate.extra.TARGET_LANGUAGE_CODE";
pub const EXTRA_TRANSLATE_EXPECTED_URL: &str =
    "org.chromium.chrome.browser.translate.extra.EXPECTED_URL";
pub const EXTRA_CUSTOM_TABS_SESSION: &str = "android.support.customtabs.extra.SESSION";
pub const EXTRA_FORCE_BROWSER_UI: &str = "org.chromium.chrome.browser.force_browser_ui";
pub const EXTRA_TRUSTED_APPLICATION_CODE: &str = "trusted_application_code_extra";
pub const EXTRA_EXTERNAL_NAV_PACKAGES: &str =
    "org.chromium.chrome.browser.dont_launch_external_nav_packages";
pub const EXTRA_TIMESTAMP_MS: &str = "org.chromium.chrome.browser.timestamp";

/// One value in the raw extras map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ExtraValue {
    Bool(bool),
    Int(i64),
    String(String),
    StringList(Vec<String>),
    Bytes(Vec<u8>),
    Token(CapabilityToken),
    Headers(Vec<(String, String)>),
}

/// Decoded extras. Absent and malformed are indistinguishable here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestExtras {
    pub application_id: Option<String>,
    pub create_new_tab: bool,
    pub open_new_incognito_tab: bool,
    pub incognito_mode: bool,
    pub invoked_from_launch_new_incognito_tab: bool,
    pub invoked_from_shortcut: bool,
    pub invoked_from_app_widget: bool,
    pub reuse_url_matching_tab: bool,
    pub reuse_tab_matching_id: Option<i32>,
    pub reuse_tab_original_url: Option<String>,
    pub bring_tab_to_front: Option<i32>,
    pub bring_tab_to_front_source: Option<i32>,
    pub tab_id: Option<i32>,
    pub referrer: Option<String>,
    pub referrer_id: Option<u32>,
    pub referrer_name: Option<String>,
    pub referrer_policy: Option<i64>,
    pub headers: Option<Vec<(String, String)>>,
    pub page_transition_type: Option<u32>,
    pub transition_bookmark_id: Option<String>,
    pub post_data: Option<Vec<u8>>,
    pub post_data_type: Option<String>,
    pub webapp_url: Option<String>,
    pub voice_results: Option<Vec<String>>,
    pub voice_result_single: Option<String>,
    pub voice_result_urls: Option<Vec<String>>,
    pub search_query: Option<String>,
    pub translate_target_language: Option<String>,
    pub translate_expected_url: Option<String>,
    pub has_session: bool,
    pub force_browser_ui: bool,
    pub legacy_capability: Option<CapabilityToken>,
    pub external_nav_packages: Option<Vec<String>>,
    pub timestamp_ms: Option<i64>,
}

struct ExtrasReader<'a> {
    raw: &'a BTreeMap<String, ExtraValue>,
}

impl ExtrasReader<'_> {
    fn bool(&self, key: &str) -> bool {
        matches!(self.raw.get(key), Some(ExtraValue::Bool(true)))
    }

    fn int(&self, key: &str) -> Option<i64> {
        match self.raw.get(key) {
            Some(ExtraValue::Int(value)) => Some(*value),
            _ => None,
        }
    }

    fn int32(&self, key: &str) -> Option<i32> {
        self.int(key).and_then(|value| i32::try_from(value).ok())
    }

    fn string(&self, key: &str) -> Option<String> {
        match self.raw.get(key) {
            Some(ExtraValue::String(value)) => Some(value.clone()),
            _ => None,
        }
    }

    fn string_list(&self, key: &str) -> Option<Vec<String>> {
        match self.raw.get(key) {
            Some(ExtraValue::StringList(values)) => Some(values.clone()),
            _ => None,
        }
    }

    fn bytes(&self, key: &str) -> Option<Vec<u8>> {
        match self.raw.get(key) {
            Some(ExtraValue::Bytes(bytes)) => Some(bytes.clone()),
            _ => None,
        }
    }

    fn headers(&self, key: &str) -> Option<Vec<(String, String)>> {
        match self.raw.get(key) {
            Some(ExtraValue::Headers(headers)) => Some(headers.clone()),
            _ => None,
        }
    }

    fn token(&self, key: &str) -> Option<CapabilityToken> {
        match self.raw.get(key) {
            Some(ExtraValue::Token(token)) => Some(token.clone()),
            _ => None,
        }
    }
}

impl RequestExtras {
    pub fn decode(raw: &BTreeMap<String, ExtraValue>) -> Self {
        let reader = ExtrasReader { raw };
        Self {
            application_id: reader.string(EXTRA_APPLICATION_ID),
            create_new_tab: reader.bool(EXTRA_CREATE_NEW_TAB),
            open_new_incognito_tab: reader.bool(EXTRA_OPEN_NEW_INCOGNITO_TAB),
            incognito_mode: reader.bool(EXTRA_INCOGNITO_MODE),
            invoked_from_launch_new_incognito_tab: reader
                .bool(EXTRA_INVOKED_FROM_LAUNCH_NEW_INCOGNITO_TAB),
            invoked_from_shortcut: reader.bool(EXTRA_INVOKED_FROM_SHORTCUT),
            invoked_from_app_widget: reader.bool(EXTRA_INVOKED_FROM_APP_WIDGET),
            reuse_url_matching_tab: reader.bool(EXTRA_REUSE_URL_MATCHING_TAB_ELSE_NEW_TAB),
            reuse_tab_matching_id: reader.int32(EXTRA_REUSE_TAB_MATCHING_ID),
            reuse_tab_original_url: reader.string(EXTRA_REUSE_TAB_ORIGINAL_URL),
            bring_tab_to_front: reader.int32(EXTRA_BRING_TAB_TO_FRONT),
            bring_tab_to_front_source: reader.int32(EXTRA_BRING_TAB_TO_FRONT_SOURCE),
            tab_id: reader.int32(EXTRA_TAB_ID),
            referrer: reader.string(EXTRA_REFERRER),
            referrer_id: reader
                .int(EXTRA_REFERRER_ID)
                .and_then(|id| u32::try_from(id).ok()),
            referrer_name: reader.string(EXTRA_REFERRER_NAME),
            referrer_policy: reader.int(EXTRA_REFERRER_POLICY),
            headers: reader.headers(EXTRA_HEADERS),
            page_transition_type: reader
                .int(EXTRA_PAGE_TRANSITION_TYPE)
                .and_then(|value| u32::try_from(value).ok()),
            transition_bookmark_id: reader.string(EXTRA_PAGE_TRANSITION_BOOKMARK_ID),
            post_data: reader.bytes(EXTRA_POST_DATA),
            post_data_type: reader.string(EXTRA_POST_DATA_TYPE),
            webapp_url: reader.string(EXTRA_WEBAPP_URL),
            voice_results: reader.string_list(EXTRA_VOICE_SEARCH_RESULT_STRINGS),
            voice_result_single: reader.string(EXTRA_VOICE_SEARCH_RESULT_STRINGS),
            voice_result_urls: reader.string_list(EXTRA_VOICE_SEARCH_RESULT_URLS),
            search_query: reader.string(EXTRA_SEARCH_QUERY),
            translate_target_language: reader.string(EXTRA_TRANSLATE_TARGET_LANGUAGE),
            translate_expected_url: reader.string(EXTRA_TRANSLATE_EXPECTED_URL),
            // Session carriers differ between client libraries; presence is what counts.
            has_session: raw.contains_key(EXTRA_CUSTOM_TABS_SESSION),
            force_browser_ui: reader.bool(EXTRA_FORCE_BROWSER_UI),
            legacy_capability: reader.token(EXTRA_TRUSTED_APPLICATION_CODE),
            external_nav_packages: reader.string_list(EXTRA_EXTERNAL_NAV_PACKAGES),
            timestamp_ms: reader.int(EXTRA_TIMESTAMP_MS),
        }
    }

    /// Whether any extra asks for an incognito surface.
    pub fn has_any_incognito_extra(&self) -> bool {
        self.incognito_mode
            || self.open_new_incognito_tab
            || self.invoked_from_launch_new_incognito_tab
    }
}
