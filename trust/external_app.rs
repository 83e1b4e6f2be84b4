/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Best-effort naming of the app that sent a request. Telemetry only; this
//! never feeds into trust.

use serde::Serialize;

use crate::intake::request::{ActivationRequest, caller_app_id};

pub const PACKAGE_GMAIL: &str = "com.google.android.gm";
pub const PACKAGE_PLUS: &str = "com.google.android.apps.plus";
pub const PACKAGE_HANGOUTS: &str = "com.google.android.talk";
pub const PACKAGE_MESSENGER: &str = "com.google.android.apps.messaging";
pub const PACKAGE_LINE: &str = "jp.naver.line.android";
pub const PACKAGE_WHATSAPP: &str = "com.whatsapp";
pub const PACKAGE_GSA: &str = "com.google.android.googlequicksearchbox";
pub const PACKAGE_YAHOO_MAIL: &str = "com.yahoo.mobile.client.android.mail";
pub const PACKAGE_VIBER: &str = "com.viber.voip";
pub const WEBAPK_PACKAGE_PREFIX: &str = "org.chromium.webapk.";

pub const TWITTER_LINK_PREFIX: &str = "http://t.co/";
pub const NEWS_LINK_PREFIX: &str = "http://news.google.com/news/url?";
pub const YOUTUBE_LINK_PREFIX_HTTPS: &str = "https://www.youtube.com/redirect?";
pub const YOUTUBE_LINK_PREFIX_HTTP: &str = "http://www.youtube.com/redirect?";
pub const FACEBOOK_REFERRER_URL: &str = "android-app://m.facebook.com";
pub const FACEBOOK_INTERNAL_BROWSER_REFERRER: &str = "http://m.facebook.com";

/// Stable ordinals; these values are recorded and must not be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ExternalAppId {
    Other = 0,
    Gmail = 1,
    Facebook = 2,
    Plus = 3,
    Twitter = 4,
    Chrome = 5,
    Hangouts = 6,
    Messenger = 7,
    News = 8,
    Line = 9,
    Whatsapp = 10,
    Gsa = 11,
    Webapk = 12,
    YahooMail = 13,
    Viber = 14,
    Youtube = 15,
}

impl ExternalAppId {
    pub const NUM_ENTRIES: u8 = 16;

    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        const ALL: [ExternalAppId; ExternalAppId::NUM_ENTRIES as usize] = [
            ExternalAppId::Other,
            ExternalAppId::Gmail,
            ExternalAppId::Facebook,
            ExternalAppId::Plus,
            ExternalAppId::Twitter,
            ExternalAppId::Chrome,
            ExternalAppId::Hangouts,
            ExternalAppId::Messenger,
            ExternalAppId::News,
            ExternalAppId::Line,
            ExternalAppId::Whatsapp,
            ExternalAppId::Gsa,
            ExternalAppId::Webapk,
            ExternalAppId::YahooMail,
            ExternalAppId::Viber,
            ExternalAppId::Youtube,
        ];
        ALL.get(usize::from(ordinal)).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Other => "other",
            Self::Gmail => "gmail",
            Self::Facebook => "facebook",
            Self::Plus => "plus",
            Self::Twitter => "twitter",
            Self::Chrome => "chrome",
            Self::Hangouts => "hangouts",
            Self::Messenger => "messenger",
            Self::News => "news",
            Self::Line => "line",
            Self::Whatsapp => "whatsapp",
            Self::Gsa => "gsa",
            Self::Webapk => "webapk",
            Self::YahooMail => "yahoo_mail",
            Self::Viber => "viber",
            Self::Youtube => "youtube",
        }
    }
}

pub fn map_package_to_external_app_id(package: &str, own_package: &str) -> ExternalAppId {
    match package {
        PACKAGE_PLUS => ExternalAppId::Plus,
        PACKAGE_GMAIL => ExternalAppId::Gmail,
        PACKAGE_HANGOUTS => ExternalAppId::Hangouts,
        PACKAGE_MESSENGER => ExternalAppId::Messenger,
        PACKAGE_LINE => ExternalAppId::Line,
        PACKAGE_WHATSAPP => ExternalAppId::Whatsapp,
        PACKAGE_GSA => ExternalAppId::Gsa,
        PACKAGE_YAHOO_MAIL => ExternalAppId::YahooMail,
        PACKAGE_VIBER => ExternalAppId::Viber,
        _ if package == own_package => ExternalAppId::Chrome,
        _ if package.starts_with(WEBAPK_PACKAGE_PREFIX) => ExternalAppId::Webapk,
        _ => ExternalAppId::Other,
    }
}

/// Ordered rules, first match wins. `url` is the already extracted target.
pub fn identify_external_sender(
    request: &ActivationRequest,
    url: Option<&str>,
    sent_by_self: bool,
    own_package: &str,
) -> ExternalAppId {
    if sent_by_self {
        return ExternalAppId::Chrome;
    }
    if let Some(package) = caller_app_id(request) {
        return map_package_to_external_app_id(package, own_package);
    }

    let url = url.unwrap_or_default();
    if url.starts_with(TWITTER_LINK_PREFIX) {
        return ExternalAppId::Twitter;
    }
    if url.starts_with(NEWS_LINK_PREFIX) {
        return ExternalAppId::News;
    }
    if url.starts_with(YOUTUBE_LINK_PREFIX_HTTPS) || url.starts_with(YOUTUBE_LINK_PREFIX_HTTP) {
        return ExternalAppId::Youtube;
    }

    // Facebook either names itself as the referrer or, from its in-app
    // browser, forwards its own page as the Referer header.
    let extras = request.extras();
    if extras.referrer.as_deref() == Some(FACEBOOK_REFERRER_URL) {
        return ExternalAppId::Facebook;
    }
    let header_referer = extras.headers.as_ref().and_then(|headers| {
        headers
            .iter()
            .find(|(name, _)| name == "Referer")
            .map(|(_, value)| value.as_str())
    });
    if header_referer == Some(FACEBOOK_INTERNAL_BROWSER_REFERRER) {
        return ExternalAppId::Facebook;
    }
    ExternalAppId::Other
}
