/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Where an admitted URL lands relative to the pages already open.

use serde::Serialize;

use crate::intake::request::ActivationRequest;
use crate::trust::TrustLevel;

/// Stable ordinals shared with the tab model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum TabOpenType {
    OpenNewTab = 0,
    ReuseUrlMatchElseNew = 1,
    ReuseAppIdMatchElseNew = 2,
    ClobberCurrent = 3,
    BringToFront = 4,
    OpenNewIncognito = 5,
    ReuseIdMatchElseNew = 6,
}

impl TabOpenType {
    pub fn ordinal(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum BringToFrontSource {
    ActivateTab = 0,
    Notification = 1,
    SearchActivity = 2,
}

impl BringToFrontSource {
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn from_ordinal(ordinal: i32) -> Option<Self> {
        match ordinal {
            0 => Some(Self::ActivateTab),
            1 => Some(Self::Notification),
            2 => Some(Self::SearchActivity),
            _ => None,
        }
    }
}

/// Tab to bring forward. Only the app itself may ask for this.
pub fn bring_tab_to_front_id(request: &ActivationRequest, trust: TrustLevel) -> Option<i32> {
    trust
        .is_self()
        .then_some(request.extras().bring_tab_to_front)
        .flatten()
}

/// Originating tab id stamped by the app on its own requests.
pub fn tab_id(request: &ActivationRequest, trust: TrustLevel) -> Option<i32> {
    trust.is_self().then_some(request.extras().tab_id).flatten()
}

/// First matching rule wins; explicit directives outrank the app-id heuristics.
pub fn classify_tab_open_type(
    request: &ActivationRequest,
    trust: TrustLevel,
    own_package: &str,
) -> TabOpenType {
    let extras = request.extras();
    if extras.reuse_url_matching_tab {
        return TabOpenType::ReuseUrlMatchElseNew;
    }
    if extras.open_new_incognito_tab {
        return TabOpenType::OpenNewIncognito;
    }
    if bring_tab_to_front_id(request, trust).is_some() {
        return TabOpenType::BringToFront;
    }
    // Apps that don't name themselves in the application-id extra never get
    // their tabs reused. The sender's package hint does not count.
    let Some(app_id) = request.application_id() else {
        return TabOpenType::OpenNewTab;
    };
    if extras.create_new_tab {
        return TabOpenType::OpenNewTab;
    }
    if extras.reuse_tab_matching_id.is_some() {
        return TabOpenType::ReuseIdMatchElseNew;
    }
    if app_id == own_package {
        TabOpenType::ClobberCurrent
    } else {
        TabOpenType::ReuseAppIdMatchElseNew
    }
}
