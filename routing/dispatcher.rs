/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Picks the surface that services an admitted request.

use serde::Serialize;

use crate::intake::request::{
    Action, ActivationRequest, CATEGORY_NOTIFICATION_PREFERENCES, LaunchFlags,
};
use crate::intake::url_extract::UrlExtraction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceKind {
    Browsing,
    Isolated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "route", rename_all = "snake_case")]
pub enum RouteDecision {
    /// Share payload without a URL; nothing to open.
    Terminate,
    WebSearch { query: String },
    NotificationSettings,
    FirstRun,
    Launch { surface: SurfaceKind, flags: LaunchFlags },
    ContinueInPlace { surface: SurfaceKind },
}

/// What the host knows about the surfaces that already exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RoutingContext {
    pub first_run_required: bool,
    pub running_surface: Option<SurfaceKind>,
    pub isolated_surface_owns_task: bool,
    pub browsing_task_exists: bool,
}

/// Session-carrying requests go to the isolated surface unless browser UI is
/// forced globally or by the request.
pub fn is_isolated_surface_request(request: &ActivationRequest, always_use_browser_ui: bool) -> bool {
    let extras = request.extras();
    extras.has_session && !always_use_browser_ui && !extras.force_browser_ui
}

/// Non-empty query on a SEARCH or MEDIA_SEARCH request.
pub fn web_search_query(request: &ActivationRequest) -> Option<&str> {
    if !matches!(request.action(), Action::Search | Action::MediaSearch) {
        return None;
    }
    request
        .extras()
        .search_query
        .as_deref()
        .filter(|query| !query.is_empty())
}

pub fn rewrite_isolated_flags(flags: LaunchFlags, owns_task: bool) -> LaunchFlags {
    let flags = if owns_task {
        flags
            .without(LaunchFlags::NEW_DOCUMENT | LaunchFlags::MULTIPLE_TASK)
            .with(LaunchFlags::SINGLE_TOP)
    } else {
        flags.with(LaunchFlags::NEW_TASK)
    };
    flags.without(LaunchFlags::EXCLUDE_FROM_RECENTS)
}

pub fn rewrite_browsing_flags(flags: LaunchFlags, task_exists: bool) -> LaunchFlags {
    let flags = if task_exists {
        flags.without(LaunchFlags::MULTIPLE_TASK | LaunchFlags::NEW_DOCUMENT)
    } else {
        flags
    };
    flags
        .with(LaunchFlags::NEW_TASK)
        .without(LaunchFlags::EXCLUDE_FROM_RECENTS)
}

#[derive(Debug, Clone, Default)]
pub struct Router {
    always_use_browser_ui: bool,
}

impl Router {
    pub fn new(always_use_browser_ui: bool) -> Self {
        Self {
            always_use_browser_ui,
        }
    }

    pub fn always_use_browser_ui(&self) -> bool {
        self.always_use_browser_ui
    }

    /// First match wins.
    pub fn decide(
        &self,
        request: &ActivationRequest,
        extraction: &UrlExtraction,
        context: &RoutingContext,
    ) -> RouteDecision {
        let has_url = extraction.url().is_some();
        if request.action().is_share() && !has_url {
            return RouteDecision::Terminate;
        }

        // A running browsing surface answers searches itself.
        if !has_url
            && context.running_surface != Some(SurfaceKind::Browsing)
            && let Some(query) = web_search_query(request)
        {
            return RouteDecision::WebSearch {
                query: query.to_string(),
            };
        }

        if request.has_category(CATEGORY_NOTIFICATION_PREFERENCES) {
            return RouteDecision::NotificationSettings;
        }

        if context.first_run_required {
            return RouteDecision::FirstRun;
        }

        let (surface, flags) = if is_isolated_surface_request(request, self.always_use_browser_ui) {
            (
                SurfaceKind::Isolated,
                rewrite_isolated_flags(request.flags(), context.isolated_surface_owns_task),
            )
        } else {
            (
                SurfaceKind::Browsing,
                rewrite_browsing_flags(request.flags(), context.browsing_task_exists),
            )
        };

        if context.running_surface == Some(surface) {
            return RouteDecision::ContinueInPlace { surface };
        }
        RouteDecision::Launch { surface, flags }
    }
}
