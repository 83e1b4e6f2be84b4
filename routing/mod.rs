/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

pub mod dispatcher;
pub mod headers;
pub mod launch_params;
pub mod referrer;
pub mod session;
pub mod tab_open;

pub use dispatcher::{RouteDecision, Router, RoutingContext, SurfaceKind, is_isolated_surface_request};
pub use launch_params::{LaunchParameters, LaunchParamsBuilder, PageTransition, PostBody, UiMetadata};
pub use referrer::{Referrer, ReferrerPolicy};
pub use session::{FixedSessionDirectory, NoSessions, SessionDirectory};
pub use tab_open::{BringToFrontSource, TabOpenType, classify_tab_open_type};
