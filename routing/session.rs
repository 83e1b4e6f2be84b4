/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use crate::intake::request::ActivationRequest;

/// Lookup into the isolated-surface session registry owned by the host.
pub trait SessionDirectory: Send {
    /// Referrer a session registered for its navigations, if any.
    fn default_referrer(&self, request: &ActivationRequest) -> Option<String>;

    /// Whether the session behind `request` is verified first-party for the
    /// origin it is opening.
    fn is_first_party_origin(&self, request: &ActivationRequest) -> bool;
}

/// No sessions registered.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSessions;

impl SessionDirectory for NoSessions {
    fn default_referrer(&self, _request: &ActivationRequest) -> Option<String> {
        None
    }

    fn is_first_party_origin(&self, _request: &ActivationRequest) -> bool {
        false
    }
}

/// Same answer for every session-carrying request.
#[derive(Debug, Clone, Default)]
pub struct FixedSessionDirectory {
    pub default_referrer: Option<String>,
    pub first_party: bool,
}

impl SessionDirectory for FixedSessionDirectory {
    fn default_referrer(&self, request: &ActivationRequest) -> Option<String> {
        if !request.extras().has_session {
            return None;
        }
        self.default_referrer.clone()
    }

    fn is_first_party_origin(&self, request: &ActivationRequest) -> bool {
        request.extras().has_session && self.first_party
    }
}
