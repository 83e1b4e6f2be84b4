/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Single-slot caches that let the app vouch for requests it sends to itself
//! without handing a trust token to whoever ends up receiving them.
//!
//! Both slots are overwritten, never merged, and live only as long as the
//! owning engine.

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingReferrer {
    id: u32,
    url: String,
}

#[derive(Debug, Default)]
pub struct CorrelationCaches {
    pending_referrer: Option<PendingReferrer>,
    last_referrer_id: u32,
    pending_incognito_url: Option<String>,
}

impl CorrelationCaches {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_pending_referrer(&mut self, id: u32, url: &str) {
        self.last_referrer_id = self.last_referrer_id.max(id);
        self.pending_referrer = Some(PendingReferrer {
            id,
            url: url.to_string(),
        });
    }

    /// Records `url` under a fresh id and returns the id to stamp on the
    /// outgoing request.
    pub fn stamp_pending_referrer(&mut self, url: &str) -> u32 {
        self.last_referrer_id = self.last_referrer_id.wrapping_add(1);
        let id = self.last_referrer_id;
        self.pending_referrer = Some(PendingReferrer {
            id,
            url: url.to_string(),
        });
        id
    }

    pub fn get_pending_referrer(&self, id: u32) -> Option<&str> {
        self.pending_referrer
            .as_ref()
            .filter(|pending| pending.id == id)
            .map(|pending| pending.url.as_str())
    }

    pub fn clear_pending_referrer(&mut self) {
        self.pending_referrer = None;
    }

    pub fn set_pending_incognito_url(&mut self, data: &str) {
        self.pending_incognito_url = Some(data.to_string());
    }

    pub fn pending_incognito_url(&self) -> Option<&str> {
        self.pending_incognito_url.as_deref()
    }

    /// Exact string match against the last self-issued incognito request.
    pub fn matches_pending_incognito(&self, data: Option<&str>) -> bool {
        match (self.pending_incognito_url.as_deref(), data) {
            (Some(pending), Some(data)) => pending == data,
            _ => false,
        }
    }

    pub fn clear_pending_incognito_url(&mut self) {
        self.pending_incognito_url = None;
    }
}
