/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::time::Instant;

use crate::intake::request::RawActivationRequest;

/// Holds at most one request that arrived while the user could not see the
/// screen. A newer deferral replaces the older one.
#[derive(Debug, Default)]
pub struct DeferredUnlockSlot {
    pending: Option<(RawActivationRequest, Instant)>,
}

impl DeferredUnlockSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when an earlier deferral was superseded.
    pub fn defer(&mut self, request: RawActivationRequest) -> bool {
        self.pending.replace((request, Instant::now())).is_some()
    }

    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deferred_at(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, at)| *at)
    }

    pub fn take_on_unlock(&mut self) -> Option<RawActivationRequest> {
        self.pending.take().map(|(request, _)| request)
    }
}
