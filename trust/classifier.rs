/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use serde::Serialize;

use super::identity::{AppIdentity, CapabilityToken, TrustedSigners};
use crate::intake::request::ActivationRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustLevel {
    SelfTrusted,
    AffiliateTrusted,
    Untrusted,
}

impl TrustLevel {
    pub fn is_self(self) -> bool {
        self == Self::SelfTrusted
    }

    pub fn is_at_least_affiliate(self) -> bool {
        !matches!(self, Self::Untrusted)
    }
}

/// Decides how far a request's origin can be trusted. Computed per request,
/// never cached.
#[derive(Debug)]
pub struct SenderTrustClassifier {
    identity: AppIdentity,
    signers: TrustedSigners,
}

impl SenderTrustClassifier {
    pub fn new(identity: AppIdentity, signers: TrustedSigners) -> Self {
        Self { identity, signers }
    }

    pub fn identity(&self) -> &AppIdentity {
        &self.identity
    }

    pub fn own_package(&self) -> &str {
        self.identity.package()
    }

    pub fn classify(&self, request: &ActivationRequest) -> TrustLevel {
        if self.is_self_token(request.capability_token()) {
            return TrustLevel::SelfTrusted;
        }
        let Some(legacy) = request.extras().legacy_capability.as_ref() else {
            return TrustLevel::Untrusted;
        };
        match self.signers.verify(legacy) {
            Ok(()) => TrustLevel::AffiliateTrusted,
            Err(err) => {
                log::debug!("legacy capability from {} rejected: {}", legacy.creator, err);
                TrustLevel::Untrusted
            }
        }
    }

    fn is_self_token(&self, token: Option<&CapabilityToken>) -> bool {
        match token {
            Some(token) => match self.identity.verify(token) {
                Ok(()) => true,
                Err(err) => {
                    log::debug!("capability token from {} rejected: {}", token.creator, err);
                    false
                }
            },
            None => false,
        }
    }
}
