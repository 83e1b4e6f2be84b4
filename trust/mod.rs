/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

pub mod classifier;
pub mod external_app;
pub mod identity;

pub use classifier::{SenderTrustClassifier, TrustLevel};
pub use external_app::{ExternalAppId, identify_external_sender, map_package_to_external_app_id};
pub use identity::{AppIdentity, CapabilityToken, TokenError, TrustedSigners};
