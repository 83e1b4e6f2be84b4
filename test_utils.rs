/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::sync::Arc;

use crate::admission::DeviceState;
use crate::engine::{ActivationContext, Engine};
use crate::prefs::{RouterConfig, TrustedSignerConfig};
use crate::routing::{NoSessions, RoutingContext, SessionDirectory, SurfaceKind};
use crate::runtime::worker::{ResolveFuture, Resolver};
use crate::trust::AppIdentity;

pub const OWN_PACKAGE: &str = "org.chromium.chrome";
pub const AFFILIATE_PACKAGE: &str = "com.google.android.googlequicksearchbox";

/// Answers every lookup with one address, without touching the network.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoopbackResolver;

impl Resolver for LoopbackResolver {
    fn resolve(&self, _host: String, _port: u16) -> ResolveFuture {
        Box::pin(async { Ok(1) })
    }
}

/// Engine with one trusted affiliate, returned alongside the affiliate's
/// identity so tests can mint its tokens.
pub fn engine_with_affiliate(sessions: Box<dyn SessionDirectory>) -> (Engine, AppIdentity) {
    let affiliate = AppIdentity::generate(AFFILIATE_PACKAGE);
    let config = RouterConfig {
        own_package: OWN_PACKAGE.to_string(),
        worker_threads: 1,
        trusted_signers: vec![TrustedSignerConfig {
            package: AFFILIATE_PACKAGE.to_string(),
            public_key: affiliate.public_key_base64(),
        }],
        ..RouterConfig::default()
    };
    let engine = match Engine::with_parts(config, sessions, Arc::new(LoopbackResolver)) {
        Ok(engine) => engine,
        Err(err) => panic!("test engine: {err}"),
    };
    (engine, affiliate)
}

pub fn engine() -> Engine {
    engine_with_affiliate(Box::new(NoSessions)).0
}

/// Browsing surface already up and showing.
pub fn browsing_in_place() -> ActivationContext {
    ActivationContext {
        freshly_started: false,
        device: DeviceState::UNLOCKED,
        full_browser_started: true,
        routing: RoutingContext {
            running_surface: Some(SurfaceKind::Browsing),
            browsing_task_exists: true,
            ..RoutingContext::default()
        },
        intent_handling_time_ms: Some(1_000),
    }
}

/// Nothing running yet.
pub fn cold_start() -> ActivationContext {
    ActivationContext {
        freshly_started: true,
        device: DeviceState::UNLOCKED,
        full_browser_started: false,
        routing: RoutingContext::default(),
        intent_handling_time_ms: None,
    }
}

pub fn locked(mut context: ActivationContext) -> ActivationContext {
    context.device = DeviceState {
        interactive: true,
        provisioned: true,
        keyguard_locked: true,
    };
    context
}
