/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The single owner of all per-process request state.
//!
//! [`Engine::handle`] runs a raw request through intake, admission and routing
//! on the caller's thread and returns what the host should do with it. The
//! correlation caches and the deferred-unlock slot are plain fields here;
//! nothing else can reach them. Background work goes to the worker pool and
//! comes back through [`Engine::drain_worker_reports`].

use std::sync::Arc;

use serde::Serialize;

use crate::admission::{
    AdmissionContext, AdmissionFilter, AdmissionVerdict, CorrelationCaches, DeferredUnlockSlot,
    DeviceState, IgnoreReason,
};
use crate::intake::extras::{
    EXTRA_APPLICATION_ID, EXTRA_BRING_TAB_TO_FRONT, EXTRA_BRING_TAB_TO_FRONT_SOURCE,
    EXTRA_CREATE_NEW_TAB, EXTRA_OPEN_NEW_INCOGNITO_TAB, EXTRA_REFERRER, EXTRA_REFERRER_ID,
    ExtraValue,
};
use crate::intake::request::{
    ACTION_VIEW, Action, ActivationRequest, LaunchFlags, RawActivationRequest,
};
use crate::intake::scheme::is_http_or_https;
use crate::intake::url_extract::{UrlExtraction, UrlExtractor, is_for_mhtml_file_or_content};
use crate::prefs::{ConfigError, RouterConfig};
use crate::routing::dispatcher::web_search_query;
use crate::routing::tab_open::{bring_tab_to_front_id, tab_id};
use crate::routing::{
    BringToFrontSource, LaunchParameters, LaunchParamsBuilder, NoSessions, RouteDecision, Router,
    RoutingContext, SessionDirectory, SurfaceKind, TabOpenType, classify_tab_open_type,
    is_isolated_surface_request,
};
use crate::runtime::diagnostics::{
    CHANNEL_ADMISSION_ADMITTED, CHANNEL_ADMISSION_DEFERRED, CHANNEL_ADMISSION_REDELIVERED,
    CHANNEL_SENDER_APP_HANDLERS_PRESENT, DiagnosticsState, ignore_channel, route_channel,
    sender_channel,
};
use crate::runtime::worker::{Resolver, SystemResolver, WorkerPool, WorkerReport};
use crate::trust::{
    AppIdentity, ExternalAppId, SenderTrustClassifier, TrustLevel, identify_external_sender,
};

/// Page opened by a trusted "new tab" request.
pub const NEW_TAB_PAGE_URL: &str = "chrome-native://newtab/";

/// Host state that accompanies one delivery of a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ActivationContext {
    /// The process was started to service this request.
    pub freshly_started: bool,
    pub device: DeviceState,
    pub full_browser_started: bool,
    pub routing: RoutingContext,
    pub intent_handling_time_ms: Option<i64>,
}

/// What the browsing surface should do with a request it already owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewIntentPlan {
    /// Absent for a pure bring-to-front.
    pub params: Option<LaunchParameters>,
    pub tab_open_type: TabOpenType,
    pub external_app_id: ExternalAppId,
    pub caller_app_id: Option<String>,
    pub bring_to_front_tab_id: Option<i32>,
    pub bring_to_front_source: Option<BringToFrontSource>,
    pub tab_id: Option<i32>,
    pub reuse_tab_id: Option<i32>,
    pub reuse_tab_original_url: Option<String>,
    /// Local MHTML opened with no referrer or headers; load as a saved page.
    pub offline_archive: bool,
    pub from_shortcut: bool,
    pub from_app_widget: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum InPlaceAction {
    WebSearch {
        query: String,
    },
    Translate {
        target_language: Option<String>,
        expected_url: Option<String>,
    },
    OpenUrl(Box<ViewIntentPlan>),
    /// Nothing to load; the surface just comes to the front.
    Nothing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ActivationOutcome {
    Ignored {
        reason: IgnoreReason,
    },
    Deferred {
        superseded: bool,
    },
    Terminated,
    WebSearch {
        query: String,
    },
    NotificationSettings,
    FirstRun,
    Launch {
        surface: SurfaceKind,
        flags: LaunchFlags,
        /// The request asked for incognito; theme the new surface for it.
        incognito_hint: bool,
        request: RawActivationRequest,
    },
    Handled {
        action: InPlaceAction,
    },
}

impl ActivationOutcome {
    pub fn is_processed(&self) -> bool {
        !matches!(self, Self::Ignored { .. } | Self::Deferred { .. })
    }
}

pub struct Engine {
    config: RouterConfig,
    extractor: UrlExtractor,
    classifier: SenderTrustClassifier,
    filter: AdmissionFilter,
    router: Router,
    caches: CorrelationCaches,
    deferred: DeferredUnlockSlot,
    sessions: Box<dyn SessionDirectory>,
    diagnostics: DiagnosticsState,
    workers: Option<WorkerPool>,
}

impl Engine {
    pub fn new(config: RouterConfig) -> Result<Self, ConfigError> {
        Self::with_parts(config, Box::new(NoSessions), Arc::new(SystemResolver))
    }

    pub fn with_sessions(
        config: RouterConfig,
        sessions: Box<dyn SessionDirectory>,
    ) -> Result<Self, ConfigError> {
        Self::with_parts(config, sessions, Arc::new(SystemResolver))
    }

    pub fn with_parts(
        config: RouterConfig,
        sessions: Box<dyn SessionDirectory>,
        resolver: Arc<dyn Resolver>,
    ) -> Result<Self, ConfigError> {
        let identity = AppIdentity::generate(&config.own_package);
        Self::with_identity(config, identity, sessions, resolver)
    }

    /// Uses a caller-supplied identity instead of a fresh process key.
    pub fn with_identity(
        config: RouterConfig,
        identity: AppIdentity,
        sessions: Box<dyn SessionDirectory>,
        resolver: Arc<dyn Resolver>,
    ) -> Result<Self, ConfigError> {
        let signers = config.trusted_signers()?;
        let diagnostics = DiagnosticsState::new();
        // The request path works without the pool; only warm-up and tallies
        // are lost.
        let workers = match WorkerPool::new(config.worker_settings(), resolver, diagnostics.sender())
        {
            Ok(pool) => Some(pool),
            Err(err) => {
                log::warn!("continuing without background workers: {}", err);
                None
            }
        };
        log::debug!(
            "engine ready for {} with {} trusted signers",
            identity.package(),
            signers.len()
        );
        Ok(Self {
            extractor: UrlExtractor::new(&config.search_url_template, config.test_intents_enabled),
            classifier: SenderTrustClassifier::new(identity, signers),
            filter: AdmissionFilter::new(config.scheme_registry()),
            router: Router::new(config.always_use_browser_ui),
            caches: CorrelationCaches::new(),
            deferred: DeferredUnlockSlot::new(),
            sessions,
            diagnostics,
            workers,
            config,
        })
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn identity(&self) -> &AppIdentity {
        self.classifier.identity()
    }

    pub fn caches(&self) -> &CorrelationCaches {
        &self.caches
    }

    pub fn has_deferred_request(&self) -> bool {
        self.deferred.is_armed()
    }

    pub fn handle(
        &mut self,
        raw: RawActivationRequest,
        context: &ActivationContext,
    ) -> ActivationOutcome {
        let outcome = self.admit_and_route(raw, context);
        self.diagnostics.tick_drain();
        outcome
    }

    fn admit_and_route(
        &mut self,
        raw: RawActivationRequest,
        context: &ActivationContext,
    ) -> ActivationOutcome {
        let request = raw.rewrite_from_history().decode();
        let extraction = self.extractor.extract(&request, context.full_browser_started);
        // The request's own target, not whichever surface happens to be up.
        let target_is_isolated_surface =
            is_isolated_surface_request(&request, self.router.always_use_browser_ui());

        let verdict = self.filter.evaluate(
            &request,
            &extraction,
            &AdmissionContext {
                classifier: &self.classifier,
                caches: &self.caches,
                device: context.device,
                freshly_started: context.freshly_started,
                target_is_isolated_surface,
            },
        );
        let trust = match verdict {
            AdmissionVerdict::Admit { trust } => trust,
            AdmissionVerdict::Defer => {
                let superseded = self.deferred.defer(request.into_raw());
                if superseded {
                    log::info!("newer request replaced the one waiting for unlock");
                }
                self.diagnostics.record(CHANNEL_ADMISSION_DEFERRED, 0);
                return ActivationOutcome::Deferred { superseded };
            }
            AdmissionVerdict::Ignore { reason } => {
                self.diagnostics.record(ignore_channel(reason), 0);
                return ActivationOutcome::Ignored { reason };
            }
        };

        if self.deferred.cancel() {
            log::info!("dropping deferred request; a newer one was processed");
        }
        self.diagnostics.record(CHANNEL_ADMISSION_ADMITTED, 0);
        log::debug!("admitted {:?} request from {:?} sender", request.action(), trust);

        let route = self.router.decide(&request, &extraction, &context.routing);
        self.diagnostics.record(route_channel(&route), 0);
        match route {
            RouteDecision::Terminate => ActivationOutcome::Terminated,
            RouteDecision::WebSearch { query } => ActivationOutcome::WebSearch { query },
            RouteDecision::NotificationSettings => ActivationOutcome::NotificationSettings,
            RouteDecision::FirstRun => ActivationOutcome::FirstRun,
            RouteDecision::Launch { surface, flags } => {
                let incognito_hint = request.extras().has_any_incognito_extra();
                let mut forwarded = request.into_raw();
                forwarded.flags = flags;
                ActivationOutcome::Launch {
                    surface,
                    flags,
                    incognito_hint,
                    request: forwarded,
                }
            }
            RouteDecision::ContinueInPlace { .. } => ActivationOutcome::Handled {
                action: self.handle_in_place(&request, &extraction, trust, context),
            },
        }
    }

    fn handle_in_place(
        &self,
        request: &ActivationRequest,
        extraction: &UrlExtraction,
        trust: TrustLevel,
        context: &ActivationContext,
    ) -> InPlaceAction {
        let own_package = self.classifier.own_package().to_string();
        let extras = request.extras();
        let url = extraction.url();
        let tab_open_type = classify_tab_open_type(request, trust, &own_package);
        let bring_to_front_tab_id = bring_tab_to_front_id(request, trust);

        if url.is_none()
            && bring_to_front_tab_id.is_none()
            && tab_open_type != TabOpenType::OpenNewIncognito
        {
            if let Some(query) = web_search_query(request) {
                return InPlaceAction::WebSearch {
                    query: query.to_string(),
                };
            }
            if request.action() == Action::TranslateTab {
                return InPlaceAction::Translate {
                    target_language: extras.translate_target_language.clone(),
                    expected_url: extras.translate_expected_url.clone(),
                };
            }
            return InPlaceAction::Nothing;
        }

        let params = url.map(|url| {
            LaunchParamsBuilder {
                request,
                trust,
                caches: &self.caches,
                sessions: self.sessions.as_ref(),
                intent_received_at_ms: context.intent_handling_time_ms.or(extras.timestamp_ms),
            }
            .build(url)
        });
        let offline_archive = match (url, params.as_ref()) {
            (Some(url), Some(params)) => {
                is_for_mhtml_file_or_content(url, request.mime_type())
                    && tab_open_type == TabOpenType::OpenNewTab
                    && params.referrer.is_none()
                    && params.headers.is_empty()
            }
            _ => false,
        };

        let external_app_id =
            identify_external_sender(request, url, trust.is_self(), &own_package);
        self.record_sender(request, external_app_id);
        if let Some(url) = url.filter(|url| is_http_or_https(url)) {
            self.warm_up(url);
        }

        InPlaceAction::OpenUrl(Box::new(ViewIntentPlan {
            params,
            tab_open_type,
            external_app_id,
            caller_app_id: request.application_id().map(str::to_string),
            bring_to_front_tab_id,
            bring_to_front_source: bring_to_front_tab_id
                .and(extras.bring_tab_to_front_source)
                .and_then(BringToFrontSource::from_ordinal),
            tab_id: tab_id(request, trust),
            reuse_tab_id: extras.reuse_tab_matching_id,
            reuse_tab_original_url: extras.reuse_tab_original_url.clone(),
            offline_archive,
            from_shortcut: extras.invoked_from_shortcut,
            from_app_widget: extras.invoked_from_app_widget,
        }))
    }

    fn record_sender(&self, request: &ActivationRequest, app: ExternalAppId) {
        // Self-sent requests are not external traffic.
        if app != ExternalAppId::Chrome {
            self.diagnostics.record(sender_channel(app), 0);
        }
        let Some(packages) = request
            .extras()
            .external_nav_packages
            .as_ref()
            .filter(|packages| !packages.is_empty())
        else {
            return;
        };
        self.diagnostics
            .record(CHANNEL_SENDER_APP_HANDLERS_PRESENT, packages.len());
        if let Some(workers) = self.workers.as_ref() {
            workers.tally_handlers(packages.clone(), self.classifier.own_package());
        }
    }

    fn warm_up(&self, url: &str) {
        let Some(workers) = self.workers.as_ref() else {
            return;
        };
        match workers.warm_up(url) {
            Ok(true) => log::debug!("queued connection warm-up"),
            Ok(false) => {}
            Err(err) => log::debug!("skipping warm-up: {}", err),
        }
    }

    /// Re-handles the request held while the device was locked, if any.
    pub fn on_device_unlocked(&mut self, context: &ActivationContext) -> Option<ActivationOutcome> {
        let raw = self.deferred.take_on_unlock()?;
        log::info!("redelivering request deferred until unlock");
        self.diagnostics.record(CHANNEL_ADMISSION_REDELIVERED, 0);
        Some(self.handle(raw, context))
    }

    pub fn cancel_deferred(&mut self) -> bool {
        self.deferred.cancel()
    }

    /// A request for a new tab that the engine will accept as self-sent.
    pub fn create_trusted_open_new_tab(&self, incognito: bool) -> RawActivationRequest {
        let mut raw = RawActivationRequest::new(ACTION_VIEW)
            .with_data(NEW_TAB_PAGE_URL)
            .with_extra(EXTRA_CREATE_NEW_TAB, ExtraValue::Bool(true))
            .with_extra(
                EXTRA_APPLICATION_ID,
                ExtraValue::String(self.classifier.own_package().to_string()),
            )
            .with_extra(EXTRA_OPEN_NEW_INCOGNITO_TAB, ExtraValue::Bool(incognito));
        self.stamp_capability(&mut raw);
        raw
    }

    pub fn create_trusted_bring_tab_to_front(
        &self,
        tab_id: i32,
        source: BringToFrontSource,
    ) -> RawActivationRequest {
        let mut raw = RawActivationRequest::default()
            .with_extra(
                EXTRA_APPLICATION_ID,
                ExtraValue::String(self.classifier.own_package().to_string()),
            )
            .with_extra(EXTRA_BRING_TAB_TO_FRONT, ExtraValue::Int(i64::from(tab_id)))
            .with_extra(
                EXTRA_BRING_TAB_TO_FRONT_SOURCE,
                ExtraValue::Int(i64::from(source.ordinal())),
            );
        self.stamp_capability(&mut raw);
        raw
    }

    pub fn stamp_capability(&self, raw: &mut RawActivationRequest) {
        raw.capability_token = Some(self.classifier.identity().mint());
    }

    /// Attaches `url` as the referrer of an outgoing request and remembers it
    /// so the app can vouch for it if the request comes back.
    pub fn stamp_pending_referrer(&mut self, raw: &mut RawActivationRequest, url: &str) -> u32 {
        let id = self.caches.stamp_pending_referrer(url);
        raw.extras
            .insert(EXTRA_REFERRER.to_string(), ExtraValue::String(url.to_string()));
        raw.extras
            .insert(EXTRA_REFERRER_ID.to_string(), ExtraValue::Int(i64::from(id)));
        id
    }

    /// Marks an outgoing request as incognito and allows it back in even
    /// though it may return without a capability token. No-op without data.
    pub fn stamp_pending_incognito(&mut self, raw: &mut RawActivationRequest) -> bool {
        let Some(data) = raw.data.clone() else {
            return false;
        };
        raw.extras.insert(
            EXTRA_OPEN_NEW_INCOGNITO_TAB.to_string(),
            ExtraValue::Bool(true),
        );
        self.caches.set_pending_incognito_url(&data);
        true
    }

    pub fn clear_pending_referrer(&mut self) {
        self.caches.clear_pending_referrer();
    }

    pub fn clear_pending_incognito_url(&mut self) {
        self.caches.clear_pending_incognito_url();
    }

    /// Reports finished background tasks, folding their telemetry in.
    pub fn drain_worker_reports(&mut self) -> Vec<WorkerReport> {
        let reports = self
            .workers
            .as_ref()
            .map(WorkerPool::drain_reports)
            .unwrap_or_default();
        self.diagnostics.tick_drain();
        reports
    }

    #[cfg(any(test, feature = "test-utils"))]
    pub fn wait_worker_report(&self, timeout: std::time::Duration) -> Option<WorkerReport> {
        self.workers.as_ref()?.wait_report(timeout)
    }

    pub fn diagnostics(&mut self) -> &DiagnosticsState {
        self.diagnostics.tick_drain();
        &self.diagnostics
    }
}
