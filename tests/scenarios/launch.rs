/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::time::Duration;

use activation_router::intake::extras::{
    EXTRA_APPLICATION_ID, EXTRA_CUSTOM_TABS_SESSION, EXTRA_EXTERNAL_NAV_PACKAGES, EXTRA_HEADERS,
    EXTRA_INCOGNITO_MODE, EXTRA_OPEN_NEW_INCOGNITO_TAB, EXTRA_REUSE_URL_MATCHING_TAB_ELSE_NEW_TAB,
    EXTRA_SEARCH_QUERY, ExtraValue,
};
use activation_router::intake::request::{
    ACTION_MAIN, ACTION_SEARCH, ACTION_SEND, CATEGORY_NOTIFICATION_PREFERENCES,
};
use activation_router::intake::{LaunchFlags, RawActivationRequest};
use activation_router::routing::{FixedSessionDirectory, NoSessions, SurfaceKind, TabOpenType};
use activation_router::runtime::WorkerReport;
use activation_router::runtime::diagnostics::{
    CHANNEL_ROUTE_LAUNCH_BROWSING, CHANNEL_ROUTE_LAUNCH_ISOLATED,
};
use activation_router::test_utils::{
    OWN_PACKAGE, browsing_in_place, cold_start, engine, engine_with_affiliate,
};
use activation_router::trust::ExternalAppId;
use activation_router::{ActivationContext, ActivationOutcome, Engine, InPlaceAction, ViewIntentPlan};
use rstest::rstest;

fn open_in_place(engine: &mut Engine, raw: RawActivationRequest) -> ViewIntentPlan {
    open_with(engine, raw, &browsing_in_place())
}

fn open_with(
    engine: &mut Engine,
    raw: RawActivationRequest,
    context: &ActivationContext,
) -> ViewIntentPlan {
    match engine.handle(raw, context) {
        ActivationOutcome::Handled {
            action: InPlaceAction::OpenUrl(plan),
        } => *plan,
        other => panic!("expected an open-url plan, got {other:?}"),
    }
}

fn headers(pairs: &[(&str, &str)]) -> ExtraValue {
    ExtraValue::Headers(
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect(),
    )
}

fn isolated_in_place() -> ActivationContext {
    let mut context = browsing_in_place();
    context.routing.running_surface = Some(SurfaceKind::Isolated);
    context.routing.isolated_surface_owns_task = true;
    context
}

#[test]
fn cold_start_launches_browsing_surface_with_new_task() {
    let mut engine = engine();
    let raw = RawActivationRequest::view("https://a.example")
        .with_flags(LaunchFlags::EXCLUDE_FROM_RECENTS)
        .with_extra(EXTRA_INCOGNITO_MODE, ExtraValue::Bool(true));
    let ActivationOutcome::Launch {
        surface,
        flags,
        incognito_hint,
        request,
    } = engine.handle(raw, &cold_start())
    else {
        panic!("expected a launch");
    };
    assert_eq!(surface, SurfaceKind::Browsing);
    assert!(flags.contains(LaunchFlags::NEW_TASK));
    assert!(!flags.contains(LaunchFlags::EXCLUDE_FROM_RECENTS));
    assert!(incognito_hint);
    assert_eq!(request.flags, flags);
    assert_eq!(request.data.as_deref(), Some("https://a.example"));
    assert_eq!(
        engine.diagnostics().message_count(CHANNEL_ROUTE_LAUNCH_BROWSING),
        1
    );
}

#[test]
fn session_request_goes_to_isolated_surface() {
    let mut engine = engine();
    let raw = RawActivationRequest::view("https://a.example")
        .with_extra(EXTRA_CUSTOM_TABS_SESSION, ExtraValue::Bool(true))
        .with_flags(LaunchFlags::EXCLUDE_FROM_RECENTS);
    match engine.handle(raw, &browsing_in_place()) {
        ActivationOutcome::Launch {
            surface: SurfaceKind::Isolated,
            flags,
            incognito_hint: false,
            ..
        } => {
            assert!(flags.contains(LaunchFlags::NEW_TASK));
            assert!(!flags.contains(LaunchFlags::EXCLUDE_FROM_RECENTS));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(
        engine.diagnostics().message_count(CHANNEL_ROUTE_LAUNCH_ISOLATED),
        1
    );
}

#[test]
fn forced_browser_ui_keeps_session_request_in_browsing_surface() {
    let config = activation_router::RouterConfig {
        always_use_browser_ui: true,
        worker_threads: 1,
        ..Default::default()
    };
    let mut engine = Engine::with_parts(
        config,
        Box::new(NoSessions),
        std::sync::Arc::new(activation_router::test_utils::LoopbackResolver),
    )
    .expect("engine");
    let raw = RawActivationRequest::view("https://a.example")
        .with_extra(EXTRA_CUSTOM_TABS_SESSION, ExtraValue::Bool(true));
    assert!(matches!(
        engine.handle(raw, &browsing_in_place()),
        ActivationOutcome::Handled { .. }
    ));
}

#[test]
fn share_without_url_terminates() {
    let mut engine = engine();
    let raw = RawActivationRequest::new(ACTION_SEND).with_mime_type("text/plain");
    assert_eq!(
        engine.handle(raw, &browsing_in_place()),
        ActivationOutcome::Terminated
    );
}

#[test]
fn notification_preferences_open_settings() {
    let mut engine = engine();
    let raw = RawActivationRequest::new(ACTION_MAIN)
        .with_category(CATEGORY_NOTIFICATION_PREFERENCES);
    assert_eq!(
        engine.handle(raw, &browsing_in_place()),
        ActivationOutcome::NotificationSettings
    );
}

#[test]
fn first_run_comes_before_any_launch() {
    let mut engine = engine();
    let mut context = cold_start();
    context.routing.first_run_required = true;
    assert_eq!(
        engine.handle(RawActivationRequest::view("https://a.example"), &context),
        ActivationOutcome::FirstRun
    );
}

#[rstest]
#[case::cold(cold_start(), false)]
#[case::running(browsing_in_place(), true)]
fn search_is_answered_where_it_lands(#[case] context: ActivationContext, #[case] in_place: bool) {
    let mut engine = engine();
    let raw = RawActivationRequest::new(ACTION_SEARCH)
        .with_extra(EXTRA_SEARCH_QUERY, ExtraValue::String("rust lifetimes".into()));
    let outcome = engine.handle(raw, &context);
    let expected = if in_place {
        ActivationOutcome::Handled {
            action: InPlaceAction::WebSearch {
                query: "rust lifetimes".into(),
            },
        }
    } else {
        ActivationOutcome::WebSearch {
            query: "rust lifetimes".into(),
        }
    };
    assert_eq!(outcome, expected);
}

#[test]
fn recents_relaunch_drops_original_payload() {
    let mut engine = engine();
    let raw = RawActivationRequest::view("https://stale.example")
        .with_flags(LaunchFlags::FROM_HISTORY)
        .with_extra(EXTRA_OPEN_NEW_INCOGNITO_TAB, ExtraValue::Bool(true));
    assert_eq!(
        engine.handle(raw, &browsing_in_place()),
        ActivationOutcome::Handled {
            action: InPlaceAction::Nothing
        }
    );
}

#[test]
fn self_issued_reuse_directive_outranks_incognito() {
    let mut engine = engine();
    let mut raw = RawActivationRequest::view("https://a.example")
        .with_extra(EXTRA_REUSE_URL_MATCHING_TAB_ELSE_NEW_TAB, ExtraValue::Bool(true))
        .with_extra(EXTRA_OPEN_NEW_INCOGNITO_TAB, ExtraValue::Bool(true));
    engine.stamp_capability(&mut raw);
    let plan = open_in_place(&mut engine, raw);
    assert_eq!(plan.tab_open_type, TabOpenType::ReuseUrlMatchElseNew);
}

#[rstest]
#[case(None, TabOpenType::OpenNewTab)]
#[case(Some("com.example.reader"), TabOpenType::ReuseAppIdMatchElseNew)]
#[case(Some(OWN_PACKAGE), TabOpenType::ClobberCurrent)]
fn caller_app_id_picks_tab(#[case] app_id: Option<&str>, #[case] expected: TabOpenType) {
    let mut engine = engine();
    let mut raw = RawActivationRequest::view("https://a.example");
    if let Some(app_id) = app_id {
        raw = raw.with_extra(EXTRA_APPLICATION_ID, ExtraValue::String(app_id.into()));
    }
    let plan = open_in_place(&mut engine, raw);
    assert_eq!(plan.tab_open_type, expected);
    assert_eq!(plan.caller_app_id.as_deref(), app_id);
}

#[rstest]
#[case("http://t.co/abc", None, ExternalAppId::Twitter)]
#[case("https://www.youtube.com/redirect?q=x", None, ExternalAppId::Youtube)]
#[case("http://t.co/abc", Some("com.google.android.gm"), ExternalAppId::Gmail)]
#[case("https://a.example", Some("org.chromium.webapk.a1b2"), ExternalAppId::Webapk)]
#[case("https://a.example", None, ExternalAppId::Other)]
fn external_sender_is_identified(
    #[case] url: &str,
    #[case] app_id: Option<&str>,
    #[case] expected: ExternalAppId,
) {
    let mut engine = engine();
    let mut raw = RawActivationRequest::view(url);
    if let Some(app_id) = app_id {
        raw = raw.with_extra(EXTRA_APPLICATION_ID, ExtraValue::String(app_id.into()));
    }
    assert_eq!(open_in_place(&mut engine, raw).external_app_id, expected);
}

#[test]
fn untrusted_headers_are_reduced_to_safelisted() {
    let mut engine = engine();
    let raw = RawActivationRequest::view("https://a.example").with_extra(
        EXTRA_HEADERS,
        headers(&[
            ("Accept-Language", "en-US"),
            ("X-Chrome-Secret", "1"),
            ("Authorization", "Bearer t"),
            ("Bad Header", "x"),
        ]),
    );
    let params = open_in_place(&mut engine, raw).params.expect("params");
    assert_eq!(
        params.headers,
        vec![("Accept-Language".to_string(), "en-US".to_string())]
    );
}

#[test]
fn first_party_session_keeps_arbitrary_headers() {
    let sessions = FixedSessionDirectory {
        default_referrer: Some("android-app://com.example.partner".into()),
        first_party: true,
    };
    let (mut engine, _) = engine_with_affiliate(Box::new(sessions));
    let raw = RawActivationRequest::view("https://a.example")
        .with_extra(EXTRA_CUSTOM_TABS_SESSION, ExtraValue::Bool(true))
        .with_extra(
            EXTRA_HEADERS,
            headers(&[("Authorization", "Bearer t"), ("X-Chrome-Secret", "1")]),
        );
    let plan = open_with(&mut engine, raw, &isolated_in_place());
    let params = plan.params.expect("params");
    assert_eq!(
        params.headers,
        vec![("Authorization".to_string(), "Bearer t".to_string())]
    );
    assert_eq!(
        params.referrer.map(|referrer| referrer.url).as_deref(),
        Some("android-app://com.example.partner")
    );
}

#[test]
fn in_place_http_open_warms_origin_once() {
    let mut engine = engine();
    open_in_place(&mut engine, RawActivationRequest::view("https://warm.example/a"));
    open_in_place(&mut engine, RawActivationRequest::view("https://warm.example/b"));
    assert_eq!(
        engine.wait_worker_report(Duration::from_secs(5)),
        Some(WorkerReport::DnsWarmed {
            origin: "https://warm.example".into(),
            addresses: 1,
        })
    );
    assert_eq!(engine.wait_worker_report(Duration::from_millis(200)), None);
}

#[test]
fn external_handlers_are_tallied_in_background() {
    let mut engine = engine();
    let raw = RawActivationRequest::view("content://media/external/1").with_extra(
        EXTRA_EXTERNAL_NAV_PACKAGES,
        ExtraValue::StringList(vec![
            "com.example.gallery".into(),
            OWN_PACKAGE.into(),
        ]),
    );
    open_in_place(&mut engine, raw);
    assert_eq!(
        engine.wait_worker_report(Duration::from_secs(5)),
        Some(WorkerReport::HandlerTally {
            packages: 2,
            third_party: 1,
        })
    );
}
