/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use activation_router::admission::IgnoreReason;
use activation_router::engine::NEW_TAB_PAGE_URL;
use activation_router::intake::RawActivationRequest;
use activation_router::intake::extras::{
    EXTRA_OPEN_NEW_INCOGNITO_TAB, EXTRA_REFERRER, EXTRA_REFERRER_ID, ExtraValue,
};
use activation_router::routing::{BringToFrontSource, TabOpenType};
use activation_router::test_utils::{browsing_in_place, engine};
use activation_router::trust::ExternalAppId;
use activation_router::{ActivationOutcome, InPlaceAction, ViewIntentPlan};

fn plan(outcome: ActivationOutcome) -> ViewIntentPlan {
    match outcome {
        ActivationOutcome::Handled {
            action: InPlaceAction::OpenUrl(plan),
        } => *plan,
        other => panic!("expected an open-url plan, got {other:?}"),
    }
}

#[test]
fn trusted_new_incognito_tab_is_admitted() {
    let mut engine = engine();
    let raw = engine.create_trusted_open_new_tab(true);
    let plan = plan(engine.handle(raw, &browsing_in_place()));
    assert_eq!(plan.tab_open_type, TabOpenType::OpenNewIncognito);
    assert_eq!(plan.external_app_id, ExternalAppId::Chrome);
    assert_eq!(
        plan.params.expect("params").url,
        NEW_TAB_PAGE_URL
    );
}

#[test]
fn trusted_new_tab_opens_new_tab() {
    let mut engine = engine();
    let raw = engine.create_trusted_open_new_tab(false);
    let plan = plan(engine.handle(raw, &browsing_in_place()));
    assert_eq!(plan.tab_open_type, TabOpenType::OpenNewTab);
}

#[test]
fn token_from_another_engine_is_not_self() {
    let other = engine();
    let mut engine = engine();
    let raw = other.create_trusted_open_new_tab(true);
    assert_eq!(
        engine.handle(raw, &browsing_in_place()),
        ActivationOutcome::Ignored {
            reason: IgnoreReason::IncognitoNotAllowed
        }
    );
}

#[test]
fn stripped_token_bring_to_front_is_not_honoured() {
    let mut engine = engine();
    let mut raw = engine.create_trusted_bring_tab_to_front(9, BringToFrontSource::ActivateTab);
    raw.capability_token = None;
    match engine.handle(raw, &browsing_in_place()) {
        ActivationOutcome::Handled { action } => assert_eq!(action, InPlaceAction::Nothing),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn pending_incognito_url_lets_own_request_back_in() {
    let mut engine = engine();
    let mut outgoing = RawActivationRequest::view("https://private.example/page");
    assert!(engine.stamp_pending_incognito(&mut outgoing));
    assert_eq!(
        outgoing.extras.get(EXTRA_OPEN_NEW_INCOGNITO_TAB),
        Some(&ExtraValue::Bool(true))
    );

    // Comes back through another app with no capability token.
    let plan = plan(engine.handle(outgoing.clone(), &browsing_in_place()));
    assert_eq!(plan.tab_open_type, TabOpenType::OpenNewIncognito);

    let tampered = RawActivationRequest::view("https://private.example/other")
        .with_extra(EXTRA_OPEN_NEW_INCOGNITO_TAB, ExtraValue::Bool(true));
    assert!(!engine.handle(tampered, &browsing_in_place()).is_processed());

    engine.clear_pending_incognito_url();
    assert!(!engine.handle(outgoing, &browsing_in_place()).is_processed());
}

#[test]
fn stamping_incognito_without_data_does_nothing() {
    let mut engine = engine();
    let mut outgoing = RawActivationRequest::default();
    assert!(!engine.stamp_pending_incognito(&mut outgoing));
    assert!(outgoing.extras.is_empty());
    assert_eq!(engine.caches().pending_incognito_url(), None);
}

#[test]
fn stamped_referrer_resolves_through_pending_slot() {
    let mut engine = engine();
    let mut outgoing = RawActivationRequest::view("https://b.example");
    engine.stamp_capability(&mut outgoing);
    let id = engine.stamp_pending_referrer(&mut outgoing, "https://a.example/source");
    assert_eq!(
        outgoing.extras.get(EXTRA_REFERRER_ID),
        Some(&ExtraValue::Int(i64::from(id)))
    );
    assert_eq!(
        engine.caches().get_pending_referrer(id),
        Some("https://a.example/source")
    );

    // A different literal referrer with the same id is replaced by the
    // remembered one.
    outgoing.extras.insert(
        EXTRA_REFERRER.to_string(),
        ExtraValue::String("https://other.example".into()),
    );
    let plan = plan(engine.handle(outgoing.clone(), &browsing_in_place()));
    assert_eq!(
        plan.params.expect("params").referrer.expect("referrer").url,
        "https://a.example/source"
    );

    engine.clear_pending_referrer();
    let plan_after_clear = self::plan(engine.handle(outgoing, &browsing_in_place()));
    assert_eq!(
        plan_after_clear
            .params
            .expect("params")
            .referrer
            .expect("referrer")
            .url,
        "https://other.example"
    );
}

#[test]
fn returning_untrusted_request_cannot_use_web_referrer() {
    let mut engine = engine();
    let mut outgoing = RawActivationRequest::view("https://b.example");
    engine.stamp_pending_referrer(&mut outgoing, "https://a.example/source");
    let plan = plan(engine.handle(outgoing, &browsing_in_place()));
    assert_eq!(plan.params.expect("params").referrer, None);
}
