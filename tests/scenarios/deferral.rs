/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use activation_router::intake::RawActivationRequest;
use activation_router::intake::extras::{EXTRA_TRUSTED_APPLICATION_CODE, ExtraValue};
use activation_router::routing::NoSessions;
use activation_router::runtime::diagnostics::{
    CHANNEL_ADMISSION_DEFERRED, CHANNEL_ADMISSION_REDELIVERED,
};
use activation_router::test_utils::{browsing_in_place, engine, engine_with_affiliate, locked};
use activation_router::{ActivationOutcome, InPlaceAction};

fn opened_url(outcome: &ActivationOutcome) -> Option<String> {
    match outcome {
        ActivationOutcome::Handled {
            action: InPlaceAction::OpenUrl(plan),
        } => plan.params.as_ref().map(|params| params.url.clone()),
        _ => None,
    }
}

#[test]
fn untrusted_request_on_locked_device_waits_for_unlock() {
    let mut engine = engine();
    let outcome = engine.handle(
        RawActivationRequest::view("https://a.example"),
        &locked(browsing_in_place()),
    );
    assert_eq!(outcome, ActivationOutcome::Deferred { superseded: false });
    assert!(engine.has_deferred_request());

    let redelivered = engine
        .on_device_unlocked(&browsing_in_place())
        .expect("deferred request");
    assert_eq!(opened_url(&redelivered).as_deref(), Some("https://a.example"));
    assert!(!engine.has_deferred_request());
    assert_eq!(engine.on_device_unlocked(&browsing_in_place()), None);

    let diagnostics = engine.diagnostics();
    assert_eq!(diagnostics.message_count(CHANNEL_ADMISSION_DEFERRED), 1);
    assert_eq!(diagnostics.message_count(CHANNEL_ADMISSION_REDELIVERED), 1);
}

#[test]
fn only_the_latest_deferral_is_redelivered() {
    let mut engine = engine();
    let context = locked(browsing_in_place());
    engine.handle(RawActivationRequest::view("https://one.example"), &context);
    assert_eq!(
        engine.handle(RawActivationRequest::view("https://two.example"), &context),
        ActivationOutcome::Deferred { superseded: true }
    );
    let redelivered = engine
        .on_device_unlocked(&browsing_in_place())
        .expect("deferred request");
    assert_eq!(opened_url(&redelivered).as_deref(), Some("https://two.example"));
}

#[test]
fn screen_off_defers_even_when_unprovisioned() {
    let mut engine = engine();
    let mut context = browsing_in_place();
    context.device.interactive = false;
    context.device.provisioned = false;
    assert!(matches!(
        engine.handle(RawActivationRequest::view("https://a.example"), &context),
        ActivationOutcome::Deferred { .. }
    ));
}

#[test]
fn unprovisioned_lockscreen_admits() {
    let mut engine = engine();
    let mut context = locked(browsing_in_place());
    context.device.provisioned = false;
    assert!(engine
        .handle(RawActivationRequest::view("https://a.example"), &context)
        .is_processed());
}

#[test]
fn trusted_senders_are_not_deferred() {
    let (mut engine, affiliate) = engine_with_affiliate(Box::new(NoSessions));
    let raw = RawActivationRequest::view("https://a.example")
        .with_extra(EXTRA_TRUSTED_APPLICATION_CODE, ExtraValue::Token(affiliate.mint()));
    assert!(engine.handle(raw, &locked(browsing_in_place())).is_processed());
    assert!(!engine.has_deferred_request());
}

#[test]
fn processed_request_cancels_pending_deferral() {
    let mut engine = engine();
    engine.handle(
        RawActivationRequest::view("https://stale.example"),
        &locked(browsing_in_place()),
    );
    assert!(engine.has_deferred_request());
    assert!(engine
        .handle(RawActivationRequest::view("https://fresh.example"), &browsing_in_place())
        .is_processed());
    assert!(!engine.has_deferred_request());
    assert_eq!(engine.on_device_unlocked(&browsing_in_place()), None);
}

#[test]
fn ignored_request_leaves_deferral_armed() {
    let mut engine = engine();
    engine.handle(
        RawActivationRequest::view("https://a.example"),
        &locked(browsing_in_place()),
    );
    engine.handle(
        RawActivationRequest::view("javascript:void(0)"),
        &browsing_in_place(),
    );
    assert!(engine.has_deferred_request());
    assert!(engine.cancel_deferred());
    assert!(!engine.has_deferred_request());
}
