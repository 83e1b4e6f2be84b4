/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use activation_router::admission::IgnoreReason;
use activation_router::intake::extras::{
    EXTRA_OPEN_NEW_INCOGNITO_TAB, EXTRA_TRUSTED_APPLICATION_CODE, ExtraValue,
};
use activation_router::intake::request::{ACTION_TRANSLATE_TAB, ACTION_VIEW};
use activation_router::intake::{RawActivationRequest, extract_url, sanitize_scheme};
use activation_router::routing::{NoSessions, SurfaceKind};
use activation_router::runtime::diagnostics::{
    CHANNEL_ADMISSION_ADMITTED, CHANNEL_ADMISSION_IGNORED,
};
use activation_router::test_utils::{browsing_in_place, cold_start, engine, engine_with_affiliate};
use activation_router::ActivationOutcome;
use rstest::rstest;

fn ignored(reason: IgnoreReason) -> ActivationOutcome {
    ActivationOutcome::Ignored { reason }
}

#[test]
fn javascript_view_is_ignored() {
    let mut engine = engine();
    let outcome = engine.handle(
        RawActivationRequest::view("javascript:alert(1)"),
        &browsing_in_place(),
    );
    assert_eq!(outcome, ignored(IgnoreReason::InvalidUrl));
    assert_eq!(
        engine.diagnostics().message_count(CHANNEL_ADMISSION_IGNORED),
        1
    );
    assert_eq!(
        engine.diagnostics().message_count(CHANNEL_ADMISSION_ADMITTED),
        0
    );
}

#[rstest]
#[case("java  script:alert(1)")]
#[case("JavaScript:alert(1)")]
#[case("jar:file:///x.jar!/a")]
#[case("googlechrome://navigate?url=javascript:alert(1)")]
#[case("googlechrome://navigate?url=chrome://settings")]
#[case("customtab://x?javascript%3Aalert(1)")]
fn obfuscated_or_indirect_bad_urls_are_ignored(#[case] url: &str) {
    let mut engine = engine();
    assert_eq!(
        engine.handle(RawActivationRequest::view(url), &browsing_in_place()),
        ignored(IgnoreReason::InvalidUrl)
    );
}

#[test]
fn sanitizer_and_indirection_examples() {
    assert_eq!(
        sanitize_scheme("HTTP://example.com/a:b").as_deref(),
        Some("http")
    );
    assert_eq!(
        extract_url("googlechrome://navigate?url=www.example.com").as_deref(),
        Some("http://www.example.com")
    );
}

#[test]
fn launcher_indirection_opens_resolved_url() {
    let mut engine = engine();
    let outcome = engine.handle(
        RawActivationRequest::view("googlechrome://navigate?url=www.example.com"),
        &browsing_in_place(),
    );
    let json = serde_json::to_value(&outcome).expect("serialize");
    assert_eq!(json["action"]["params"]["url"], "http://www.example.com");
}

#[test]
fn untrusted_incognito_request_is_ignored() {
    let mut engine = engine();
    let raw = RawActivationRequest::view("https://a.example")
        .with_extra(EXTRA_OPEN_NEW_INCOGNITO_TAB, ExtraValue::Bool(true));
    assert_eq!(
        engine.handle(raw, &browsing_in_place()),
        ignored(IgnoreReason::IncognitoNotAllowed)
    );
}

#[test]
fn running_isolated_surface_does_not_excuse_incognito() {
    let mut engine = engine();
    let mut context = browsing_in_place();
    context.routing.running_surface = Some(SurfaceKind::Isolated);
    context.routing.isolated_surface_owns_task = true;
    let raw = RawActivationRequest::view("https://evil.example/")
        .with_extra(EXTRA_OPEN_NEW_INCOGNITO_TAB, ExtraValue::Bool(true));
    assert_eq!(
        engine.handle(raw, &context),
        ignored(IgnoreReason::IncognitoNotAllowed)
    );
}

#[test]
fn affiliate_cannot_open_incognito_either() {
    let (mut engine, affiliate) = engine_with_affiliate(Box::new(NoSessions));
    let raw = RawActivationRequest::view("https://a.example")
        .with_extra(EXTRA_OPEN_NEW_INCOGNITO_TAB, ExtraValue::Bool(true))
        .with_extra(EXTRA_TRUSTED_APPLICATION_CODE, ExtraValue::Token(affiliate.mint()));
    assert_eq!(
        engine.handle(raw, &browsing_in_place()),
        ignored(IgnoreReason::IncognitoNotAllowed)
    );
}

#[test]
fn internal_pages_need_affiliate_trust() {
    let (mut engine, affiliate) = engine_with_affiliate(Box::new(NoSessions));
    assert_eq!(
        engine.handle(
            RawActivationRequest::view("chrome://settings"),
            &browsing_in_place()
        ),
        ignored(IgnoreReason::UnsafeInternalScheme)
    );
    assert!(
        engine
            .handle(
                RawActivationRequest::view("chrome://dino/"),
                &browsing_in_place()
            )
            .is_processed()
    );
    let trusted = RawActivationRequest::view("chrome://settings")
        .with_extra(EXTRA_TRUSTED_APPLICATION_CODE, ExtraValue::Token(affiliate.mint()));
    assert!(engine.handle(trusted, &browsing_in_place()).is_processed());
}

#[test]
fn forged_token_grants_nothing() {
    let (mut engine, _) = engine_with_affiliate(Box::new(NoSessions));
    let impostor = activation_router::trust::AppIdentity::generate(
        activation_router::test_utils::AFFILIATE_PACKAGE,
    );
    let raw = RawActivationRequest::view("chrome://settings")
        .with_extra(EXTRA_TRUSTED_APPLICATION_CODE, ExtraValue::Token(impostor.mint()));
    assert_eq!(
        engine.handle(raw, &browsing_in_place()),
        ignored(IgnoreReason::UnsafeInternalScheme)
    );
}

#[test]
fn translate_that_started_the_process_is_not_replayed() {
    let mut engine = engine();
    assert_eq!(
        engine.handle(RawActivationRequest::new(ACTION_TRANSLATE_TAB), &cold_start()),
        ignored(IgnoreReason::ReplayedTranslate)
    );
}

#[test]
fn malformed_extras_degrade_to_absent() {
    let mut engine = engine();
    let raw = RawActivationRequest::new(ACTION_VIEW)
        .with_data("https://a.example")
        .with_extra(EXTRA_OPEN_NEW_INCOGNITO_TAB, ExtraValue::String("true".into()))
        .with_extra(EXTRA_TRUSTED_APPLICATION_CODE, ExtraValue::Int(7));
    assert!(engine.handle(raw, &browsing_in_place()).is_processed());
}
