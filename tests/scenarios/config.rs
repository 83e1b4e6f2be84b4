/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::io::Write;
use std::sync::Arc;

use activation_router::intake::RawActivationRequest;
use activation_router::intake::extras::{
    EXTRA_TRUSTED_APPLICATION_CODE, EXTRA_VOICE_SEARCH_RESULT_STRINGS, ExtraValue,
};
use activation_router::intake::request::ACTION_VOICE_SEARCH_RESULTS;
use activation_router::prefs::TrustedSignerConfig;
use activation_router::routing::NoSessions;
use activation_router::test_utils::{LoopbackResolver, browsing_in_place};
use activation_router::trust::{AppIdentity, TokenError};
use activation_router::{ActivationOutcome, ConfigError, Engine, InPlaceAction, RouterConfig};

fn engine_from(config: RouterConfig) -> Result<Engine, ConfigError> {
    Engine::with_parts(config, Box::new(NoSessions), Arc::new(LoopbackResolver))
}

#[test]
fn signer_from_file_grants_internal_pages() {
    let partner = AppIdentity::generate("com.example.partner");
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(
        file,
        "worker_threads = 1\n\
         [[trusted_signers]]\n\
         package = \"com.example.partner\"\n\
         public_key = \"{}\"",
        partner.public_key_base64()
    )
    .expect("write config");

    let config = RouterConfig::load(file.path()).expect("load");
    let mut engine = engine_from(config).expect("engine");
    let raw = RawActivationRequest::view("chrome://settings/")
        .with_extra(EXTRA_TRUSTED_APPLICATION_CODE, ExtraValue::Token(partner.mint()));
    assert!(engine.handle(raw, &browsing_in_place()).is_processed());

    let unsigned = RawActivationRequest::view("chrome://settings/");
    assert!(!engine.handle(unsigned, &browsing_in_place()).is_processed());
}

#[test]
fn extra_internal_scheme_from_config_is_guarded() {
    let config = RouterConfig::from_toml_str(
        "internal_schemes = [\"chrome\", \"devtools\"]\nworker_threads = 1",
    )
    .expect("config");
    let mut engine = engine_from(config).expect("engine");
    assert!(matches!(
        engine.handle(
            RawActivationRequest::view("devtools://inspect"),
            &browsing_in_place()
        ),
        ActivationOutcome::Ignored { .. }
    ));
    // `about` is no longer internal under this config.
    assert!(engine
        .handle(RawActivationRequest::view("about:version"), &browsing_in_place())
        .is_processed());
}

#[test]
fn malformed_signer_key_fails_engine_construction() {
    let config = RouterConfig {
        trusted_signers: vec![TrustedSignerConfig {
            package: "com.example.partner".into(),
            public_key: "not base64!".into(),
        }],
        ..RouterConfig::default()
    };
    match engine_from(config) {
        Err(ConfigError::InvalidSigner { package, source }) => {
            assert_eq!(package, "com.example.partner");
            assert!(matches!(source, TokenError::InvalidKeyEncoding(_)));
        }
        Err(other) => panic!("unexpected error {other}"),
        Ok(_) => panic!("engine accepted a malformed signer"),
    }
}

#[test]
fn custom_search_template_is_used_for_voice_fallback() {
    let config = RouterConfig::from_toml_str(
        "search_url_template = \"https://search.example/?q=%s\"\nworker_threads = 1",
    )
    .expect("config");
    let mut engine = engine_from(config).expect("engine");
    let raw = RawActivationRequest::new(ACTION_VOICE_SEARCH_RESULTS).with_extra(
        EXTRA_VOICE_SEARCH_RESULT_STRINGS,
        ExtraValue::StringList(vec!["rust borrow checker".into()]),
    );
    match engine.handle(raw, &browsing_in_place()) {
        ActivationOutcome::Handled {
            action: InPlaceAction::OpenUrl(plan),
        } => assert_eq!(
            plan.params.expect("params").url,
            "https://search.example/?q=rust+borrow+checker"
        ),
        other => panic!("unexpected {other:?}"),
    }
}
