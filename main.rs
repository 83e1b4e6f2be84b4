/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::{env, fs, process};

use activation_router::admission::DeviceState;
use activation_router::intake::RawActivationRequest;
use activation_router::prefs::{AppPreferences, ArgumentParsingResult, parse_command_line_arguments};
use activation_router::routing::{RoutingContext, SurfaceKind};
use activation_router::{ActivationContext, Engine, RouterConfig};

fn main() {
    // Skip the first argument, which is the binary name.
    let args: Vec<String> = env::args().skip(1).collect();
    let preferences = match parse_command_line_arguments(&args) {
        ArgumentParsingResult::Run(preferences) => preferences,
        ArgumentParsingResult::Exit => process::exit(0),
        ArgumentParsingResult::ErrorParsing => process::exit(1),
    };

    activation_router::init_tracing(preferences.tracing_filter.as_deref());

    if let Err(e) = run(&preferences) {
        log::error!("{e}");
        eprintln!("activation-router: {e}");
        process::exit(1);
    }
}

fn run(preferences: &AppPreferences) -> Result<(), Box<dyn std::error::Error>> {
    let config = match preferences.config_path.as_deref() {
        Some(path) => RouterConfig::load(path)?,
        None => RouterConfig::default(),
    };
    let request_json = fs::read_to_string(&preferences.request_path)
        .map_err(|e| format!("cannot read {}: {}", preferences.request_path.display(), e))?;
    let raw: RawActivationRequest = serde_json::from_str(&request_json)?;

    let mut engine = Engine::new(config)?;
    let context = ActivationContext {
        freshly_started: preferences.freshly_started,
        device: DeviceState {
            interactive: preferences.interactive,
            provisioned: preferences.provisioned,
            keyguard_locked: preferences.keyguard_locked,
        },
        full_browser_started: preferences.full_browser_started,
        routing: RoutingContext {
            first_run_required: preferences.first_run_required,
            running_surface: preferences.isolated_target.then_some(SurfaceKind::Isolated),
            isolated_surface_owns_task: preferences.isolated_target,
            browsing_task_exists: false,
        },
        intent_handling_time_ms: None,
    };

    let outcome = engine.handle(raw, &context);
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    log::debug!(
        "diagnostics: {}",
        engine.diagnostics().snapshot_json()
    );
    Ok(())
}
