/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Admission and routing for launch requests sent to the browser by other
//! processes.

pub mod admission;
pub mod engine;
pub mod intake;
pub mod prefs;
pub mod routing;
pub mod runtime;
pub mod surface;
pub mod trust;

#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use engine::{ActivationContext, ActivationOutcome, Engine, InPlaceAction, ViewIntentPlan};
pub use prefs::{ConfigError, RouterConfig};

pub const VERSION: &str = concat!("activation-router/", env!("CARGO_PKG_VERSION"));

/// Installs a global subscriber when built with the `tracing` feature. `log`
/// records are forwarded to it.
pub fn init_tracing(filter_directives: Option<&str>) {
    #[cfg(feature = "tracing")]
    {
        let filter = match filter_directives {
            Some(directives) => tracing_subscriber::EnvFilter::new(directives),
            None => tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        };
        if let Err(err) = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
        {
            eprintln!("tracing subscriber already installed: {err}");
        }
    }

    #[cfg(not(feature = "tracing"))]
    {
        if filter_directives.is_some() {
            eprintln!("--tracing-filter ignored: built without the `tracing` feature");
        }
    }
}
