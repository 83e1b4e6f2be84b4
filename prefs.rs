/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Router configuration and command-line options.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bpaf::{Args, Bpaf};
use serde::{Deserialize, Serialize};

use crate::intake::scheme::SchemeRegistry;
use crate::runtime::worker::WorkerSettings;
use crate::trust::{TokenError, TrustedSigners};

pub const DEFAULT_OWN_PACKAGE: &str = "org.chromium.chrome";
pub const DEFAULT_SEARCH_URL_TEMPLATE: &str = "https://www.google.com/search?q=%s";

/// A first-party app whose capability tokens earn affiliate trust.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustedSignerConfig {
    pub package: String,
    /// Base64 ed25519 public key.
    pub public_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RouterConfig {
    pub own_package: String,
    pub internal_schemes: Vec<String>,
    pub internal_allowlist: Vec<String>,
    pub search_url_template: String,
    pub always_use_browser_ui: bool,
    pub test_intents_enabled: bool,
    pub worker_threads: usize,
    pub preconnect_dedupe_secs: u64,
    pub trusted_signers: Vec<TrustedSignerConfig>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            own_package: DEFAULT_OWN_PACKAGE.to_string(),
            internal_schemes: vec!["chrome".into(), "chrome-native".into(), "about".into()],
            internal_allowlist: vec!["about:blank".into(), "chrome://dino/".into()],
            search_url_template: DEFAULT_SEARCH_URL_TEMPLATE.to_string(),
            always_use_browser_ui: false,
            test_intents_enabled: false,
            worker_threads: 2,
            preconnect_dedupe_secs: 10,
            trusted_signers: Vec::new(),
        }
    }
}

impl RouterConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.own_package.trim().is_empty() {
            return Err(ConfigError::EmptyOwnPackage);
        }
        if !self.search_url_template.contains("%s") {
            return Err(ConfigError::SearchTemplateWithoutPlaceholder(
                self.search_url_template.clone(),
            ));
        }
        Ok(())
    }

    pub fn scheme_registry(&self) -> SchemeRegistry {
        SchemeRegistry::with_internal_schemes(
            self.internal_schemes.iter().map(String::as_str),
            self.internal_allowlist.iter().map(String::as_str),
        )
    }

    pub fn trusted_signers(&self) -> Result<TrustedSigners, ConfigError> {
        let mut signers = TrustedSigners::new();
        for signer in &self.trusted_signers {
            signers
                .insert_base64(&signer.package, &signer.public_key)
                .map_err(|source| ConfigError::InvalidSigner {
                    package: signer.package.clone(),
                    source,
                })?;
        }
        Ok(signers)
    }

    pub fn worker_settings(&self) -> WorkerSettings {
        WorkerSettings {
            worker_threads: self.worker_threads,
            preconnect_dedupe: Duration::from_secs(self.preconnect_dedupe_secs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Io { path: PathBuf, message: String },
    Parse(String),
    EmptyOwnPackage,
    SearchTemplateWithoutPlaceholder(String),
    InvalidSigner { package: String, source: TokenError },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, message } => {
                write!(f, "cannot read {}: {}", path.display(), message)
            }
            Self::Parse(e) => write!(f, "invalid config: {}", e),
            Self::EmptyOwnPackage => write!(f, "own_package must not be empty"),
            Self::SearchTemplateWithoutPlaceholder(template) => {
                write!(f, "search_url_template has no %s placeholder: {}", template)
            }
            Self::InvalidSigner { package, source } => {
                write!(f, "trusted signer {}: {}", package, source)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidSigner { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Feeds one request through the engine and prints the outcome.
#[derive(Bpaf, Clone, Debug)]
#[bpaf(options, version)]
pub(crate) struct CmdArgs {
    /// Router configuration in TOML. Defaults apply when omitted.
    #[bpaf(long, argument("PATH"))]
    config: Option<PathBuf>,

    /// Raw request as JSON.
    #[bpaf(long, argument("PATH"))]
    request: PathBuf,

    /// The process was started by this request.
    #[bpaf(long("fresh-start"), switch)]
    fresh_start: bool,

    /// The request was delivered to an already running isolated surface.
    #[bpaf(long("isolated-target"), switch)]
    isolated_target: bool,

    /// The screen is off.
    #[bpaf(long("not-interactive"), switch)]
    not_interactive: bool,

    /// The keyguard is showing.
    #[bpaf(long, switch)]
    locked: bool,

    /// The device has not finished setup.
    #[bpaf(long, switch)]
    unprovisioned: bool,

    /// First-run flow has not been completed.
    #[bpaf(long("first-run-required"), switch)]
    first_run_required: bool,

    /// The full browser runtime has not started yet.
    #[bpaf(long("runtime-not-started"), switch)]
    runtime_not_started: bool,

    /// Filter for the tracing subscriber, e.g. `activation_router=debug`.
    #[bpaf(long("tracing-filter"), argument("FILTER"))]
    tracing_filter: Option<String>,
}

/// Preferences for one CLI run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppPreferences {
    pub config_path: Option<PathBuf>,
    pub request_path: PathBuf,
    pub freshly_started: bool,
    pub isolated_target: bool,
    pub interactive: bool,
    pub keyguard_locked: bool,
    pub provisioned: bool,
    pub first_run_required: bool,
    pub full_browser_started: bool,
    pub tracing_filter: Option<String>,
}

impl From<CmdArgs> for AppPreferences {
    fn from(args: CmdArgs) -> Self {
        Self {
            config_path: args.config,
            request_path: args.request,
            freshly_started: args.fresh_start,
            isolated_target: args.isolated_target,
            interactive: !args.not_interactive,
            keyguard_locked: args.locked,
            provisioned: !args.unprovisioned,
            first_run_required: args.first_run_required,
            full_browser_started: !args.runtime_not_started,
            tracing_filter: args.tracing_filter,
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum ArgumentParsingResult {
    Run(AppPreferences),
    Exit,
    ErrorParsing,
}

/// `args` excludes the binary name.
pub fn parse_command_line_arguments(args: &[String]) -> ArgumentParsingResult {
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    match cmd_args().run_inner(Args::from(args.as_slice())) {
        Ok(cmd_args) => ArgumentParsingResult::Run(cmd_args.into()),
        Err(error) => {
            error.print_message(80);
            if error.exit_code() == 0 {
                ArgumentParsingResult::Exit
            } else {
                ArgumentParsingResult::ErrorParsing
            }
        }
    }
}
