/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Background pool for work the request path triggers but never waits on.
//!
//! Tasks run on a small tokio runtime owned by the pool. Results come back to
//! the engine thread as [`WorkerReport`]s over a bounded crossbeam channel;
//! failures, and reports that find the channel full, are logged and dropped.

use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use moka::sync::Cache;
use tokio::runtime::{Builder, Runtime};
use url::Url;

use super::diagnostics::{
    CHANNEL_WORKER_DNS_DEDUPED, CHANNEL_WORKER_DNS_WARMED, CHANNEL_WORKER_FAILED,
    CHANNEL_WORKER_HANDLER_TALLY, DiagnosticEvent, emit_event, emit_message,
};
use crate::intake::scheme::is_http_or_https;

/// Upper bound on remembered warm-up origins.
const WARMED_ORIGIN_CAPACITY: u64 = 1024;
/// Undrained reports held for the engine thread.
pub const REPORT_QUEUE_CAPACITY: usize = 256;

pub type ResolveFuture = Pin<Box<dyn Future<Output = std::io::Result<usize>> + Send>>;

/// Host lookup used for connection warm-up.
pub trait Resolver: Send + Sync + 'static {
    /// Resolves to the number of addresses found for `host:port`.
    fn resolve(&self, host: String, port: u16) -> ResolveFuture;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl Resolver for SystemResolver {
    fn resolve(&self, host: String, port: u16) -> ResolveFuture {
        Box::pin(async move {
            let addrs = tokio::net::lookup_host((host.as_str(), port)).await?;
            Ok(addrs.count())
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerReport {
    DnsWarmed { origin: String, addresses: usize },
    /// Apps other than this one that could also have handled a request.
    HandlerTally { packages: usize, third_party: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerError {
    RuntimeBuild(String),
    NotWarmable(String),
    Resolve { origin: String, message: String },
    NoAddresses(String),
}

impl std::fmt::Display for WorkerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RuntimeBuild(e) => write!(f, "worker runtime failed to start: {}", e),
            Self::NotWarmable(url) => write!(f, "no http(s) origin to warm in {}", url),
            Self::Resolve { origin, message } => {
                write!(f, "lookup for {} failed: {}", origin, message)
            }
            Self::NoAddresses(origin) => write!(f, "lookup for {} returned no addresses", origin),
        }
    }
}

impl std::error::Error for WorkerError {}

#[derive(Debug, Clone, Copy)]
pub struct WorkerSettings {
    pub worker_threads: usize,
    pub preconnect_dedupe: Duration,
}

pub struct WorkerPool {
    runtime: Option<Runtime>,
    resolver: Arc<dyn Resolver>,
    warmed_origins: Cache<String, ()>,
    report_tx: Sender<WorkerReport>,
    report_rx: Receiver<WorkerReport>,
    diagnostics_tx: Sender<DiagnosticEvent>,
}

impl WorkerPool {
    pub fn new(
        settings: WorkerSettings,
        resolver: Arc<dyn Resolver>,
        diagnostics_tx: Sender<DiagnosticEvent>,
    ) -> Result<Self, WorkerError> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(settings.worker_threads.max(1))
            .thread_name("activation-worker")
            .enable_all()
            .build()
            .map_err(|e| WorkerError::RuntimeBuild(e.to_string()))?;
        let warmed_origins = Cache::builder()
            .max_capacity(WARMED_ORIGIN_CAPACITY)
            .time_to_live(settings.preconnect_dedupe.max(Duration::from_millis(1)))
            .build();
        let (report_tx, report_rx) = bounded(REPORT_QUEUE_CAPACITY);
        log::debug!(
            "worker pool started with {} threads",
            settings.worker_threads.max(1)
        );
        Ok(Self {
            runtime: Some(runtime),
            resolver,
            warmed_origins,
            report_tx,
            report_rx,
            diagnostics_tx,
        })
    }

    fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if let Some(runtime) = self.runtime.as_ref() {
            runtime.spawn(task);
        }
    }

    /// Queues a lookup for `url`'s origin. Returns `Ok(false)` when the origin
    /// was warmed recently and nothing was queued.
    pub fn warm_up(&self, url: &str) -> Result<bool, WorkerError> {
        let (origin, host, port) = warmable_origin(url)?;
        let entry = self.warmed_origins.entry(origin.clone()).or_insert(());
        if !entry.is_fresh() {
            emit_message(&self.diagnostics_tx, CHANNEL_WORKER_DNS_DEDUPED, origin.len());
            return Ok(false);
        }

        let resolver = Arc::clone(&self.resolver);
        let report_tx = self.report_tx.clone();
        let diagnostics_tx = self.diagnostics_tx.clone();
        let queued_at = Instant::now();
        self.spawn(async move {
            let result = match resolver.resolve(host, port).await {
                Ok(0) => Err(WorkerError::NoAddresses(origin.clone())),
                Ok(addresses) => Ok(addresses),
                Err(e) => Err(WorkerError::Resolve {
                    origin: origin.clone(),
                    message: e.to_string(),
                }),
            };
            match result {
                Ok(addresses) => {
                    send_report(&report_tx, WorkerReport::DnsWarmed { origin, addresses });
                    emit_event(
                        &diagnostics_tx,
                        DiagnosticEvent::MessageReceived {
                            channel_id: CHANNEL_WORKER_DNS_WARMED,
                            latency_us: queued_at.elapsed().as_micros() as u64,
                        },
                    );
                }
                Err(err) => report_failure(&diagnostics_tx, &err),
            }
        });
        Ok(true)
    }

    pub fn tally_handlers(&self, packages: Vec<String>, own_package: &str) {
        let own_package = own_package.to_string();
        let report_tx = self.report_tx.clone();
        let diagnostics_tx = self.diagnostics_tx.clone();
        self.spawn(async move {
            let distinct: BTreeSet<&str> = packages
                .iter()
                .map(|p| p.trim())
                .filter(|p| !p.is_empty())
                .collect();
            let third_party = distinct.iter().filter(|p| **p != own_package).count();
            send_report(
                &report_tx,
                WorkerReport::HandlerTally {
                    packages: distinct.len(),
                    third_party,
                },
            );
            emit_message(&diagnostics_tx, CHANNEL_WORKER_HANDLER_TALLY, distinct.len());
        });
    }

    pub fn drain_reports(&self) -> Vec<WorkerReport> {
        self.report_rx.try_iter().collect()
    }

    #[cfg(any(test, feature = "test-utils"))]
    pub fn wait_report(&self, timeout: Duration) -> Option<WorkerReport> {
        self.report_rx.recv_timeout(timeout).ok()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

fn send_report(report_tx: &Sender<WorkerReport>, report: WorkerReport) {
    if let Err(TrySendError::Full(report)) = report_tx.try_send(report) {
        log::debug!("report queue full; dropping {:?}", report);
    }
}

fn report_failure(diagnostics_tx: &Sender<DiagnosticEvent>, err: &WorkerError) {
    log::warn!("background task dropped: {}", err);
    emit_message(diagnostics_tx, CHANNEL_WORKER_FAILED, 0);
}

fn warmable_origin(url: &str) -> Result<(String, String, u16), WorkerError> {
    let not_warmable = || WorkerError::NotWarmable(url.to_string());
    if !is_http_or_https(url) {
        return Err(not_warmable());
    }
    let parsed = Url::parse(url).map_err(|_| not_warmable())?;
    let host = parsed.host_str().filter(|h| !h.is_empty()).ok_or_else(not_warmable)?;
    let port = parsed.port_or_known_default().ok_or_else(not_warmable)?;
    Ok((
        parsed.origin().ascii_serialization(),
        host.to_string(),
        port,
    ))
}
