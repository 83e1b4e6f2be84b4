/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Telemetry for the request path.
//!
//! Producers hold a cloned [`Sender`] and never block; the engine owns the
//! receiving side and folds events into per-channel counters when it drains.
//! The queue is bounded. Events sent while it is full are dropped.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use serde_json::{Value, json};

use crate::admission::IgnoreReason;
use crate::routing::{RouteDecision, SurfaceKind};
use crate::trust::ExternalAppId;

pub const CHANNEL_ADMISSION_ADMITTED: &str = "intake.admission.admitted";
pub const CHANNEL_ADMISSION_IGNORED: &str = "intake.admission.ignored";
pub const CHANNEL_ADMISSION_DEFERRED: &str = "intake.admission.deferred";
pub const CHANNEL_ADMISSION_FAULTED: &str = "intake.admission.faulted";
pub const CHANNEL_ADMISSION_REDELIVERED: &str = "intake.admission.redelivered";

pub const CHANNEL_SENDER_APP_HANDLERS_PRESENT: &str = "intake.sender.app_handlers_present";

pub const CHANNEL_ROUTE_TERMINATE: &str = "intake.route.terminate";
pub const CHANNEL_ROUTE_WEB_SEARCH: &str = "intake.route.web_search";
pub const CHANNEL_ROUTE_NOTIFICATION_SETTINGS: &str = "intake.route.notification_settings";
pub const CHANNEL_ROUTE_FIRST_RUN: &str = "intake.route.first_run";
pub const CHANNEL_ROUTE_LAUNCH_BROWSING: &str = "intake.route.launch_browsing";
pub const CHANNEL_ROUTE_LAUNCH_ISOLATED: &str = "intake.route.launch_isolated";
pub const CHANNEL_ROUTE_IN_PLACE: &str = "intake.route.in_place";

pub const CHANNEL_WORKER_DNS_WARMED: &str = "intake.worker.dns_warmed";
pub const CHANNEL_WORKER_DNS_DEDUPED: &str = "intake.worker.dns_deduped";
pub const CHANNEL_WORKER_HANDLER_TALLY: &str = "intake.worker.handler_tally";
pub const CHANNEL_WORKER_FAILED: &str = "intake.worker.failed";

const EVENT_RING_CAPACITY: usize = 512;
/// Undrained events held between ticks.
pub const EVENT_QUEUE_CAPACITY: usize = 4096;
const LATENCY_SAMPLE_WINDOW: usize = 64;

/// Per-sender channel. Channel ids are static so events stay allocation-free.
pub fn sender_channel(app: ExternalAppId) -> &'static str {
    match app {
        ExternalAppId::Other => "intake.sender.other",
        ExternalAppId::Gmail => "intake.sender.gmail",
        ExternalAppId::Facebook => "intake.sender.facebook",
        ExternalAppId::Plus => "intake.sender.plus",
        ExternalAppId::Twitter => "intake.sender.twitter",
        ExternalAppId::Chrome => "intake.sender.chrome",
        ExternalAppId::Hangouts => "intake.sender.hangouts",
        ExternalAppId::Messenger => "intake.sender.messenger",
        ExternalAppId::News => "intake.sender.news",
        ExternalAppId::Line => "intake.sender.line",
        ExternalAppId::Whatsapp => "intake.sender.whatsapp",
        ExternalAppId::Gsa => "intake.sender.gsa",
        ExternalAppId::Webapk => "intake.sender.webapk",
        ExternalAppId::YahooMail => "intake.sender.yahoo_mail",
        ExternalAppId::Viber => "intake.sender.viber",
        ExternalAppId::Youtube => "intake.sender.youtube",
    }
}

pub fn route_channel(route: &RouteDecision) -> &'static str {
    match route {
        RouteDecision::Terminate => CHANNEL_ROUTE_TERMINATE,
        RouteDecision::WebSearch { .. } => CHANNEL_ROUTE_WEB_SEARCH,
        RouteDecision::NotificationSettings => CHANNEL_ROUTE_NOTIFICATION_SETTINGS,
        RouteDecision::FirstRun => CHANNEL_ROUTE_FIRST_RUN,
        RouteDecision::Launch {
            surface: SurfaceKind::Browsing,
            ..
        } => CHANNEL_ROUTE_LAUNCH_BROWSING,
        RouteDecision::Launch {
            surface: SurfaceKind::Isolated,
            ..
        } => CHANNEL_ROUTE_LAUNCH_ISOLATED,
        RouteDecision::ContinueInPlace { .. } => CHANNEL_ROUTE_IN_PLACE,
    }
}

pub fn ignore_channel(reason: IgnoreReason) -> &'static str {
    match reason {
        IgnoreReason::Faulted => CHANNEL_ADMISSION_FAULTED,
        _ => CHANNEL_ADMISSION_IGNORED,
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiagnosticEvent {
    MessageSent {
        channel_id: &'static str,
        byte_len: usize,
    },
    MessageReceived {
        channel_id: &'static str,
        latency_us: u64,
    },
}

impl DiagnosticEvent {
    pub fn channel_id(&self) -> &'static str {
        match self {
            Self::MessageSent { channel_id, .. } | Self::MessageReceived { channel_id, .. } => {
                channel_id
            }
        }
    }
}

/// Never blocks. Events are dropped when the queue is full or nobody drains
/// it anymore.
pub fn emit_event(tx: &Sender<DiagnosticEvent>, event: DiagnosticEvent) {
    if let Err(TrySendError::Full(event)) = tx.try_send(event) {
        log::trace!("diagnostics queue full; dropping {}", event.channel_id());
    }
}

pub fn emit_message(tx: &Sender<DiagnosticEvent>, channel_id: &'static str, byte_len: usize) {
    emit_event(
        tx,
        DiagnosticEvent::MessageSent {
            channel_id,
            byte_len,
        },
    );
}

#[derive(Clone, Debug, Default)]
pub(crate) struct DiagnosticGraph {
    pub(crate) message_counts: HashMap<&'static str, u64>,
    pub(crate) message_bytes_sent: HashMap<&'static str, u64>,
    pub(crate) message_latency_us: HashMap<&'static str, u64>,
    pub(crate) message_latency_samples: HashMap<&'static str, u64>,
    pub(crate) message_latency_recent_us: HashMap<&'static str, VecDeque<u64>>,
}

pub struct DiagnosticsState {
    event_tx: Sender<DiagnosticEvent>,
    event_rx: Receiver<DiagnosticEvent>,
    event_ring: VecDeque<DiagnosticEvent>,
    last_drain_at: Option<Instant>,
    drain_interval: Duration,
    diagnostic_graph: DiagnosticGraph,
}

impl DiagnosticsState {
    pub fn new() -> Self {
        let (event_tx, event_rx) = bounded(EVENT_QUEUE_CAPACITY);
        Self {
            event_tx,
            event_rx,
            event_ring: VecDeque::new(),
            last_drain_at: None,
            drain_interval: Duration::ZERO,
            diagnostic_graph: DiagnosticGraph::default(),
        }
    }

    /// Drains at most once per `interval`.
    pub fn with_drain_interval(mut self, interval: Duration) -> Self {
        self.drain_interval = interval;
        self
    }

    pub fn sender(&self) -> Sender<DiagnosticEvent> {
        self.event_tx.clone()
    }

    pub fn record(&self, channel_id: &'static str, byte_len: usize) {
        emit_message(&self.event_tx, channel_id, byte_len);
    }

    pub fn tick_drain(&mut self) {
        if let Some(last) = self.last_drain_at
            && last.elapsed() < self.drain_interval
        {
            return;
        }
        self.last_drain_at = Some(Instant::now());

        while let Ok(event) = self.event_rx.try_recv() {
            self.aggregate_event(&event);
            self.event_ring.push_back(event);
            while self.event_ring.len() > EVENT_RING_CAPACITY {
                self.event_ring.pop_front();
            }
        }
    }

    fn aggregate_event(&mut self, event: &DiagnosticEvent) {
        let graph = &mut self.diagnostic_graph;
        match event {
            DiagnosticEvent::MessageSent {
                channel_id,
                byte_len,
            } => {
                *graph.message_counts.entry(*channel_id).or_insert(0) += 1;
                *graph.message_bytes_sent.entry(*channel_id).or_insert(0) += *byte_len as u64;
            }
            DiagnosticEvent::MessageReceived {
                channel_id,
                latency_us,
            } => {
                *graph.message_counts.entry(*channel_id).or_insert(0) += 1;
                *graph.message_latency_us.entry(*channel_id).or_insert(0) += *latency_us;
                *graph.message_latency_samples.entry(*channel_id).or_insert(0) += 1;
                let samples = graph
                    .message_latency_recent_us
                    .entry(*channel_id)
                    .or_default();
                samples.push_back(*latency_us);
                while samples.len() > LATENCY_SAMPLE_WINDOW {
                    samples.pop_front();
                }
            }
        }
    }

    /// Events sent but not yet drained.
    pub fn pending_events(&self) -> usize {
        self.event_rx.len()
    }

    pub fn message_count(&self, channel_id: &str) -> u64 {
        self.diagnostic_graph
            .message_counts
            .get(channel_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn recent_events(&self) -> impl Iterator<Item = &DiagnosticEvent> {
        self.event_ring.iter()
    }

    pub fn snapshot_json(&self) -> Value {
        let graph = &self.diagnostic_graph;
        let mut channels: Vec<&&'static str> = graph.message_counts.keys().collect();
        channels.sort();
        let channels: Vec<Value> = channels
            .into_iter()
            .map(|channel| {
                let samples = graph
                    .message_latency_samples
                    .get(*channel)
                    .copied()
                    .unwrap_or(0);
                let avg_latency_us = graph
                    .message_latency_us
                    .get(*channel)
                    .map(|total| if samples == 0 { 0 } else { total / samples });
                json!({
                    "channel_id": channel,
                    "count": graph.message_counts.get(*channel).copied().unwrap_or(0),
                    "bytes_sent": graph.message_bytes_sent.get(*channel).copied().unwrap_or(0),
                    "avg_latency_us": avg_latency_us,
                })
            })
            .collect();
        json!({
            "buffered_events": self.event_ring.len(),
            "channels": channels,
        })
    }
}

impl Default for DiagnosticsState {
    fn default() -> Self {
        Self::new()
    }
}
