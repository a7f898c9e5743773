//! Handshake and result delivery between the sandbox and its host.
//!
//! The bridge runs a small lifecycle: announce readiness on a timer
//! while polling for a directly callable host object, settle on the
//! best channel discovered, then deliver the finished batch through a
//! strict fallback ladder ending in a redirect URL that carries the
//! encoded results itself.

pub mod host;
pub mod payload;

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};

use crate::record::FileRecord;
use crate::timeline::ProbeTimeline;

pub use host::{
    ChannelError, Destination, DirectHost, HostCapability, HostEvent, HostMessage, HostPort,
    StandaloneHost,
};
pub use payload::{decode_results, encode_results, DecodeError, ResultsPayload};

/// Where the bridge is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Unconnected,
    Announcing,
    Connected,
    /// Discovery budgets exhausted without a handshake or direct
    /// object. Delivery will lean on the fallback ladder.
    DegradedPolling,
    Delivering,
    Done,
}

/// What discovery established about the host relationship.
#[derive(Debug, Clone, Default)]
pub struct BridgeSession {
    pub host_id: Option<String>,
    pub channel: ChannelKind,
    pub capability: Option<HostCapability>,
    pub announce_attempts: u32,
    pub poll_attempts: u32,
}

/// Channel class the session ended up on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChannelKind {
    /// A live channel: direct object or handshaken message session.
    Direct,
    /// Results went out via the redirect URL.
    FallbackRedirect,
    #[default]
    Undiscovered,
}

/// Discovery timing knobs.
#[derive(Debug, Clone)]
pub struct BridgeTuning {
    pub announce_interval: Duration,
    pub announce_budget: u32,
    pub poll_interval: Duration,
    pub poll_budget: u32,
    /// Base URL the redirect fallback navigates to.
    pub host_base_url: String,
}

impl Default for BridgeTuning {
    fn default() -> Self {
        Self {
            announce_interval: Duration::from_millis(1500),
            announce_budget: 10,
            poll_interval: Duration::from_millis(250),
            poll_budget: 40,
            host_base_url: "http://localhost:8501".into(),
        }
    }
}

pub struct Bridge<P: HostPort> {
    port: P,
    events: mpsc::Receiver<HostEvent>,
    tuning: BridgeTuning,
    timeline: ProbeTimeline,
    session: BridgeSession,
    state: BridgeState,
    direct: Option<Arc<dyn DirectHost>>,
    announce_error_logged: bool,
    resize_error_logged: bool,
}

impl<P: HostPort> Bridge<P> {
    pub fn new(
        port: P,
        events: mpsc::Receiver<HostEvent>,
        tuning: BridgeTuning,
        timeline: ProbeTimeline,
    ) -> Self {
        Self {
            port,
            events,
            tuning,
            timeline,
            session: BridgeSession::default(),
            state: BridgeState::Unconnected,
            direct: None,
            announce_error_logged: false,
            resize_error_logged: false,
        }
    }

    pub fn state(&self) -> BridgeState {
        self.state
    }

    pub fn session(&self) -> &BridgeSession {
        &self.session
    }

    /// Run discovery until a channel is established or both budgets
    /// run out. Returns either `Connected` or `DegradedPolling`; a
    /// handshake or direct-object hit tears the remaining timers down
    /// with it.
    pub async fn connect(&mut self) -> BridgeState {
        self.state = BridgeState::Announcing;
        self.note("Sandbox loaded. Announcing readiness to host...").await;

        let mut next_announce = Instant::now();
        let mut next_poll = Instant::now();
        let mut events_open = true;

        loop {
            let announcing = self.session.announce_attempts < self.tuning.announce_budget;
            let polling = self.session.poll_attempts < self.tuning.poll_budget;
            let deadline = match (announcing, polling) {
                (true, true) => next_announce.min(next_poll),
                (true, false) => next_announce,
                (false, true) => next_poll,
                (false, false) => break,
            };

            if events_open {
                let event = tokio::time::timeout_at(deadline, self.events.recv()).await;
                match event {
                    Ok(Some(HostEvent::Handshake { session_id })) => {
                        self.adopt(session_id).await;
                        return self.state;
                    }
                    Ok(None) => {
                        events_open = false;
                        continue;
                    }
                    Err(_) => {}
                }
            } else {
                tokio::time::sleep_until(deadline).await;
            }

            let now = Instant::now();
            if polling && now >= next_poll {
                self.session.poll_attempts += 1;
                next_poll = now + self.tuning.poll_interval;
                if let Some(direct) = self.port.direct_host() {
                    self.direct = Some(direct);
                    self.session.capability = Some(HostCapability::DirectCall);
                    self.session.channel = ChannelKind::Direct;
                    self.state = BridgeState::Connected;
                    self.note("Detected directly callable host object.").await;
                    return self.state;
                }
                if self.session.poll_attempts >= self.tuning.poll_budget {
                    self.note("Host object not detected; continuing without a direct channel.")
                        .await;
                }
            }
            if announcing && now >= next_announce {
                self.session.announce_attempts += 1;
                next_announce = now + self.tuning.announce_interval;
                let posted = self
                    .port
                    .post(HostMessage::Ready { api_version: 1 }, Destination::Broadcast)
                    .await;
                if let Err(e) = posted {
                    if !self.announce_error_logged {
                        self.announce_error_logged = true;
                        self.note(format!("Failed to announce readiness: {e}")).await;
                    }
                }
                if self.session.announce_attempts >= self.tuning.announce_budget {
                    self.note("No host response after repeated announcements.").await;
                }
            }
        }

        self.state = BridgeState::DegradedPolling;
        self.state
    }

    /// Deliver the batch through the channel ladder: direct call,
    /// session-scoped message, best-effort broadcast when degraded,
    /// then the redirect URL. First success wins.
    pub async fn deliver(&mut self, records: &[FileRecord]) -> Result<ChannelKind, ChannelError> {
        // A handshake may have raced the end of discovery.
        while let Ok(HostEvent::Handshake { session_id }) = self.events.try_recv() {
            if self.session.host_id.is_none() {
                self.adopt(session_id).await;
            }
        }

        let degraded = self.state == BridgeState::DegradedPolling;
        self.state = BridgeState::Delivering;
        let payload = ResultsPayload::new(records.to_vec(), self.timeline.entries());

        if let Some(direct) = self.direct.clone() {
            match direct.deliver(&payload) {
                Ok(()) => {
                    self.session.channel = ChannelKind::Direct;
                    self.note(format!(
                        "Delivered {} record(s) via direct host call.",
                        payload.metadata.len()
                    ))
                    .await;
                    self.state = BridgeState::Done;
                    return Ok(ChannelKind::Direct);
                }
                Err(e) => self.note(format!("Direct delivery failed: {e}")).await,
            }
        }

        if let Some(id) = self.session.host_id.clone() {
            let posted = self
                .port
                .post(HostMessage::Results(payload.clone()), Destination::Session(id))
                .await;
            match posted {
                Ok(()) => {
                    self.session.channel = ChannelKind::Direct;
                    self.note(format!(
                        "Delivered {} record(s) via session message.",
                        payload.metadata.len()
                    ))
                    .await;
                    self.state = BridgeState::Done;
                    return Ok(ChannelKind::Direct);
                }
                Err(e) => self.note(format!("Session delivery failed: {e}")).await,
            }
        } else if degraded {
            let posted = self
                .port
                .post(HostMessage::Results(payload.clone()), Destination::Broadcast)
                .await;
            match posted {
                Ok(()) => {
                    self.session.channel = ChannelKind::Direct;
                    self.note("Delivered results via best-effort broadcast.").await;
                    self.state = BridgeState::Done;
                    return Ok(ChannelKind::Direct);
                }
                Err(e) => {
                    self.note(format!("Best-effort broadcast found no listener: {e}"))
                        .await
                }
            }
        }

        match payload::encode_results(&payload) {
            Ok(encoded) => {
                let url = payload::results_url(&self.tuning.host_base_url, &encoded);
                self.note(format!(
                    "Falling back to redirect delivery ({} encoded chars).",
                    encoded.len()
                ))
                .await;
                match self.port.navigate(&url).await {
                    Ok(()) => {
                        self.session.channel = ChannelKind::FallbackRedirect;
                        self.note("Redirected host with encoded results.").await;
                        self.state = BridgeState::Done;
                        return Ok(ChannelKind::FallbackRedirect);
                    }
                    Err(e) => self.note(format!("Redirect delivery failed: {e}")).await,
                }
            }
            Err(e) => self.note(format!("Could not encode results payload: {e}")).await,
        }

        self.note("All delivery channels failed; results remain local.").await;
        self.state = BridgeState::Done;
        Err(ChannelError::AllChannelsFailed)
    }

    /// Record a progress note and nudge the host to grow the frame so
    /// the note stays visible.
    pub async fn note(&mut self, message: impl Into<String>) {
        self.timeline.push(message);
        self.request_resize().await;
    }

    async fn adopt(&mut self, session_id: String) {
        self.session.host_id = Some(session_id.clone());
        if self.session.capability.is_none() {
            self.session.capability = Some(HostCapability::MessageOnly);
        }
        self.session.channel = ChannelKind::Direct;
        self.state = BridgeState::Connected;
        self.note(format!("Connected to host (session {session_id}).")).await;
    }

    /// Best-effort frame resize; the first failure is logged, the rest
    /// are suppressed so a hostless run does not flood the timeline.
    async fn request_resize(&mut self) {
        let height = 80 + 18 * self.timeline.len() as u32;
        let result = match &self.direct {
            Some(direct) => direct.set_frame_height(height),
            None => {
                let destination = match &self.session.host_id {
                    Some(id) => Destination::Session(id.clone()),
                    None => Destination::Broadcast,
                };
                self.port
                    .post(HostMessage::FrameHeight { height }, destination)
                    .await
            }
        };
        if let Err(e) = result {
            if !self.resize_error_logged {
                self.resize_error_logged = true;
                self.timeline.push(format!("Unable to request frame resize: {e}"));
            }
        }
    }
}
