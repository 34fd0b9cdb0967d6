use std::{collections::VecDeque, sync::Arc};

use camera::{CameraDevice, MediaStream, MissingCamera};
use chrono::{DateTime, Utc};
use shared::{
    domain::{Gate, ScanLogId},
    protocol::{QrPayload, ScanLog, ValidateScanRequest},
};
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

pub mod config;
pub mod dashboard;
pub mod detection;
pub mod error;
pub mod qr;
pub mod types;
pub mod validation;

pub use config::{FallbackDefaults, RejectionPolicy, ScanSessionConfig};
pub use dashboard::{DashboardNotifier, DashboardUpdate, HttpDashboardNotifier, LoggingDashboard};
pub use detection::{DetectionSource, ManualDetection, SimulatedDetection};
pub use error::ValidationError;
pub use qr::parse_qr_payload;
pub use types::{
    Feedback, FeedbackKind, RecordSource, ScanCounters, ScanPhase, ScanRecord,
    ScanSessionSnapshot, PLACEHOLDER,
};
pub use validation::{HttpScanValidator, MissingScanValidator, ScanValidator};

use types::ResolvedPermit;

const INVALID_CODE_TITLE: &str = "Invalid QR Code";
const INVALID_CODE_DETAIL: &str = "This QR code is not recognised.";
const SCAN_FAILED_TITLE: &str = "Scan Failed";

/// Notifications for whatever view is rendering the scan screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    PhaseChanged(ScanPhase),
    GateChanged(Gate),
    CameraUnavailable { reason: String },
    Overlay(Feedback),
    Toast(Feedback),
    ScanLogged(ScanRecord),
    CountersChanged(ScanCounters),
    Cleared,
}

/// Result of feeding one decoded QR text through the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// No session was scanning; nothing changed.
    Ignored,
    InvalidCode,
    /// Explicit rejection under [`RejectionPolicy::Discard`].
    Rejected { message: Option<String> },
    Logged(ScanRecord),
    /// The session was restarted or cleared while validation was in flight.
    Stale,
}

#[derive(Debug, Clone, Copy)]
enum DetectionOrigin {
    External,
    Armed { generation: u64 },
}

struct SessionState {
    phase: ScanPhase,
    gate: Gate,
    generation: u64,
    camera_stream: Option<Arc<dyn MediaStream>>,
    detection_task: Option<JoinHandle<()>>,
    counters: ScanCounters,
    records: VecDeque<ScanRecord>,
    last_scan_at: Option<DateTime<Utc>>,
    last_record_id: i64,
}

impl SessionState {
    fn new(gate: Gate) -> Self {
        Self {
            phase: ScanPhase::Idle,
            gate,
            generation: 0,
            camera_stream: None,
            detection_task: None,
            counters: ScanCounters::default(),
            records: VecDeque::new(),
            last_scan_at: None,
            last_record_id: 0,
        }
    }

    /// Leaves scanning and releases the camera. Returns whether a session was active.
    fn end_session(&mut self, abort_detection: bool) -> bool {
        let was_scanning = self.phase.is_scanning();
        self.phase = ScanPhase::Idle;
        if let Some(task) = self.detection_task.take() {
            if abort_detection {
                task.abort();
            }
        }
        if let Some(stream) = self.camera_stream.take() {
            stream.stop_all_tracks();
        }
        was_scanning
    }

    fn next_record_id(&mut self, now: DateTime<Utc>) -> i64 {
        let id = now.timestamp_millis().max(self.last_record_id + 1);
        self.last_record_id = id;
        id
    }
}

/// Gate scan session: scanning lifecycle, QR handling, validation and the
/// in-memory scan log for one scanner view.
pub struct GateScanController {
    camera: Arc<dyn CameraDevice>,
    validator: Arc<dyn ScanValidator>,
    dashboard: Arc<dyn DashboardNotifier>,
    detection: Arc<dyn DetectionSource>,
    config: ScanSessionConfig,
    inner: Mutex<SessionState>,
    events: broadcast::Sender<ScanEvent>,
}

impl GateScanController {
    pub fn new(config: ScanSessionConfig) -> Arc<Self> {
        Self::new_with_dependencies(
            config,
            Arc::new(MissingCamera),
            Arc::new(MissingScanValidator),
            Arc::new(LoggingDashboard),
            Arc::new(ManualDetection),
        )
    }

    pub fn new_with_dependencies(
        config: ScanSessionConfig,
        camera: Arc<dyn CameraDevice>,
        validator: Arc<dyn ScanValidator>,
        dashboard: Arc<dyn DashboardNotifier>,
        detection: Arc<dyn DetectionSource>,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Arc::new(Self {
            camera,
            validator,
            dashboard,
            detection,
            inner: Mutex::new(SessionState::new(config.initial_gate)),
            config,
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ScanEvent> {
        self.events.subscribe()
    }

    pub fn config(&self) -> &ScanSessionConfig {
        &self.config
    }

    pub async fn snapshot(&self) -> ScanSessionSnapshot {
        let state = self.inner.lock().await;
        ScanSessionSnapshot {
            phase: state.phase,
            gate: state.gate,
            counters: state.counters,
            camera_live: state.camera_stream.is_some(),
            last_scan_at: state.last_scan_at,
            generation: state.generation,
        }
    }

    /// Scan log, most recent first.
    pub async fn records(&self) -> Vec<ScanRecord> {
        self.inner.lock().await.records.iter().cloned().collect()
    }

    pub async fn set_gate(&self, gate: Gate) {
        let changed = {
            let mut state = self.inner.lock().await;
            let changed = state.gate != gate;
            state.gate = gate;
            changed
        };
        if changed {
            debug!(%gate, "scan: gate changed");
            self.emit(ScanEvent::GateChanged(gate));
        }
    }

    pub async fn toggle_scanning(self: &Arc<Self>) {
        let scanning = self.inner.lock().await.phase.is_scanning();
        if scanning {
            self.stop_scanning().await;
        } else {
            self.start_scanning().await;
        }
    }

    /// Starts a session. Camera failures leave the session armed without a
    /// live feed instead of failing.
    pub async fn start_scanning(self: &Arc<Self>) {
        let generation = {
            let mut state = self.inner.lock().await;
            if state.phase.is_scanning() {
                debug!("scan: start ignored, session already active");
                return;
            }
            state.generation += 1;
            state.phase = ScanPhase::Armed;
            state.generation
        };
        info!(generation, "scan: session started");
        self.emit(ScanEvent::PhaseChanged(ScanPhase::Armed));

        let acquired = self.camera.acquire(&self.config.camera).await;

        let mut state = self.inner.lock().await;
        let still_current = state.phase.is_scanning() && state.generation == generation;
        match acquired {
            Ok(stream) if still_current => {
                state.camera_stream = Some(stream);
                state.phase = ScanPhase::Scanning;
                self.emit(ScanEvent::PhaseChanged(ScanPhase::Scanning));
            }
            Ok(stream) => {
                stream.stop_all_tracks();
                debug!(generation, "camera: stream arrived after session ended, released");
                return;
            }
            Err(err) => {
                warn!(%err, "camera: could not access camera, continuing without live feed");
                if !still_current {
                    return;
                }
                self.emit(ScanEvent::CameraUnavailable {
                    reason: err.to_string(),
                });
            }
        }
        state.detection_task = Some(self.arm_detection(generation));
    }

    fn arm_detection(self: &Arc<Self>, generation: u64) -> JoinHandle<()> {
        let detection = Arc::clone(&self.detection);
        let controller = Arc::downgrade(self);
        tokio::spawn(async move {
            let Some(code) = detection.next_code().await else {
                return;
            };
            let Some(controller) = controller.upgrade() else {
                return;
            };
            controller
                .handle_detected(&code, DetectionOrigin::Armed { generation })
                .await;
        })
    }

    /// Safe to call when no session is active.
    pub async fn stop_scanning(&self) {
        let was_scanning = self.inner.lock().await.end_session(true);
        if was_scanning {
            info!("scan: session stopped");
            self.emit(ScanEvent::PhaseChanged(ScanPhase::Idle));
        }
    }

    /// Entry point for an external QR decoder.
    pub async fn handle_qr_detected(&self, raw: &str) -> ScanOutcome {
        self.handle_detected(raw, DetectionOrigin::External).await
    }

    async fn handle_detected(&self, raw: &str, origin: DetectionOrigin) -> ScanOutcome {
        let (gate, generation) = {
            let mut state = self.inner.lock().await;
            if !state.phase.is_scanning() {
                debug!("scan: detection ignored, not scanning");
                return ScanOutcome::Ignored;
            }
            if let DetectionOrigin::Armed { generation } = origin {
                if generation != state.generation {
                    debug!(generation, "scan: detection from previous session ignored");
                    return ScanOutcome::Ignored;
                }
            }
            // The armed task is the caller in that case; it must not abort itself.
            state.end_session(matches!(origin, DetectionOrigin::External));
            (state.gate, state.generation)
        };
        self.emit(ScanEvent::PhaseChanged(ScanPhase::Idle));

        let Some(payload) = parse_qr_payload(raw) else {
            warn!(bytes = raw.len(), "scan: unrecognised QR payload");
            self.emit(ScanEvent::Overlay(Feedback::overlay(
                FeedbackKind::Error,
                INVALID_CODE_TITLE,
            )));
            self.emit(ScanEvent::Toast(Feedback::toast(
                FeedbackKind::Error,
                INVALID_CODE_TITLE,
                INVALID_CODE_DETAIL,
            )));
            return ScanOutcome::InvalidCode;
        };

        self.validate_and_log_scan(payload, gate, generation).await
    }

    async fn validate_and_log_scan(
        &self,
        payload: QrPayload,
        gate: Gate,
        generation: u64,
    ) -> ScanOutcome {
        let request = ValidateScanRequest {
            permit_id: payload.permit_id.clone(),
            gate,
            scanned_at: Utc::now(),
            guard_id: self.config.guard_id,
        };
        let timeout = self.config.validation_timeout;
        let result = match tokio::time::timeout(timeout, self.validator.validate(&request)).await {
            Ok(result) => result,
            Err(_) => Err(ValidationError::Timeout(timeout)),
        };

        let (permit, scan_log, source) = match result {
            Ok(response) if response.success => (
                ResolvedPermit::from_validated(&payload, response.permit.as_ref()),
                response.scan_log,
                RecordSource::Validated,
            ),
            Ok(response) => {
                let message = response.message.filter(|message| !message.is_empty());
                if let Some(message) = &message {
                    warn!(permit_id = %payload.permit_id, %message, "scan: validation rejected permit");
                    self.emit(ScanEvent::Overlay(Feedback::overlay(
                        FeedbackKind::Error,
                        message.clone(),
                    )));
                    self.emit(ScanEvent::Toast(Feedback::toast(
                        FeedbackKind::Error,
                        SCAN_FAILED_TITLE,
                        message.clone(),
                    )));
                }
                match self.config.rejection_policy {
                    RejectionPolicy::Discard => return ScanOutcome::Rejected { message },
                    RejectionPolicy::LogFallback => (
                        ResolvedPermit::fallback(&payload, &self.config.fallback),
                        None,
                        RecordSource::RejectedFallback,
                    ),
                }
            }
            Err(err) => {
                warn!(permit_id = %payload.permit_id, %err, "scan: backend validate failed, using fallback data");
                (
                    ResolvedPermit::fallback(&payload, &self.config.fallback),
                    None,
                    RecordSource::TransportFallback,
                )
            }
        };

        self.process_valid_scan(permit, gate, generation, scan_log, source)
            .await
    }

    async fn process_valid_scan(
        &self,
        permit: ResolvedPermit,
        gate: Gate,
        generation: u64,
        scan_log: Option<serde_json::Value>,
        source: RecordSource,
    ) -> ScanOutcome {
        let (record, counters) = {
            let mut state = self.inner.lock().await;
            if state.generation != generation {
                warn!(
                    permit_id = %permit.permit_id,
                    sent_generation = generation,
                    current_generation = state.generation,
                    "scan: discarding stale validation result"
                );
                return ScanOutcome::Stale;
            }
            let now = Utc::now();
            let id = state.next_record_id(now);
            state.counters.record(gate);
            let record = ScanRecord {
                id,
                name: permit.bearer,
                id_number: permit.id_number,
                item_purpose: permit.item_purpose,
                gp_number: permit.gp_number,
                photo_url: permit.photo_url,
                qr_data: permit.permit_id,
                gate,
                time: now,
                source,
            };
            state.records.push_front(record.clone());
            state.last_scan_at = Some(now);
            (record, state.counters)
        };

        info!(
            record_id = record.id,
            permit_id = %record.qr_data,
            %gate,
            ?source,
            total = counters.total(),
            "scan: {} logged",
            gate.as_str()
        );

        let title = format!("{} Logged", gate.label());
        self.emit(ScanEvent::ScanLogged(record.clone()));
        self.emit(ScanEvent::CountersChanged(counters));
        self.emit(ScanEvent::Overlay(Feedback::overlay(
            FeedbackKind::Success,
            title.clone(),
        )));
        self.emit(ScanEvent::Toast(Feedback::toast(
            FeedbackKind::Success,
            title,
            format!("{} — {}", record.name, record.item_purpose),
        )));

        let scan_log = scan_log.or_else(|| {
            serde_json::to_value(ScanLog {
                id: ScanLogId(record.id),
                permit_id: record.qr_data.clone(),
                gate,
                scanned_at: record.time,
                guard_id: self.config.guard_id,
            })
            .map_err(|err| warn!(%err, record_id = record.id, "dashboard: could not encode scan log"))
            .ok()
        });
        if let Some(scan_log) = scan_log {
            self.notify_dashboard(DashboardUpdate {
                record: record.clone(),
                scan_log,
            });
        }

        ScanOutcome::Logged(record)
    }

    fn notify_dashboard(&self, update: DashboardUpdate) {
        let dashboard = Arc::clone(&self.dashboard);
        tokio::spawn(async move {
            if let Err(err) = dashboard.push(&update).await {
                warn!(%err, record_id = update.record.id, "dashboard: push failed");
            }
        });
    }

    /// Stops any session and forgets every logged scan. In-flight validations
    /// are discarded when they complete.
    pub async fn clear_results(&self) {
        let was_scanning = {
            let mut state = self.inner.lock().await;
            let was_scanning = state.end_session(true);
            state.generation += 1;
            state.counters = ScanCounters::default();
            state.records.clear();
            state.last_scan_at = None;
            was_scanning
        };
        if was_scanning {
            self.emit(ScanEvent::PhaseChanged(ScanPhase::Idle));
        }
        info!("scan: results cleared");
        self.emit(ScanEvent::CountersChanged(ScanCounters::default()));
        self.emit(ScanEvent::Cleared);
    }

    fn emit(&self, event: ScanEvent) {
        let _ = self.events.send(event);
    }
}

impl Drop for GateScanController {
    fn drop(&mut self) {
        self.inner.get_mut().end_session(true);
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
