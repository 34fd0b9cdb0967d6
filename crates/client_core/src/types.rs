use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{
    domain::Gate,
    protocol::{QrPayload, ValidatedPermit},
};

use crate::config::FallbackDefaults;

/// Rendered in place of any permit field the scan could not supply.
pub const PLACEHOLDER: &str = "—";

pub const OVERLAY_DISMISS_AFTER: Duration = Duration::from_millis(2200);
pub const TOAST_DISMISS_AFTER: Duration = Duration::from_millis(3200);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanPhase {
    #[default]
    Idle,
    /// Scanning without a live camera feed.
    Armed,
    Scanning,
}

impl ScanPhase {
    pub fn is_scanning(self) -> bool {
        !matches!(self, ScanPhase::Idle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScanCounters {
    pub entry: u64,
    pub exit: u64,
}

impl ScanCounters {
    pub fn total(&self) -> u64 {
        self.entry + self.exit
    }

    pub(crate) fn record(&mut self, gate: Gate) {
        match gate {
            Gate::Entry => self.entry += 1,
            Gate::Exit => self.exit += 1,
        }
    }
}

/// How the permit data behind a record was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordSource {
    Validated,
    RejectedFallback,
    TransportFallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRecord {
    /// Unix milliseconds of the scan, bumped to stay unique within a session.
    pub id: i64,
    pub name: String,
    pub id_number: String,
    pub item_purpose: String,
    pub gp_number: String,
    pub photo_url: Option<String>,
    pub qr_data: String,
    pub gate: Gate,
    pub time: DateTime<Utc>,
    pub source: RecordSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackKind {
    Success,
    Error,
}

/// Transient operator acknowledgment; the view hides it after `dismiss_after`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    pub kind: FeedbackKind,
    pub title: String,
    pub detail: Option<String>,
    pub dismiss_after: Duration,
}

impl Feedback {
    pub(crate) fn overlay(kind: FeedbackKind, title: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            detail: None,
            dismiss_after: OVERLAY_DISMISS_AFTER,
        }
    }

    pub(crate) fn toast(
        kind: FeedbackKind,
        title: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            title: title.into(),
            detail: Some(detail.into()),
            dismiss_after: TOAST_DISMISS_AFTER,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSessionSnapshot {
    pub phase: ScanPhase,
    pub gate: Gate,
    pub counters: ScanCounters,
    pub camera_live: bool,
    pub last_scan_at: Option<DateTime<Utc>>,
    pub generation: u64,
}

impl ScanSessionSnapshot {
    pub fn is_scanning(&self) -> bool {
        self.phase.is_scanning()
    }
}

/// Permit fields a record is built from, after validation or fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResolvedPermit {
    pub permit_id: String,
    pub bearer: String,
    pub id_number: String,
    pub gp_number: String,
    pub item_purpose: String,
    pub photo_url: Option<String>,
}

fn present(value: Option<&String>) -> Option<&String> {
    value.filter(|v| !v.is_empty())
}

fn or_placeholder(value: Option<&String>) -> String {
    present(value)
        .cloned()
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

impl ResolvedPermit {
    /// Endpoint data wins; anything it leaves out comes from the scanned payload.
    pub fn from_validated(payload: &QrPayload, validated: Option<&ValidatedPermit>) -> Self {
        let Some(permit) = validated else {
            return Self::from_payload(payload);
        };
        Self {
            permit_id: present(permit.permit_id.as_ref())
                .cloned()
                .unwrap_or_else(|| payload.permit_id.clone()),
            bearer: present(permit.bearer.as_ref())
                .cloned()
                .unwrap_or_else(|| payload.bearer.clone()),
            id_number: or_placeholder(
                present(permit.id_number.as_ref()).or(payload.id_number.as_ref()),
            ),
            gp_number: or_placeholder(
                present(permit.gp_number.as_ref()).or(payload.gp_number.as_ref()),
            ),
            item_purpose: or_placeholder(
                present(permit.item_purpose.as_ref()).or(payload.item_purpose.as_ref()),
            ),
            photo_url: present(permit.photo_url.as_ref())
                .or(present(payload.photo_url.as_ref()))
                .cloned(),
        }
    }

    fn from_payload(payload: &QrPayload) -> Self {
        Self {
            permit_id: payload.permit_id.clone(),
            bearer: payload.bearer.clone(),
            id_number: or_placeholder(payload.id_number.as_ref()),
            gp_number: or_placeholder(payload.gp_number.as_ref()),
            item_purpose: or_placeholder(payload.item_purpose.as_ref()),
            photo_url: present(payload.photo_url.as_ref()).cloned(),
        }
    }

    /// Payload fields merged over fixed defaults for anything missing.
    pub fn fallback(payload: &QrPayload, defaults: &FallbackDefaults) -> Self {
        let pick = |value: Option<&String>, default: &str| {
            present(value)
                .cloned()
                .unwrap_or_else(|| default.to_string())
        };
        Self {
            permit_id: payload.permit_id.clone(),
            bearer: pick(Some(&payload.bearer), defaults.bearer.as_str()),
            id_number: pick(payload.id_number.as_ref(), defaults.id_number.as_str()),
            gp_number: pick(payload.gp_number.as_ref(), defaults.gp_number.as_str()),
            item_purpose: pick(payload.item_purpose.as_ref(), defaults.item_purpose.as_str()),
            photo_url: present(payload.photo_url.as_ref()).cloned(),
        }
    }
}
