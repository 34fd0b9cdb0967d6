use std::time::Duration;

use camera::CameraConstraints;
use shared::domain::{Gate, GuardId};

pub const DEFAULT_VALIDATION_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_EVENT_CAPACITY: usize = 256;

/// What to do when the validation endpoint explicitly rejects a permit.
///
/// `LogFallback` keeps the demo behavior of logging a locally built record
/// anyway. Transport failures always fall back regardless of this setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RejectionPolicy {
    #[default]
    LogFallback,
    Discard,
}

/// Values substituted for permit fields missing from a fallback record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackDefaults {
    pub bearer: String,
    pub id_number: String,
    pub gp_number: String,
    pub item_purpose: String,
}

impl Default for FallbackDefaults {
    fn default() -> Self {
        Self {
            bearer: "John Doe".into(),
            id_number: "22076840".into(),
            gp_number: "CMP-123456".into(),
            item_purpose: "Dell XPS 15 Laptop".into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScanSessionConfig {
    pub initial_gate: Gate,
    pub guard_id: Option<GuardId>,
    pub camera: CameraConstraints,
    pub validation_timeout: Duration,
    pub rejection_policy: RejectionPolicy,
    pub fallback: FallbackDefaults,
    pub event_capacity: usize,
}

impl Default for ScanSessionConfig {
    fn default() -> Self {
        Self {
            initial_gate: Gate::Entry,
            guard_id: None,
            camera: CameraConstraints::default(),
            validation_timeout: DEFAULT_VALIDATION_TIMEOUT,
            rejection_policy: RejectionPolicy::default(),
            fallback: FallbackDefaults::default(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}
