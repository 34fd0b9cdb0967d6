use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use shared::{fixtures::demo_permits, protocol::QrPayload};
use tracing::warn;

pub const DEFAULT_SIMULATED_DELAY: Duration = Duration::from_millis(2500);

/// One-shot source of decoded QR text, armed each time scanning starts.
///
/// Returning `None` means this source will not produce a code for the
/// current session.
#[async_trait]
pub trait DetectionSource: Send + Sync {
    async fn next_code(&self) -> Option<String>;
}

/// Codes are delivered from outside through `handle_qr_detected`.
pub struct ManualDetection;

#[async_trait]
impl DetectionSource for ManualDetection {
    async fn next_code(&self) -> Option<String> {
        None
    }
}

/// Yields a sample permit after a fixed delay, cycling through the samples.
pub struct SimulatedDetection {
    delay: Duration,
    samples: Vec<QrPayload>,
    cursor: AtomicUsize,
}

impl SimulatedDetection {
    pub fn new(delay: Duration) -> Self {
        Self::with_samples(delay, demo_permits())
    }

    pub fn with_samples(delay: Duration, samples: Vec<QrPayload>) -> Self {
        Self {
            delay,
            samples,
            cursor: AtomicUsize::new(0),
        }
    }
}

impl Default for SimulatedDetection {
    fn default() -> Self {
        Self::new(DEFAULT_SIMULATED_DELAY)
    }
}

#[async_trait]
impl DetectionSource for SimulatedDetection {
    async fn next_code(&self) -> Option<String> {
        tokio::time::sleep(self.delay).await;
        if self.samples.is_empty() {
            return None;
        }
        let index = self.cursor.fetch_add(1, Ordering::SeqCst) % self.samples.len();
        match serde_json::to_string(&self.samples[index]) {
            Ok(code) => Some(code),
            Err(err) => {
                warn!(%err, "detection: failed to encode sample permit");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qr::parse_qr_payload;

    #[tokio::test]
    async fn simulated_detection_cycles_through_samples() {
        let source = SimulatedDetection::new(Duration::ZERO);
        let mut permit_ids = Vec::new();
        for _ in 0..6 {
            let code = source.next_code().await.expect("code");
            permit_ids.push(parse_qr_payload(&code).expect("payload").permit_id);
        }
        assert_eq!(
            permit_ids,
            vec!["UC-000042", "UC-000087", "UC-000103", "UC-000019", "UC-000155", "UC-000042"]
        );
    }

    #[tokio::test]
    async fn sources_without_codes_yield_nothing() {
        assert_eq!(ManualDetection.next_code().await, None);
        let empty = SimulatedDetection::with_samples(Duration::ZERO, Vec::new());
        assert_eq!(empty.next_code().await, None);
    }
}
