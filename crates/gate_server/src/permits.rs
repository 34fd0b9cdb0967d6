//! In-memory permit registry backing the validation endpoint.

use std::{collections::HashMap, fs, path::Path};

use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use shared::{
    domain::STATUS_APPROVED,
    error::{ApiException, ErrorCode},
    fixtures::demo_permits,
    protocol::{QrPayload, ValidatedPermit},
};
use tracing::warn;

#[derive(Debug, Deserialize)]
struct PermitFile {
    #[serde(default)]
    permits: Vec<QrPayload>,
}

#[derive(Debug, Clone, Default)]
pub struct PermitRegistry {
    permits: HashMap<String, QrPayload>,
}

impl PermitRegistry {
    pub fn new(permits: impl IntoIterator<Item = QrPayload>) -> Self {
        Self {
            permits: permits
                .into_iter()
                .map(|permit| (permit.permit_id.clone(), permit))
                .collect(),
        }
    }

    pub fn with_demo_permits() -> Self {
        Self::new(demo_permits())
    }

    /// Reads `[[permits]]` tables using the QR payload's camelCase keys.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read permits file '{}'", path.display()))?;
        let file: PermitFile = toml::from_str(&raw)
            .with_context(|| format!("failed to parse permits file '{}'", path.display()))?;
        Ok(Self::new(file.permits))
    }

    pub fn len(&self) -> usize {
        self.permits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.permits.is_empty()
    }

    /// Checks that a permit exists, is approved and has not lapsed at `scanned_at`.
    pub fn check(
        &self,
        permit_id: &str,
        scanned_at: DateTime<Utc>,
    ) -> Result<ValidatedPermit, ApiException> {
        let permit = self
            .permits
            .get(permit_id.trim())
            .ok_or_else(|| ApiException::new(ErrorCode::NotFound, "Permit not found"))?;

        let status = permit.status.as_deref().unwrap_or(STATUS_APPROVED);
        if !status.eq_ignore_ascii_case(STATUS_APPROVED) {
            return Err(ApiException::new(
                ErrorCode::Validation,
                format!("Permit is {status}"),
            ));
        }

        if let Some(valid_until) = permit.valid_until.as_deref() {
            match NaiveDate::parse_from_str(valid_until, "%Y-%m-%d") {
                Ok(last_day) if scanned_at.date_naive() > last_day => {
                    return Err(ApiException::new(
                        ErrorCode::Expired,
                        format!("Permit expired on {valid_until}"),
                    ));
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(permit_id, valid_until, %err, "permits: unreadable validUntil, not enforcing");
                }
            }
        }

        Ok(ValidatedPermit {
            permit_id: Some(permit.permit_id.clone()),
            bearer: Some(permit.bearer.clone()),
            id_number: permit.id_number.clone(),
            gp_number: permit.gp_number.clone(),
            item_purpose: permit.item_purpose.clone(),
            photo_url: permit.photo_url.clone(),
            status: Some(status.to_string()),
            valid_until: permit.valid_until.clone(),
        })
    }
}

#[cfg(test)]
#[path = "tests/permits_tests.rs"]
mod tests;
