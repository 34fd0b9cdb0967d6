use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::domain::{Gate, GuardId, ScanLogId};

/// Payload carried inside a gate-pass QR code.
///
/// The JSON form uses camelCase keys:
/// `permitId, bearer, idNumber, gpNumber, itemPurpose, photoUrl, status, validUntil`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrPayload {
    pub permit_id: String,
    pub bearer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gp_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_purpose: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateScanRequest {
    pub permit_id: String,
    pub gate: Gate,
    pub scanned_at: DateTime<Utc>,
    pub guard_id: Option<GuardId>,
}

/// Permit data as confirmed by the validation endpoint.
///
/// Scalar fields accept numbers as well as strings since backends differ
/// on how they encode ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedPermit {
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub permit_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub bearer: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub id_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub gp_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub item_purpose: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub photo_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub valid_until: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanLog {
    pub id: ScanLogId,
    pub permit_id: String,
    pub gate: Gate,
    pub scanned_at: DateTime<Utc>,
    #[serde(default)]
    pub guard_id: Option<GuardId>,
}

/// Envelope returned by `POST /api/qr/validate`.
///
/// `scan_log` is kept as raw JSON: its shape belongs to the backend and it
/// is only forwarded to the live feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateScanResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(
        default,
        deserialize_with = "lenient_permit",
        skip_serializing_if = "Option::is_none"
    )]
    pub permit: Option<ValidatedPermit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_log: Option<Value>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ValidateScanResponse {
    pub fn accepted(permit: ValidatedPermit, scan_log: &ScanLog) -> Self {
        Self {
            success: true,
            permit: Some(permit),
            scan_log: serde_json::to_value(scan_log).ok(),
            message: None,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            permit: None,
            scan_log: None,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveFeedPushResponse {
    pub success: bool,
}

/// Any JSON scalar as text; `null`, objects and arrays read as absent.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    })
}

/// A permit that is not an object reads as absent.
fn lenient_permit<'de, D>(deserializer: D) -> Result<Option<ValidatedPermit>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
