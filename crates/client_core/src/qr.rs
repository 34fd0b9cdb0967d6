//! Decoding of gate-pass QR payloads.
//!
//! Two encodings exist in the field: the JSON object printed on current
//! passes and the older `permitId|bearer|idNumber|gpNumber|itemPurpose` text.

use serde_json::{Map, Value};
use shared::{domain::STATUS_APPROVED, protocol::QrPayload};

use crate::types::PLACEHOLDER;

pub const LEGACY_DELIMITER: char = '|';

/// Returns `None` when the text is neither an acceptable JSON payload nor a
/// legacy string with at least a permit id and bearer segment.
///
/// Text that is valid JSON but lacks `permitId` or `bearer` is rejected
/// outright; it is not retried as a legacy string.
pub fn parse_qr_payload(raw: &str) -> Option<QrPayload> {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => parse_structured(value.as_object()?),
        Err(_) => parse_legacy(raw),
    }
}

fn parse_structured(object: &Map<String, Value>) -> Option<QrPayload> {
    let permit_id = text_field(object, "permitId")?;
    let bearer = text_field(object, "bearer")?;
    Some(QrPayload {
        permit_id,
        bearer,
        id_number: text_field(object, "idNumber"),
        gp_number: text_field(object, "gpNumber"),
        item_purpose: text_field(object, "itemPurpose"),
        photo_url: text_field(object, "photoUrl"),
        status: text_field(object, "status"),
        valid_until: text_field(object, "validUntil"),
    })
}

// Empty strings, zero, null and non-scalar values count as absent.
fn text_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    match object.get(key)? {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) if number.as_f64() != Some(0.0) => Some(number.to_string()),
        _ => None,
    }
}

fn parse_legacy(raw: &str) -> Option<QrPayload> {
    let segments: Vec<&str> = raw.split(LEGACY_DELIMITER).collect();
    if segments.len() < 2 {
        return None;
    }
    let optional = |index: usize| {
        segments
            .get(index)
            .filter(|segment| !segment.is_empty())
            .map_or_else(|| PLACEHOLDER.to_string(), |segment| segment.to_string())
    };
    Some(QrPayload {
        permit_id: segments[0].to_string(),
        bearer: segments[1].to_string(),
        id_number: Some(optional(2)),
        gp_number: Some(optional(3)),
        item_purpose: Some(optional(4)),
        photo_url: None,
        status: Some(STATUS_APPROVED.to_string()),
        valid_until: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_payload_keeps_permit_id_and_bearer_verbatim() {
        let payload = parse_qr_payload(
            r#"{"permitId":"UC-000042","bearer":"Maria Santos","idNumber":"22031045",
                "gpNumber":"CMP-112233","itemPurpose":"Dell XPS 15 Laptop",
                "photoUrl":"/uploads/permits/uc000042_photo1.jpg","status":"approved",
                "validUntil":"2026-12-31"}"#,
        )
        .expect("payload");

        assert_eq!(payload.permit_id, "UC-000042");
        assert_eq!(payload.bearer, "Maria Santos");
        assert_eq!(payload.gp_number.as_deref(), Some("CMP-112233"));
        assert_eq!(
            payload.photo_url.as_deref(),
            Some("/uploads/permits/uc000042_photo1.jpg")
        );
        assert_eq!(payload.valid_until.as_deref(), Some("2026-12-31"));
    }

    #[test]
    fn json_payload_with_only_required_fields_leaves_rest_absent() {
        let payload = parse_qr_payload(r#"{"permitId":"UC-1","bearer":"Jane"}"#).expect("payload");
        assert_eq!(payload.permit_id, "UC-1");
        assert_eq!(payload.bearer, "Jane");
        assert_eq!(payload.id_number, None);
        assert_eq!(payload.status, None);
    }

    #[test]
    fn json_payload_preserves_surrounding_whitespace_in_values() {
        let payload =
            parse_qr_payload(r#"{"permitId":" UC-7 ","bearer":"Ana  Reyes"}"#).expect("payload");
        assert_eq!(payload.permit_id, " UC-7 ");
        assert_eq!(payload.bearer, "Ana  Reyes");
    }

    #[test]
    fn numeric_permit_id_is_rendered_as_text() {
        let payload = parse_qr_payload(r#"{"permitId":1042,"bearer":"Jane"}"#).expect("payload");
        assert_eq!(payload.permit_id, "1042");
    }

    #[test]
    fn json_without_required_fields_is_rejected() {
        assert!(parse_qr_payload(r#"{"permitId":"UC-1"}"#).is_none());
        assert!(parse_qr_payload(r#"{"bearer":"Jane"}"#).is_none());
        assert!(parse_qr_payload(r#"{"permitId":"","bearer":"Jane"}"#).is_none());
        assert!(parse_qr_payload(r#"{"permitId":null,"bearer":"Jane"}"#).is_none());
    }

    #[test]
    fn valid_non_object_json_is_not_retried_as_legacy() {
        assert!(parse_qr_payload(r#""UC-1|Jane""#).is_none());
        assert!(parse_qr_payload("42").is_none());
        assert!(parse_qr_payload("[\"UC-1\",\"Jane\"]").is_none());
    }

    #[test]
    fn legacy_payload_fills_missing_segments_with_placeholder() {
        let payload = parse_qr_payload("UC-000019|Carlos Mendoza").expect("payload");
        assert_eq!(payload.permit_id, "UC-000019");
        assert_eq!(payload.bearer, "Carlos Mendoza");
        assert_eq!(payload.id_number.as_deref(), Some(PLACEHOLDER));
        assert_eq!(payload.gp_number.as_deref(), Some(PLACEHOLDER));
        assert_eq!(payload.item_purpose.as_deref(), Some(PLACEHOLDER));
        assert_eq!(payload.photo_url, None);
        assert_eq!(payload.status.as_deref(), Some("approved"));
    }

    #[test]
    fn legacy_payload_reads_all_five_segments() {
        let payload =
            parse_qr_payload("UC-000087|John dela Cruz|22076840|OFP-998877|Epson Projector EB-X41")
                .expect("payload");
        assert_eq!(payload.id_number.as_deref(), Some("22076840"));
        assert_eq!(payload.gp_number.as_deref(), Some("OFP-998877"));
        assert_eq!(payload.item_purpose.as_deref(), Some("Epson Projector EB-X41"));
    }

    #[test]
    fn legacy_payload_treats_empty_optional_segment_as_missing() {
        let payload = parse_qr_payload("UC-5|Liza||CMP-778899").expect("payload");
        assert_eq!(payload.id_number.as_deref(), Some(PLACEHOLDER));
        assert_eq!(payload.gp_number.as_deref(), Some("CMP-778899"));
        assert_eq!(payload.item_purpose.as_deref(), Some(PLACEHOLDER));
    }

    #[test]
    fn text_without_json_or_delimiter_is_rejected() {
        assert!(parse_qr_payload("not json and no pipe").is_none());
        assert!(parse_qr_payload("").is_none());
        assert!(parse_qr_payload("{\"permitId\":").is_none());
    }
}
