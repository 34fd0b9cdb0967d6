use super::*;
use axum::{body, body::Body, http::Request};
use chrono::{TimeZone, Utc};
use shared::{
    domain::{Gate, GuardId, ScanLogId},
    protocol::QrPayload,
};
use tower::ServiceExt;

fn test_app() -> Router {
    let mut permits: Vec<QrPayload> = shared::fixtures::demo_permits();
    permits.push(QrPayload {
        permit_id: "UC-REVOKED".to_string(),
        bearer: "Revoked Holder".to_string(),
        id_number: None,
        gp_number: None,
        item_purpose: None,
        photo_url: None,
        status: Some("revoked".to_string()),
        valid_until: None,
    });
    permits.push(QrPayload {
        permit_id: "UC-OLD".to_string(),
        bearer: "Lapsed Holder".to_string(),
        id_number: None,
        gp_number: None,
        item_purpose: None,
        photo_url: None,
        status: Some("approved".to_string()),
        valid_until: Some("2020-01-31".to_string()),
    });
    build_router(Arc::new(AppState::new(PermitRegistry::new(permits), 3)))
}

fn validate_request(permit_id: &str, gate: Gate) -> Request<Body> {
    let req = ValidateScanRequest {
        permit_id: permit_id.to_string(),
        gate,
        scanned_at: Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap(),
        guard_id: Some(GuardId(7)),
    };
    Request::post("/api/qr/validate")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&req).expect("json")))
        .expect("request")
}

async fn read_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

#[tokio::test]
async fn healthz_reports_ok() {
    let request = Request::get("/healthz")
        .body(Body::empty())
        .expect("request");
    let response = test_app().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    assert_eq!(body.as_ref(), b"ok");
}

#[tokio::test]
async fn known_permit_is_accepted_and_appears_in_live_feed() {
    let app = test_app();

    let response = app
        .clone()
        .oneshot(validate_request("UC-000042", Gate::Exit))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let dto: ValidateScanResponse = read_json(response).await;
    assert!(dto.success);
    let permit = dto.permit.expect("permit");
    assert_eq!(permit.bearer.as_deref(), Some("Maria Santos"));
    assert_eq!(permit.status.as_deref(), Some("approved"));
    let scan_log: ScanLog =
        serde_json::from_value(dto.scan_log.expect("scan log")).expect("scan log shape");
    assert_eq!(scan_log.id, ScanLogId(1));
    assert_eq!(scan_log.gate, Gate::Exit);
    assert_eq!(scan_log.guard_id, Some(GuardId(7)));

    let feed_request = Request::get("/api/dashboard/live-feed")
        .body(Body::empty())
        .expect("request");
    let feed_response = app.oneshot(feed_request).await.expect("response");
    assert_eq!(feed_response.status(), StatusCode::OK);
    let feed: Vec<ScanLog> = read_json(feed_response).await;
    assert_eq!(feed, vec![scan_log]);
}

#[tokio::test]
async fn unknown_permit_is_rejected_with_not_found() {
    let response = test_app()
        .oneshot(validate_request("UC-404", Gate::Entry))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let dto: ValidateScanResponse = read_json(response).await;
    assert!(!dto.success);
    assert!(dto.permit.is_none());
    assert!(dto.scan_log.is_none());
    assert_eq!(dto.message.as_deref(), Some("Permit not found"));
}

#[tokio::test]
async fn revoked_and_expired_permits_are_unprocessable() {
    let app = test_app();

    let revoked = app
        .clone()
        .oneshot(validate_request("UC-REVOKED", Gate::Entry))
        .await
        .expect("response");
    assert_eq!(revoked.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let dto: ValidateScanResponse = read_json(revoked).await;
    assert_eq!(dto.message.as_deref(), Some("Permit is revoked"));

    let expired = app
        .oneshot(validate_request("UC-OLD", Gate::Entry))
        .await
        .expect("response");
    assert_eq!(expired.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let dto: ValidateScanResponse = read_json(expired).await;
    assert_eq!(
        dto.message.as_deref(),
        Some("Permit expired on 2020-01-31")
    );
}

#[tokio::test]
async fn pushed_scans_are_listed_newest_first_within_capacity() {
    let app = test_app();
    for id in 1..=4 {
        let scan_log = ScanLog {
            id: ScanLogId(100 + id),
            permit_id: format!("UC-{id}"),
            gate: Gate::Entry,
            scanned_at: Utc.with_ymd_and_hms(2026, 3, 14, 10, 0, id as u32).unwrap(),
            guard_id: None,
        };
        let request = Request::post("/api/dashboard/live-feed/push")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&scan_log).expect("json")))
            .expect("request");
        let response = app.clone().oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let ack: LiveFeedPushResponse = read_json(response).await;
        assert!(ack.success);
    }

    let request = Request::get("/api/dashboard/live-feed?limit=2")
        .body(Body::empty())
        .expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    let feed: Vec<ScanLog> = read_json(response).await;
    let ids: Vec<_> = feed.iter().map(|log| log.id).collect();
    assert_eq!(ids, vec![ScanLogId(104), ScanLogId(103)]);

    let request = Request::get("/api/dashboard/live-feed")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    let feed: Vec<ScanLog> = read_json(response).await;
    assert_eq!(feed.len(), 3);
}

#[tokio::test]
async fn live_feed_rejects_out_of_range_limit() {
    let app = test_app();
    for uri in ["/api/dashboard/live-feed?limit=0", "/api/dashboard/live-feed?limit=4"] {
        let request = Request::get(uri).body(Body::empty()).expect("request");
        let response = app.clone().oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ApiError = read_json(response).await;
        assert_eq!(error.code, ErrorCode::Validation);
        assert_eq!(error.message, "limit must be between 1 and 3");
    }
}

#[test]
fn every_error_code_maps_to_a_client_error_status() {
    assert_eq!(status_for(ErrorCode::NotFound), StatusCode::NOT_FOUND);
    assert_eq!(status_for(ErrorCode::Validation), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(status_for(ErrorCode::Expired), StatusCode::UNPROCESSABLE_ENTITY);
}
