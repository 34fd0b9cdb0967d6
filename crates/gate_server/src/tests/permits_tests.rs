use super::*;
use chrono::TimeZone;

fn scanned_on(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 23, 59, 0).unwrap()
}

fn permit(permit_id: &str, status: Option<&str>, valid_until: Option<&str>) -> QrPayload {
    QrPayload {
        permit_id: permit_id.to_string(),
        bearer: "Test Holder".to_string(),
        id_number: Some("11111111".to_string()),
        gp_number: None,
        item_purpose: None,
        photo_url: None,
        status: status.map(str::to_string),
        valid_until: valid_until.map(str::to_string),
    }
}

#[test]
fn demo_registry_accepts_every_sample_permit() {
    let registry = PermitRegistry::with_demo_permits();
    assert_eq!(registry.len(), 5);
    for sample in demo_permits() {
        let validated = registry
            .check(&sample.permit_id, scanned_on(2026, 1, 1))
            .expect("accepted");
        assert_eq!(validated.bearer.as_deref(), Some(sample.bearer.as_str()));
        assert_eq!(validated.id_number, sample.id_number);
    }
}

#[test]
fn permit_ids_are_matched_after_trimming() {
    let registry = PermitRegistry::new([permit("UC-1", None, None)]);
    let validated = registry
        .check("  UC-1 ", scanned_on(2026, 1, 1))
        .expect("accepted");
    assert_eq!(validated.permit_id.as_deref(), Some("UC-1"));
    assert_eq!(validated.status.as_deref(), Some("approved"));
}

#[test]
fn valid_until_is_inclusive_of_the_last_day() {
    let registry = PermitRegistry::new([permit("UC-1", Some("approved"), Some("2026-03-14"))]);
    assert!(registry.check("UC-1", scanned_on(2026, 3, 14)).is_ok());

    let err = registry
        .check("UC-1", scanned_on(2026, 3, 15))
        .expect_err("expired");
    assert_eq!(err.code, ErrorCode::Expired);
}

#[test]
fn unreadable_valid_until_is_not_enforced() {
    let registry = PermitRegistry::new([permit("UC-1", None, Some("next tuesday"))]);
    assert!(registry.check("UC-1", scanned_on(2030, 1, 1)).is_ok());
}

#[test]
fn non_approved_status_is_a_validation_error() {
    let registry = PermitRegistry::new([permit("UC-1", Some("Pending"), None)]);
    let err = registry
        .check("UC-1", scanned_on(2026, 1, 1))
        .expect_err("pending");
    assert_eq!(err.code, ErrorCode::Validation);
    assert_eq!(err.message, "Permit is Pending");
}

#[test]
fn load_reads_permit_tables_from_toml() {
    let path = std::env::temp_dir().join(format!(
        "gate_server_permits_{}.toml",
        std::process::id()
    ));
    fs::write(
        &path,
        r#"
[[permits]]
permitId = "UC-900"
bearer = "Toml Holder"
gpNumber = "GP-900"
validUntil = "2099-12-31"

[[permits]]
permitId = "UC-901"
bearer = "Second Holder"
status = "revoked"
"#,
    )
    .expect("write permits file");

    let registry = PermitRegistry::load(&path).expect("load");
    let _ = fs::remove_file(&path);

    assert_eq!(registry.len(), 2);
    let validated = registry
        .check("UC-900", scanned_on(2026, 1, 1))
        .expect("accepted");
    assert_eq!(validated.gp_number.as_deref(), Some("GP-900"));
    assert!(registry.check("UC-901", scanned_on(2026, 1, 1)).is_err());
}

#[test]
fn load_reports_missing_file() {
    let missing = std::env::temp_dir().join("gate_server_permits_missing_file.toml");
    let err = PermitRegistry::load(&missing).expect_err("missing");
    assert!(err.to_string().contains("failed to read permits file"));
}
