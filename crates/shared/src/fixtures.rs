//! Sample permits used by the simulated scanner and the stand-in gate server.

use crate::{domain::STATUS_APPROVED, protocol::QrPayload};

fn permit(
    permit_id: &str,
    bearer: &str,
    id_number: &str,
    gp_number: &str,
    item_purpose: &str,
    photo_url: Option<&str>,
) -> QrPayload {
    QrPayload {
        permit_id: permit_id.to_string(),
        bearer: bearer.to_string(),
        id_number: Some(id_number.to_string()),
        gp_number: Some(gp_number.to_string()),
        item_purpose: Some(item_purpose.to_string()),
        photo_url: photo_url.map(str::to_string),
        status: Some(STATUS_APPROVED.to_string()),
        valid_until: None,
    }
}

pub fn demo_permits() -> Vec<QrPayload> {
    vec![
        permit(
            "UC-000042",
            "Maria Santos",
            "22031045",
            "CMP-112233",
            "Dell XPS 15 Laptop",
            Some("https://via.placeholder.com/300x300/1c2128/388bfd?text=Laptop"),
        ),
        permit(
            "UC-000087",
            "John dela Cruz",
            "22076840",
            "OFP-998877",
            "Epson Projector EB-X41",
            Some("https://via.placeholder.com/300x300/1c2128/00c853?text=Projector"),
        ),
        permit(
            "UC-000103",
            "Ana Reyes",
            "21054321",
            "CMP-445566",
            "MacBook Pro 14\"",
            Some("https://via.placeholder.com/300x300/1c2128/ff6b35?text=MacBook"),
        ),
        permit(
            "UC-000019",
            "Carlos Mendoza",
            "20091234",
            "OFP-334455",
            "HDMI Cables (x3)",
            None,
        ),
        permit(
            "UC-000155",
            "Liza Fernandez",
            "23000987",
            "CMP-778899",
            "HP EliteBook 840",
            Some("https://via.placeholder.com/300x300/1c2128/f0f6fc?text=EliteBook"),
        ),
    ]
}
