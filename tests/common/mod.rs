//! Shared test utilities and fixtures
//!
//! A mock ticket API with one account's field definitions and tickets.

#![allow(dead_code)]

use std::io::Write;
use std::path::PathBuf;

use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const IMPACT_FIELD: u64 = 360_001;
pub const SECURITY_FIELD: u64 = 360_002;
pub const OVERRIDE_FIELD: u64 = 360_003;
pub const SCORE_FIELD: u64 = 360_004;

/// Field definitions as the remote API lists them, split over two pages.
pub async fn mount_ticket_fields(server: &MockServer) {
    let first = json!({
        "ticket_fields": [
            {"id": 1, "type": "subject", "title": "Subject"},
            {"id": IMPACT_FIELD, "type": "tagger", "title": "Business Impact", "custom_field_options": [
                {"name": "High", "value": "cps_impact_high"},
                {"name": "Medium", "value": "cps_impact_medium"},
                {"name": "Low", "value": "cps_impact_low"}
            ]},
            {"id": SECURITY_FIELD, "type": "checkbox", "title": "Security", "tag": "cps_security_flag"}
        ],
        "next_page": format!("{}/api/v2/ticket_fields.json?page=2&per_page=100", server.uri())
    });
    let second = json!({
        "ticket_fields": [
            {"id": OVERRIDE_FIELD, "type": "tagger", "title": "Manager Override", "custom_field_options": [
                {"name": "+1", "value": "cps_override_1"},
                {"name": "+5", "value": "cps_override_5"}
            ]},
            {"id": SCORE_FIELD, "type": "integer", "title": "CPS"}
        ],
        "next_page": null
    });

    Mock::given(method("GET"))
        .and(path("/api/v2/ticket_fields.json"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(second))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/ticket_fields.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(first))
        .mount(server)
        .await;
}

pub fn ticket_json(id: u64, priority: &str, created_at: &str, fields: &[(u64, Value)]) -> Value {
    let custom_fields: Vec<Value> = fields
        .iter()
        .map(|(field, value)| json!({"id": field, "value": value}))
        .collect();
    json!({
        "ticket": {
            "id": id,
            "priority": priority,
            "created_at": created_at,
            "custom_fields": custom_fields
        }
    })
}

pub async fn mount_ticket(server: &MockServer, id: u64, body: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/api/v2/tickets/{id}.json")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Write a config pointing at `server` with fast write timings.
pub fn write_config(server: &MockServer, extra: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("config.toml");
    let mut file = std::fs::File::create(&path).expect("create config");
    write!(
        file,
        r#"
[remote]
base_url = "{}"
email = "agent@example.com"
api_token = "test-token"

[write]
pre_wait_ms = 0
debounce_ms = 30
base_ms = 1
jitter = false
{extra}
"#,
        server.uri()
    )
    .expect("write config");
    (dir, path)
}
