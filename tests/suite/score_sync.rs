//! Score sync against a mock ticket API, configured from a config file.

use safewrite_engine::{FieldOverrides, RefreshOutcome, SafewriteConfig, ScoreSync, SyncError};
use serde_json::json;
use wiremock::matchers::{body_json, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{
    IMPACT_FIELD, OVERRIDE_FIELD, SCORE_FIELD, SECURITY_FIELD, mount_ticket, mount_ticket_fields,
    ticket_json, write_config,
};

async fn connect(server: &MockServer, extra: &str) -> ScoreSync {
    let (_dir, config_path) = write_config(server, extra);
    let config = SafewriteConfig::load_from(&config_path).unwrap();
    ScoreSync::connect(&config).await.unwrap()
}

#[tokio::test]
async fn connect_discovers_mapping_across_pages() {
    let server = MockServer::start().await;
    mount_ticket_fields(&server).await;

    let sync = connect(&server, "").await;
    let mapping = sync.mapping();
    assert_eq!(mapping.impact, Some(IMPACT_FIELD));
    assert_eq!(mapping.security, Some(SECURITY_FIELD));
    assert_eq!(mapping.manager_override, Some(OVERRIDE_FIELD));
    assert_eq!(mapping.score, Some(SCORE_FIELD));
    assert_eq!(mapping.impact_options.len(), 3);
}

#[tokio::test]
async fn recalc_uses_configured_priority_points() {
    let server = MockServer::start().await;
    mount_ticket_fields(&server).await;
    mount_ticket(
        &server,
        77,
        ticket_json(
            77,
            "normal",
            "2021-06-01T00:00:00Z",
            &[
                (IMPACT_FIELD, json!("cps_impact_medium")),
                (SECURITY_FIELD, json!(false)),
                (OVERRIDE_FIELD, json!(null)),
                (SCORE_FIELD, json!(null)),
            ],
        ),
    )
    .await;
    // medium 8 + normal (configured) 5 + over a week 6
    Mock::given(method("PUT"))
        .and(path("/api/v2/tickets/77.json"))
        .and(header_exists("authorization"))
        .and(body_json(json!({"ticket": {"custom_fields": [{"id": SCORE_FIELD, "value": 19}]}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ticket": {"id": 77}})))
        .expect(1)
        .mount(&server)
        .await;

    let sync = connect(&server, "\n[scoring]\npriority_points_normal = 5\n").await;
    let outcome = sync.refresh(77, FieldOverrides::default()).await.unwrap();

    assert!(matches!(
        outcome,
        RefreshOutcome::Written { previous: None, .. }
    ));
    let breakdown = outcome.breakdown();
    assert_eq!(breakdown.impact, 8);
    assert_eq!(breakdown.priority, 5);
    assert_eq!(breakdown.time_open, 6);
    assert_eq!(breakdown.total, 19);
}

#[tokio::test]
async fn recalc_many_reports_each_ticket() {
    let server = MockServer::start().await;
    mount_ticket_fields(&server).await;
    for (id, stored) in [(1, json!(24)), (2, json!(0))] {
        mount_ticket(
            &server,
            id,
            ticket_json(
                id,
                "high",
                "2019-01-01T00:00:00Z",
                &[
                    (IMPACT_FIELD, json!("cps_impact_low")),
                    (SECURITY_FIELD, json!(true)),
                    (OVERRIDE_FIELD, json!("cps_override_2")),
                    (SCORE_FIELD, stored),
                ],
            ),
        )
        .await;
    }
    Mock::given(method("GET"))
        .and(path("/api/v2/tickets/3.json"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "RecordNotFound"})))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/v2/tickets/2.json"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let sync = connect(&server, "").await;
    let results = sync.refresh_many(&[1, 2, 3]).await;

    // low 4 + high 8 + week 6 + security 4 + override 2
    assert!(matches!(
        &results[0],
        (1, Ok(RefreshOutcome::Unchanged { breakdown })) if breakdown.total == 24
    ));
    assert!(matches!(
        &results[1],
        (2, Ok(RefreshOutcome::Written { previous: Some(0), breakdown })) if breakdown.total == 24
    ));
    let (3, Err(SyncError::Remote(err))) = &results[2] else {
        panic!("expected a remote error for ticket 3, got {:?}", results[2]);
    };
    assert_eq!(err.api().map(|api| api.status), Some(404));
}

#[tokio::test]
async fn connect_without_remote_section_fails() {
    let config = SafewriteConfig::default();
    let err = ScoreSync::connect(&config).await.unwrap_err();
    assert!(matches!(err, SyncError::Unconfigured(_)));
}

#[tokio::test]
async fn missing_score_field_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/ticket_fields.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ticket_fields": [{"id": 5, "type": "text", "title": "Impact"}]
        })))
        .mount(&server)
        .await;

    let sync = connect(&server, "").await;
    let err = sync.refresh(1, FieldOverrides::default()).await.unwrap_err();
    assert!(matches!(err, SyncError::MissingField("score")));
}
