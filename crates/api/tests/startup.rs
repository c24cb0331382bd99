use std::path::Path;
use std::sync::Arc;

use alert_history::{AlertStatus, EntityStore, InMemoryEntityStore};
use api::{build_state, create_router, load_entities, ServerConfig};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

const SCOPE: &str = "http://prometheus/graph?g0.expr=up";

fn write_entities(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("entities.json");
    let entities = json!({
        "10": { "alerts": [{
            "id": "a1",
            "status": "firing",
            "starts_at": "2020-01-01T00:00:00Z",
            "graph_url": SCOPE
        }] },
        "20": { "alerts": [{
            "id": "b1",
            "status": "firing",
            "starts_at": "2020-01-01 00:00:00 UTC",
            "graph_url": SCOPE
        }] }
    });
    std::fs::write(&path, entities.to_string()).unwrap();
    path
}

fn write_config(dir: &Path, entities: &Path) -> String {
    let path = dir.join("alert-receiver.toml");
    std::fs::write(
        &path,
        format!(
            r#"
entities_file = "{}"

[[receivers]]
token = "AbCToken"

[[receivers.topics]]
alertname = "NodeDown"
entity_id = 10

[[receivers.topics]]
alertname = "DiskFull"
entity_id = 20
"#,
            entities.display()
        ),
    )
    .unwrap();
    path.to_str().unwrap().to_string()
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_file_config_matches_mixed_case_alertname() {
    let dir = tempfile::tempdir().unwrap();
    let entities = write_entities(dir.path());
    let config = ServerConfig::load_from(&write_config(dir.path(), &entities)).unwrap();

    let state = Arc::new(build_state(&config).unwrap());
    let store = Arc::clone(state.service.store());
    let app = create_router(state);

    let data = json!([
        { "labels": { "id": "a1", "alertname": "NodeDown" }, "status": { "state": "active" } }
    ]);
    let response = app
        .clone()
        .oneshot(post(
            "/api/v1/receivers/AbCToken/batches",
            json!({ "data": data.to_string(), "graph_url": SCOPE }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let summary: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(summary["updated"], json!([20]));

    // Still firing: the alert was matched, not aged out
    let entity = store.load(10).unwrap().unwrap();
    assert_eq!(entity.alerts[0].status, AlertStatus::Firing);
    let entity = store.load(20).unwrap().unwrap();
    assert_eq!(entity.alerts[0].status, AlertStatus::Stale);

    let response = app
        .oneshot(post(
            "/api/v1/receivers/abctoken/batches",
            json!({ "data": "[]", "graph_url": SCOPE }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[test]
fn test_load_entities_from_minimal_seed() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_entities(dir.path());
    let store = InMemoryEntityStore::new();

    assert_eq!(load_entities(&path, &store).unwrap(), 2);

    let record = store.get(10).unwrap().unwrap();
    assert!(record.firing);
    assert_eq!(record.version, 1);
    assert_eq!(record.revisions, 0);
}

#[test]
fn test_load_entities_reports_bad_seed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("entities.json");
    std::fs::write(&path, r#"{"10": {"alerts": "nope"}}"#).unwrap();
    let store = InMemoryEntityStore::new();

    let err = load_entities(&path, &store).unwrap_err();
    assert!(err.to_string().contains("entities.json"));
    assert!(load_entities(&dir.path().join("missing.json"), &store).is_err());
}
