use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{Duration, TimeZone, Utc};
use tokio::sync::broadcast;
use tokio_stream::StreamExt;
use tower::ServiceExt;

use nokeys::db;
use nokeys::handlers;
use nokeys::models::{Notification, NotificationKind};
use nokeys::services::appointments::{AppointmentStore, APPOINTMENTS_KEY};
use nokeys::services::clock::ManualClock;
use nokeys::services::refresh;
use nokeys::services::storage::memory::MemoryStore;
use nokeys::services::storage::sqlite::SqliteStore;
use nokeys::state::AppState;

// ── Helpers ──

struct TestEnv {
    state: Arc<AppState>,
    clock: ManualClock,
    notifications: broadcast::Receiver<Notification>,
}

fn test_env_with(backend: MemoryStore) -> TestEnv {
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 6, 16, 8, 0, 0).unwrap());
    let (notifications_tx, notifications) = broadcast::channel(64);
    let (view_tx, _) = broadcast::channel(16);
    let store = AppointmentStore::open(
        Box::new(backend),
        Arc::new(clock.clone()),
        notifications_tx.clone(),
    );
    TestEnv {
        state: Arc::new(AppState::new(store, notifications_tx, view_tx)),
        clock,
        notifications,
    }
}

fn test_env() -> TestEnv {
    test_env_with(MemoryStore::new())
}

fn test_app(state: Arc<AppState>) -> Router {
    handlers::router(state)
}

fn draft_json(name: &str) -> String {
    serde_json::json!({
        "customerName": name,
        "phone": "+4512345678",
        "email": "",
        "service": "Lock change",
        "date": "2025-06-16",
        "time": "10:00",
        "address": "Vestergade 1",
        "notes": "Ring twice"
    })
    .to_string()
}

fn json_request(method: &str, uri: &str, body: String) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(res: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn create(state: &Arc<AppState>, name: &str) -> serde_json::Value {
    let res = test_app(state.clone())
        .oneshot(json_request("POST", "/api/appointments", draft_json(name)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    body_json(res).await
}

// ── Health ──

#[tokio::test]
async fn test_health() {
    let env = test_env();
    let res = test_app(env.state)
        .oneshot(empty_request("GET", "/health"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["status"], "ok");
}

// ── Appointment lifecycle ──

#[tokio::test]
async fn test_create_and_list() {
    let env = test_env();
    let created = create(&env.state, "Mette Hansen").await;
    assert_eq!(created["customerName"], "Mette Hansen");
    assert_eq!(created["completed"], false);
    assert_eq!(created["completedAt"], serde_json::Value::Null);
    assert_eq!(created["createdAt"], created["id"]);

    let res = test_app(env.state)
        .oneshot(empty_request("GET", "/api/appointments"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["id"], created["id"]);
    assert_eq!(json[0]["time"], "10:00");
}

#[tokio::test]
async fn test_create_missing_field_is_unprocessable() {
    let mut env = test_env();
    let body = serde_json::json!({
        "customerName": "Mette",
        "phone": "   ",
        "service": "Lock change",
        "date": "2025-06-16",
        "time": "10:00",
        "address": ""
    })
    .to_string();

    let res = test_app(env.state.clone())
        .oneshot(json_request("POST", "/api/appointments", body))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(res).await;
    assert_eq!(json["fields"], serde_json::json!(["phone", "address"]));

    assert!(refresh::lock_store(&env.state).list().is_empty());
    let n = env.notifications.try_recv().unwrap();
    assert_eq!(n.kind, NotificationKind::Warning);
}

#[tokio::test]
async fn test_update_keeps_completion() {
    let env = test_env();
    let created = create(&env.state, "Mette").await;
    let id = created["id"].as_i64().unwrap();

    let res = test_app(env.state.clone())
        .oneshot(empty_request("POST", &format!("/api/appointments/{id}/toggle")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let toggled = body_json(res).await;
    assert_eq!(toggled["completed"], true);

    env.clock.advance(Duration::minutes(5));
    let res = test_app(env.state.clone())
        .oneshot(json_request(
            "PUT",
            &format!("/api/appointments/{id}"),
            draft_json("Jens"),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated = body_json(res).await;
    assert_eq!(updated["customerName"], "Jens");
    assert_eq!(updated["completed"], true);
    assert_eq!(updated["completedAt"], toggled["completedAt"]);
    assert_eq!(updated["createdAt"], created["createdAt"]);
}

#[tokio::test]
async fn test_unknown_id_is_not_found() {
    let env = test_env();

    for (method, uri) in [
        ("GET", "/api/appointments/42"),
        ("DELETE", "/api/appointments/42"),
        ("POST", "/api/appointments/42/toggle"),
        ("GET", "/api/appointments/42/google-calendar"),
        ("GET", "/calendar/42.ics"),
    ] {
        let res = test_app(env.state.clone())
            .oneshot(empty_request(method, uri))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND, "{method} {uri}");
    }

    let res = test_app(env.state)
        .oneshot(json_request("PUT", "/api/appointments/42", draft_json("X")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete() {
    let env = test_env();
    let created = create(&env.state, "Mette").await;
    let id = created["id"].as_i64().unwrap();

    let res = test_app(env.state.clone())
        .oneshot(empty_request("DELETE", &format!("/api/appointments/{id}")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert!(refresh::lock_store(&env.state).list().is_empty());
}

#[tokio::test]
async fn test_completed_appointment_expires_after_tick() {
    let env = test_env();
    let created = create(&env.state, "B").await;
    let id = created["id"].as_i64().unwrap();

    test_app(env.state.clone())
        .oneshot(empty_request("POST", &format!("/api/appointments/{id}/toggle")))
        .await
        .unwrap();

    env.clock.advance(Duration::hours(5) + Duration::seconds(1));
    assert_eq!(refresh::tick(&env.state), 1);

    let res = test_app(env.state)
        .oneshot(empty_request("GET", "/api/appointments"))
        .await
        .unwrap();
    let json = body_json(res).await;
    assert!(json.as_array().unwrap().is_empty());
}

// ── View ──

#[tokio::test]
async fn test_view_projection() {
    let env = test_env();
    let first = create(&env.state, "First").await;
    env.clock.advance(Duration::seconds(1));
    create(&env.state, "Second").await;

    let id = first["id"].as_i64().unwrap();
    test_app(env.state.clone())
        .oneshot(empty_request("POST", &format!("/api/appointments/{id}/toggle")))
        .await
        .unwrap();

    let res = test_app(env.state)
        .oneshot(empty_request("GET", "/api/view"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["upcoming"].as_array().unwrap().len(), 1);
    assert_eq!(json["upcoming"][0]["customerName"], "Second");
    assert_eq!(json["completed"].as_array().unwrap().len(), 1);
    assert_eq!(json["completed"][0]["customerName"], "First");
    assert_eq!(json["completed"][0]["deletesIn"]["hours"], 5);
    assert_eq!(json["completed"][0]["deletesIn"]["minutes"], 0);
    assert_eq!(json["stats"]["upcomingCount"], 1);
    assert!(json["greeting"].is_string());
}

#[tokio::test]
async fn test_mutation_publishes_view() {
    let env = test_env();
    let mut views = env.state.view_tx.subscribe();

    create(&env.state, "Mette").await;
    let view = views.try_recv().unwrap();
    assert_eq!(view.stats.upcoming_count, 1);
}

// ── Profile ──

#[tokio::test]
async fn test_profile() {
    let env = test_env();

    let res = test_app(env.state.clone())
        .oneshot(empty_request("GET", "/api/profile"))
        .await
        .unwrap();
    let json = body_json(res).await;
    assert_eq!(json["displayName"], serde_json::Value::Null);

    let res = test_app(env.state.clone())
        .oneshot(json_request(
            "POST",
            "/api/profile",
            r#"{"displayName":" Lars "}"#.to_string(),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = test_app(env.state)
        .oneshot(empty_request("GET", "/api/view"))
        .await
        .unwrap();
    let json = body_json(res).await;
    assert_eq!(json["displayName"], "Lars");
}

// ── Calendar ──

#[tokio::test]
async fn test_download_ics() {
    let env = test_env();
    let created = create(&env.state, "Mette").await;
    let id = created["id"].as_i64().unwrap();

    let res = test_app(env.state)
        .oneshot(empty_request("GET", &format!("/calendar/{id}.ics")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers()["content-type"],
        "text/calendar; charset=utf-8"
    );
    let body = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let ics = String::from_utf8(body.to_vec()).unwrap();
    assert!(ics.contains("DTSTART:20250616T100000"));
    assert!(ics.contains("SUMMARY:NoKeys - Mette - Lock change"));
}

#[tokio::test]
async fn test_google_calendar_link() {
    let env = test_env();
    let created = create(&env.state, "Mette").await;
    let id = created["id"].as_i64().unwrap();

    let res = test_app(env.state)
        .oneshot(empty_request(
            "GET",
            &format!("/api/appointments/{id}/google-calendar"),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    let url = json["url"].as_str().unwrap();
    assert!(url.starts_with("https://calendar.google.com/calendar/render?action=TEMPLATE"));
    assert!(url.contains("Mette"));
}

// ── Persistence ──

#[tokio::test]
async fn test_corrupt_storage_starts_empty() {
    let mut env = test_env_with(MemoryStore::with_entry(APPOINTMENTS_KEY, "[{\"id\":"));

    let n = env.notifications.try_recv().unwrap();
    assert_eq!(n.kind, NotificationKind::Error);

    let res = test_app(env.state.clone())
        .oneshot(empty_request("GET", "/api/appointments"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(body_json(res).await.as_array().unwrap().is_empty());

    create(&env.state, "After corruption").await;
}

#[tokio::test]
async fn test_view_reports_failed_startup_load() {
    let env = test_env_with(MemoryStore::with_entry(APPOINTMENTS_KEY, "{not json"));

    let res = test_app(env.state.clone())
        .oneshot(empty_request("GET", "/api/view"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["loadNotification"]["kind"], "error");
    assert_eq!(
        json["loadNotification"]["message"],
        "Failed to load saved appointments"
    );
    assert!(json["upcoming"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_view_without_load_failure_has_no_load_notification() {
    let env = test_env();
    let res = test_app(env.state.clone())
        .oneshot(empty_request("GET", "/api/view"))
        .await
        .unwrap();
    assert!(body_json(res).await["loadNotification"].is_null());
}

#[tokio::test]
async fn test_events_replay_failed_startup_load() {
    let backend = MemoryStore::new();
    backend.set_fail_reads(true);
    let env = test_env_with(backend);

    let res = test_app(env.state.clone())
        .oneshot(empty_request("GET", "/api/events"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let mut body = res.into_body().into_data_stream();
    let mut received = String::new();
    while !received.contains("event: notification") {
        let chunk = tokio::time::timeout(std::time::Duration::from_secs(1), body.next())
            .await
            .expect("initial events should arrive without waiting")
            .expect("stream ended early")
            .unwrap();
        received.push_str(std::str::from_utf8(&chunk).unwrap());
    }
    assert!(received.contains("event: view"));
    assert!(received.contains("Failed to load saved appointments"));
    assert!(received.contains("\"kind\":\"warning\""));
}

#[test]
fn test_sqlite_backend_survives_reopen() {
    let dir = std::env::temp_dir().join(format!("nokeys-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("appointments.db");
    let _ = std::fs::remove_file(&path);
    let path = path.to_str().unwrap().to_string();

    let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 6, 16, 8, 0, 0).unwrap());
    let open = |clock: &ManualClock| {
        let (tx, _) = broadcast::channel(8);
        AppointmentStore::open(
            Box::new(SqliteStore::new(db::init_db(&path).unwrap())),
            Arc::new(clock.clone()),
            tx,
        )
    };

    let id = {
        let mut store = open(&clock);
        let draft: nokeys::models::AppointmentDraft =
            serde_json::from_str(&draft_json("Persisted")).unwrap();
        store.create(&draft).unwrap().id
    };

    let store = open(&clock);
    assert_eq!(store.list().len(), 1);
    assert_eq!(store.list()[0].id, id);
    assert_eq!(store.list()[0].notes, "Ring twice");

    drop(store);
    let _ = std::fs::remove_dir_all(&dir);
}
