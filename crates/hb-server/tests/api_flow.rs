//! End-to-end tests for the HTTP surface: auth, heartbeat accrual,
//! settings and holiday round trips, and the HTML pages.

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode, header};
use chrono::Local;
use serde_json::{Value, json};
use tower::ServiceExt;

use hb_db::Database;
use hb_server::{AppState, ServerConfig};

const TOKEN: &str = "test-token";

fn test_state() -> Arc<AppState> {
    let config = ServerConfig {
        port: 0,
        bearer_token: TOKEN.to_string(),
        database_path: PathBuf::from(":memory:"),
        device_id: "dev-1".to_string(),
    };
    let db = Database::open_in_memory().expect("in-memory database");
    AppState::new(db, config)
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

fn bare_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

#[tokio::test]
async fn health_is_unauthenticated() {
    let app = hb_server::router(test_state());
    let response = send(&app, bare_request("GET", "/health", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn api_rejects_missing_or_wrong_token() {
    let state = test_state();
    let app = hb_server::router(state.clone());

    let payload = json!({ "device_id": "dev-1" });
    let missing = send(&app, json_request("POST", "/api/heartbeat", None, &payload)).await;
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let wrong = send(
        &app,
        json_request("POST", "/api/heartbeat", Some("nope"), &payload),
    )
    .await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    // Rejected requests must not have mutated any state.
    let today = Local::now().date_naive();
    let entry = state.db().unwrap().ledger_entry("dev-1", today).unwrap();
    assert!(entry.is_none());
}

#[tokio::test]
async fn heartbeats_accrue_minutes() {
    let state = test_state();
    let app = hb_server::router(state.clone());
    let payload = json!({ "device_id": "dev-1", "timezone": "UTC" });

    for _ in 0..3 {
        let response = send(
            &app,
            json_request("POST", "/api/heartbeat", Some(TOKEN), &payload),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "success");
    }

    let today = Local::now().date_naive();
    let entry = state
        .db()
        .unwrap()
        .ledger_entry("dev-1", today)
        .unwrap()
        .expect("row created by first heartbeat");
    assert_eq!(entry.time_recorded, 3);
}

#[tokio::test]
async fn heartbeat_with_empty_device_is_rejected() {
    let app = hb_server::router(test_state());
    let response = send(
        &app,
        json_request(
            "POST",
            "/api/heartbeat",
            Some(TOKEN),
            &json!({ "device_id": "" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn settings_get_is_404_before_configuration() {
    let app = hb_server::router(test_state());
    let response = send(&app, bare_request("GET", "/api/settings", Some(TOKEN))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn settings_round_trip() {
    let app = hb_server::router(test_state());

    let update = json!({
        "start_date": "2024-06-01",
        "end_date": "2024-06-30",
        "working_days": [0, 1, 2, 3, 4],
        "daily_working_hours": 7.5,
    });
    let response = send(
        &app,
        json_request("POST", "/api/settings", Some(TOKEN), &update),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["daily_required_minutes"], 450);

    let response = send(&app, bare_request("GET", "/api/settings", Some(TOKEN))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["start_date"], "2024-06-01");
    assert_eq!(body["end_date"], "2024-06-30");
    assert_eq!(body["working_days"], json!([0, 1, 2, 3, 4]));
    assert_eq!(body["daily_required_minutes"], 450);
    assert_eq!(body["daily_working_hours"], 7.5);
}

#[tokio::test]
async fn settings_reject_bad_working_days() {
    let app = hb_server::router(test_state());
    let update = json!({ "working_days": [0, 9] });
    let response = send(
        &app,
        json_request("POST", "/api/settings", Some(TOKEN), &update),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn holiday_round_trip() {
    let app = hb_server::router(test_state());

    let add = json!({ "date": "2024-06-05", "description": "Founders Day" });
    let response = send(
        &app,
        json_request("POST", "/api/holidays", Some(TOKEN), &add),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, bare_request("GET", "/api/holidays", Some(TOKEN))).await;
    let body = body_json(response).await;
    assert_eq!(body[0]["date"], "2024-06-05");
    assert_eq!(body[0]["category"], "holiday");
    assert_eq!(body[0]["description"], "Founders Day");

    let response = send(
        &app,
        bare_request("DELETE", "/api/holidays/2024-06-05", Some(TOKEN)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // The override is gone.
    let response = send(&app, bare_request("GET", "/api/holidays", Some(TOKEN))).await;
    let body = body_json(response).await;
    assert_eq!(body, json!([]));

    // Deleting again misses.
    let response = send(
        &app,
        bare_request("DELETE", "/api/holidays/2024-06-05", Some(TOKEN)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn holiday_delete_rejects_malformed_dates() {
    let app = hb_server::router(test_state());
    let response = send(
        &app,
        bare_request("DELETE", "/api/holidays/05-06-2024", Some(TOKEN)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn correction_round_trip() {
    let app = hb_server::router(test_state());

    let set = json!({
        "date": "2024-06-03",
        "corrected_minutes": 480,
        "reason": "agent offline",
    });
    let response = send(
        &app,
        json_request("POST", "/api/corrections", Some(TOKEN), &set),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, bare_request("GET", "/api/corrections", Some(TOKEN))).await;
    let body = body_json(response).await;
    assert_eq!(body[0]["date"], "2024-06-03");
    assert_eq!(body[0]["corrected_minutes"], 480);
    assert_eq!(body[0]["reason"], "agent offline");

    let response = send(
        &app,
        bare_request("DELETE", "/api/corrections/2024-06-03", Some(TOKEN)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        &app,
        bare_request("DELETE", "/api/corrections/2024-06-03", Some(TOKEN)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn root_redirects_to_dashboard() {
    let app = hb_server::router(test_state());
    let response = send(&app, bare_request("GET", "/", None)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/dashboard");
}

#[tokio::test]
async fn dashboard_reflects_recorded_heartbeats() {
    let state = test_state();
    let app = hb_server::router(state.clone());

    let payload = json!({ "device_id": "dev-1" });
    send(
        &app,
        json_request("POST", "/api/heartbeat", Some(TOKEN), &payload),
    )
    .await;

    let response = send(&app, bare_request("GET", "/dashboard", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("<h1>Attendance</h1>"));
    // One recorded minute against today's quota shows up in a day cell.
    assert!(html.contains("00:01 /"));
}

#[tokio::test]
async fn settings_form_applies_and_redirects() {
    let app = hb_server::router(test_state());

    let form = "start_date=2024-06-01&end_date=2024-06-30&daily_working_hours=8\
                &monday=on&tuesday=on&wednesday=on&thursday=on&friday=on";
    let request = Request::builder()
        .method("POST")
        .uri("/settings")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form))
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/settings");

    let response = send(&app, bare_request("GET", "/api/settings", Some(TOKEN))).await;
    let body = body_json(response).await;
    assert_eq!(body["start_date"], "2024-06-01");
    assert_eq!(body["daily_required_minutes"], 480);
}

#[tokio::test]
async fn holiday_form_requires_a_description_for_holidays() {
    let state = test_state();
    let app = hb_server::router(state.clone());

    let form = "kind=holiday&start_date=2024-06-05&end_date=2024-06-05&description=";
    let request = Request::builder()
        .method("POST")
        .uri("/holidays")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form))
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    // Nothing was stored.
    let response = send(&app, bare_request("GET", "/api/holidays", Some(TOKEN))).await;
    assert_eq!(body_json(response).await, json!([]));
}

#[tokio::test]
async fn holiday_form_round_trip() {
    let app = hb_server::router(test_state());

    let form = "kind=full_leave&start_date=2024-06-06&end_date=2024-06-06&description=";
    let request = Request::builder()
        .method("POST")
        .uri("/holidays")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form))
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = send(&app, bare_request("GET", "/api/holidays", Some(TOKEN))).await;
    let body = body_json(response).await;
    assert_eq!(body[0]["category"], "full_leave");
    assert_eq!(body[0]["description"], "Leave (full day)");

    // The form delete route reverts it.
    let request = Request::builder()
        .method("POST")
        .uri("/holidays/2024-06-06/delete")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = send(&app, bare_request("GET", "/api/holidays", Some(TOKEN))).await;
    assert_eq!(body_json(response).await, json!([]));
}
