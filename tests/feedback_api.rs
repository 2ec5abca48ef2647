//! End-to-end CRUD tests against a live MongoDB.
//!
//! These tests exercise the full stack - gatekeeper, handlers, store - over
//! real HTTP and require a running MongoDB reachable via the `MONGODB_URL`
//! environment variable. They are `#[ignore]`d so the default test run
//! stays hermetic; run them with:
//!
//! ```sh
//! MONGODB_URL=mongodb://localhost:27017/parknet-test cargo test -- --ignored
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use parknet_feedback::config::{AppConfig, Environment};
use parknet_feedback::gatekeeper::{PerIpRateLimiter, RateLimiterConfig};
use parknet_feedback::routes::router;
use parknet_feedback::state::AppState;
use parknet_feedback::store::FeedbackStore;
use serde_json::{json, Value};

/// Start the service on an ephemeral port and return its base URL.
async fn spawn_app() -> String {
    let config = AppConfig {
        mongodb_url: std::env::var("MONGODB_URL")
            .expect("MONGODB_URL must point at a running MongoDB for ignored tests"),
        allowed_origins: vec!["http://localhost:3000".to_string()],
        trusted_origin_suffix: Some(".vercel.app".to_string()),
        rate_limit_window: Duration::from_secs(900),
        // Generous budget so the suite itself is never throttled
        rate_limit_max: 10_000,
        environment: Environment::Development,
    };

    let store = FeedbackStore::open(&config).await.expect("store opens");
    let state = AppState::new(
        store,
        Arc::new(config),
        Arc::new(PerIpRateLimiter::new(RateLimiterConfig {
            max_requests: 10_000,
            window: Duration::from_secs(900),
            stale_after: Duration::from_secs(900),
        })),
    );
    let app = router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("ephemeral port binds");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    format!("http://{addr}")
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}

async fn create_feedback(base: &str, name: &str, email: &str, message: &str) -> Value {
    let response = client()
        .post(format!("{base}/api/feedbacks"))
        .json(&json!({ "name": name, "email": email, "message": message }))
        .send()
        .await
        .expect("create request sends");
    assert_eq!(response.status(), 201);
    response.json().await.expect("create response is JSON")
}

#[tokio::test]
#[ignore = "requires a running MongoDB (MONGODB_URL)"]
async fn test_round_trip_create_then_fetch() {
    let base = spawn_app().await;

    let created = create_feedback(
        &base,
        "  Jane Doe  ",
        "  Jane.Doe@Example.COM ",
        "  The new parking map is a big improvement.  ",
    )
    .await;
    assert_eq!(created["success"], true);
    assert_eq!(created["message"], "Feedback created successfully");

    let record = &created["data"];
    // Normalization applied at the boundary: trimmed, email lower-cased
    assert_eq!(record["name"], "Jane Doe");
    assert_eq!(record["email"], "jane.doe@example.com");
    assert_eq!(
        record["message"],
        "The new parking map is a big improvement."
    );

    let id = record["id"].as_str().unwrap();
    let fetched: Value = client()
        .get(format!("{base}/api/feedbacks/{id}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched["success"], true);
    assert_eq!(&fetched["data"], record);
}

#[tokio::test]
#[ignore = "requires a running MongoDB (MONGODB_URL)"]
async fn test_listing_is_most_recent_first() {
    let base = spawn_app().await;

    let mut ids = Vec::new();
    for label in ["A", "B", "C"] {
        let created = create_feedback(
            &base,
            &format!("Order Probe {label}"),
            &format!("order.probe.{}@example.com", label.to_lowercase()),
            &format!("Ordering probe record {label} for the listing test"),
        )
        .await;
        ids.push(created["data"]["id"].as_str().unwrap().to_string());
        // createdAt has millisecond resolution; keep the ordering unambiguous
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let listing: Value = client()
        .get(format!("{base}/api/feedbacks"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listing["success"], true);
    let records = listing["data"].as_array().unwrap();
    assert_eq!(listing["count"], records.len());

    // Positions of our three records in the listing: C before B before A
    let position = |id: &str| {
        records
            .iter()
            .position(|r| r["id"] == id)
            .expect("created record appears in listing")
    };
    assert!(position(&ids[2]) < position(&ids[1]));
    assert!(position(&ids[1]) < position(&ids[0]));
}

#[tokio::test]
#[ignore = "requires a running MongoDB (MONGODB_URL)"]
async fn test_partial_update_retains_omitted_fields() {
    let base = spawn_app().await;

    let created = create_feedback(
        &base,
        "Partial Update",
        "before@example.com",
        "Original message body for the update test",
    )
    .await;
    let id = created["data"]["id"].as_str().unwrap();
    let created_at = created["data"]["createdAt"].as_str().unwrap().to_string();

    tokio::time::sleep(Duration::from_millis(20)).await;

    let response = client()
        .put(format!("{base}/api/feedbacks/{id}"))
        .json(&json!({ "email": "After@Example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let updated: Value = response.json().await.unwrap();

    assert_eq!(updated["message"], "Feedback updated successfully");
    let record = &updated["data"];
    assert_eq!(record["email"], "after@example.com");
    assert_eq!(record["name"], "Partial Update");
    assert_eq!(
        record["message"],
        "Original message body for the update test"
    );
    assert_eq!(record["createdAt"], created_at.as_str());
    let created_ts = chrono::DateTime::parse_from_rfc3339(&created_at).unwrap();
    let updated_ts =
        chrono::DateTime::parse_from_rfc3339(record["updatedAt"].as_str().unwrap()).unwrap();
    assert!(updated_ts > created_ts);
}

#[tokio::test]
#[ignore = "requires a running MongoDB (MONGODB_URL)"]
async fn test_delete_is_terminal() {
    let base = spawn_app().await;

    let created = create_feedback(
        &base,
        "Delete Probe",
        "delete.probe@example.com",
        "Record created only to be deleted",
    )
    .await;
    let id = created["data"]["id"].as_str().unwrap();

    let first = client()
        .delete(format!("{base}/api/feedbacks/{id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), 200);
    let body: Value = first.json().await.unwrap();
    assert_eq!(body["message"], "Feedback deleted successfully");
    assert_eq!(body["data"]["id"], *id);

    // Second delete of the same identifier is NotFound, not idempotent-OK
    let second = client()
        .delete(format!("{base}/api/feedbacks/{id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), 404);
    let body: Value = second.json().await.unwrap();
    assert_eq!(body["message"], "Feedback not found");
}

#[tokio::test]
#[ignore = "requires a running MongoDB (MONGODB_URL)"]
async fn test_not_found_vs_malformed_identifier() {
    let base = spawn_app().await;

    // Well-formed but nonexistent: 404
    let missing = client()
        .get(format!("{base}/api/feedbacks/ffffffffffffffffffffffff"))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 404);

    // Ill-formed: 400, and a different message
    let malformed = client()
        .get(format!("{base}/api/feedbacks/definitely-not-an-id"))
        .send()
        .await
        .unwrap();
    assert_eq!(malformed.status(), 400);
    let body: Value = malformed.json().await.unwrap();
    assert_eq!(body["message"], "Invalid feedback ID format");
}

#[tokio::test]
#[ignore = "requires a running MongoDB (MONGODB_URL)"]
async fn test_validation_boundaries_end_to_end() {
    let base = spawn_app().await;

    // name of length 1 rejected, 2 and 100 accepted, 101 rejected
    for (name_len, expected) in [(1, 400), (2, 201), (100, 201), (101, 400)] {
        let response = client()
            .post(format!("{base}/api/feedbacks"))
            .json(&json!({
                "name": "n".repeat(name_len),
                "email": "boundary@example.com",
                "message": "Boundary probe message body"
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), expected, "name length {name_len}");
    }

    // message boundaries at 10/1000
    for (message_len, expected) in [(9, 400), (10, 201), (1000, 201), (1001, 400)] {
        let response = client()
            .post(format!("{base}/api/feedbacks"))
            .json(&json!({
                "name": "Boundary Probe",
                "email": "boundary@example.com",
                "message": "m".repeat(message_len)
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), expected, "message length {message_len}");
    }
}
