//! Integration tests for the Twilio client against a local stand-in API.
//!
//! ```bash
//! cargo test -p relay-notifier --test integration
//! ```

use std::collections::HashMap;

use axum::extract::{Form, Path};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};

use relay_notifier::twilio::TwilioClient;
use relay_notifier::{NotificationProvider, NotifyError};

/// Serve a fake Messages endpoint and return its base URL.
async fn spawn_fake_twilio() -> String {
    async fn create_message(
        Path(sid): Path<String>,
        Form(form): Form<HashMap<String, String>>,
    ) -> (StatusCode, Json<Value>) {
        if form.get("To").map(String::as_str) == Some("invalid") {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"code": 21211, "message": "Invalid 'To' Phone Number", "status": 400})),
            );
        }
        (
            StatusCode::CREATED,
            Json(json!({
                "sid": format!("SM-{sid}-{}", form["Body"].len()),
                "date_created": "Thu, 30 Jul 2015 20:12:31 +0000",
                "to": form["To"],
                "from": form["From"],
            })),
        )
    }

    let app = Router::new().route(
        "/2010-04-01/Accounts/{sid}/Messages.json",
        post(create_message),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn test_send_returns_provider_sid() {
    let base = spawn_fake_twilio().await;
    let client = TwilioClient::new("AC1", "token").unwrap().with_api_base(base);

    let sent = client
        .send("+15552223333", "+15550001111", "Alerts found: 1")
        .await
        .unwrap();

    assert_eq!(sent.id, "SM-AC1-15");
    assert_eq!(sent.sent_at.as_deref(), Some("Thu, 30 Jul 2015 20:12:31 +0000"));
}

#[tokio::test]
async fn test_send_surfaces_rejection() {
    let base = spawn_fake_twilio().await;
    let client = TwilioClient::new("AC1", "token").unwrap().with_api_base(base);

    let err = client
        .send("invalid", "+15550001111", "Alerts found: 1")
        .await
        .unwrap_err();

    match err {
        NotifyError::Rejected { status, message } => {
            assert_eq!(status, 400);
            assert!(message.contains("21211"));
        }
        other => panic!("unexpected error: {other}"),
    }
}
