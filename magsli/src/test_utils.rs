//! Shared test helpers: a fake Slack webhook and signed Mailgun forms.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde_json::Value;
use tokio::net::TcpListener;
use url::{form_urlencoded, Url};

use crate::mailgun::compute_signature;

pub const SIGNING_KEY: &str = "test-signing-key";

#[derive(Clone)]
struct FakeSlackState {
    received: Arc<Mutex<Vec<Value>>>,
    status: StatusCode,
    delay: Duration,
}

/// A local HTTP server standing in for a Slack incoming webhook.
pub struct FakeSlack {
    pub url: Url,
    received: Arc<Mutex<Vec<Value>>>,
}

impl FakeSlack {
    pub async fn start(status: StatusCode) -> Self {
        Self::start_with_delay(status, Duration::ZERO).await
    }

    pub async fn start_with_delay(status: StatusCode, delay: Duration) -> Self {
        let received = Arc::new(Mutex::new(Vec::new()));
        let state = FakeSlackState {
            received: received.clone(),
            status,
            delay,
        };

        let app = Router::new()
            .route("/hook", post(record))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: Url::parse(&format!("http://{}/hook", addr)).unwrap(),
            received,
        }
    }

    /// Bodies received so far, in arrival order.
    pub fn received(&self) -> Vec<Value> {
        self.received.lock().unwrap().clone()
    }
}

async fn record(State(state): State<FakeSlackState>, Json(body): Json<Value>) -> StatusCode {
    state.received.lock().unwrap().push(body);
    tokio::time::sleep(state.delay).await;
    state.status
}

/// Encode `fields` as a form body signed with `key`.
pub fn signed_form(key: &str, fields: &[(&str, &str)]) -> String {
    let timestamp = "1700000000";
    let token = "0123456789abcdef0123456789abcdef0123456789abcdef01";
    let signature = hex::encode(compute_signature(key, timestamp, token));

    let mut form = form_urlencoded::Serializer::new(String::new());
    form.append_pair("timestamp", timestamp);
    form.append_pair("token", token);
    form.append_pair("signature", &signature);
    for (name, value) in fields {
        form.append_pair(name, value);
    }
    form.finish()
}
