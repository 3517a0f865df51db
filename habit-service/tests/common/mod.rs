#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use habit_service::services::providers::{MockTextProvider, TextProvider};
use habit_service::services::{MockPlanStore, PlanStore};
use habit_service::startup::{build_router, AppState, Application};
use std::sync::Arc;
use tower::util::ServiceExt;

pub const CANONICAL_PLAN: &str = r#"{"goal":"drink more water","action_steps":[{"step":1,"action":"Keep a bottle on your desk","reason":"Visible cues trigger the habit"},{"step":2,"action":"Drink a glass with every meal","reason":"Anchors the habit to an existing routine"}],"obstacles":[{"issue":"Forgetting during busy days","solution":"Set hourly phone reminders"}]}"#;

/// Router wired to in-memory clients that stay inspectable from the test.
pub struct TestHarness {
    pub router: Router,
    pub provider: Arc<MockTextProvider>,
    pub store: Arc<MockPlanStore>,
}

impl TestHarness {
    pub fn new(provider: MockTextProvider, store: MockPlanStore) -> Self {
        let provider = Arc::new(provider);
        let store = Arc::new(store);
        let state = AppState {
            store: store.clone() as Arc<dyn PlanStore>,
            text_provider: provider.clone() as Arc<dyn TextProvider>,
        };

        Self {
            router: build_router(state),
            provider,
            store,
        }
    }

    /// Provider answering with `text`, store accepting writes.
    pub fn with_model_text(text: &str) -> Self {
        Self::new(MockTextProvider::with_text(text), MockPlanStore::new())
    }

    pub async fn post_plans(&self, body: impl Into<Body>) -> Response {
        self.router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/plans")
                    .header("content-type", "application/json")
                    .body(body.into())
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn assert_internal_error(response: Response) {
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await,
        serde_json::json!({ "error": "Internal server error" })
    );
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub provider: Arc<MockTextProvider>,
    pub store: Arc<MockPlanStore>,
}

impl TestApp {
    /// Run the real server on a random port with mock clients.
    pub async fn spawn() -> Self {
        let provider = Arc::new(MockTextProvider::with_text(CANONICAL_PLAN));
        let store = Arc::new(MockPlanStore::new());
        let state = AppState {
            store: store.clone() as Arc<dyn PlanStore>,
            text_provider: provider.clone() as Arc<dyn TextProvider>,
        };

        let app = Application::from_parts(0, state)
            .await
            .expect("Failed to build test application");

        let port = app.http_port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to accept connections
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            provider,
            store,
        }
    }
}
