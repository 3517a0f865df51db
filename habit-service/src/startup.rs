//! Application startup and lifecycle management.

use crate::config::HabitConfig;
use crate::handlers::{create_plan, health_check, metrics_handler, readiness_check};
use crate::middleware::metrics_middleware;
use crate::services::providers::{build_text_provider, TextProvider};
use crate::services::{MongoPlanStore, PlanStore};
use axum::{
    body::Body,
    middleware,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{http_request_span, request_id_middleware};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PlanStore>,
    pub text_provider: Arc<dyn TextProvider>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/plans", post(create_plan))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_handler))
        .route_layer(middleware::from_fn(metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http().make_span_with(http_request_span::<Body>))
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Connect the store, build the provider and bind the listener.
    pub async fn build(config: HabitConfig) -> Result<Self, AppError> {
        let store = MongoPlanStore::connect(
            &config.mongodb.uri,
            &config.mongodb.database,
            &config.mongodb.collection,
        )
        .await?;

        store.initialize_indexes().await.map_err(|e| {
            tracing::error!("Failed to initialize database indexes: {}", e);
            e
        })?;

        let text_provider = build_text_provider(&config.inference).await?;
        text_provider.health_check().await.map_err(|e| {
            tracing::error!(provider = text_provider.name(), "Provider check failed: {}", e);
            AppError::ConfigError(anyhow::Error::new(e))
        })?;

        let state = AppState {
            store: Arc::new(store),
            text_provider,
        };

        Self::from_parts(config.common.port, state).await
    }

    /// Bind on `port` (0 picks a free one) with pre-built clients.
    pub async fn from_parts(port: u16, state: AppState) -> Result<Self, AppError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Habit service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    /// Get the HTTP port the server is listening on.
    pub fn http_port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let router = build_router(self.state);
        axum::serve(self.listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
