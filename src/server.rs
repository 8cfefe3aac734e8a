// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! HTTP server for metrics and Kubernetes probes.
//!
//! Provides endpoints:
//! - `/metrics` - Prometheus metrics in text format
//! - `/healthz` - Liveness probe (always returns 200)
//! - `/readyz` - Readiness probe (200 once the controllers are running)

use crate::constants::{HEALTH_PATH, METRICS_SERVER_BIND_ADDRESS, METRICS_SERVER_PATH, READY_PATH};
use crate::metrics::gather_metrics;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Shared between the probe handlers and the controllers.
#[derive(Debug, Default)]
pub struct ServerState {
    ready: AtomicBool,
}

impl ServerState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Relaxed)
    }
}

/// Routes served on the metrics port.
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route(METRICS_SERVER_PATH, get(metrics_handler))
        .route(HEALTH_PATH, get(healthz_handler))
        .route(READY_PATH, get(readyz_handler))
        .with_state(state)
}

/// Serve [`router`] until the listener fails.
///
/// # Errors
///
/// Returns an error when the port cannot be bound or the server stops.
pub async fn start_server(port: u16, state: Arc<ServerState>) -> anyhow::Result<()> {
    let addr = format!("{METRICS_SERVER_BIND_ADDRESS}:{port}");
    let listener = TcpListener::bind(&addr).await?;

    info!("HTTP server listening on {}", addr);

    axum::serve(listener, router(state)).await?;
    Ok(())
}

pub(crate) async fn metrics_handler() -> impl IntoResponse {
    match gather_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            body,
        ),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "text/plain")],
                format!("Failed to encode metrics: {e}"),
            )
        }
    }
}

pub(crate) async fn healthz_handler() -> impl IntoResponse {
    StatusCode::OK
}

pub(crate) async fn readyz_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    if state.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod server_tests;
