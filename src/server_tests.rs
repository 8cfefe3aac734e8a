// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `server.rs`

#[cfg(test)]
mod tests {
    use crate::metrics::record_reconciliation_success;
    use crate::server::{healthz_handler, metrics_handler, readyz_handler, ServerState};
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_healthz_always_ok() {
        let response = healthz_handler().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_readyz_follows_state() {
        let state = Arc::new(ServerState::new());

        let response = readyz_handler(State(state.clone())).await.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        state.mark_ready();
        let response = readyz_handler(State(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_metrics_served_as_prometheus_text() {
        record_reconciliation_success("ServerTest", Duration::from_millis(5));

        let response = metrics_handler().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers()["content-type"].to_str().unwrap();
        assert!(content_type.starts_with("text/plain"));
    }
}
