//! HTTP surface: the WebSocket endpoint plus the visit counters.

use crate::config::RelayConfig;
use crate::state::RelayState;
use crate::stats::{StatsSnapshot, VisitCount};
use anyhow::Result;
use axum::{Json, Router, extract::State, routing::get};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;

use super::websocket;

/// PUT /visit
async fn record_visit(State(state): State<Arc<RelayState>>) -> Json<VisitCount> {
    Json(state.stats.record_visit())
}

/// GET /visit
async fn read_stats(State(state): State<Arc<RelayState>>) -> Json<StatsSnapshot> {
    Json(state.stats.snapshot())
}

/// Build the axum router around shared relay state
pub fn create_router(state: Arc<RelayState>) -> Router {
    Router::new()
        .route("/", get(websocket::ws_handler))
        .route("/ws", get(websocket::ws_handler))
        .route("/visit", get(read_stats).put(record_visit))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve on an already-bound listener until `shutdown` fires
pub async fn serve(
    listener: TcpListener,
    state: Arc<RelayState>,
    shutdown: CancellationToken,
) -> Result<()> {
    let router = create_router(state);

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown.cancelled().await;
        tracing::info!("Relay server shutting down gracefully");
    })
    .await?;

    Ok(())
}

/// Bind `config.bind_addr` and serve
pub async fn run(config: RelayConfig, shutdown: CancellationToken) -> Result<()> {
    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Relay server listening on ws://{}", listener.local_addr()?);

    let state = Arc::new(RelayState::new(config));
    serve(listener, state, shutdown).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request, StatusCode};
    use tower::ServiceExt;

    async fn call(router: Router, method: Method, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .header("Origin", "http://example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "*"
        );
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_visit_counters() {
        let state = Arc::new(RelayState::new(RelayConfig::default()));
        let router = create_router(state.clone());

        let (status, body) = call(router.clone(), Method::PUT, "/visit").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({"NoOfVisitors": 1}));

        call(router.clone(), Method::PUT, "/visit").await;
        state.stats.add_files_transferred(3);

        let (status, body) = call(router, Method::GET, "/visit").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            serde_json::json!({"NoOfVisitors": 2, "NoOfFilesTransferred": 3})
        );
    }
}
