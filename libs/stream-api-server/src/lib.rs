mod http;
mod ws;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use tokio_util::sync::CancellationToken;

use broker_api::OverflowPolicy;
use stream_engine::StreamBroker;

#[derive(Clone)]
pub(crate) struct AppState {
    broker: Arc<StreamBroker>,
    session_buffer: usize,
    session_overflow: OverflowPolicy,
}

/// HTTP + WebSocket API server.
///
/// `/ws/stream` carries the session protocol; the `/api/stream/*`
/// routes are thin callers of the same broker operations, kept for
/// operational testing.
pub async fn run(
    port: u16,
    broker: Arc<StreamBroker>,
    session_buffer: usize,
    session_overflow: OverflowPolicy,
    shutdown: CancellationToken,
) -> Result<(), String> {
    let state = AppState {
        broker,
        session_buffer,
        session_overflow,
    };

    let app = Router::new()
        .route("/ws/stream", get(ws::handle_ws))
        .route("/api/stream/publish", post(http::handle_publish))
        .route("/api/stream/consume", get(http::handle_consume))
        .route("/api/stream/clear", put(http::handle_clear))
        .route("/api/stream/length", get(http::handle_length))
        .route("/api/stream/messages", get(http::handle_messages))
        .route("/api/stream/messages/recent", get(http::handle_recent))
        .route("/api/stream/topics", get(http::handle_topics))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .map_err(|e| format!("bind api :{port}: {e}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(|e| format!("axum serve: {e}"))?;

    Ok(())
}
