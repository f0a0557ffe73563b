use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{Stream, StreamExt};
use serde::Deserialize;

use super::AppState;

// ═══════════════════════════════════════════════════════════════
//  REST: ad-hoc test surface over the same broker operations
// ═══════════════════════════════════════════════════════════════

#[derive(Deserialize)]
pub(crate) struct PublishParams {
    stream: String,
    message: String,
}

#[derive(Deserialize)]
pub(crate) struct StreamParams {
    stream: String,
}

#[derive(Deserialize)]
pub(crate) struct FetchParams {
    stream: String,
    #[serde(default = "default_count")]
    count: usize,
}

fn default_count() -> usize {
    10
}

// --- POST /api/stream/publish?stream=&message= ---

pub(crate) async fn handle_publish(
    State(state): State<AppState>,
    Query(params): Query<PublishParams>,
) -> impl IntoResponse {
    match state.broker.publish(&params.stream, params.message).await {
        Ok(record) => format!(
            "Message published to {} with ID: {}",
            params.stream, record.id
        )
        .into_response(),
        Err(e) => (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            format!("error: {e}"),
        )
            .into_response(),
    }
}

// --- GET /api/stream/consume?stream= (SSE) ---

/// Server-push sequence: current log content first, then live records.
/// A record published between the subscribe and the snapshot read may
/// appear twice; the live tail is gapless.
pub(crate) async fn handle_consume(
    State(state): State<AppState>,
    Query(params): Query<StreamParams>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let sub = state
        .broker
        .subscribe(&params.stream, state.session_buffer, state.session_overflow)
        .await;
    let backlog = state.broker.fetch_oldest(&params.stream, usize::MAX).await;

    let live = futures::stream::unfold(sub, |mut sub| async move {
        sub.recv().await.map(|record| (record, sub))
    });

    let events = futures::stream::iter(backlog)
        .chain(live)
        .map(|record| Event::default().json_data(&record));

    Sse::new(events).keep_alive(KeepAlive::default())
}

// --- PUT /api/stream/clear?stream= ---

pub(crate) async fn handle_clear(
    State(state): State<AppState>,
    Query(params): Query<StreamParams>,
) -> impl IntoResponse {
    let deleted = state.broker.clear(&params.stream).await;
    tracing::info!(topic = %params.stream, deleted, "cleared via api");
    axum::Json(deleted)
}

// --- GET /api/stream/length?stream= ---

pub(crate) async fn handle_length(
    State(state): State<AppState>,
    Query(params): Query<StreamParams>,
) -> impl IntoResponse {
    axum::Json(state.broker.length(&params.stream).await)
}

// --- GET /api/stream/messages?stream=&count= ---

pub(crate) async fn handle_messages(
    State(state): State<AppState>,
    Query(params): Query<FetchParams>,
) -> impl IntoResponse {
    axum::Json(state.broker.fetch_oldest(&params.stream, params.count).await)
}

// --- GET /api/stream/messages/recent?stream=&count= ---

pub(crate) async fn handle_recent(
    State(state): State<AppState>,
    Query(params): Query<FetchParams>,
) -> impl IntoResponse {
    axum::Json(state.broker.fetch_newest(&params.stream, params.count).await)
}

// --- GET /api/stream/topics ---

pub(crate) async fn handle_topics(State(state): State<AppState>) -> impl IntoResponse {
    axum::Json(state.broker.topics().await)
}
