use std::collections::HashMap;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::AppState;

// ═══════════════════════════════════════════════════════════════
//  WebSocket: /ws/stream
// ═══════════════════════════════════════════════════════════════

pub(crate) async fn handle_ws(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| ws_session(socket, state))
}

// ═══════════════════════════════════════════════════════════════
//  Command grammar
// ═══════════════════════════════════════════════════════════════

/// `COMMAND:topic[:payload]` — at most 3 colon-separated parts.
#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Subscribe { topic: &'a str },
    Publish { topic: &'a str, payload: &'a str },
}

/// Err carries the reason text of the `ERROR:` reply.
fn parse_command(text: &str) -> Result<Command<'_>, String> {
    let parts: Vec<&str> = text.splitn(3, ':').collect();
    if parts.len() < 2 {
        return Err("Invalid message format".to_string());
    }
    match parts[0] {
        "SUBSCRIBE" => Ok(Command::Subscribe { topic: parts[1] }),
        "PUBLISH" => match parts.get(2) {
            Some(&payload) => Ok(Command::Publish {
                topic: parts[1],
                payload,
            }),
            None => Err("Missing message content".to_string()),
        },
        other => Err(format!("Unknown command: {other}")),
    }
}

// ═══════════════════════════════════════════════════════════════
//  Session
// ═══════════════════════════════════════════════════════════════

/// One session: two independent flows over a split socket.
///
/// The outbound flow drains a bounded queue carrying every frame
/// (SUCCESS/ERROR replies and MESSAGE fan-out) to the socket. The
/// inbound flow parses and dispatches commands, enqueueing replies on
/// the same queue; one forward task per subscribed topic feeds fan-out
/// into it. A full queue suspends only this session's producers — the
/// writer keeps draining independently. The handler returns after both
/// flows have finished, and releases every subscription on the way out
/// however the connection ended.
async fn ws_session(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();
    let (out_tx, mut out_rx) = mpsc::channel::<String>(state.session_buffer);

    // Outbound flow.
    let writer = tokio::spawn(async move {
        while let Some(frame) = out_rx.recv().await {
            if sink.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    let mut subs: HashMap<String, JoinHandle<()>> = HashMap::new();

    // Inbound flow: runs until the client disconnects or the socket
    // errors out.
    while let Some(Ok(msg)) = stream.next().await {
        let text = match msg {
            Message::Text(t) => t,
            Message::Close(_) => break,
            _ => continue,
        };
        handle_command(&state, &mut subs, &out_tx, text.as_str()).await;
    }

    // Unconditional cleanup, however the connection ended.
    for (_, handle) in subs {
        handle.abort();
    }
    drop(out_tx);
    let _ = writer.await;
}

async fn handle_command(
    state: &AppState,
    subs: &mut HashMap<String, JoinHandle<()>>,
    out_tx: &mpsc::Sender<String>,
    text: &str,
) {
    match parse_command(text) {
        Ok(Command::Subscribe { topic }) => {
            handle_subscribe(state, subs, out_tx, topic).await;
        }
        Ok(Command::Publish { topic, payload }) => {
            handle_publish(state, out_tx, topic, payload).await;
        }
        Err(reason) => send_error(out_tx, &reason).await,
    }
}

async fn handle_subscribe(
    state: &AppState,
    subs: &mut HashMap<String, JoinHandle<()>>,
    out_tx: &mpsc::Sender<String>,
    topic: &str,
) {
    if subs.contains_key(topic) {
        send_success(out_tx, &format!("Already subscribed to {topic}")).await;
        return;
    }

    let mut sub = state
        .broker
        .subscribe(topic, state.session_buffer, state.session_overflow)
        .await;

    let topic_name = topic.to_string();
    let tx = out_tx.clone();
    let handle = tokio::spawn(async move {
        while let Some(record) = sub.recv().await {
            let frame = format!("MESSAGE:{topic_name}:{}", record.payload);
            if tx.send(frame).await.is_err() {
                break;
            }
        }
    });

    subs.insert(topic.to_string(), handle);
    send_success(out_tx, &format!("Subscribed to {topic}")).await;
}

async fn handle_publish(state: &AppState, out_tx: &mpsc::Sender<String>, topic: &str, payload: &str) {
    match state.broker.publish(topic, payload.to_string()).await {
        Ok(record) => {
            send_success(out_tx, &format!("PUBLISHED:{topic}:{}", record.id)).await;
        }
        Err(e) => {
            // The record is appended; only the inline flush failed.
            tracing::warn!(topic = %topic, error = %e, "publish-triggered flush failed");
            send_error(out_tx, &format!("Publish failed: {e}")).await;
        }
    }
}

async fn send_success(out_tx: &mpsc::Sender<String>, text: &str) {
    let _ = out_tx.send(format!("SUCCESS:{text}")).await;
}

async fn send_error(out_tx: &mpsc::Sender<String>, text: &str) {
    let _ = out_tx.send(format!("ERROR:{text}")).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use broker_api::OverflowPolicy;
    use store_memory::MemoryBatchStore;
    use stream_engine::StreamBroker;

    fn test_state(batch_size: usize) -> AppState {
        AppState {
            broker: Arc::new(StreamBroker::new(Arc::new(MemoryBatchStore::new()), batch_size)),
            session_buffer: 64,
            session_overflow: OverflowPolicy::Drop,
        }
    }

    #[test]
    fn parses_subscribe_and_publish() {
        assert_eq!(
            parse_command("SUBSCRIBE:room1"),
            Ok(Command::Subscribe { topic: "room1" })
        );
        assert_eq!(
            parse_command("PUBLISH:room1:hello world"),
            Ok(Command::Publish { topic: "room1", payload: "hello world" })
        );
        // Payload keeps embedded colons: split into at most 3 parts.
        assert_eq!(
            parse_command("PUBLISH:room1:a:b:c"),
            Ok(Command::Publish { topic: "room1", payload: "a:b:c" })
        );
    }

    #[test]
    fn rejects_malformed_commands() {
        assert_eq!(parse_command("FOO"), Err("Invalid message format".into()));
        assert_eq!(
            parse_command("PUBLISH:room1"),
            Err("Missing message content".into())
        );
        assert_eq!(
            parse_command("FOO:room1"),
            Err("Unknown command: FOO".into())
        );
    }

    #[tokio::test]
    async fn subscribe_is_idempotent_per_session() {
        let state = test_state(100);
        let (out_tx, mut out_rx) = mpsc::channel(16);
        let mut subs = HashMap::new();

        handle_command(&state, &mut subs, &out_tx, "SUBSCRIBE:room1").await;
        assert_eq!(out_rx.recv().await.unwrap(), "SUCCESS:Subscribed to room1");

        handle_command(&state, &mut subs, &out_tx, "SUBSCRIBE:room1").await;
        assert_eq!(
            out_rx.recv().await.unwrap(),
            "SUCCESS:Already subscribed to room1"
        );

        assert_eq!(subs.len(), 1);
        assert_eq!(state.broker.subscriber_count("room1").await, 1);
    }

    #[tokio::test]
    async fn publish_replies_with_record_id() {
        let state = test_state(100);
        let (out_tx, mut out_rx) = mpsc::channel(16);
        let mut subs = HashMap::new();

        handle_command(&state, &mut subs, &out_tx, "PUBLISH:room1:hello").await;
        assert_eq!(out_rx.recv().await.unwrap(), "SUCCESS:PUBLISHED:room1:1");

        handle_command(&state, &mut subs, &out_tx, "PUBLISH:room1:again").await;
        assert_eq!(out_rx.recv().await.unwrap(), "SUCCESS:PUBLISHED:room1:2");
    }

    #[tokio::test]
    async fn subscriber_receives_message_frames_in_order() {
        let state = test_state(100);
        let (out_tx, mut out_rx) = mpsc::channel(16);
        let mut subs = HashMap::new();

        handle_command(&state, &mut subs, &out_tx, "SUBSCRIBE:room1").await;
        assert_eq!(out_rx.recv().await.unwrap(), "SUCCESS:Subscribed to room1");

        for payload in ["a", "b", "c"] {
            state.broker.publish("room1", payload.into()).await.unwrap();
        }

        for expected in ["MESSAGE:room1:a", "MESSAGE:room1:b", "MESSAGE:room1:c"] {
            assert_eq!(out_rx.recv().await.unwrap(), expected);
        }
    }

    #[tokio::test]
    async fn malformed_input_gets_error_reply_and_session_continues() {
        let state = test_state(100);
        let (out_tx, mut out_rx) = mpsc::channel(16);
        let mut subs = HashMap::new();

        handle_command(&state, &mut subs, &out_tx, "FOO").await;
        assert_eq!(out_rx.recv().await.unwrap(), "ERROR:Invalid message format");

        handle_command(&state, &mut subs, &out_tx, "PUBLISH:room1").await;
        assert_eq!(out_rx.recv().await.unwrap(), "ERROR:Missing message content");

        // The session still works after protocol errors.
        handle_command(&state, &mut subs, &out_tx, "PUBLISH:room1:ok").await;
        assert_eq!(out_rx.recv().await.unwrap(), "SUCCESS:PUBLISHED:room1:1");
    }

    #[tokio::test]
    async fn disconnect_releases_subscriptions() {
        let state = test_state(100);
        let (out_tx, mut out_rx) = mpsc::channel(16);
        let mut subs = HashMap::new();

        handle_command(&state, &mut subs, &out_tx, "SUBSCRIBE:room1").await;
        assert_eq!(out_rx.recv().await.unwrap(), "SUCCESS:Subscribed to room1");

        // What ws_session does when either flow ends.
        let handles: Vec<_> = subs.drain().map(|(_, handle)| handle).collect();
        for handle in &handles {
            handle.abort();
        }
        for handle in handles {
            let _ = handle.await;
        }
        drop(out_rx);

        // Publishing to a topic with no remaining subscribers still works,
        // and the dead subscriber is pruned on the next broadcast.
        state.broker.publish("room1", "after close".into()).await.unwrap();
        assert_eq!(state.broker.subscriber_count("room1").await, 0);
    }
}
