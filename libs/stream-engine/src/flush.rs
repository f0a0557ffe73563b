use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use broker_api::{BatchStore, now_ms};

use crate::activity::ActivityTracker;
use crate::broker::{StreamBroker, TopicState};
use crate::error::BrokerError;

// ═══════════════════════════════════════════════════════════════
//  Flush procedure
// ═══════════════════════════════════════════════════════════════

/// Persist the topic's current records to the store, then truncate the
/// log. Shared by the inline (size-triggered) and scheduled callers.
///
/// The flush gate serializes flushes of one topic; truncation uses the
/// id of the last persisted record, so records appended while the store
/// call was in flight survive. If the store fails nothing is cleared.
pub(crate) async fn flush_topic(
    state: &TopicState,
    topic: &str,
    store: &dyn BatchStore,
    activity: &ActivityTracker,
) -> Result<usize, BrokerError> {
    let _gate = state.flush_gate.lock().await;

    let len = state.log.len().await;
    if len == 0 {
        return Ok(0);
    }

    let batch = state.log.range_from_start(len).await;
    let last_id = batch.last().map(|r| r.id).unwrap_or(0);

    store.persist_batch(topic, &batch).await?;

    let removed = state.log.clear_through(last_id).await;
    if removed != batch.len() {
        // Consistency anomaly: non-fatal, the batch is already durable.
        tracing::warn!(
            topic = %topic,
            persisted = batch.len(),
            removed,
            "post-flush truncation did not remove the persisted batch"
        );
    }

    activity.mark_flushed(topic).await;
    tracing::info!(topic = %topic, records = batch.len(), "flushed batch");
    Ok(batch.len())
}

// ═══════════════════════════════════════════════════════════════
//  Flush scheduler
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct FlushConfig {
    /// How often the scheduler walks the activity table.
    pub check_interval: Duration,
    /// A topic idle longer than this is flushed regardless of size.
    pub flush_interval: Duration,
}

impl Default for FlushConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(10),
            flush_interval: Duration::from_secs(60),
        }
    }
}

/// Start the background loop that inspects topic activity every
/// `check_interval` and triggers staleness- or size-based flushes.
/// Flushes run fire-and-forget — a tick never waits for them — and the
/// per-topic gate inside `flush_topic` keeps them from overlapping.
pub fn spawn_flush_scheduler(
    broker: Arc<StreamBroker>,
    config: FlushConfig,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(config.check_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = tick.tick() => check_topics(&broker, &config).await,
                _ = token.cancelled() => break,
            }
        }
        tracing::info!("flush scheduler stopped");
    })
}

async fn check_topics(broker: &Arc<StreamBroker>, config: &FlushConfig) {
    let now = now_ms();
    let stale_after_ms = config.flush_interval.as_millis() as i64;

    for (topic, last_write) in broker.activity_snapshot().await {
        let len = broker.length(&topic).await;
        if len == 0 {
            continue;
        }

        let reason = if now - last_write > stale_after_ms {
            "staleness"
        } else if len >= broker.batch_size() {
            "size"
        } else {
            continue;
        };

        tracing::info!(topic = %topic, reason, "flush triggered");
        let broker = broker.clone();
        tokio::spawn(async move {
            match broker.flush_topic(&topic).await {
                Ok(records) => {
                    tracing::debug!(topic = %topic, records, "scheduled flush complete");
                }
                Err(e) => {
                    // Nothing was cleared; the next tick retries.
                    tracing::error!(topic = %topic, error = %e, "scheduled flush failed");
                }
            }
        });
    }
}
