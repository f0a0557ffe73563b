use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use broker_api::{BatchStore, OverflowPolicy, StreamRecord, TopicName};

use crate::activity::ActivityTracker;
use crate::error::BrokerError;
use crate::flush;
use crate::hub::{Broadcaster, Subscription};
use crate::log::TopicLog;

// ═══════════════════════════════════════════════════════════════
//  TopicState
// ═══════════════════════════════════════════════════════════════

/// Everything the broker owns for one topic: the log, the multicast
/// broadcaster and the gate serializing flushes of this topic.
pub(crate) struct TopicState {
    pub(crate) log: TopicLog,
    pub(crate) broadcaster: Broadcaster,
    pub(crate) flush_gate: Mutex<()>,
}

// ═══════════════════════════════════════════════════════════════
//  StreamBroker
// ═══════════════════════════════════════════════════════════════

/// Owner of all per-topic state. One instance per process, passed into
/// session handlers and the scheduler by explicit construction.
///
/// Topics are created lazily on first publish or first subscribe and
/// live until the process exits.
pub struct StreamBroker {
    topics: RwLock<HashMap<TopicName, Arc<TopicState>>>,
    activity: ActivityTracker,
    store: Arc<dyn BatchStore>,
    batch_size: usize,
}

impl StreamBroker {
    pub fn new(store: Arc<dyn BatchStore>, batch_size: usize) -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            activity: ActivityTracker::new(),
            store,
            batch_size,
        }
    }

    /// Size threshold that arms the inline and scheduled flush.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Idempotent lazy creation: exactly one state per topic, safe to
    /// call concurrently.
    async fn ensure_topic(&self, name: &str) -> Arc<TopicState> {
        {
            let topics = self.topics.read().await;
            if let Some(state) = topics.get(name) {
                return state.clone();
            }
        }
        let mut topics = self.topics.write().await;
        topics
            .entry(name.to_string())
            .or_insert_with(|| {
                tracing::info!(topic = %name, "created topic");
                Arc::new(TopicState {
                    log: TopicLog::new(name.to_string()),
                    broadcaster: Broadcaster::new(name.to_string()),
                    flush_gate: Mutex::new(()),
                })
            })
            .clone()
    }

    async fn topic_state(&self, name: &str) -> Option<Arc<TopicState>> {
        self.topics.read().await.get(name).cloned()
    }

    /// Append a payload, then flush inline if the log reached the batch
    /// size, then broadcast to subscribers.
    ///
    /// When the inline flush fails the record is already appended and
    /// stays appended; the error is returned so the session can report
    /// the failed flush, and the broadcast is skipped.
    pub async fn publish(&self, topic: &str, payload: String) -> Result<StreamRecord, BrokerError> {
        let state = self.ensure_topic(topic).await;
        let record = state.log.append(payload).await;
        self.activity.touch(topic).await;

        if state.log.len().await >= self.batch_size {
            tracing::info!(topic = %topic, "size threshold reached, flushing inline");
            flush::flush_topic(&state, topic, self.store.as_ref(), &self.activity).await?;
        }

        state.broadcaster.broadcast(&record).await;
        Ok(record)
    }

    /// Attach a new bounded subscription to the topic's broadcaster,
    /// creating the topic if this is its first use.
    pub async fn subscribe(
        &self,
        topic: &str,
        buffer: usize,
        overflow: OverflowPolicy,
    ) -> Subscription {
        let state = self.ensure_topic(topic).await;
        self.activity.observe(topic).await;
        state.broadcaster.subscribe(buffer, overflow).await
    }

    /// Current record count; 0 for a topic that was never written.
    pub async fn length(&self, topic: &str) -> usize {
        match self.topic_state(topic).await {
            Some(state) => state.log.len().await,
            None => 0,
        }
    }

    /// Up to `count` oldest records.
    pub async fn fetch_oldest(&self, topic: &str, count: usize) -> Vec<StreamRecord> {
        match self.topic_state(topic).await {
            Some(state) => state.log.range_from_start(count).await,
            None => Vec::new(),
        }
    }

    /// Up to `count` newest records, newest first.
    pub async fn fetch_newest(&self, topic: &str, count: usize) -> Vec<StreamRecord> {
        match self.topic_state(topic).await {
            Some(state) => state.log.range_from_end(count).await,
            None => Vec::new(),
        }
    }

    /// Drop every record of the topic without persisting. Admin surface.
    pub async fn clear(&self, topic: &str) -> usize {
        match self.topic_state(topic).await {
            Some(state) => state.log.clear().await,
            None => 0,
        }
    }

    /// Persist-then-truncate the topic's current records. Returns the
    /// number of records persisted; 0 for an empty or unknown topic.
    pub async fn flush_topic(&self, topic: &str) -> Result<usize, BrokerError> {
        match self.topic_state(topic).await {
            Some(state) => {
                flush::flush_topic(&state, topic, self.store.as_ref(), &self.activity).await
            }
            None => Ok(0),
        }
    }

    /// All topics created so far.
    pub async fn topics(&self) -> Vec<TopicName> {
        self.topics.read().await.keys().cloned().collect()
    }

    /// Live subscriber count of a topic. 0 when the topic is unknown.
    pub async fn subscriber_count(&self, topic: &str) -> usize {
        match self.topic_state(topic).await {
            Some(state) => state.broadcaster.subscriber_count().await,
            None => 0,
        }
    }

    pub(crate) async fn activity_snapshot(&self) -> Vec<(TopicName, i64)> {
        self.activity.snapshot().await
    }
}
