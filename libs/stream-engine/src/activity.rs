use std::collections::HashMap;

use tokio::sync::RwLock;

use broker_api::{TopicName, now_ms};

// ═══════════════════════════════════════════════════════════════
//  ActivityTracker
// ═══════════════════════════════════════════════════════════════

/// Per-topic last-write timestamps (Unix ms), consulted by the flush
/// scheduler. Entries appear lazily on first publish or first subscribe
/// and are never removed for the lifetime of the process.
pub struct ActivityTracker {
    entries: RwLock<HashMap<TopicName, i64>>,
}

impl Default for ActivityTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivityTracker {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Record a write: overwrite the topic's timestamp with now.
    pub async fn touch(&self, topic: &str) {
        let mut entries = self.entries.write().await;
        entries.insert(topic.to_string(), now_ms());
    }

    /// Make sure the topic is tracked without resetting its timestamp.
    /// Used on subscribe, so idle-but-watched topics still get
    /// staleness flushes.
    pub async fn observe(&self, topic: &str) {
        let mut entries = self.entries.write().await;
        entries.entry(topic.to_string()).or_insert_with(now_ms);
    }

    /// A completed flush counts as activity.
    pub async fn mark_flushed(&self, topic: &str) {
        self.touch(topic).await;
    }

    /// Snapshot of all entries for one scheduler pass.
    pub async fn snapshot(&self) -> Vec<(TopicName, i64)> {
        let entries = self.entries.read().await;
        entries.iter().map(|(k, v)| (k.clone(), *v)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn observe_does_not_reset_touch() {
        let tracker = ActivityTracker::new();
        tracker.touch("t").await;
        let first = tracker.snapshot().await[0].1;

        tracker.observe("t").await;
        let after = tracker.snapshot().await[0].1;
        assert_eq!(first, after);
    }

    #[tokio::test]
    async fn snapshot_lists_every_tracked_topic() {
        let tracker = ActivityTracker::new();
        tracker.touch("a").await;
        tracker.observe("b").await;

        let mut names: Vec<_> = tracker
            .snapshot()
            .await
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        names.sort();
        assert_eq!(names, ["a", "b"]);
    }
}
