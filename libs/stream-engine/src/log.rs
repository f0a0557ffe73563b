use std::collections::VecDeque;

use tokio::sync::RwLock;

use broker_api::{StreamRecord, TopicName, now_ms};

// ═══════════════════════════════════════════════════════════════
//  TopicLog
// ═══════════════════════════════════════════════════════════════

/// Append-only record sequence of one topic.
///
/// Ids are assigned under the write lock, so they are strictly
/// increasing and every read sees a consistent snapshot. Records leave
/// the log only through `clear` (admin) or `clear_through` (flush).
pub struct TopicLog {
    name: TopicName,
    inner: RwLock<LogInner>,
}

struct LogInner {
    records: VecDeque<StreamRecord>,
    next_id: u64,
}

impl TopicLog {
    pub fn new(name: TopicName) -> Self {
        Self {
            name,
            inner: RwLock::new(LogInner {
                records: VecDeque::new(),
                next_id: 1,
            }),
        }
    }

    /// Append a payload, assigning the next monotonic id.
    /// Never blocks on subscribers — fan-out happens elsewhere.
    pub async fn append(&self, payload: String) -> StreamRecord {
        let mut inner = self.inner.write().await;
        let record = StreamRecord {
            id: inner.next_id,
            topic: self.name.clone(),
            payload,
            enqueued_at: now_ms(),
        };
        inner.next_id += 1;
        inner.records.push_back(record.clone());
        record
    }

    /// Up to `limit` oldest records, oldest first.
    pub async fn range_from_start(&self, limit: usize) -> Vec<StreamRecord> {
        let inner = self.inner.read().await;
        inner.records.iter().take(limit).cloned().collect()
    }

    /// Up to `limit` newest records, newest first.
    pub async fn range_from_end(&self, limit: usize) -> Vec<StreamRecord> {
        let inner = self.inner.read().await;
        inner.records.iter().rev().take(limit).cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    /// Remove every current record. Returns the number removed.
    pub async fn clear(&self) -> usize {
        let mut inner = self.inner.write().await;
        let removed = inner.records.len();
        inner.records.clear();
        removed
    }

    /// Remove records with `id <= upto` only. Records appended after the
    /// caller captured `upto` survive. Returns the number removed.
    pub async fn clear_through(&self, upto: u64) -> usize {
        let mut inner = self.inner.write().await;
        let before = inner.records.len();
        // Records are id-ordered, so everything to keep is a suffix.
        while inner.records.front().is_some_and(|r| r.id <= upto) {
            inner.records.pop_front();
        }
        before - inner.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn append_assigns_increasing_ids() {
        let log = TopicLog::new("room1".into());
        let a = log.append("a".into()).await;
        let b = log.append("b".into()).await;
        assert!(b.id > a.id);
        assert_eq!(a.topic, "room1");

        let tail = log.range_from_end(1).await;
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].payload, "b");
        assert_eq!(tail[0].id, b.id);
    }

    #[tokio::test]
    async fn ranges_and_len() {
        let log = TopicLog::new("t".into());
        for p in ["a", "b", "c"] {
            log.append(p.into()).await;
        }
        assert_eq!(log.len().await, 3);

        let oldest = log.range_from_start(2).await;
        assert_eq!(
            oldest.iter().map(|r| r.payload.as_str()).collect::<Vec<_>>(),
            ["a", "b"]
        );

        let newest = log.range_from_end(2).await;
        assert_eq!(
            newest.iter().map(|r| r.payload.as_str()).collect::<Vec<_>>(),
            ["c", "b"]
        );
    }

    #[tokio::test]
    async fn empty_log_reads_are_not_errors() {
        let log = TopicLog::new("nothing".into());
        assert_eq!(log.len().await, 0);
        assert!(log.range_from_start(10).await.is_empty());
        assert!(log.range_from_end(10).await.is_empty());
        assert_eq!(log.clear().await, 0);
    }

    #[tokio::test]
    async fn clear_through_keeps_later_records() {
        let log = TopicLog::new("t".into());
        for p in ["a", "b", "c"] {
            log.append(p.into()).await;
        }
        let batch = log.range_from_start(3).await;
        let upto = batch.last().unwrap().id;

        // A record arriving between the batch read and the clear.
        let late = log.append("d".into()).await;

        assert_eq!(log.clear_through(upto).await, 3);
        let rest = log.range_from_start(10).await;
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].id, late.id);
        assert_eq!(rest[0].payload, "d");
    }

    #[tokio::test]
    async fn ids_keep_growing_after_clear() {
        let log = TopicLog::new("t".into());
        let a = log.append("a".into()).await;
        log.clear().await;
        let b = log.append("b".into()).await;
        assert!(b.id > a.id);
    }
}
