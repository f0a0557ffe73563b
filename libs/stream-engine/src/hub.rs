use tokio::sync::{RwLock, mpsc};

use broker_api::{OverflowPolicy, StreamRecord, TopicName};

// ═══════════════════════════════════════════════════════════════
//  Subscriber
// ═══════════════════════════════════════════════════════════════

struct Subscriber {
    tx: mpsc::Sender<StreamRecord>,
    overflow: OverflowPolicy,
}

// ═══════════════════════════════════════════════════════════════
//  Subscription — bounded per-subscriber record stream
// ═══════════════════════════════════════════════════════════════

pub struct Subscription {
    rx: mpsc::Receiver<StreamRecord>,
}

impl Subscription {
    /// Next record. None = topic closed / subscription cancelled.
    pub async fn recv(&mut self) -> Option<StreamRecord> {
        self.rx.recv().await
    }
}

// ═══════════════════════════════════════════════════════════════
//  Broadcaster
// ═══════════════════════════════════════════════════════════════

/// Per-topic multicast: every appended record goes to every current
/// subscriber through that subscriber's own bounded channel, in append
/// order. A slow subscriber only affects itself.
pub struct Broadcaster {
    name: TopicName,
    subscribers: RwLock<Vec<Subscriber>>,
}

impl Broadcaster {
    pub fn new(name: TopicName) -> Self {
        Self {
            name,
            subscribers: RwLock::new(Vec::new()),
        }
    }

    pub async fn subscribe(&self, buffer: usize, overflow: OverflowPolicy) -> Subscription {
        let (tx, rx) = mpsc::channel(buffer);
        let mut subs = self.subscribers.write().await;
        subs.push(Subscriber { tx, overflow });
        Subscription { rx }
    }

    /// Push a record to all subscribers. Closed subscribers are pruned;
    /// a full channel is handled per that subscriber's overflow policy
    /// and never delays the publisher.
    pub async fn broadcast(&self, record: &StreamRecord) {
        let mut subs = self.subscribers.write().await;
        let mut i = 0;
        while i < subs.len() {
            let sub = &subs[i];
            if sub.tx.is_closed() {
                subs.swap_remove(i);
                continue;
            }
            match sub.overflow {
                OverflowPolicy::Drop => match sub.tx.try_send(record.clone()) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        tracing::warn!(topic = %self.name, "subscriber channel full, dropping");
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        subs.swap_remove(i);
                        continue;
                    }
                },
                OverflowPolicy::BackPressure => {
                    let tx = sub.tx.clone();
                    let rec = record.clone();
                    let name = self.name.clone();
                    tokio::spawn(async move {
                        if tx.send(rec).await.is_err() {
                            tracing::warn!(topic = %name, "subscriber closed during backpressure send");
                        }
                    });
                }
            }
            i += 1;
        }
    }

    /// Live (non-closed) subscriber count.
    pub async fn subscriber_count(&self) -> usize {
        let subs = self.subscribers.read().await;
        subs.iter().filter(|s| !s.tx.is_closed()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use broker_api::now_ms;

    fn record(id: u64, payload: &str) -> StreamRecord {
        StreamRecord {
            id,
            topic: "t".into(),
            payload: payload.into(),
            enqueued_at: now_ms(),
        }
    }

    #[tokio::test]
    async fn delivers_in_publish_order() {
        let hub = Broadcaster::new("t".into());
        let mut sub = hub.subscribe(16, OverflowPolicy::Drop).await;

        for (id, p) in [(1, "a"), (2, "b"), (3, "c")] {
            hub.broadcast(&record(id, p)).await;
        }

        for expected in ["a", "b", "c"] {
            let got = sub.recv().await.unwrap();
            assert_eq!(got.payload, expected);
        }
    }

    #[tokio::test]
    async fn drop_policy_skips_full_subscriber_only() {
        let hub = Broadcaster::new("t".into());
        let mut slow = hub.subscribe(1, OverflowPolicy::Drop).await;
        let mut fast = hub.subscribe(16, OverflowPolicy::Drop).await;

        hub.broadcast(&record(1, "a")).await;
        hub.broadcast(&record(2, "b")).await; // slow's channel is full here

        assert_eq!(fast.recv().await.unwrap().payload, "a");
        assert_eq!(fast.recv().await.unwrap().payload, "b");

        assert_eq!(slow.recv().await.unwrap().payload, "a");
        // "b" was dropped for the slow subscriber; nothing else is queued.
        assert!(slow.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn closed_subscribers_are_pruned() {
        let hub = Broadcaster::new("t".into());
        let sub = hub.subscribe(4, OverflowPolicy::Drop).await;
        assert_eq!(hub.subscriber_count().await, 1);

        drop(sub);
        hub.broadcast(&record(1, "a")).await;
        assert_eq!(hub.subscriber_count().await, 0);

        // Broadcasting with zero subscribers is a no-op, not an error.
        hub.broadcast(&record(2, "b")).await;
    }
}
