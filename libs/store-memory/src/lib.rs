use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use tokio::sync::RwLock;

use broker_api::{BatchStore, StoreError, StreamRecord, now_ms};

// ═══════════════════════════════════════════════════════════════
//  StoredMessage
// ═══════════════════════════════════════════════════════════════

/// One persisted document: what the broker hands over per record,
/// plus the store-side timestamp.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct StoredMessage {
    pub payload: String,
    pub stored_at: i64,
}

// ═══════════════════════════════════════════════════════════════
//  MemoryBatchStore
// ═══════════════════════════════════════════════════════════════

/// In-memory batch store. The default durable-store collaborator for
/// development and tests; a document store would implement the same
/// `BatchStore` trait behind its own crate.
#[derive(Default)]
pub struct MemoryBatchStore {
    topics: RwLock<HashMap<String, Vec<StoredMessage>>>,
}

impl MemoryBatchStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All documents persisted for `topic`, in arrival order.
    pub async fn messages(&self, topic: &str) -> Vec<StoredMessage> {
        let topics = self.topics.read().await;
        topics.get(topic).cloned().unwrap_or_default()
    }

    /// Persisted document count for `topic`.
    pub async fn len(&self, topic: &str) -> usize {
        let topics = self.topics.read().await;
        topics.get(topic).map(|docs| docs.len()).unwrap_or(0)
    }

    pub async fn topics(&self) -> Vec<String> {
        self.topics.read().await.keys().cloned().collect()
    }
}

impl BatchStore for MemoryBatchStore {
    fn persist_batch<'a>(
        &'a self,
        topic: &'a str,
        records: &'a [StreamRecord],
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>> {
        Box::pin(async move {
            let stored_at = now_ms();
            let mut topics = self.topics.write().await;
            let docs = topics.entry(topic.to_string()).or_default();
            docs.extend(records.iter().map(|r| StoredMessage {
                payload: r.payload.clone(),
                stored_at,
            }));
            Ok(())
        })
    }
}
