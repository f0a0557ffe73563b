use std::future::Future;
use std::pin::Pin;

use crate::{StoreError, StreamRecord};

// ════════════════════════════════════════════════════════════════
//  Batch Store
// ════════════════════════════════════════════════════════════════

/// Durable store receiving flushed batches.
///
/// The broker depends on nothing about the store beyond this method:
/// one ordered batch per call, success or failure. A failed call must
/// leave the store without a partial batch visible to readers — the
/// broker will retry the same records on the next flush.
///
/// Implementations: `store-memory` (built-in), document stores behind
/// their own crates. The trait uses a manual boxed future so this API
/// crate carries no async-runtime dependency.
pub trait BatchStore: Send + Sync {
    /// Persist `records` (oldest first) for `topic`.
    fn persist_batch<'a>(
        &'a self,
        topic: &'a str,
        records: &'a [StreamRecord],
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>>;
}
