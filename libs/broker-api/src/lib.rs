pub mod error;
pub mod store;
pub mod types;

pub use error::{StoreError, StoreErrorKind};
pub use store::BatchStore;
pub use types::{OverflowPolicy, StreamRecord, TopicName};

// ════════════════════════════════════════════════════════════════
//  Utilities
// ════════════════════════════════════════════════════════════════

/// Current Unix time in milliseconds.
pub fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
