use serde::{Deserialize, Serialize};

/// Topic name as stored in the registry maps.
pub type TopicName = String;

// ════════════════════════════════════════════════════════════════
//  Overflow Policy
// ════════════════════════════════════════════════════════════════

/// Behavior when a subscriber's bounded channel is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// try_send(): if the channel is full — drop the record, log a warning.
    Drop,
    /// .send().await: wait for room (back-pressure, publisher never waits).
    #[serde(alias = "backpressure")]
    BackPressure,
}

// ════════════════════════════════════════════════════════════════
//  StreamRecord
// ════════════════════════════════════════════════════════════════

/// One entry of a topic log.
///
/// `id` is assigned on append and is strictly increasing within a topic;
/// comparing ids across topics is meaningless. Records are immutable and
/// leave the log only through a flush truncation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRecord {
    /// Per-topic monotonic identifier.
    pub id: u64,
    /// Owning topic.
    pub topic: TopicName,
    /// Message body as published.
    pub payload: String,
    /// Append time (Unix ms).
    pub enqueued_at: i64,
}
