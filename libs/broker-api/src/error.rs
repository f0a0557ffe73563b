// ════════════════════════════════════════════════════════════════
//  Store Error
// ════════════════════════════════════════════════════════════════

/// Category of a store error. Lets the broker decide how to react
/// (a flush that fails with a transient kind is simply retried on the
/// next scheduler tick).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    /// I/O or network error — transient, safe to retry.
    Io,
    /// Store is reachable but refused the batch (schema, size, auth).
    Rejected,
    /// Store is down or not configured — transient.
    Unavailable,
}

impl std::fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreErrorKind::Io => f.write_str("io"),
            StoreErrorKind::Rejected => f.write_str("rejected"),
            StoreErrorKind::Unavailable => f.write_str("unavailable"),
        }
    }
}

/// Error type for the durable-store collaborator boundary.
///
/// Carries a `StoreErrorKind` for categorization and a human-readable
/// message. `From` impls assign the kind automatically and allow
/// ergonomic `?` in store implementations.
#[derive(Clone)]
pub struct StoreError {
    kind: StoreErrorKind,
    message: String,
}

impl StoreError {
    /// I/O error — transient, retried on the next flush attempt.
    pub fn io(msg: impl Into<String>) -> Self {
        Self { kind: StoreErrorKind::Io, message: msg.into() }
    }

    /// Batch rejected by the store.
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self { kind: StoreErrorKind::Rejected, message: msg.into() }
    }

    /// Store unreachable.
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self { kind: StoreErrorKind::Unavailable, message: msg.into() }
    }

    pub fn kind(&self) -> StoreErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Debug for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        Self { kind: StoreErrorKind::Io, message: e.to_string() }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self { kind: StoreErrorKind::Rejected, message: e.to_string() }
    }
}
