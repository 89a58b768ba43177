//! Error types for key/value store operations.

/// Errors that can occur while building a store.
///
/// Lookups of absent keys are not errors; they surface as `None`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A store needs at least one bucket to hash into.
    #[error("bucket count must be at least 1")]
    ZeroBuckets,
}
