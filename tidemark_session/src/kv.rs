use time::OffsetDateTime;

/// The contract a storage engine must satisfy to back KV-mode sessions.
///
/// It is deliberately a dumb expiring blob store: no transactions across
/// keys, no schema. Keys handed to implementations are already one-way
/// hashed — a storage-layer read never exposes a usable session token.
#[async_trait::async_trait]
pub trait SessionKv: Send + Sync + std::fmt::Debug {
    /// Fetch the value stored under `key`.
    ///
    /// Returns `None` both for keys that never existed and for keys whose
    /// expiry has elapsed. Errors are reserved for backend faults.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError>;

    /// Store `value` under `key` until `expires_at`. Upsert semantics.
    async fn set(&self, key: &str, expires_at: OffsetDateTime, value: &[u8]) -> Result<(), KvError>;

    /// Remove the value stored under `key`.
    ///
    /// Deleting a key that does not exist is not an error.
    async fn delete(&self, key: &str) -> Result<(), KvError>;
}

/// Optional extension for engines that support actively pruning expired rows.
///
/// Passive expiry via [`SessionKv::get`] is mandatory regardless; this only
/// reclaims the storage.
#[async_trait::async_trait]
pub trait SessionKvGc: SessionKv {
    /// Delete all expired rows, returning how many were removed.
    async fn delete_expired(&self) -> Result<usize, KvError>;
}

#[derive(Debug, thiserror::Error)]
#[error("session KV store operation failed")]
/// A fault reported by the storage engine backing KV-mode sessions.
pub struct KvError(#[source] pub anyhow::Error);

impl KvError {
    pub fn new(source: impl Into<anyhow::Error>) -> Self {
        Self(source.into())
    }
}
