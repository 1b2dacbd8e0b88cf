//! An in-memory KV store for `tidemark_session`, geared towards testing and
//! local development.
use std::{collections::HashMap, sync::Arc};

use time::OffsetDateTime;
use tokio::sync::Mutex;

use tidemark_session::{KvError, SessionKv, SessionKvGc};

#[derive(Clone)]
/// An in-memory session KV store.
///
/// # Limitations
///
/// This store won't persist data between server restarts.
/// It also won't synchronize data between multiple server instances.
/// It is primarily intended for testing and local development.
pub struct InMemorySessionKv(Arc<Mutex<HashMap<String, StoreRecord>>>);

impl std::fmt::Debug for InMemorySessionKv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemorySessionKv").finish_non_exhaustive()
    }
}

#[derive(Debug)]
struct StoreRecord {
    value: Vec<u8>,
    deadline: OffsetDateTime,
}

impl StoreRecord {
    fn is_stale(&self) -> bool {
        self.deadline <= OffsetDateTime::now_utc()
    }
}

impl Default for InMemorySessionKv {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySessionKv {
    /// Creates a new (empty) in-memory session KV store.
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(HashMap::new())))
    }

    /// The number of rows currently held, stale ones included.
    pub async fn len(&self) -> usize {
        self.0.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.0.lock().await.is_empty()
    }
}

#[async_trait::async_trait]
impl SessionKv for InMemorySessionKv {
    /// Fetch the value stored under `key`.
    ///
    /// Expired rows are treated as missing, even before the garbage
    /// collector has swept them away.
    #[tracing::instrument(name = "Get session KV row", level = tracing::Level::TRACE, skip_all)]
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError> {
        let guard = self.0.lock().await;
        let Some(record) = guard.get(key) else {
            return Ok(None);
        };
        if record.is_stale() {
            return Ok(None);
        }
        Ok(Some(record.value.clone()))
    }

    /// Store `value` under `key`, overwriting any existing row.
    #[tracing::instrument(name = "Set session KV row", level = tracing::Level::TRACE, skip_all)]
    async fn set(
        &self,
        key: &str,
        expires_at: OffsetDateTime,
        value: &[u8],
    ) -> Result<(), KvError> {
        let mut guard = self.0.lock().await;
        guard.insert(
            key.to_owned(),
            StoreRecord {
                value: value.to_vec(),
                deadline: expires_at,
            },
        );
        Ok(())
    }

    /// Remove the row stored under `key`, if there is one.
    #[tracing::instrument(name = "Delete session KV row", level = tracing::Level::TRACE, skip_all)]
    async fn delete(&self, key: &str) -> Result<(), KvError> {
        let mut guard = self.0.lock().await;
        guard.remove(key);
        Ok(())
    }
}

#[async_trait::async_trait]
impl SessionKvGc for InMemorySessionKv {
    /// Remove all expired rows, reclaiming their memory.
    #[tracing::instrument(name = "Delete expired session KV rows", level = tracing::Level::TRACE, skip_all)]
    async fn delete_expired(&self) -> Result<usize, KvError> {
        let mut guard = self.0.lock().await;
        let before = guard.len();
        guard.retain(|_, record| !record.is_stale());
        Ok(before - guard.len())
    }
}
