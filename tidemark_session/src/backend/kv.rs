use std::sync::Arc;

use sha2::{Digest, Sha256};
use time::OffsetDateTime;

use super::errors::{DeleteError, LoadError, StoreError};
use super::{IdSlot, StorageBackend};
use crate::kv::SessionKv;

/// Stores session payloads server-side, with the cookie carrying only a
/// random identifier.
///
/// The identifier is hashed before it is used as a storage key: a dump of
/// the KV store never contains a usable session token.
#[derive(Debug)]
pub(crate) struct KvBackend {
    kv: Arc<dyn SessionKv>,
}

impl KvBackend {
    pub(crate) fn new(kv: Arc<dyn SessionKv>) -> Self {
        Self { kv }
    }
}

fn storage_key(id: &str) -> String {
    hex::encode(Sha256::digest(id.as_bytes()))
}

#[async_trait::async_trait]
impl StorageBackend for KvBackend {
    async fn load(
        &self,
        slot: &mut IdSlot,
        cookie_value: &str,
    ) -> Result<Option<Vec<u8>>, LoadError> {
        let payload = self
            .kv
            .get(&storage_key(cookie_value))
            .await
            .map_err(LoadError::Kv)?;
        if payload.is_some() {
            // Bind the incoming identifier so a save later in this request
            // updates the existing row instead of minting a new one.
            slot.bind(cookie_value.to_owned());
        }
        Ok(payload)
    }

    async fn store(
        &self,
        slot: &mut IdSlot,
        expires_at: OffsetDateTime,
        payload: &[u8],
    ) -> Result<String, StoreError> {
        let id = slot.get_or_mint().to_owned();
        self.kv
            .set(&storage_key(&id), expires_at, payload)
            .await
            .map_err(StoreError::Kv)?;
        Ok(id)
    }

    async fn touch(
        &self,
        slot: &mut IdSlot,
        expires_at: OffsetDateTime,
        raw: &[u8],
    ) -> Result<String, StoreError> {
        self.store(slot, expires_at, raw).await
    }

    async fn delete(&self, slot: &mut IdSlot, incoming: Option<&str>) -> Result<(), DeleteError> {
        if let Some(id) = slot.value().or(incoming) {
            self.kv
                .delete(&storage_key(id))
                .await
                .map_err(DeleteError::Kv)?;
        }
        // A save later in this request must not resurrect the deleted row.
        slot.mint_fresh();
        Ok(())
    }
}
