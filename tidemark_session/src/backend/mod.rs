//! Where session payloads live between requests: encrypted inside the cookie
//! itself, or in a server-side KV store referenced by a cookie-carried
//! identifier.
mod cookie;
mod kv;

pub(crate) use cookie::CookieBackend;
pub(crate) use kv::KvBackend;

use time::OffsetDateTime;

use crate::SessionId;
use errors::{DeleteError, LoadError, StoreError};

/// The storage strategy behind a session manager, fixed at construction.
///
/// `store` and `touch` return the value to put in the session cookie.
#[async_trait::async_trait]
pub(crate) trait StorageBackend: Send + Sync + std::fmt::Debug {
    /// Fetch the raw session payload referenced by the incoming cookie.
    ///
    /// Returns `None` if no session exists for it (including passively
    /// expired KV rows). In KV mode, a successful hit binds the incoming
    /// identifier to `slot` so later writes in the same request reuse it.
    async fn load(&self, slot: &mut IdSlot, cookie_value: &str)
        -> Result<Option<Vec<u8>>, LoadError>;

    /// Persist `payload` until `expires_at`.
    async fn store(
        &self,
        slot: &mut IdSlot,
        expires_at: OffsetDateTime,
        payload: &[u8],
    ) -> Result<String, StoreError>;

    /// Extend the expiry of an unchanged session, re-sending the original
    /// encoded bytes rather than re-encoding.
    async fn touch(
        &self,
        slot: &mut IdSlot,
        expires_at: OffsetDateTime,
        raw: &[u8],
    ) -> Result<String, StoreError>;

    /// Remove the stored payload, if any. Idempotent.
    async fn delete(&self, slot: &mut IdSlot, incoming: Option<&str>) -> Result<(), DeleteError>;
}

/// The session identifier bound to the current request, if any.
///
/// Only meaningful in KV mode; the cookie backend carries no identity.
#[derive(Debug, Clone, Default)]
pub(crate) struct IdSlot(Option<String>);

impl IdSlot {
    pub(crate) fn bind(&mut self, id: String) {
        self.0 = Some(id);
    }

    /// The bound identifier, minting a fresh one if none is bound yet.
    pub(crate) fn get_or_mint(&mut self) -> &str {
        self.0
            .get_or_insert_with(|| SessionId::random().cookie_value())
            .as_str()
    }

    /// Replace whatever is bound with a freshly minted identifier, so a
    /// subsequent save in the same request writes under a new identity.
    pub(crate) fn mint_fresh(&mut self) {
        self.0 = Some(SessionId::random().cookie_value());
    }

    pub(crate) fn value(&self) -> Option<&str> {
        self.0.as_deref()
    }
}


/// Errors raised by the storage backends.
pub mod errors {
    use time::OffsetDateTime;

    use crate::aead::{DecryptError, EncryptError};
    use crate::kv::KvError;

    #[derive(Debug, thiserror::Error)]
    #[non_exhaustive]
    /// Why an incoming session payload could not be loaded.
    ///
    /// Every variant degrades to a fresh empty session: a corrupt or stale
    /// cookie is never the client's problem.
    pub enum LoadError {
        #[error("cookie does not contain two '.'-separated parts")]
        MissingSeparator,
        #[error("cookie has bad magic prefix: {0}")]
        BadMagic(String),
        #[error("failed to base64-decode cookie value")]
        Base64(#[from] base64::DecodeError),
        #[error("failed to decompress cookie payload")]
        Decompress(#[source] std::io::Error),
        #[error(transparent)]
        Decrypt(#[from] DecryptError),
        #[error("decrypted payload is too short to carry an expiry")]
        Truncated,
        #[error("cookie payload carries an invalid expiry timestamp")]
        BadTimestamp,
        #[error("cookie expired at {expired_at}")]
        Expired { expired_at: OffsetDateTime },
        #[error("failed to read the session from the KV store")]
        Kv(#[source] KvError),
    }

    #[derive(Debug, thiserror::Error)]
    #[non_exhaustive]
    /// Why a session payload could not be persisted.
    pub enum StoreError {
        /// The encrypted and encoded cookie exceeded the hard size ceiling.
        /// Data is never silently truncated to fit.
        #[error("cookie size {size} is greater than max {limit}")]
        CookieTooLarge { size: usize, limit: usize },
        #[error("failed to compress cookie payload")]
        Compress(#[source] std::io::Error),
        #[error(transparent)]
        Encrypt(#[from] EncryptError),
        #[error("failed to write the session to the KV store")]
        Kv(#[source] KvError),
    }

    #[derive(Debug, thiserror::Error)]
    #[non_exhaustive]
    /// Why a stored session could not be deleted.
    pub enum DeleteError {
        #[error("failed to delete the session from the KV store")]
        Kv(#[source] KvError),
    }
}
