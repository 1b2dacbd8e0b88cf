use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use time::OffsetDateTime;

use super::errors::{DeleteError, LoadError, StoreError};
use super::{IdSlot, StorageBackend};
use crate::aead::Aead;
use crate::compress::{compress, decompress};

/// Magic prefix for an uncompressed cookie payload.
const MAGIC: &str = "EU1";
/// Magic prefix for a zlib-compressed cookie payload.
const COMPRESSED_MAGIC: &str = "EC1";

/// Payloads larger than this (expiry header included) are compressed before
/// encryption, unless compression is disabled.
const COMPRESS_THRESHOLD: usize = 512;
/// Hard ceiling on the final encoded cookie value. Browsers cap cookies at
/// 4KiB; exceeding it loses data silently, so we fail loudly instead.
const MAX_COOKIE_SIZE: usize = 4096;

/// Stores the whole session payload inside the cookie itself, encrypted and
/// authenticated. The server keeps no per-session state.
///
/// The expiry instant travels inside the ciphertext, as an 8-byte
/// little-endian unix timestamp prepended to the payload, so a client cannot
/// extend its own session by replaying an old cookie past its deadline.
pub(crate) struct CookieBackend {
    aead: Box<dyn Aead>,
    /// Doubles as the AEAD associated data, binding each ciphertext to the
    /// cookie it was minted for.
    cookie_name: String,
    disable_compression: bool,
}

impl CookieBackend {
    pub(crate) fn new(
        aead: Box<dyn Aead>,
        cookie_name: String,
        disable_compression: bool,
    ) -> Self {
        Self {
            aead,
            cookie_name,
            disable_compression,
        }
    }

    fn seal(&self, expires_at: OffsetDateTime, payload: &[u8]) -> Result<String, StoreError> {
        let unix = expires_at.unix_timestamp() as u64;
        let mut data = Vec::with_capacity(8 + payload.len());
        data.extend_from_slice(&unix.to_le_bytes());
        data.extend_from_slice(payload);

        let mut magic = MAGIC;
        if data.len() > COMPRESS_THRESHOLD && !self.disable_compression {
            data = compress(&data).map_err(StoreError::Compress)?;
            magic = COMPRESSED_MAGIC;
        }

        let ciphertext = self.aead.encrypt(&data, self.cookie_name.as_bytes())?;
        let value = format!("{magic}.{}", URL_SAFE_NO_PAD.encode(ciphertext));
        if value.len() > MAX_COOKIE_SIZE {
            return Err(StoreError::CookieTooLarge {
                size: value.len(),
                limit: MAX_COOKIE_SIZE,
            });
        }
        Ok(value)
    }
}

#[async_trait::async_trait]
impl StorageBackend for CookieBackend {
    async fn load(
        &self,
        _slot: &mut IdSlot,
        cookie_value: &str,
    ) -> Result<Option<Vec<u8>>, LoadError> {
        let Some((magic, encoded)) = cookie_value.split_once('.') else {
            return Err(LoadError::MissingSeparator);
        };
        if magic != MAGIC && magic != COMPRESSED_MAGIC {
            return Err(LoadError::BadMagic(magic.to_owned()));
        }
        let ciphertext = URL_SAFE_NO_PAD.decode(encoded)?;
        // Authenticate before touching the bytes with anything else; only
        // decompress data that has already passed the AEAD tag check.
        let mut data = self.aead.decrypt(&ciphertext, self.cookie_name.as_bytes())?;
        if magic == COMPRESSED_MAGIC {
            data = decompress(&data).map_err(LoadError::Decompress)?;
        }
        if data.len() < 8 {
            return Err(LoadError::Truncated);
        }
        let mut header = [0u8; 8];
        header.copy_from_slice(&data[..8]);
        let expired_at = OffsetDateTime::from_unix_timestamp(u64::from_le_bytes(header) as i64)
            .map_err(|_| LoadError::BadTimestamp)?;
        if expired_at < OffsetDateTime::now_utc() {
            return Err(LoadError::Expired { expired_at });
        }
        Ok(Some(data.split_off(8)))
    }

    async fn store(
        &self,
        _slot: &mut IdSlot,
        expires_at: OffsetDateTime,
        payload: &[u8],
    ) -> Result<String, StoreError> {
        self.seal(expires_at, payload)
    }

    async fn touch(
        &self,
        _slot: &mut IdSlot,
        expires_at: OffsetDateTime,
        raw: &[u8],
    ) -> Result<String, StoreError> {
        // The expiry lives outside the payload, so touching is just
        // re-sealing the same bytes under a new deadline.
        self.seal(expires_at, raw)
    }

    async fn delete(
        &self,
        _slot: &mut IdSlot,
        _incoming: Option<&str>,
    ) -> Result<(), DeleteError> {
        // Nothing is stored server-side; removal is the caller clearing the
        // cookie.
        Ok(())
    }
}

impl std::fmt::Debug for CookieBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieBackend")
            .field("cookie_name", &self.cookie_name)
            .field("disable_compression", &self.disable_compression)
            .finish_non_exhaustive()
    }
}
