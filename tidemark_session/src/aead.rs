use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_128_GCM, AES_256_GCM, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};

/// Authenticated encryption with associated data, as used to secure
/// cookie-mode session payloads.
///
/// The associated data binds a ciphertext to its context (the session cookie
/// name), so a payload cannot be replayed under a different cookie.
/// Implementations must support decrypting with older keys to keep existing
/// cookies valid across a key rotation.
pub trait Aead: Send + Sync {
    /// Encrypt `plaintext`, binding it to `associated_data`.
    fn encrypt(&self, plaintext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>, EncryptError>;

    /// Decrypt `ciphertext`, verifying it was bound to `associated_data`.
    fn decrypt(&self, ciphertext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>, DecryptError>;
}

/// An [`Aead`] implementation using AES-GCM with a random nonce prepended to
/// the ciphertext.
///
/// A single key should not be used for more than 4 billion encryptions.
/// The encryption key is used as the primary encrypt/decrypt key. Additional
/// decryption-only keys can be provided to enable key rotation: a freshly
/// rotated deployment encrypts under the new key while still accepting
/// cookies minted under the old ones.
pub struct AesGcmAead {
    // keys[0] is the encryption key; the rest are decryption-only.
    keys: Vec<LessSafeKey>,
    rng: SystemRandom,
}

impl std::fmt::Debug for AesGcmAead {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesGcmAead").finish_non_exhaustive()
    }
}

impl AesGcmAead {
    /// Build an AES-GCM AEAD from raw key material.
    ///
    /// Keys must be 16 or 32 bytes (AES-128-GCM or AES-256-GCM).
    pub fn new(
        encryption_key: &[u8],
        additional_decryption_keys: &[&[u8]],
    ) -> Result<Self, InvalidKeyLength> {
        let mut keys = Vec::with_capacity(1 + additional_decryption_keys.len());
        for raw in std::iter::once(&encryption_key).chain(additional_decryption_keys) {
            let algorithm = match raw.len() {
                16 => &AES_128_GCM,
                32 => &AES_256_GCM,
                n => return Err(InvalidKeyLength { length: n }),
            };
            let unbound = UnboundKey::new(algorithm, raw)
                .map_err(|_| InvalidKeyLength { length: raw.len() })?;
            keys.push(LessSafeKey::new(unbound));
        }
        Ok(Self {
            keys,
            rng: SystemRandom::new(),
        })
    }
}

impl Aead for AesGcmAead {
    fn encrypt(&self, plaintext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>, EncryptError> {
        let mut nonce = [0u8; NONCE_LEN];
        self.rng.fill(&mut nonce).map_err(|_| EncryptError)?;

        let mut out = Vec::with_capacity(NONCE_LEN + plaintext.len() + 16);
        out.extend_from_slice(&nonce);
        let mut in_out = plaintext.to_vec();
        self.keys[0]
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key(nonce),
                Aad::from(associated_data),
                &mut in_out,
            )
            .map_err(|_| EncryptError)?;
        out.extend_from_slice(&in_out);
        Ok(out)
    }

    fn decrypt(&self, ciphertext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>, DecryptError> {
        // A single opaque error for every failure mode: no oracle on why a
        // ciphertext was rejected.
        if ciphertext.len() < NONCE_LEN {
            return Err(DecryptError);
        }
        let (nonce, sealed) = ciphertext.split_at(NONCE_LEN);
        for key in &self.keys {
            let nonce = Nonce::try_assume_unique_for_key(nonce).map_err(|_| DecryptError)?;
            let mut in_out = sealed.to_vec();
            if let Ok(plaintext) = key.open_in_place(nonce, Aad::from(associated_data), &mut in_out)
            {
                return Ok(plaintext.to_vec());
            }
        }
        Err(DecryptError)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("AEAD keys must be 16 or 32 bytes, got {length}")]
/// The key material handed to [`AesGcmAead::new`] had an unsupported length.
pub struct InvalidKeyLength {
    /// The length of the offending key, in bytes.
    pub length: usize,
}

#[derive(Debug, thiserror::Error)]
#[error("failed to encrypt data")]
/// The error returned by [`Aead::encrypt`].
pub struct EncryptError;

#[derive(Debug, thiserror::Error)]
#[error("failed to decrypt data")]
/// The error returned by [`Aead::decrypt`].
///
/// Deliberately opaque: it covers truncated inputs, authentication failures
/// and wrong-key failures alike.
pub struct DecryptError;
