/*!
Cookie-backed session management for browser-facing HTTP services.

# Why do we need sessions?

HTTP is stateless: each request stands on its own. Sessions attach state to
the set of requests coming from the same client, built on top of cookies —
the server sets a cookie in the response, the browser sends it back with
every subsequent request.

# Two storage modes

A [`SessionManager`] persists sessions in one of two ways, chosen at
construction:

- **Cookie mode** ([`SessionManager::cookie`]): the whole session payload
  travels inside the cookie, compressed when large and always encrypted and
  authenticated with an AEAD cipher. The server keeps no per-session state,
  so there is nothing to replicate or garbage-collect.
- **KV mode** ([`SessionManager::kv`]): the payload lives server-side in any
  store implementing the [`SessionKv`] contract; the cookie carries only a
  random identifier. Identifiers are one-way hashed before being used as
  storage keys, so a dump of the store never yields a usable session token.

In both modes the manager enforces an idle timeout and/or an absolute
lifetime, loads the session at the start of a request (degrading corrupt or
expired state to a fresh session) and persists the outcome exactly once when
the response is written.

## References

- [RFC 6265](https://datatracker.ietf.org/doc/html/rfc6265);
- [OWASP's session management cheat-sheet](https://cheatsheetseries.owasp.org/cheatsheets/Session_Management_Cheat_Sheet.html).
*/
pub mod config;

mod aead;
mod backend;
mod compress;
mod id;
mod kv;
mod manager;
mod middleware;
mod record;
mod registry;
mod session_;

pub use aead::{Aead, AesGcmAead};
pub use id::SessionId;
pub use kv::{KvError, SessionKv, SessionKvGc};
pub use manager::SessionManager;
pub use middleware::finalize_session;
pub use registry::RequestSessions;
pub use session_::Session;

pub mod errors {
    //! Everything that can go wrong while managing sessions.
    pub use crate::aead::{DecryptError, EncryptError, InvalidKeyLength};
    pub use crate::backend::errors::{DeleteError, LoadError, StoreError};
    pub use crate::config::MissingExpiryPolicy;
    pub use crate::manager::errors::{FinalizeError, SessionSetupError};
    pub use crate::record::{DecodeError, EncodeError};
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
/// Configure how sessions are managed.
///
/// The defaults follow
/// [OWASP's guidelines for secure session management](https://github.com/OWASP/ASVS/blob/67726f1976a759c58a82669d0dad3b16b9c04ecc/4.0/en/0x12-V3-Session-management.md):
/// `HttpOnly` and `Secure` cookies, `SameSite=Lax`, a host-locked cookie
/// name and a 24-hour idle timeout.
pub struct SessionConfig {
    /// Configure the session cookie.
    #[serde(default)]
    pub cookie: crate::config::SessionCookieConfig,
    /// Configure when sessions expire.
    #[serde(default)]
    pub expiry: crate::config::SessionExpiryConfig,
}
