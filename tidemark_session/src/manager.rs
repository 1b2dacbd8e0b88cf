use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use biscotti::{RemovalCookie, RequestCookies, ResponseCookie};
use time::OffsetDateTime;

use crate::aead::Aead;
use crate::backend::{CookieBackend, IdSlot, KvBackend, StorageBackend};
use crate::config::{SessionCookieKind, SessionExpiryConfig};
use crate::kv::SessionKv;
use crate::record::{self, SessionRecord};
use crate::session_::Session;
use crate::SessionConfig;
use errors::{FinalizeError, SessionSetupError};

/// Default cookie name in cookie mode. The `__Host-` prefix pins the cookie
/// to the issuing host, over HTTPS, with no `Domain` attribute.
const DEFAULT_COOKIE_NAME: &str = "__Host-session";
/// Default cookie name in KV mode, where the cookie carries an identifier
/// rather than the session data itself.
const DEFAULT_KV_COOKIE_NAME: &str = "__Host-session-id";

static NEXT_MANAGER_ID: AtomicU64 = AtomicU64::new(0);

/// Distinguishes managers when more than one is active in the same
/// application, e.g. a user session and a short-lived checkout session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ManagerId(u64);

/// Loads sessions from incoming requests and persists their outcome when the
/// response is being written.
///
/// Construct one per logical session type, via [`cookie`](Self::cookie) or
/// [`kv`](Self::kv), and share it across requests.
#[derive(Debug)]
pub struct SessionManager {
    backend: Box<dyn StorageBackend + 'static>,
    cookie_name: String,
    domain: Option<String>,
    path: Option<String>,
    insecure: bool,
    same_site: Option<biscotti::SameSite>,
    kind: SessionCookieKind,
    expiry: SessionExpiryConfig,
    id: ManagerId,
}

impl SessionManager {
    /// A manager that stores the session data inside the cookie itself,
    /// encrypted with `aead`. The server keeps no per-session state.
    pub fn cookie(
        aead: impl Aead + 'static,
        config: SessionConfig,
    ) -> Result<Self, SessionSetupError> {
        let cookie_name = config
            .cookie
            .name
            .clone()
            .unwrap_or_else(|| DEFAULT_COOKIE_NAME.to_owned());
        let backend = CookieBackend::new(
            Box::new(aead),
            cookie_name.clone(),
            config.cookie.disable_compression,
        );
        Self::new(Box::new(backend), cookie_name, config)
    }

    /// A manager that stores the session data in `kv`, with the cookie
    /// carrying only a random identifier.
    pub fn kv(kv: Arc<dyn SessionKv>, config: SessionConfig) -> Result<Self, SessionSetupError> {
        let cookie_name = config
            .cookie
            .name
            .clone()
            .unwrap_or_else(|| DEFAULT_KV_COOKIE_NAME.to_owned());
        Self::new(Box::new(KvBackend::new(kv)), cookie_name, config)
    }

    fn new(
        backend: Box<dyn StorageBackend + 'static>,
        cookie_name: String,
        config: SessionConfig,
    ) -> Result<Self, SessionSetupError> {
        config.expiry.validate()?;
        Ok(Self {
            backend,
            cookie_name,
            domain: config.cookie.domain,
            path: config.cookie.path,
            insecure: config.cookie.insecure,
            same_site: config.cookie.same_site,
            kind: config.cookie.kind,
            expiry: config.expiry,
            id: ManagerId(NEXT_MANAGER_ID.fetch_add(1, Ordering::Relaxed)),
        })
    }

    pub(crate) fn id(&self) -> ManagerId {
        self.id
    }

    /// The resolved name of the session cookie.
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Load the session attached to the incoming request.
    ///
    /// This never fails: a missing, corrupt, expired or unloadable session
    /// degrades to a fresh empty one, with the failure logged at warning
    /// level. A broken cookie is never the client's problem.
    pub async fn load(&self, request_cookies: &RequestCookies<'_>) -> Session {
        let now = OffsetDateTime::now_utc();
        let Some(cookie) = request_cookies.get(&self.cookie_name) else {
            return Session::new(SessionRecord::fresh(now), None, None, IdSlot::default());
        };
        let cookie_value = cookie.value().to_owned();

        let mut slot = IdSlot::default();
        let bytes = match self.backend.load(&mut slot, &cookie_value).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                return Session::new(
                    SessionRecord::fresh(now),
                    None,
                    Some(cookie_value),
                    slot,
                );
            }
            Err(e) => {
                tracing::warn!(
                    error.msg = %e,
                    error.details = ?e,
                    "Failed to load the session state, starting a new session."
                );
                return Session::new(
                    SessionRecord::fresh(now),
                    None,
                    Some(cookie_value),
                    slot,
                );
            }
        };
        match record::decode(&bytes) {
            Ok(recorded) => {
                // Keep the original bytes around so an idle-timeout refresh
                // can re-persist them without re-encoding.
                let raw = self.expiry.idle_timeout.is_some().then_some(bytes);
                Session::new(recorded, raw, Some(cookie_value), slot)
            }
            Err(e) => {
                tracing::warn!(
                    error.msg = %e,
                    error.details = ?e,
                    "Failed to decode the session state, starting a new session."
                );
                Session::new(SessionRecord::fresh(now), None, Some(cookie_value), slot)
            }
        }
    }

    /// Persist the session's outcome and compute the cookie to attach to the
    /// response, if any.
    ///
    /// Exactly one invocation per session does the work; any later call is a
    /// no-op returning `Ok(None)`, so a framework-level safety net can call
    /// it unconditionally without double-writing.
    pub async fn finalize(
        &self,
        session: &Session,
    ) -> Result<Option<ResponseCookie<'static>>, FinalizeError> {
        if !session.try_finalize() {
            return Ok(None);
        }

        // Move everything we need out of the handle before the first await:
        // the session is done after finalization, nothing is written back.
        let (mut recorded, raw, incoming, mut slot, save, delete, reset) = {
            let mut state = session.write();
            (
                state.record.clone(),
                state.raw.take(),
                state.incoming_cookie.take(),
                state.id.clone(),
                state.save,
                state.delete,
                state.reset,
            )
        };
        let now = OffsetDateTime::now_utc();

        let mut removal = None;
        if delete || reset {
            self.backend
                .delete(&mut slot, incoming.as_deref())
                .await
                .map_err(|e| self.on_error(e))?;
            removal = Some(self.removal_cookie());
        }

        if save || reset {
            recorded.updated_at = Some(now);
            let deadline = self.expiry.deadline(recorded.created_at, now);
            let payload = record::encode(&recorded).map_err(|e| self.on_error(e))?;
            let value = self
                .backend
                .store(&mut slot, deadline, &payload)
                .await
                .map_err(|e| self.on_error(e))?;
            // Supersedes the removal cookie from the reset branch: same name,
            // path and domain, so inserting it replaces the removal.
            return Ok(Some(self.response_cookie(value, deadline, now)));
        }

        if let Some(removal) = removal {
            return Ok(Some(removal.into()));
        }

        if self.expiry.idle_timeout.is_some() {
            if let Some(raw) = raw {
                let deadline = self.expiry.deadline(recorded.created_at, now);
                let value = self
                    .backend
                    .touch(&mut slot, deadline, &raw)
                    .await
                    .map_err(|e| self.on_error(e))?;
                return Ok(Some(self.response_cookie(value, deadline, now)));
            }
        }

        Ok(None)
    }

    fn on_error<E: Into<FinalizeError>>(&self, e: E) -> FinalizeError {
        let e = e.into();
        tracing::error!(
            error.msg = %e,
            error.details = ?e,
            "Failed to finalize the session."
        );
        e
    }

    fn response_cookie(
        &self,
        value: String,
        deadline: OffsetDateTime,
        now: OffsetDateTime,
    ) -> ResponseCookie<'static> {
        let mut cookie = ResponseCookie::new(self.cookie_name.clone(), value)
            .set_http_only(true)
            .set_secure(!self.insecure);
        if let Some(domain) = self.domain.as_deref() {
            cookie = cookie.set_domain(domain.to_owned());
        }
        if let Some(path) = self.path.as_deref() {
            cookie = cookie.set_path(path.to_owned());
        }
        if let Some(same_site) = self.same_site {
            cookie = cookie.set_same_site(same_site);
        }
        if self.kind == SessionCookieKind::Persistent {
            cookie = cookie.set_max_age(deadline - now);
        }
        cookie
    }

    fn removal_cookie(&self) -> RemovalCookie<'static> {
        let mut cookie = RemovalCookie::new(self.cookie_name.clone());
        if let Some(domain) = self.domain.as_deref() {
            cookie = cookie.set_domain(domain.to_owned());
        }
        if let Some(path) = self.path.as_deref() {
            cookie = cookie.set_path(path.to_owned());
        }
        cookie
    }
}


/// Errors raised by [`SessionManager`].
pub mod errors {
    use crate::backend::errors::{DeleteError, StoreError};
    use crate::config::MissingExpiryPolicy;
    use crate::record::EncodeError;

    #[derive(Debug, thiserror::Error)]
    #[non_exhaustive]
    /// The manager could not be built from the given configuration.
    pub enum SessionSetupError {
        #[error(transparent)]
        MissingExpiryPolicy(#[from] MissingExpiryPolicy),
    }

    #[derive(Debug, thiserror::Error)]
    #[non_exhaustive]
    /// Something went wrong when persisting the session's outcome.
    ///
    /// Unlike load failures, these are surfaced: silently dropping a write
    /// the application asked for would be worse than failing the response.
    pub enum FinalizeError {
        #[error(transparent)]
        Serialization(#[from] EncodeError),
        #[error(transparent)]
        Store(#[from] StoreError),
        #[error(transparent)]
        Delete(#[from] DeleteError),
    }
}
