use std::sync::Arc;

use biscotti::{Processor, ProcessorConfig, RequestCookies, ResponseCookie};
use tidemark_session::{
    AesGcmAead, KvError, Session, SessionConfig, SessionKv, SessionManager,
};
use tidemark_session_memory_kv::InMemorySessionKv;
use time::OffsetDateTime;
use tokio::sync::Mutex;

pub const ENCRYPTION_KEY: [u8; 32] = [0x42; 32];

/// A cookie-mode manager with a fixed encryption key.
pub fn cookie_manager(config: SessionConfig) -> SessionManager {
    let aead = AesGcmAead::new(&ENCRYPTION_KEY, &[]).unwrap();
    SessionManager::cookie(aead, config).unwrap()
}

/// A KV-mode manager backed by an in-memory store, which is also returned so
/// tests can inspect what ended up in it.
pub fn kv_manager(config: SessionConfig) -> (SessionManager, InMemorySessionKv) {
    let kv = InMemorySessionKv::new();
    let manager = SessionManager::kv(Arc::new(kv.clone()), config).unwrap();
    (manager, kv)
}

/// Like [`kv_manager`], with a mechanism to inspect what calls were made to
/// the store.
pub fn spy_kv_manager(
    config: SessionConfig,
) -> (SessionManager, InMemorySessionKv, CallTracker) {
    let kv = InMemorySessionKv::new();
    let spy = SpyKv::new(kv.clone());
    let tracker = spy.call_tracker();
    let manager = SessionManager::kv(Arc::new(spy), config).unwrap();
    (manager, kv, tracker)
}

pub fn processor() -> Processor {
    ProcessorConfig::default().into()
}

/// The `Cookie` request header a browser would send back after receiving
/// `cookie` in a `Set-Cookie` header.
pub fn cookie_header(cookie: &ResponseCookie<'static>) -> String {
    format!("{}={}", cookie.name(), cookie.value())
}

/// Simulate one request/response cycle: load the session carried by
/// `incoming` (if any), run the handler against it, finalize, and return the
/// cookie attached to the response.
pub async fn run_request(
    manager: &SessionManager,
    incoming: Option<&ResponseCookie<'static>>,
    handler: impl FnOnce(&Session),
) -> Option<ResponseCookie<'static>> {
    let processor = processor();
    let header = incoming
        .map(cookie_header)
        .unwrap_or_else(|| "unrelated=1".to_owned());
    let request_cookies = RequestCookies::parse_header(&header, &processor).unwrap();
    let session = manager.load(&request_cookies).await;
    handler(&session);
    manager.finalize(&session).await.unwrap()
}

/// A wrapper that keeps track of which methods have been called on the
/// underlying session KV store.
#[derive(Debug)]
pub struct SpyKv {
    kv: InMemorySessionKv,
    call_tracker: CallTracker,
}

impl SpyKv {
    pub fn new(kv: InMemorySessionKv) -> Self {
        Self {
            kv,
            call_tracker: Default::default(),
        }
    }

    pub fn call_tracker(&self) -> CallTracker {
        self.call_tracker.clone()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CallTracker(Arc<Mutex<Vec<String>>>);

impl CallTracker {
    pub async fn assert_kv_was_untouched(&self) {
        let oplog = self.0.lock().await;
        assert!(
            oplog.is_empty(),
            "The KV store was supposed to be untouched, but at least one method has been called on it. Operation log:\n  - {}",
            oplog.join("\n  - ")
        )
    }

    pub async fn operation_log(&self) -> Vec<String> {
        self.0.lock().await.clone()
    }

    pub async fn reset_operation_log(&self) {
        self.0.lock().await.clear();
    }

    async fn push_operation(&self, op: impl Into<String>) {
        self.0.lock().await.push(op.into());
    }
}

#[async_trait::async_trait]
impl SessionKv for SpyKv {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError> {
        self.call_tracker.push_operation(format!("get {key}")).await;
        self.kv.get(key).await
    }

    async fn set(
        &self,
        key: &str,
        expires_at: OffsetDateTime,
        value: &[u8],
    ) -> Result<(), KvError> {
        self.call_tracker.push_operation(format!("set {key}")).await;
        self.kv.set(key, expires_at, value).await
    }

    async fn delete(&self, key: &str) -> Result<(), KvError> {
        self.call_tracker
            .push_operation(format!("delete {key}"))
            .await;
        self.kv.delete(key).await
    }
}

/// A store whose operations can be made to fail on demand, to exercise the
/// degradation paths.
#[derive(Debug, Default)]
pub struct FailingKv {
    pub kv: InMemorySessionKv,
    pub fail_get: bool,
    pub fail_set: bool,
    pub fail_delete: bool,
}

impl FailingKv {
    fn fault() -> KvError {
        KvError::new(std::io::Error::other("injected KV store failure"))
    }
}

#[async_trait::async_trait]
impl SessionKv for FailingKv {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError> {
        if self.fail_get {
            return Err(Self::fault());
        }
        self.kv.get(key).await
    }

    async fn set(
        &self,
        key: &str,
        expires_at: OffsetDateTime,
        value: &[u8],
    ) -> Result<(), KvError> {
        if self.fail_set {
            return Err(Self::fault());
        }
        self.kv.set(key, expires_at, value).await
    }

    async fn delete(&self, key: &str) -> Result<(), KvError> {
        if self.fail_delete {
            return Err(Self::fault());
        }
        self.kv.delete(key).await
    }
}
