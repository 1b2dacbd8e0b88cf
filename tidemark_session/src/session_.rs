use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;

use crate::backend::IdSlot;
use crate::record::{FlashLevel, SessionRecord};

/// The current HTTP session.
///
/// Cloning is cheap: all clones share the same underlying state, so a value
/// set through one clone is visible through every other. Mutations only mark
/// the session; nothing is persisted until the manager finalizes the request.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    state: RwLock<State>,
    finalized: AtomicBool,
}

/// What happened to the session over the course of the request, consumed by
/// the manager when the response is being written.
pub(crate) struct State {
    pub(crate) record: SessionRecord,
    /// The encoded bytes the session was loaded from, kept so an idle-timeout
    /// refresh can re-persist without re-encoding. Dropped on any mutation
    /// that invalidates them.
    pub(crate) raw: Option<Vec<u8>>,
    /// The session cookie value that came in with the request, if any.
    pub(crate) incoming_cookie: Option<String>,
    pub(crate) id: IdSlot,
    pub(crate) save: bool,
    pub(crate) delete: bool,
    pub(crate) reset: bool,
}

impl Session {
    pub(crate) fn new(
        record: SessionRecord,
        raw: Option<Vec<u8>>,
        incoming_cookie: Option<String>,
        id: IdSlot,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                state: RwLock::new(State {
                    record,
                    raw,
                    incoming_cookie,
                    id,
                    save: false,
                    delete: false,
                    reset: false,
                }),
                finalized: AtomicBool::new(false),
            }),
        }
    }

    /// Get the value associated with `key`, deserialized into `T`.
    ///
    /// Returns `None` if the key does not exist, an error if the stored value
    /// cannot be deserialized into `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, serde_json::Error> {
        self.read()
            .record
            .data
            .get(key)
            .map(|value| serde_json::from_value(value.clone()))
            .transpose()
    }

    /// Get the raw JSON value associated with `key`.
    pub fn get_value(&self, key: &str) -> Option<Value> {
        self.read().record.data.get(key).cloned()
    }

    /// A copy of the whole session data map.
    ///
    /// Mutating the returned map does not touch the session; use
    /// [`set`](Self::set) or [`set_all`](Self::set_all) for that.
    pub fn get_all(&self) -> HashMap<String, Value> {
        self.read().record.data.clone()
    }

    /// Set a value in the session and mark it to be saved.
    pub fn set<T: Serialize>(
        &self,
        key: impl Into<String>,
        value: T,
    ) -> Result<(), serde_json::Error> {
        let value = serde_json::to_value(value)?;
        self.set_value(key.into(), value);
        Ok(())
    }

    /// Set a raw JSON value in the session and mark it to be saved.
    pub fn set_value(&self, key: String, value: Value) {
        let mut state = self.write();
        state.delete = false;
        state.save = true;
        state.record.data.insert(key, value);
    }

    /// Replace the whole session data map and mark the session to be saved.
    pub fn set_all(&self, data: HashMap<String, Value>) {
        let mut state = self.write();
        state.delete = false;
        state.save = true;
        state.record.data = data;
    }

    /// Mark the session for deletion at the end of the request.
    ///
    /// The in-memory data is cleared immediately. A subsequent
    /// [`set`](Self::set) in the same request starts a brand new session.
    pub fn delete(&self) {
        let mut state = self.write();
        state.raw = None;
        state.record = SessionRecord::fresh(OffsetDateTime::now_utc());
        state.delete = true;
        state.save = false;
        state.reset = false;
    }

    /// Rotate the session identity while keeping its data, to prevent
    /// session fixation. Call it on privilege changes, e.g. after login.
    pub fn reset(&self) {
        let mut state = self.write();
        state.raw = None;
        state.record.created_at = OffsetDateTime::now_utc();
        state.save = false;
        state.delete = false;
        state.reset = true;
    }

    /// Is there a flash message waiting to be read?
    pub fn has_flash(&self) -> bool {
        !self.read().record.flash.is_none()
    }

    /// Is the pending flash message an error?
    pub fn flash_is_error(&self) -> bool {
        self.read().record.flash == FlashLevel::Error
    }

    /// The pending flash message, if any. Reading it consumes it: the next
    /// request will not see it again.
    pub fn take_flash_message(&self) -> Option<String> {
        let mut state = self.write();
        if state.record.flash_message.is_empty() {
            // A stale level without a message must not keep `has_flash` true.
            if !state.record.flash.is_none() {
                state.record.flash = FlashLevel::None;
                state.save = true;
            }
            return None;
        }
        let message = std::mem::take(&mut state.record.flash_message);
        state.record.flash = FlashLevel::None;
        state.save = true;
        Some(message)
    }

    /// Set an informational flash message for the next request.
    pub fn set_flash_message(&self, message: impl Into<String>) {
        let mut state = self.write();
        state.record.flash = FlashLevel::Info;
        state.record.flash_message = message.into();
        state.save = true;
    }

    /// Set an error flash message for the next request.
    pub fn set_flash_error(&self, message: impl Into<String>) {
        let mut state = self.write();
        state.record.flash = FlashLevel::Error;
        state.record.flash_message = message.into();
        state.save = true;
    }

    /// Flip the finalized flag, returning `true` to the one caller that got
    /// there first.
    pub(crate) fn try_finalize(&self) -> bool {
        !self.inner.finalized.swap(true, Ordering::SeqCst)
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.inner.state.read().expect("session state lock poisoned")
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.inner.state.write().expect("session state lock poisoned")
    }
}

impl std::fmt::Debug for Session {
    // Session data can hold credentials; keep it out of logs.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.read();
        f.debug_struct("Session")
            .field("save", &state.save)
            .field("delete", &state.delete)
            .field("reset", &state.reset)
            .finish_non_exhaustive()
    }
}
