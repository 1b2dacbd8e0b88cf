use std::collections::HashMap;

use crate::manager::{ManagerId, SessionManager};
use crate::session_::Session;

/// The sessions attached to the current request, keyed by the manager that
/// loaded them.
///
/// An application can run several managers side by side, e.g. a long-lived
/// user session next to a short-lived checkout session; each gets its own
/// entry. The registry travels with the request (e.g. in request extensions)
/// so handlers can retrieve the session for the manager they care about.
#[derive(Debug, Default)]
pub struct RequestSessions {
    sessions: HashMap<ManagerId, Session>,
}

impl RequestSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the session loaded by `manager` to this request.
    ///
    /// # Panics
    ///
    /// Panics if a session is already attached for the same manager: that
    /// means the middleware was installed twice, and the inner invocation
    /// would silently discard the outer one's pending changes.
    pub fn attach(&mut self, manager: &SessionManager, session: Session) {
        if self.sessions.insert(manager.id(), session).is_some() {
            panic!("the same session manager was attached twice to one request");
        }
    }

    /// The session loaded by `manager`, if one was attached.
    pub fn get(&self, manager: &SessionManager) -> Option<&Session> {
        self.sessions.get(&manager.id())
    }

    /// The session loaded by `manager`.
    ///
    /// # Panics
    ///
    /// Panics if no session was attached for `manager`, i.e. the middleware
    /// was not installed on the route that ended up calling this.
    pub fn expect(&self, manager: &SessionManager) -> &Session {
        self.get(manager)
            .unwrap_or_else(|| panic!("no session attached for this session manager"))
    }

    /// Iterate over all attached sessions.
    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }
}
