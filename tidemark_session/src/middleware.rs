use biscotti::ResponseCookies;

use crate::manager::errors::FinalizeError;
use crate::{Session, SessionManager};

/// Persist the session's outcome and attach the resulting cookie to the
/// outgoing response, if there is one.
///
/// Call it once per request, after the handler has run. Thanks to the
/// exactly-once guarantee on [`SessionManager::finalize`], it is safe to
/// invoke from a catch-all response path even when a handler may have
/// already finalized the session itself.
pub async fn finalize_session(
    manager: &SessionManager,
    session: &Session,
    response_cookies: &mut ResponseCookies<'static>,
) -> Result<(), FinalizeError> {
    if let Some(cookie) = manager.finalize(session).await? {
        response_cookies.insert(cookie);
    }
    Ok(())
}
