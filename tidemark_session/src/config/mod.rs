//! Types related to [`SessionConfig`][crate::SessionConfig].
mod cookie;
mod expiry;

pub use cookie::{SessionCookieConfig, SessionCookieKind};
pub use expiry::{MissingExpiryPolicy, SessionExpiryConfig};
