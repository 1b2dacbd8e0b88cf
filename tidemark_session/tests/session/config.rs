use googletest::prelude::*;
use serde_json::json;

use tidemark_session::config::SessionCookieKind;
use tidemark_session::{AesGcmAead, SessionConfig, SessionManager};
use tidemark_session_memory_kv::InMemorySessionKv;

use crate::fixtures::{cookie_manager, kv_manager, run_request, ENCRYPTION_KEY};

#[tokio::test]
async fn each_mode_has_its_own_default_cookie_name() {
    let manager = cookie_manager(SessionConfig::default());
    assert_eq!(manager.cookie_name(), "__Host-session");

    let (manager, _) = kv_manager(SessionConfig::default());
    assert_eq!(manager.cookie_name(), "__Host-session-id");
}

#[tokio::test]
async fn the_cookie_name_can_be_overridden() {
    let mut config = SessionConfig::default();
    config.cookie.name = Some("checkout".to_owned());
    let manager = cookie_manager(config);
    assert_eq!(manager.cookie_name(), "checkout");

    let cookie = run_request(&manager, None, |session| {
        session.set("step", 1).unwrap();
    })
    .await
    .unwrap();
    assert_eq!(cookie.name(), "checkout");
}

#[test]
fn a_manager_without_any_expiry_bound_cannot_be_built() {
    let mut config = SessionConfig::default();
    config.expiry.idle_timeout = None;
    config.expiry.max_lifetime = None;

    let aead = AesGcmAead::new(&ENCRYPTION_KEY, &[]).unwrap();
    assert!(SessionManager::cookie(aead, config.clone()).is_err());
    assert!(
        SessionManager::kv(std::sync::Arc::new(InMemorySessionKv::new()), config).is_err()
    );
}

#[test]
fn config_deserializes_from_human_friendly_values() {
    let config: SessionConfig = serde_json::from_value(json!({
        "cookie": {
            "name": "my-session",
            "same_site": "strict",
            "kind": "session",
            "insecure": true,
        },
        "expiry": {
            "idle_timeout": "2h",
            "max_lifetime": "30days",
        },
    }))
    .unwrap();

    assert_eq!(config.cookie.name.as_deref(), Some("my-session"));
    assert_eq!(config.cookie.same_site, Some(biscotti::SameSite::Strict));
    assert_eq!(config.cookie.kind, SessionCookieKind::Session);
    assert!(config.cookie.insecure);
    assert_eq!(
        config.expiry.idle_timeout,
        Some(std::time::Duration::from_secs(2 * 3600))
    );
    assert_eq!(
        config.expiry.max_lifetime,
        Some(std::time::Duration::from_secs(30 * 24 * 3600))
    );
}

#[test]
fn defaults_are_sensible() {
    let config = SessionConfig::default();
    assert_eq!(config.cookie.name, None);
    assert_eq!(config.cookie.path.as_deref(), Some("/"));
    assert_eq!(config.cookie.same_site, Some(biscotti::SameSite::Lax));
    assert_eq!(config.cookie.kind, SessionCookieKind::Persistent);
    assert!(!config.cookie.insecure);
    assert_eq!(
        config.expiry.idle_timeout,
        Some(std::time::Duration::from_secs(24 * 3600))
    );
    assert_eq!(config.expiry.max_lifetime, None);
}

#[tokio::test]
async fn persistent_cookies_carry_a_max_age_capped_by_the_expiry() {
    let mut config = SessionConfig::default();
    config.expiry.idle_timeout = Some(std::time::Duration::from_secs(3600));
    let manager = cookie_manager(config);

    let cookie = run_request(&manager, None, |session| {
        session.set("user", "alice").unwrap();
    })
    .await
    .unwrap();

    assert_eq!(cookie.http_only(), Some(true));
    assert_eq!(cookie.secure(), Some(true));
    assert_eq!(cookie.same_site(), Some(biscotti::SameSite::Lax));
    assert_eq!(cookie.path(), Some("/"));
    let max_age = cookie.max_age().unwrap();
    assert!(max_age <= time::Duration::seconds(3600));
    assert!(max_age > time::Duration::seconds(3500));
}

#[tokio::test]
async fn browser_session_cookies_carry_no_max_age() {
    let mut config = SessionConfig::default();
    config.cookie.kind = SessionCookieKind::Session;
    let manager = cookie_manager(config);

    let cookie = run_request(&manager, None, |session| {
        session.set("user", "alice").unwrap();
    })
    .await
    .unwrap();

    assert_that!(cookie.max_age(), none());
}

#[tokio::test]
async fn the_insecure_override_drops_the_secure_attribute() {
    let mut config = SessionConfig::default();
    config.cookie.name = Some("dev-session".to_owned());
    config.cookie.insecure = true;
    let manager = cookie_manager(config);

    let cookie = run_request(&manager, None, |session| {
        session.set("user", "alice").unwrap();
    })
    .await
    .unwrap();

    assert_eq!(cookie.secure(), Some(false));
    // HttpOnly is not negotiable.
    assert_eq!(cookie.http_only(), Some(true));
}
