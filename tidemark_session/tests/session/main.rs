use biscotti::{RequestCookies, ResponseCookieId, ResponseCookies};
use googletest::prelude::*;
use serde_json::json;

use tidemark_session::{finalize_session, RequestSessions, SessionConfig};

use crate::fixtures::{cookie_header, cookie_manager, processor, run_request};

mod assertions;
mod config;
mod fixtures;

#[tokio::test]
async fn finalizing_twice_is_a_no_op() {
    let manager = cookie_manager(SessionConfig::default());
    let processor = processor();
    let request_cookies = RequestCookies::parse_header("unrelated=1", &processor).unwrap();

    let session = manager.load(&request_cookies).await;
    session.set("user", "alice").unwrap();

    let first = manager.finalize(&session).await.unwrap();
    assert_that!(first, some(anything()));

    // A framework-level safety net can call finalize unconditionally without
    // double-writing.
    let second = manager.finalize(&session).await.unwrap();
    assert_that!(second, none());
}

#[tokio::test]
async fn the_middleware_attaches_the_session_cookie_to_the_response() {
    let manager = cookie_manager(SessionConfig::default());
    let processor = processor();
    let request_cookies = RequestCookies::parse_header("unrelated=1", &processor).unwrap();

    let session = manager.load(&request_cookies).await;
    session.set("user", "alice").unwrap();

    let mut response_cookies = ResponseCookies::default();
    finalize_session(&manager, &session, &mut response_cookies)
        .await
        .unwrap();

    let cookie = response_cookies
        .get(ResponseCookieId::new("__Host-session").set_path("/"))
        .unwrap();
    assert_that!(cookie.value(), starts_with("EU1."));
}

#[tokio::test]
async fn mutations_through_a_clone_are_persisted() {
    let manager = cookie_manager(SessionConfig::default());
    let processor = processor();
    let request_cookies = RequestCookies::parse_header("unrelated=1", &processor).unwrap();

    let session = manager.load(&request_cookies).await;
    let mut registry = RequestSessions::new();
    registry.attach(&manager, session.clone());

    // The handler mutates the registry's copy; the manager finalizes its own.
    registry.expect(&manager).set("user", "alice").unwrap();

    let cookie = manager.finalize(&session).await.unwrap().unwrap();
    run_request(&manager, Some(&cookie), |session| {
        assert_eq!(session.get_value("user"), Some(json!("alice")));
    })
    .await;
}

#[tokio::test]
async fn session_debug_representation_does_not_leak_data() {
    let manager = cookie_manager(SessionConfig::default());
    let cookie = run_request(&manager, None, |session| {
        session.set("user", "s3cr3t-alice").unwrap();
    })
    .await
    .unwrap();

    let header = cookie_header(&cookie);
    let processor = processor();
    let request_cookies = RequestCookies::parse_header(&header, &processor).unwrap();
    let session = manager.load(&request_cookies).await;
    assert_eq!(session.get_value("user"), Some(json!("s3cr3t-alice")));

    let debug = format!("{session:?}");
    assert_that!(debug.as_str(), not(contains_substring("s3cr3t")));
    assert_that!(debug.as_str(), not(contains_substring(cookie.value())));
}
