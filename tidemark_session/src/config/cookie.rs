use biscotti::SameSite;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
/// Configure the cookie used to track sessions on the client-side.
///
/// The `HttpOnly` attribute is always set: session state must never be
/// visible to JavaScript snippets running in the browser.
pub struct SessionCookieConfig {
    /// The name of the session cookie.
    ///
    /// If unset, it defaults to `__Host-session` in cookie mode and
    /// `__Host-session-id` in KV mode. The `__Host-` prefix locks the cookie
    /// to the host that set it and forbids a `Domain` attribute; drop the
    /// prefix if you need to set [`domain`][Self::domain].
    #[serde(default)]
    pub name: Option<String>,
    /// Set the `Domain` attribute on the session cookie.
    ///
    /// By default, the attribute is not set.
    #[serde(default)]
    pub domain: Option<String>,
    /// Set the `Path` attribute on the session cookie.
    ///
    /// By default, the attribute is set to `/`.
    #[serde(default = "default_cookie_path")]
    pub path: Option<String>,
    /// Skip the `Secure` attribute on the session cookie.
    ///
    /// `Secure` is set unless this override is enabled. Only enable it for
    /// local development over plain HTTP.
    #[serde(default)]
    pub insecure: bool,
    /// Set the [`SameSite`] attribute on the session cookie.
    ///
    /// By default, the attribute is set to [`SameSite::Lax`].
    #[serde(default = "default_cookie_same_site")]
    #[serde(with = "same_site")]
    pub same_site: Option<SameSite>,
    /// The kind of session cookie to use.
    ///
    /// By default, it is set to [`SessionCookieKind::Persistent`].
    #[serde(default)]
    pub kind: SessionCookieKind,
    /// Never compress cookie-mode payloads, even above the size threshold.
    ///
    /// Has no effect in KV mode, where the cookie only carries an identifier.
    #[serde(default)]
    pub disable_compression: bool,
}

impl Default for SessionCookieConfig {
    fn default() -> Self {
        Self {
            name: None,
            domain: None,
            path: default_cookie_path(),
            insecure: false,
            same_site: default_cookie_same_site(),
            kind: Default::default(),
            disable_compression: false,
        }
    }
}

fn default_cookie_path() -> Option<String> {
    Some("/".to_string())
}

fn default_cookie_same_site() -> Option<SameSite> {
    Some(SameSite::Lax)
}

/// The kind of cookie used to track sessions on the client-side.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum SessionCookieKind {
    /// A persistent session cookie.
    ///
    /// The cookie will be stored on the client's device with an
    /// expiration date set by the server via the `Max-Age` attribute.
    ///
    /// This is the default.
    #[default]
    Persistent,
    /// A cookie that expires when the browser session ends.
    ///
    /// Each browser has its own concept of "browser session", e.g. the session
    /// doesn't necessarily end when the browser window or tab is closed.
    /// Consider using [`SessionCookieKind::Persistent`]
    /// if you don't want to deal with the nuances of browser-specific behaviour.
    Session,
}

// Deserialization and serialization routines for the `same_site` attribute.
mod same_site {
    use biscotti::SameSite;
    use serde::{de, Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S>(value: &Option<SameSite>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(same_site) => {
                let same_site = match same_site {
                    SameSite::Strict => "Strict",
                    SameSite::Lax => "Lax",
                    SameSite::None => "None",
                };
                serializer.serialize_some(same_site)
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<SameSite>, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SameSiteVisitor;

        impl<'de> de::Visitor<'de> for SameSiteVisitor {
            type Value = Option<SameSite>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a string or null")
            }

            fn visit_str<E>(self, value: &str) -> Result<Option<SameSite>, E>
            where
                E: de::Error,
            {
                match value {
                    "Strict" | "strict" => Ok(Some(SameSite::Strict)),
                    "Lax" | "lax" => Ok(Some(SameSite::Lax)),
                    "None" | "none" => Ok(Some(SameSite::None)),
                    _ => Err(de::Error::unknown_variant(
                        value,
                        &["Strict", "Lax", "None"],
                    )),
                }
            }

            fn visit_none<E>(self) -> Result<Option<SameSite>, E>
            where
                E: de::Error,
            {
                Ok(None)
            }
        }

        deserializer.deserialize_option(SameSiteVisitor)
    }
}
