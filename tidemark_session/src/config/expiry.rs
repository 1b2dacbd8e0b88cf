use time::OffsetDateTime;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
/// Configure when sessions expire.
///
/// At least one of the two bounds must be configured: a session manager
/// cannot be built from a config with neither.
pub struct SessionExpiryConfig {
    /// The absolute lifetime bound: a session expires this long after its
    /// creation, regardless of activity.
    ///
    /// Unset by default.
    #[serde(with = "humantime_serde", default)]
    pub max_lifetime: Option<std::time::Duration>,
    /// The inactivity bound: a session expires this long after the last
    /// request that saved or touched it.
    ///
    /// Defaults to 24 hours.
    #[serde(with = "humantime_serde", default = "default_idle_timeout")]
    pub idle_timeout: Option<std::time::Duration>,
}

impl Default for SessionExpiryConfig {
    fn default() -> Self {
        Self {
            max_lifetime: None,
            idle_timeout: default_idle_timeout(),
        }
    }
}

fn default_idle_timeout() -> Option<std::time::Duration> {
    Some(std::time::Duration::from_secs(60 * 60 * 24))
}

impl SessionExpiryConfig {
    pub(crate) fn validate(&self) -> Result<(), MissingExpiryPolicy> {
        if self.max_lifetime.is_none() && self.idle_timeout.is_none() {
            return Err(MissingExpiryPolicy);
        }
        Ok(())
    }

    /// The moment a session created at `created_at` and last active at
    /// `last_activity` stops being valid: the earlier of the two configured
    /// bounds.
    pub(crate) fn deadline(
        &self,
        created_at: OffsetDateTime,
        last_activity: OffsetDateTime,
    ) -> OffsetDateTime {
        let absolute = self.max_lifetime.map(|max| created_at + max);
        let idle = self.idle_timeout.map(|idle| last_activity + idle);
        match (absolute, idle) {
            (Some(a), Some(i)) => a.min(i),
            (Some(a), None) => a,
            (None, Some(i)) => i,
            // Ruled out by `validate` at manager construction.
            (None, None) => unreachable!("no expiry policy configured"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("at least one of idle timeout or max lifetime must be configured")]
/// The expiry configuration specified neither an idle timeout nor a maximum
/// lifetime.
pub struct MissingExpiryPolicy;
