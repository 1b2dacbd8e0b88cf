use std::collections::HashMap;

use serde_json::Value;
use time::OffsetDateTime;

/// The session state as it is persisted: user data plus the metadata the
/// manager needs to enforce expiry and carry flash messages.
///
/// # Format stability
///
/// Fields are renamed to fixed numeric tags on the wire, so renaming a field
/// (or the struct) in a refactor never invalidates stored sessions. Timestamps
/// are unix seconds.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SessionRecord {
    /// When this logical session was first created. Immutable across saves
    /// and touches; re-minted by a reset or delete.
    #[serde(rename = "0", with = "unix_seconds")]
    pub(crate) created_at: OffsetDateTime,
    /// When this session was last persisted. `None` until the first save.
    #[serde(
        rename = "1",
        with = "unix_seconds_opt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub(crate) updated_at: Option<OffsetDateTime>,
    #[serde(rename = "2", default, skip_serializing_if = "FlashLevel::is_none")]
    pub(crate) flash: FlashLevel,
    #[serde(rename = "3", default, skip_serializing_if = "String::is_empty")]
    pub(crate) flash_message: String,
    /// The user-visible key-value data.
    #[serde(rename = "4", default, skip_serializing_if = "HashMap::is_empty")]
    pub(crate) data: HashMap<String, Value>,
}

impl SessionRecord {
    pub(crate) fn fresh(created_at: OffsetDateTime) -> Self {
        Self {
            created_at,
            updated_at: None,
            flash: FlashLevel::None,
            flash_message: String::new(),
            data: HashMap::new(),
        }
    }
}

/// The severity of the flash message carried by a session, if any.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum FlashLevel {
    #[default]
    None,
    Info,
    Error,
}

impl FlashLevel {
    pub(crate) fn is_none(&self) -> bool {
        matches!(self, FlashLevel::None)
    }
}

/// Serialize a [`SessionRecord`] to its wire representation.
pub(crate) fn encode(record: &SessionRecord) -> Result<Vec<u8>, EncodeError> {
    serde_json::to_vec(record).map_err(|source| EncodeError { source })
}

/// Deserialize a [`SessionRecord`] from its wire representation.
///
/// Corrupt bytes are an error for the caller to degrade on, never a panic.
pub(crate) fn decode(bytes: &[u8]) -> Result<SessionRecord, DecodeError> {
    serde_json::from_slice(bytes).map_err(|source| DecodeError { source })
}

#[derive(Debug, thiserror::Error)]
#[error("failed to serialize the session record")]
/// The session record could not be serialized.
pub struct EncodeError {
    #[source]
    source: serde_json::Error,
}

#[derive(Debug, thiserror::Error)]
#[error("failed to deserialize the session record")]
/// The stored session payload could not be deserialized.
pub struct DecodeError {
    #[source]
    source: serde_json::Error,
}

mod unix_seconds {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::OffsetDateTime;

    pub fn serialize<S: Serializer>(value: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(value.unix_timestamp())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<OffsetDateTime, D::Error> {
        let seconds = i64::deserialize(deserializer)?;
        OffsetDateTime::from_unix_timestamp(seconds).map_err(serde::de::Error::custom)
    }
}

mod unix_seconds_opt {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::OffsetDateTime;

    pub fn serialize<S: Serializer>(
        value: &Option<OffsetDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => serializer.serialize_some(&value.unix_timestamp()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<OffsetDateTime>, D::Error> {
        let seconds = Option::<i64>::deserialize(deserializer)?;
        seconds
            .map(|s| OffsetDateTime::from_unix_timestamp(s).map_err(serde::de::Error::custom))
            .transpose()
    }
}
