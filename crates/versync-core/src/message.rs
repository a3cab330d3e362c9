//! Protocol messages.
//!
//! Every frame is a JSON document `{"type": "<MessageType>", "payload": {...}}`.
//! The payload is kept untyped; accessors below pull out the fields each
//! message type is expected to carry.

use crate::{MetricCatalogue, Version};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;

/// Payload field names.
pub mod keys {
    pub const TYPE: &str = "type";
    pub const PAYLOAD: &str = "payload";
    pub const REQUEST: &str = "request";
    pub const VERSION: &str = "version";
    pub const METRICS: &str = "metrics";
    pub const ERROR: &str = "error";
}

/// Message type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    // Any direction
    Uninitialized,
    NotSupported,
    Accepted,

    // Client -> Server
    Version,
    GetUpdates,
    PushSettings,

    // Server -> Client
    BadRequest,
    VersionUpdatesAvailable,
    Updates,
    Deprecated,
}

impl MessageType {
    pub const ALL: [MessageType; 10] = [
        MessageType::Uninitialized,
        MessageType::NotSupported,
        MessageType::Accepted,
        MessageType::Version,
        MessageType::GetUpdates,
        MessageType::PushSettings,
        MessageType::BadRequest,
        MessageType::VersionUpdatesAvailable,
        MessageType::Updates,
        MessageType::Deprecated,
    ];

    /// The wire tag.
    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::Uninitialized => "Uninitialized",
            MessageType::NotSupported => "NotSupported",
            MessageType::Accepted => "Accepted",
            MessageType::Version => "Version",
            MessageType::GetUpdates => "GetUpdates",
            MessageType::PushSettings => "PushSettings",
            MessageType::BadRequest => "BadRequest",
            MessageType::VersionUpdatesAvailable => "VersionUpdatesAvailable",
            MessageType::Updates => "Updates",
            MessageType::Deprecated => "Deprecated",
        }
    }

    /// Look up a type by its wire tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ty| ty.as_str() == tag)
    }

    /// Whether a message of this type can be the server's reply to `request`.
    ///
    /// Anything else arriving while a request is outstanding is a push.
    pub fn answers(self, request: MessageType) -> bool {
        match self {
            MessageType::BadRequest | MessageType::NotSupported => true,
            MessageType::Accepted => {
                matches!(request, MessageType::Version | MessageType::PushSettings)
            }
            MessageType::VersionUpdatesAvailable => request == MessageType::Version,
            MessageType::Updates => request == MessageType::GetUpdates,
            MessageType::Deprecated => request == MessageType::PushSettings,
            _ => false,
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed envelope around an untyped payload.
///
/// A `Null` payload is omitted on the wire and restored as `Null` when parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub ty: MessageType,
    pub payload: Value,
}

impl Message {
    pub fn new(ty: MessageType, payload: Value) -> Self {
        Self { ty, payload }
    }

    /// A message with no payload.
    pub fn bare(ty: MessageType) -> Self {
        Self::new(ty, Value::Null)
    }

    /// Parse one frame.
    ///
    /// Fails only if `text` is not a JSON document. A document without a
    /// recognised `type` yields an `Uninitialized` message with no payload.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let document: Value = serde_json::from_str(text).map_err(ProtocolError::Malformed)?;
        Ok(Self::from_document(document))
    }

    /// Build a message from an already-parsed document.
    pub fn from_document(document: Value) -> Self {
        let Value::Object(mut object) = document else {
            return Self::bare(MessageType::Uninitialized);
        };

        let ty = object
            .get(keys::TYPE)
            .and_then(Value::as_str)
            .and_then(MessageType::from_tag);

        match ty {
            Some(ty) => Self::new(ty, object.remove(keys::PAYLOAD).unwrap_or(Value::Null)),
            None => Self::bare(MessageType::Uninitialized),
        }
    }

    /// Render the frame text, `type` first.
    pub fn serialize(&self) -> String {
        if self.payload.is_null() {
            format!(r#"{{"{}":"{}"}}"#, keys::TYPE, self.ty)
        } else {
            format!(
                r#"{{"{}":"{}","{}":{}}}"#,
                keys::TYPE,
                self.ty,
                keys::PAYLOAD,
                self.payload
            )
        }
    }

    /// Look up a payload field.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// The required `version` field, parsed.
    pub fn version(&self) -> Result<Version, ProtocolError> {
        let raw = self
            .field(keys::VERSION)
            .ok_or(ProtocolError::MissingField(keys::VERSION))?
            .as_str()
            .ok_or(ProtocolError::InvalidField(keys::VERSION))?;
        raw.parse::<Version>().map_err(ProtocolError::Version)
    }

    /// The required `metrics` field, parsed as a catalogue.
    pub fn metrics(&self) -> Result<MetricCatalogue, ProtocolError> {
        let raw = self
            .field(keys::METRICS)
            .ok_or(ProtocolError::MissingField(keys::METRICS))?;
        if !raw.is_array() {
            return Err(ProtocolError::InvalidField(keys::METRICS));
        }
        MetricCatalogue::deserialize(raw).map_err(ProtocolError::Metrics)
    }

    /// The `error` field of a `Deprecated` message, if present.
    pub fn error_text(&self) -> Option<&str> {
        self.field(keys::ERROR).and_then(Value::as_str)
    }

    // Constructors for each payload schema.

    pub fn version_request(version: &Version) -> Self {
        Self::new(MessageType::Version, payload([(keys::VERSION, version.to_string().into())]))
    }

    pub fn get_updates() -> Self {
        Self::bare(MessageType::GetUpdates)
    }

    pub fn push_settings(version: &Version, metrics: &MetricCatalogue) -> Self {
        Self::new(
            MessageType::PushSettings,
            payload([
                (keys::METRICS, catalogue_value(metrics)),
                (keys::VERSION, version.to_string().into()),
            ]),
        )
    }

    pub fn accepted() -> Self {
        Self::bare(MessageType::Accepted)
    }

    /// `BadRequest` echoing the offending request under `request`.
    pub fn bad_request(request: Value) -> Self {
        Self::new(MessageType::BadRequest, payload([(keys::REQUEST, request)]))
    }

    /// `NotSupported` echoing the original payload.
    pub fn not_supported(original: Value) -> Self {
        Self::new(MessageType::NotSupported, original)
    }

    pub fn version_updates_available(version: &Version) -> Self {
        Self::new(
            MessageType::VersionUpdatesAvailable,
            payload([(keys::VERSION, version.to_string().into())]),
        )
    }

    pub fn updates(version: &Version, metrics: &MetricCatalogue) -> Self {
        Self::new(
            MessageType::Updates,
            payload([
                (keys::METRICS, catalogue_value(metrics)),
                (keys::VERSION, version.to_string().into()),
            ]),
        )
    }

    pub fn deprecated(version: &Version, error: impl Into<String>) -> Self {
        Self::new(
            MessageType::Deprecated,
            payload([
                (keys::VERSION, version.to_string().into()),
                (keys::ERROR, Value::String(error.into())),
            ]),
        )
    }
}

fn payload<const N: usize>(fields: [(&str, Value); N]) -> Value {
    Value::Object(
        fields
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect(),
    )
}

fn catalogue_value(metrics: &MetricCatalogue) -> Value {
    Value::Array(
        metrics
            .iter()
            .filter_map(|metric| serde_json::to_value(metric).ok())
            .collect(),
    )
}

/// Error reading a frame or one of its payload fields.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed document: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("missing payload field '{0}'")]
    MissingField(&'static str),
    #[error("payload field '{0}' has the wrong shape")]
    InvalidField(&'static str),
    #[error(transparent)]
    Version(#[from] crate::VersionParseError),
    #[error("invalid metric list: {0}")]
    Metrics(#[source] serde_json::Error),
}
