//! Message attachments (`<field>~attach`).
//!
//! Payloads are UTF-8 JSON documents carried as base64.

use crate::core::ValidationError;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Mime type of every attachment this engine produces.
pub const MIME_JSON: &str = "application/json";

/// Suffix that marks an attachment field.
pub const ATTACH_SUFFIX: &str = "~attach";

/// A single attachment descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "mime-type", default = "default_mime")]
    pub mime_type: String,
    pub data: AttachmentData,
}

/// Attachment payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentData {
    pub base64: String,
}

fn default_mime() -> String {
    MIME_JSON.to_string()
}

impl Attachment {
    /// Attach a JSON payload to the envelope with the given id.
    ///
    /// The attachment id is `<tag>-<envelope_id>`, so a reader that knows the
    /// envelope and the tag can find it again.
    pub fn attach(envelope_id: &str, tag: &str, payload: &Value) -> Self {
        Self {
            id: attachment_id(tag, envelope_id),
            mime_type: MIME_JSON.to_string(),
            data: AttachmentData {
                base64: base64::engine::general_purpose::STANDARD.encode(payload.to_string()),
            },
        }
    }

    /// Decode the payload back into JSON.
    pub fn decode(&self) -> Result<Value, ValidationError> {
        let bytes = base64::engine::general_purpose::STANDARD.decode(&self.data.base64)?;
        let text = String::from_utf8(bytes)
            .map_err(|e| ValidationError::MalformedAttachment(format!("{}: {}", self.id, e)))?;
        serde_json::from_str(&text)
            .map_err(|e| ValidationError::MalformedAttachment(format!("{}: {}", self.id, e)))
    }
}

/// Deterministic attachment id.
pub fn attachment_id(tag: &str, envelope_id: &str) -> String {
    format!("{}-{}", tag, envelope_id)
}

/// Field name for an attachment group, e.g. `requests` -> `requests~attach`.
pub fn attach_field(name: &str) -> String {
    if name.ends_with(ATTACH_SUFFIX) {
        name.to_string()
    } else {
        format!("{}{}", name, ATTACH_SUFFIX)
    }
}

/// An attachment waiting for its envelope id.
#[derive(Clone, Debug, PartialEq)]
pub struct AttachmentSpec {
    /// Group name, with or without the `~attach` suffix
    pub field: String,
    /// Role tag the attachment id is derived from
    pub tag: String,
    /// JSON payload
    pub payload: Value,
}

impl AttachmentSpec {
    pub fn new(field: &str, tag: &str, payload: Value) -> Self {
        Self {
            field: attach_field(field),
            tag: tag.to_string(),
            payload,
        }
    }
}
