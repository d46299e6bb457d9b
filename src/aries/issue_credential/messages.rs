//! issue-credential 1.0 messages.

use crate::core::{Result, ValidationError};
use crate::messaging::{attachment_id, Envelope, MessageBuilder, MessageType};
use serde_json::{Map, Value};

pub const PROTOCOL: &str = "issue-credential";
pub const VERSION: &str = "1.0";

pub const OFFER_CREDENTIAL: &str = "offer-credential";
pub const REQUEST_CREDENTIAL: &str = "request-credential";
pub const ISSUE_CREDENTIAL: &str = "issue-credential";
pub const CREDENTIAL_PREVIEW: &str = "credential-preview";

pub const OFFERS: &str = "offers";
pub const REQUESTS: &str = "requests";
pub const CREDENTIALS: &str = "credentials";

pub const OFFER_TAG: &str = "libindy-cred-offer";
pub const CRED_DEF_TAG: &str = "cred-def";
pub const REQUEST_TAG: &str = "cred-request";
pub const CREDENTIAL_TAG: &str = "libindy-cred";

const PREVIEW_FIELD: &str = "credential_preview";
const CRED_ID_FIELD: &str = "cred_id";

/// Message type of an issue-credential step.
pub fn message_type(doc_uri: &str, name: &str) -> MessageType {
    MessageType::new(doc_uri, PROTOCOL, VERSION, name)
}

/// `credential-preview` body for a set of raw values.
pub fn credential_preview(doc_uri: &str, values: &Map<String, Value>) -> Value {
    let attributes: Vec<Value> = values
        .iter()
        .map(|(name, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            serde_json::json!({"name": name, "value": value})
        })
        .collect();
    serde_json::json!({
        "@type": message_type(doc_uri, CREDENTIAL_PREVIEW).to_string(),
        "attributes": attributes,
    })
}

/// Offer carrying the raw offer and the credential definition.
pub fn offer_credential(
    doc_uri: &str,
    offer: &Value,
    cred_def: &Value,
    preview: Option<Value>,
    comment: Option<&str>,
    locale: Option<&str>,
) -> std::result::Result<Envelope, ValidationError> {
    MessageBuilder::new(message_type(doc_uri, OFFER_CREDENTIAL))
        .comment(comment)
        .locale(locale)
        .optional_field(PREVIEW_FIELD, preview)
        .attach(OFFERS, OFFER_TAG, offer.clone())
        .attach(OFFERS, CRED_DEF_TAG, cred_def.clone())
        .build()
}

/// Request answering an offer on thread `thid`.
pub fn request_credential(
    doc_uri: &str,
    thid: &str,
    cred_request: &Value,
    comment: Option<&str>,
    locale: Option<&str>,
) -> std::result::Result<Envelope, ValidationError> {
    MessageBuilder::new(message_type(doc_uri, REQUEST_CREDENTIAL))
        .thread(thid)
        .comment(comment)
        .locale(locale)
        .attach(REQUESTS, REQUEST_TAG, cred_request.clone())
        .build()
}

/// Issued credential, asking for an ack on `thid`.
pub fn issue_credential(
    doc_uri: &str,
    thid: &str,
    credential: &Value,
    cred_id: Option<&str>,
    comment: Option<&str>,
    locale: Option<&str>,
) -> std::result::Result<Envelope, ValidationError> {
    MessageBuilder::new(message_type(doc_uri, ISSUE_CREDENTIAL))
        .thread(thid)
        .comment(comment)
        .locale(locale)
        .optional_field(CRED_ID_FIELD, cred_id)
        .please_ack(thid)
        .attach(CREDENTIALS, CREDENTIAL_TAG, credential.clone())
        .build()
}

// Exact-id lookup; positional fallback would hand back the wrong payload
// when the offer group carries two attachments.
fn tagged_attachment(envelope: &Envelope, field: &str, tag: &str) -> Result<Option<Value>> {
    let id = attachment_id(tag, envelope.id());
    let attachment = envelope.attachments(field)?.into_iter().find(|a| a.id == id);
    Ok(attachment.map(|a| a.decode()).transpose()?)
}

fn required(payload: Option<Value>, field: &str) -> Result<Value> {
    payload.ok_or_else(|| ValidationError::MissingAttribute(format!("{}~attach", field)).into())
}

/// Raw offer from an `offer-credential`.
pub fn offer_payload(envelope: &Envelope) -> Result<Value> {
    let id = attachment_id(OFFER_TAG, envelope.id());
    required(envelope.read_attachment(OFFERS, Some(&id))?, OFFERS)
}

/// Credential definition from an `offer-credential`.
pub fn cred_def_payload(envelope: &Envelope) -> Result<Value> {
    required(tagged_attachment(envelope, OFFERS, CRED_DEF_TAG)?, OFFERS)
}

/// Credential request from a `request-credential`.
pub fn request_payload(envelope: &Envelope) -> Result<Value> {
    let id = attachment_id(REQUEST_TAG, envelope.id());
    required(envelope.read_attachment(REQUESTS, Some(&id))?, REQUESTS)
}

/// Credential from an `issue-credential`.
pub fn credential_payload(envelope: &Envelope) -> Result<Value> {
    let id = attachment_id(CREDENTIAL_TAG, envelope.id());
    required(envelope.read_attachment(CREDENTIALS, Some(&id))?, CREDENTIALS)
}

/// Credential id proposed by the issuer.
pub fn proposed_cred_id(envelope: &Envelope) -> Option<&str> {
    envelope.str_field(CRED_ID_FIELD).filter(|id| !id.is_empty())
}

/// Preview attributes as `name -> value`.
pub fn preview_values(envelope: &Envelope) -> Map<String, Value> {
    envelope
        .field(PREVIEW_FIELD)
        .and_then(|p| p.get("attributes"))
        .and_then(Value::as_array)
        .map(|attributes| {
            attributes
                .iter()
                .filter_map(|a| {
                    let name = a.get("name")?.as_str()?;
                    Some((name.to_string(), a.get("value").cloned().unwrap_or(Value::Null)))
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Error;
    use serde_json::json;

    const DOC_URI: &str = "https://didcomm.org/";

    #[test]
    fn test_offer_attachments() {
        let offer = json!({"cred_def_id": "cd:1", "nonce": "1"});
        let cred_def = json!({"id": "cd:1"});
        let values = json!({"attr1": "Value-1", "attr2": 456});
        let preview = credential_preview(DOC_URI, values.as_object().unwrap());

        let env = offer_credential(DOC_URI, &offer, &cred_def, Some(preview), Some("hello"), Some("en"))
            .unwrap();

        assert!(env.is(PROTOCOL, OFFER_CREDENTIAL));
        assert!(env.thread().is_none());
        assert_eq!(env.comment(), Some("hello"));
        assert_eq!(env.locale(), Some("en"));
        assert_eq!(offer_payload(&env).unwrap(), offer);
        assert_eq!(cred_def_payload(&env).unwrap(), cred_def);

        let preview = preview_values(&env);
        assert_eq!(preview["attr1"], "Value-1");
        assert_eq!(preview["attr2"], "456");
    }

    #[test]
    fn test_request_threaded() {
        let env = request_credential(DOC_URI, "t-1", &json!({"prover_did": "did:h"}), None, None)
            .unwrap();
        assert!(env.is(PROTOCOL, REQUEST_CREDENTIAL));
        assert_eq!(env.thread_id(), Some("t-1"));
        assert_eq!(request_payload(&env).unwrap()["prover_did"], "did:h");
    }

    #[test]
    fn test_issue_asks_for_ack() {
        let env = issue_credential(DOC_URI, "t-1", &json!({"values": {}}), Some("cred-7"), None, None)
            .unwrap();
        assert_eq!(env.please_ack_id(), Some("t-1"));
        assert_eq!(env.ack_message_id(), "t-1");
        assert_eq!(proposed_cred_id(&env), Some("cred-7"));
        assert_eq!(credential_payload(&env).unwrap(), json!({"values": {}}));
    }

    #[test]
    fn test_missing_payload() {
        let env = MessageBuilder::new(message_type(DOC_URI, ISSUE_CREDENTIAL))
            .build()
            .unwrap();
        let err = credential_payload(&env).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::MissingAttribute(ref f)) if f == "credentials~attach"
        ));
        assert_eq!(proposed_cred_id(&env), None);
    }

    #[test]
    fn test_missing_cred_def_does_not_fall_back() {
        let env = MessageBuilder::new(message_type(DOC_URI, OFFER_CREDENTIAL))
            .attach(OFFERS, OFFER_TAG, json!({"nonce": "1"}))
            .build()
            .unwrap();
        assert!(offer_payload(&env).is_ok());
        assert!(cred_def_payload(&env).is_err());
    }
}
