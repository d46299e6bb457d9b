//! present-proof 1.0 messages.

use crate::core::{Result, ValidationError};
use crate::messaging::{attachment_id, Envelope, MessageBuilder, MessageType};
use serde_json::Value;

pub const PROTOCOL: &str = "present-proof";
pub const VERSION: &str = "1.0";

pub const REQUEST_PRESENTATION: &str = "request-presentation";
pub const PRESENTATION: &str = "presentation";

pub const REQUEST_PRESENTATIONS: &str = "request_presentations";
pub const PRESENTATIONS: &str = "presentations";

pub const REQUEST_TAG: &str = "libindy-request-presentation";
pub const PRESENTATION_TAG: &str = "libindy-presentation";

/// Message type of a present-proof step.
pub fn message_type(doc_uri: &str, version: &str, name: &str) -> MessageType {
    MessageType::new(doc_uri, PROTOCOL, version, name)
}

/// Request for a presentation.
pub fn request_presentation(
    doc_uri: &str,
    version: &str,
    proof_request: &Value,
    comment: Option<&str>,
    locale: Option<&str>,
) -> std::result::Result<Envelope, ValidationError> {
    MessageBuilder::new(message_type(doc_uri, version, REQUEST_PRESENTATION))
        .comment(comment)
        .locale(locale)
        .attach(REQUEST_PRESENTATIONS, REQUEST_TAG, proof_request.clone())
        .build()
}

/// Presentation answering a request on thread `thid`.
pub fn presentation(
    doc_uri: &str,
    thid: &str,
    proof: &Value,
    comment: Option<&str>,
) -> std::result::Result<Envelope, ValidationError> {
    MessageBuilder::new(message_type(doc_uri, VERSION, PRESENTATION))
        .thread(thid)
        .comment(comment)
        .attach(PRESENTATIONS, PRESENTATION_TAG, proof.clone())
        .build()
}

fn required(payload: Option<Value>, field: &str) -> Result<Value> {
    payload.ok_or_else(|| ValidationError::MissingAttribute(format!("{}~attach", field)).into())
}

/// Proof request from a `request-presentation`.
pub fn proof_request_payload(envelope: &Envelope) -> Result<Value> {
    let id = attachment_id(REQUEST_TAG, envelope.id());
    required(
        envelope.read_attachment(REQUEST_PRESENTATIONS, Some(&id))?,
        REQUEST_PRESENTATIONS,
    )
}

/// Proof from a `presentation`.
pub fn proof_payload(envelope: &Envelope) -> Result<Value> {
    let id = attachment_id(PRESENTATION_TAG, envelope.id());
    required(envelope.read_attachment(PRESENTATIONS, Some(&id))?, PRESENTATIONS)
}

/// Schema and credential definition ids a proof refers to.
pub fn proof_identifiers(proof: &Value) -> (Vec<&str>, Vec<&str>) {
    let identifiers = proof
        .get("identifiers")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    (
        identifier_values(identifiers, "schema_id"),
        identifier_values(identifiers, "cred_def_id"),
    )
}

fn identifier_values<'a>(identifiers: &'a [Value], key: &str) -> Vec<&'a str> {
    identifiers
        .iter()
        .filter_map(|i| i.get(key).and_then(Value::as_str))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const DOC_URI: &str = "https://didcomm.org/";

    #[test]
    fn test_request_presentation() {
        let proof_request = json!({"nonce": "1", "name": "Test ProofRequest", "version": "0.1"});
        let env = request_presentation(DOC_URI, "1.0", &proof_request, Some("Verification"), None)
            .unwrap();

        assert!(env.is(PROTOCOL, REQUEST_PRESENTATION));
        assert_eq!(env.msg_type().version, "1.0");
        assert_eq!(env.comment(), Some("Verification"));
        assert_eq!(proof_request_payload(&env).unwrap(), proof_request);
    }

    #[test]
    fn test_presentation() {
        let proof = json!({
            "requested_proof": {},
            "identifiers": [
                {"schema_id": "s:1", "cred_def_id": "cd:1"},
                {"schema_id": "s:1", "cred_def_id": "cd:2"}
            ]
        });
        let env = presentation(DOC_URI, "t-1", &proof, None).unwrap();

        assert_eq!(env.thread_id(), Some("t-1"));
        let decoded = proof_payload(&env).unwrap();
        let (schemas, cred_defs) = proof_identifiers(&decoded);
        assert_eq!(schemas, vec!["s:1", "s:1"]);
        assert_eq!(cred_defs, vec!["cd:1", "cd:2"]);
    }

    #[test]
    fn test_proof_without_identifiers() {
        let empty = json!({});
        let (schemas, cred_defs) = proof_identifiers(&empty);
        assert!(schemas.is_empty());
        assert!(cred_defs.is_empty());
    }

    #[test]
    fn test_missing_request() {
        let env = MessageBuilder::new(message_type(DOC_URI, VERSION, REQUEST_PRESENTATION))
            .build()
            .unwrap();
        assert!(proof_request_payload(&env).is_err());
    }
}
