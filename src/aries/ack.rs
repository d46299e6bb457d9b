//! Acknowledgements.

use crate::core::ValidationError;
use crate::messaging::{Envelope, MessageBuilder, MessageType};
use serde::{Deserialize, Serialize};

pub const ACK: &str = "ack";
const STATUS: &str = "status";

/// Ack status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AckStatus {
    Ok,
    Fail,
    Pending,
}

impl AckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AckStatus::Ok => "OK",
            AckStatus::Fail => "FAIL",
            AckStatus::Pending => "PENDING",
        }
    }
}

/// Whether an envelope is an ack of any protocol family.
pub fn is_ack(envelope: &Envelope) -> bool {
    envelope.msg_type().name == ACK
}

/// Status of a received ack.
pub fn ack_status(envelope: &Envelope) -> Option<AckStatus> {
    if !is_ack(envelope) {
        return None;
    }
    envelope
        .field(STATUS)
        .and_then(|s| serde_json::from_value(s.clone()).ok())
}

/// Build an ack for a protocol family, threaded to the acknowledged message.
pub fn build_ack(
    family: &MessageType,
    thid: &str,
    status: AckStatus,
) -> Result<Envelope, ValidationError> {
    MessageBuilder::new(family.sibling(ACK))
        .thread(thid)
        .field(STATUS, status.as_str())
        .build()
}
