//! Aries message model
//!
//! Provides the envelope every protocol step exchanges:
//! - Message type URIs
//! - Envelope parsing, validation and construction
//! - Base64 JSON attachments
//! - `~thread` / `~timing` validation

pub mod attachment;
pub mod envelope;
pub mod message_type;
pub mod validators;

pub use attachment::{attachment_id, Attachment, AttachmentSpec};
pub use envelope::{Envelope, MessageBuilder};
pub use message_type::MessageType;
pub use validators::{ThreadBlock, TimingBlock};
