//! The message envelope.
//!
//! An [`Envelope`] is an immutable Aries message: identity, type, optional
//! `~thread` and `~timing` blocks, and every other field as semi-structured
//! JSON (role fields, attachments, further decorators). Received envelopes are
//! never modified; the `with_*` methods return new envelopes.

use crate::core::{new_id, Error, Result, ValidationError};
use crate::messaging::attachment::{attach_field, Attachment, AttachmentSpec};
use crate::messaging::message_type::MessageType;
use crate::messaging::validators::{
    check_for_attributes, check_timing_order, validate_thread_block, validate_timing_block,
    ThreadBlock, TimingBlock, ID, THREAD_DECORATOR, TIMING_DECORATOR, TYPE,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

pub const PLEASE_ACK_DECORATOR: &str = "~please_ack";
pub const L10N_DECORATOR: &str = "~l10n";
pub const COMMENT: &str = "comment";

const RESERVED: [&str; 4] = [ID, TYPE, THREAD_DECORATOR, TIMING_DECORATOR];

/// An Aries message.
#[derive(Clone, Debug, PartialEq)]
pub struct Envelope {
    id: String,
    msg_type: MessageType,
    thread: Option<ThreadBlock>,
    timing: Option<TimingBlock>,
    fields: Map<String, Value>,
}

impl Envelope {
    /// Parse and validate a raw message.
    pub fn parse(raw: &Value) -> std::result::Result<Self, ValidationError> {
        let partial = raw
            .as_object()
            .ok_or_else(|| ValidationError::invalid("message", "must be a JSON object"))?;

        check_for_attributes(partial, &[ID, TYPE])?;
        let id = match &partial[ID] {
            Value::String(id) if !id.is_empty() => id.clone(),
            _ => return Err(ValidationError::invalid(ID, "must be a non-empty string")),
        };
        let msg_type = match &partial[TYPE] {
            Value::String(t) => MessageType::parse(t)?,
            _ => return Err(ValidationError::invalid(TYPE, "must be a string")),
        };

        let thread = validate_thread_block(partial, &id)?;
        let timing = validate_timing_block(partial)?;

        let fields = partial
            .iter()
            .filter(|(key, _)| !RESERVED.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Ok(Self {
            id,
            msg_type,
            thread,
            timing,
            fields,
        })
    }

    /// Parse a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: Value = serde_json::from_str(json)?;
        Ok(Self::parse(&raw)?)
    }

    /// Build a new envelope with a fresh id.
    ///
    /// With a `thread_ref` the envelope continues that thread; without one the
    /// thread block is left out and the envelope starts a new thread.
    pub fn build(
        msg_type: MessageType,
        thread_ref: Option<&str>,
        attachments: Vec<AttachmentSpec>,
        fields: Map<String, Value>,
    ) -> std::result::Result<Self, ValidationError> {
        if let Some(key) = fields.keys().find(|k| RESERVED.contains(&k.as_str())) {
            return Err(ValidationError::invalid(key, "reserved field cannot be set directly"));
        }

        let id = new_id();
        let mut fields = fields;
        for spec in attachments {
            let attachment = Attachment::attach(&id, &spec.tag, &spec.payload);
            let group = fields
                .entry(spec.field)
                .or_insert_with(|| Value::Array(Vec::new()));
            match group {
                Value::Array(items) => items.push(attachment_value(&attachment)),
                other => *other = Value::Array(vec![attachment_value(&attachment)]),
            }
        }

        Ok(Self {
            thread: thread_ref.map(ThreadBlock::new),
            id,
            msg_type,
            timing: None,
            fields,
        })
    }

    /// Message id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Declared message type.
    pub fn msg_type(&self) -> &MessageType {
        &self.msg_type
    }

    /// Whether the envelope is the given protocol step.
    pub fn is(&self, protocol: &str, name: &str) -> bool {
        self.msg_type.is(protocol, name)
    }

    /// Thread decorator, if present.
    pub fn thread(&self) -> Option<&ThreadBlock> {
        self.thread.as_ref()
    }

    /// Thread id, if present.
    pub fn thread_id(&self) -> Option<&str> {
        self.thread.as_ref().map(|t| t.thid.as_str())
    }

    /// Thread id, or the message id for a message that starts a thread.
    pub fn effective_thread_id(&self) -> &str {
        self.thread_id().unwrap_or(&self.id)
    }

    /// Timing decorator, if present.
    pub fn timing(&self) -> Option<&TimingBlock> {
        self.timing.as_ref()
    }

    /// Any non-reserved field.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// A string field.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// All non-reserved fields.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn comment(&self) -> Option<&str> {
        self.str_field(COMMENT)
    }

    /// Locale from `~l10n`.
    pub fn locale(&self) -> Option<&str> {
        self.fields
            .get(L10N_DECORATOR)
            .and_then(|l| l.get("locale"))
            .and_then(Value::as_str)
    }

    /// Message id requested by `~please_ack`.
    pub fn please_ack_id(&self) -> Option<&str> {
        self.fields
            .get(PLEASE_ACK_DECORATOR)
            .and_then(|p| p.get("message_id"))
            .and_then(Value::as_str)
    }

    /// Id an acknowledgement of this message should thread to.
    pub fn ack_message_id(&self) -> &str {
        self.please_ack_id()
            .unwrap_or_else(|| self.effective_thread_id())
    }

    /// Attachments of a group; accepts a single object or an array.
    pub fn attachments(&self, field: &str) -> std::result::Result<Vec<Attachment>, ValidationError> {
        let field = attach_field(field);
        let items = match self.fields.get(&field) {
            None | Some(Value::Null) => return Ok(Vec::new()),
            Some(Value::Array(items)) => items.clone(),
            Some(single @ Value::Object(_)) => vec![single.clone()],
            Some(_) => {
                return Err(ValidationError::MalformedAttachment(format!(
                    "{} must be an object or an array",
                    field
                )))
            }
        };
        items
            .into_iter()
            .map(|item| {
                serde_json::from_value(item)
                    .map_err(|e| ValidationError::MalformedAttachment(format!("{}: {}", field, e)))
            })
            .collect()
    }

    /// Decode an attachment payload.
    ///
    /// Looks the attachment up by `id` first and falls back to the first
    /// attachment of the group. Absence yields `Ok(None)`; undecodable payloads
    /// are validation errors.
    pub fn read_attachment(
        &self,
        field: &str,
        id: Option<&str>,
    ) -> std::result::Result<Option<Value>, ValidationError> {
        let attachments = self.attachments(field)?;
        let chosen = id
            .and_then(|id| attachments.iter().find(|a| a.id == id))
            .or_else(|| attachments.first());
        chosen.map(Attachment::decode).transpose()
    }

    /// Same envelope on the given thread.
    pub fn with_thread_id(&self, thid: &str) -> std::result::Result<Self, ValidationError> {
        if thid == self.id {
            return Err(ValidationError::ThreadInconsistent(format!(
                "Thread id {} cannot be equal to outer id {}",
                thid, self.id
            )));
        }
        let mut thread = self.thread.clone().unwrap_or_else(|| ThreadBlock::new(thid));
        thread.thid = thid.to_string();
        Ok(Self {
            thread: Some(thread),
            ..self.clone()
        })
    }

    /// Same envelope with a timing block.
    pub fn with_timing(&self, timing: TimingBlock) -> std::result::Result<Self, ValidationError> {
        check_timing_order(&timing)?;
        Ok(Self {
            timing: Some(timing),
            ..self.clone()
        })
    }

    /// Wire form.
    pub fn to_value(&self) -> Value {
        let mut raw = Map::new();
        raw.insert(ID.into(), Value::from(self.id.clone()));
        raw.insert(TYPE.into(), Value::from(self.msg_type.to_string()));
        if let Some(thread) = &self.thread {
            raw.insert(THREAD_DECORATOR.into(), thread.to_value());
        }
        if let Some(timing) = &self.timing {
            raw.insert(TIMING_DECORATOR.into(), timing.to_value());
        }
        for (key, value) in &self.fields {
            raw.insert(key.clone(), value.clone());
        }
        Value::Object(raw)
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> String {
        self.to_value().to_string()
    }
}

fn attachment_value(attachment: &Attachment) -> Value {
    serde_json::json!({
        "@id": attachment.id,
        "mime-type": attachment.mime_type,
        "data": {"base64": attachment.data.base64},
    })
}

impl Serialize for Envelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Envelope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Envelope::parse(&raw).map_err(serde::de::Error::custom)
    }
}

impl TryFrom<Value> for Envelope {
    type Error = Error;

    fn try_from(raw: Value) -> Result<Self> {
        Ok(Envelope::parse(&raw)?)
    }
}

/// Typed helpers on top of [`Envelope::build`].
#[derive(Clone, Debug)]
pub struct MessageBuilder {
    msg_type: MessageType,
    thread_ref: Option<String>,
    attachments: Vec<AttachmentSpec>,
    fields: Map<String, Value>,
}

impl MessageBuilder {
    pub fn new(msg_type: MessageType) -> Self {
        Self {
            msg_type,
            thread_ref: None,
            attachments: Vec::new(),
            fields: Map::new(),
        }
    }

    /// Continue an existing thread.
    pub fn thread(mut self, thid: &str) -> Self {
        self.thread_ref = Some(thid.to_string());
        self
    }

    /// Set an arbitrary field.
    pub fn field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    /// Set a field only when a value is given.
    pub fn optional_field(self, name: &str, value: Option<impl Into<Value>>) -> Self {
        match value {
            Some(value) => self.field(name, value),
            None => self,
        }
    }

    pub fn comment(self, comment: Option<&str>) -> Self {
        self.optional_field(COMMENT, comment)
    }

    /// Set `~l10n.locale`.
    pub fn locale(self, locale: Option<&str>) -> Self {
        match locale {
            Some(locale) => self.field(L10N_DECORATOR, serde_json::json!({ "locale": locale })),
            None => self,
        }
    }

    /// Ask the receiver to acknowledge under `message_id`.
    pub fn please_ack(self, message_id: &str) -> Self {
        self.field(
            PLEASE_ACK_DECORATOR,
            serde_json::json!({ "message_id": message_id }),
        )
    }

    /// Attach a JSON payload to the `<field>~attach` group.
    pub fn attach(mut self, field: &str, tag: &str, payload: Value) -> Self {
        self.attachments.push(AttachmentSpec::new(field, tag, payload));
        self
    }

    pub fn build(self) -> std::result::Result<Envelope, ValidationError> {
        Envelope::build(
            self.msg_type,
            self.thread_ref.as_deref(),
            self.attachments,
            self.fields,
        )
    }
}
