//! Validation of the common message blocks (`~thread`, `~timing`).

use crate::core::{format_timestamp, parse_timestamp, Timestamp, ValidationError};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const ID: &str = "@id";
pub const TYPE: &str = "@type";
pub const THREAD_DECORATOR: &str = "~thread";
pub const THREAD_ID: &str = "thid";
pub const PARENT_THREAD_ID: &str = "pthid";
pub const SENDER_ORDER: &str = "sender_order";
pub const RECEIVED_ORDERS: &str = "received_orders";
pub const TIMING_DECORATOR: &str = "~timing";
pub const IN_TIME: &str = "in_time";
pub const OUT_TIME: &str = "out_time";
pub const STALE_TIME: &str = "stale_time";
pub const EXPIRES_TIME: &str = "expires_time";
pub const WAIT_UNTIL_TIME: &str = "wait_until_time";
pub const DELAY_MILLI: &str = "delay_milli";

/// The `~thread` decorator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ThreadBlock {
    pub thid: String,
    pub pthid: Option<String>,
    pub sender_order: Option<u64>,
    pub received_orders: BTreeMap<String, u64>,
}

impl ThreadBlock {
    /// Thread block carrying only a thread id.
    pub fn new(thid: &str) -> Self {
        Self {
            thid: thid.to_string(),
            pthid: None,
            sender_order: None,
            received_orders: BTreeMap::new(),
        }
    }

    /// Wire form.
    pub fn to_value(&self) -> Value {
        let mut thread = Map::new();
        thread.insert(THREAD_ID.into(), Value::from(self.thid.clone()));
        if let Some(pthid) = &self.pthid {
            thread.insert(PARENT_THREAD_ID.into(), Value::from(pthid.clone()));
        }
        if let Some(order) = self.sender_order {
            thread.insert(SENDER_ORDER.into(), Value::from(order));
        }
        if !self.received_orders.is_empty() {
            let orders = self
                .received_orders
                .iter()
                .map(|(did, order)| (did.clone(), Value::from(*order)))
                .collect();
            thread.insert(RECEIVED_ORDERS.into(), Value::Object(orders));
        }
        Value::Object(thread)
    }
}

impl TimingBlock {
    /// Wire form.
    pub fn to_value(&self) -> Value {
        let mut timing = Map::new();
        let stamps = [
            (IN_TIME, &self.in_time),
            (OUT_TIME, &self.out_time),
            (STALE_TIME, &self.stale_time),
            (EXPIRES_TIME, &self.expires_time),
            (WAIT_UNTIL_TIME, &self.wait_until_time),
        ];
        for (field, stamp) in stamps {
            if let Some(ts) = stamp {
                timing.insert(field.into(), Value::from(format_timestamp(ts)));
            }
        }
        if let Some(delay) = self.delay_milli {
            timing.insert(DELAY_MILLI.into(), Value::from(delay));
        }
        Value::Object(timing)
    }
}

/// The `~timing` decorator.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TimingBlock {
    pub in_time: Option<Timestamp>,
    pub out_time: Option<Timestamp>,
    pub stale_time: Option<Timestamp>,
    pub expires_time: Option<Timestamp>,
    pub wait_until_time: Option<Timestamp>,
    pub delay_milli: Option<u64>,
}

/// Fail with `MissingAttribute` for the first absent attribute.
pub fn check_for_attributes(
    partial: &Map<String, Value>,
    attributes: &[&str],
) -> Result<(), ValidationError> {
    for attribute in attributes {
        if !partial.contains_key(*attribute) {
            return Err(ValidationError::MissingAttribute(attribute.to_string()));
        }
    }
    Ok(())
}

/// Validate `~thread` against the outer message id.
pub fn validate_thread_block(
    partial: &Map<String, Value>,
    outer_id: &str,
) -> Result<Option<ThreadBlock>, ValidationError> {
    let thread = match partial.get(THREAD_DECORATOR) {
        None => return Ok(None),
        Some(Value::Object(thread)) => thread,
        Some(_) => {
            return Err(ValidationError::invalid(
                THREAD_DECORATOR,
                "decorator must be an object",
            ))
        }
    };

    check_for_attributes(thread, &[THREAD_ID])
        .map_err(|_| ValidationError::MissingAttribute(format!("{}.{}", THREAD_DECORATOR, THREAD_ID)))?;
    let thid = string_field(thread, THREAD_ID)?;

    if thid == outer_id {
        return Err(ValidationError::ThreadInconsistent(format!(
            "Thread id {} cannot be equal to outer id {}",
            thid, outer_id
        )));
    }

    let pthid = match thread.get(PARENT_THREAD_ID) {
        None | Some(Value::Null) => None,
        Some(_) => Some(string_field(thread, PARENT_THREAD_ID)?),
    };
    if let Some(pthid) = &pthid {
        if pthid == &thid || pthid == outer_id {
            return Err(ValidationError::ThreadInconsistent(format!(
                "Parent thread id {} must be different than thread id and outer id",
                pthid
            )));
        }
    }

    let sender_order = match thread.get(SENDER_ORDER) {
        None | Some(Value::Null) => None,
        Some(value) => Some(non_negative(SENDER_ORDER, value, ValidationError::ThreadInconsistent)?),
    };

    let mut received_orders = BTreeMap::new();
    match thread.get(RECEIVED_ORDERS) {
        None | Some(Value::Null) => {}
        Some(Value::Object(orders)) => {
            for (did, value) in orders {
                let order = non_negative(RECEIVED_ORDERS, value, ValidationError::ThreadInconsistent)?;
                received_orders.insert(did.clone(), order);
            }
        }
        Some(_) => {
            return Err(ValidationError::invalid(
                RECEIVED_ORDERS,
                "must map DIDs to orders",
            ))
        }
    }

    Ok(Some(ThreadBlock {
        thid,
        pthid,
        sender_order,
        received_orders,
    }))
}

/// Validate `~timing`.
pub fn validate_timing_block(
    partial: &Map<String, Value>,
) -> Result<Option<TimingBlock>, ValidationError> {
    let timing = match partial.get(TIMING_DECORATOR) {
        None => return Ok(None),
        Some(Value::Object(timing)) => timing,
        Some(_) => {
            return Err(ValidationError::invalid(
                TIMING_DECORATOR,
                "decorator must be an object",
            ))
        }
    };

    let block = TimingBlock {
        in_time: timestamp_field(timing, IN_TIME)?,
        out_time: timestamp_field(timing, OUT_TIME)?,
        stale_time: timestamp_field(timing, STALE_TIME)?,
        expires_time: timestamp_field(timing, EXPIRES_TIME)?,
        wait_until_time: timestamp_field(timing, WAIT_UNTIL_TIME)?,
        delay_milli: match timing.get(DELAY_MILLI) {
            None | Some(Value::Null) => None,
            Some(value) => Some(non_negative(DELAY_MILLI, value, ValidationError::TimingInconsistent)?),
        },
    };

    check_timing_order(&block)?;
    Ok(Some(block))
}

/// In time cannot be after out time; stale time cannot be after expires time.
pub fn check_timing_order(block: &TimingBlock) -> Result<(), ValidationError> {
    if let (Some(t_in), Some(t_out)) = (block.in_time, block.out_time) {
        if t_in > t_out {
            return Err(ValidationError::TimingInconsistent(format!(
                "{} cannot be greater than {}",
                IN_TIME, OUT_TIME
            )));
        }
    }
    if let (Some(t_stale), Some(t_exp)) = (block.stale_time, block.expires_time) {
        if t_stale > t_exp {
            return Err(ValidationError::TimingInconsistent(format!(
                "{} cannot be greater than {}",
                STALE_TIME, EXPIRES_TIME
            )));
        }
    }
    Ok(())
}

fn string_field(partial: &Map<String, Value>, field: &str) -> Result<String, ValidationError> {
    match partial.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Value::String(_)) => Err(ValidationError::invalid(field, "must not be empty")),
        Some(_) => Err(ValidationError::invalid(field, "must be a string")),
        None => Err(ValidationError::MissingAttribute(field.to_string())),
    }
}

fn timestamp_field(
    partial: &Map<String, Value>,
    field: &str,
) -> Result<Option<Timestamp>, ValidationError> {
    match partial.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => parse_timestamp(s)
            .map(Some)
            .ok_or_else(|| ValidationError::invalid(field, format!("\"{}\" is not an ISO-8601 datetime", s))),
        Some(_) => Err(ValidationError::invalid(field, "must be an ISO-8601 string")),
    }
}

fn non_negative(
    field: &str,
    value: &Value,
    negative: fn(String) -> ValidationError,
) -> Result<u64, ValidationError> {
    if let Some(n) = value.as_u64() {
        return Ok(n);
    }
    match value.as_i64() {
        Some(n) => Err(negative(format!("{} must be non-negative, got {}", field, n))),
        None => Err(ValidationError::invalid(field, "must be an integer")),
    }
}
