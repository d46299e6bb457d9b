//! Problem reports.

use crate::core::{ProblemCode, ValidationError};
use crate::messaging::{Envelope, MessageBuilder, MessageType};

pub const PROBLEM_REPORT: &str = "problem-report";
const LEGACY_PROBLEM_REPORT: &str = "problem_report";
const PROBLEM_CODE: &str = "problem-code";
const EXPLAIN: &str = "explain";

/// A problem report body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProblemReport {
    pub problem_code: ProblemCode,
    pub explain: String,
}

impl ProblemReport {
    pub fn new(problem_code: ProblemCode, explain: &str) -> Self {
        Self {
            problem_code,
            explain: explain.to_string(),
        }
    }

    /// Whether an envelope is a problem report of any protocol family.
    pub fn is_problem_report(envelope: &Envelope) -> bool {
        let name = envelope.msg_type().name.as_str();
        name == PROBLEM_REPORT || name == LEGACY_PROBLEM_REPORT
    }

    /// Read a received problem report.
    pub fn from_envelope(envelope: &Envelope) -> Option<Self> {
        if !Self::is_problem_report(envelope) {
            return None;
        }
        Some(Self {
            problem_code: ProblemCode::parse(envelope.str_field(PROBLEM_CODE).unwrap_or_default()),
            explain: envelope.str_field(EXPLAIN).unwrap_or_default().to_string(),
        })
    }

    /// Build the report for a protocol family, on the given thread.
    pub fn to_envelope(
        &self,
        family: &MessageType,
        thid: Option<&str>,
    ) -> Result<Envelope, ValidationError> {
        let mut builder = MessageBuilder::new(family.sibling(PROBLEM_REPORT))
            .field(PROBLEM_CODE, self.problem_code.as_str())
            .field(EXPLAIN, self.explain.as_str());
        if let Some(thid) = thid {
            builder = builder.thread(thid);
        }
        builder.build()
    }
}
