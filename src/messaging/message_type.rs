//! Aries message type URIs.
//!
//! A type looks like `https://didcomm.org/issue-credential/1.0/offer-credential`
//! or, in the legacy form, `did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/issue-credential/1.0/offer-credential`.

use crate::core::ValidationError;

/// A parsed `@type`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MessageType {
    /// Prefix up to and including the trailing separator
    pub doc_uri: String,
    /// Protocol family, e.g. "issue-credential"
    pub protocol: String,
    /// Protocol version, e.g. "1.0"
    pub version: String,
    /// Message name, e.g. "offer-credential"
    pub name: String,
}

impl MessageType {
    /// Build a type from parts.
    pub fn new(doc_uri: &str, protocol: &str, version: &str, name: &str) -> Self {
        let mut doc_uri = doc_uri.to_string();
        if !doc_uri.ends_with('/') {
            doc_uri.push('/');
        }
        Self {
            doc_uri,
            protocol: protocol.to_string(),
            version: version.to_string(),
            name: name.to_string(),
        }
    }

    /// Parse a `@type` string.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let mut parts = raw.rsplitn(4, '/');
        let name = parts.next().unwrap_or_default();
        let version = parts.next().unwrap_or_default();
        let protocol = parts.next().unwrap_or_default();
        let doc_uri = parts.next().unwrap_or_default();

        if [doc_uri, protocol, version, name].iter().any(|p| p.is_empty()) {
            return Err(ValidationError::invalid(
                "@type",
                format!("\"{}\" is not a message type URI", raw),
            ));
        }

        Ok(Self::new(doc_uri, protocol, version, name))
    }

    /// Whether this type names the given protocol step, regardless of prefix and version.
    pub fn is(&self, protocol: &str, name: &str) -> bool {
        self.protocol == protocol && self.name == name
    }

    /// Same family and version, different message name.
    pub fn sibling(&self, name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..self.clone()
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{}/{}/{}",
            self.doc_uri, self.protocol, self.version, self.name
        )
    }
}

impl std::str::FromStr for MessageType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_https() {
        let t = MessageType::parse("https://didcomm.org/issue-credential/1.0/offer-credential")
            .unwrap();
        assert_eq!(t.doc_uri, "https://didcomm.org/");
        assert_eq!(t.protocol, "issue-credential");
        assert_eq!(t.version, "1.0");
        assert_eq!(t.name, "offer-credential");
        assert_eq!(
            t.to_string(),
            "https://didcomm.org/issue-credential/1.0/offer-credential"
        );
    }

    #[test]
    fn test_parse_legacy() {
        let t = MessageType::parse(
            "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/present-proof/1.0/presentation",
        )
        .unwrap();
        assert_eq!(t.doc_uri, "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/");
        assert!(t.is("present-proof", "presentation"));
    }

    #[test]
    fn test_parse_rejects_short() {
        assert!(MessageType::parse("offer-credential").is_err());
        assert!(MessageType::parse("issue-credential/1.0/offer").is_err());
        assert!(MessageType::parse("").is_err());
    }

    #[test]
    fn test_new_appends_separator() {
        let t = MessageType::new("https://didcomm.org", "notification", "1.0", "ack");
        assert_eq!(t.to_string(), "https://didcomm.org/notification/1.0/ack");
    }

    #[test]
    fn test_sibling() {
        let t = MessageType::new("https://didcomm.org/", "issue-credential", "1.0", "offer-credential");
        let s = t.sibling("problem-report");
        assert!(s.is("issue-credential", "problem-report"));
        assert_eq!(s.version, "1.0");
    }
}
