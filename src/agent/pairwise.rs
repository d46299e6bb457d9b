//! Pairwise relationships.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Our side of a pairwise.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Me {
    pub did: String,
    pub verkey: String,
}

/// The counterparty side of a pairwise.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Their {
    pub did: String,
    pub verkey: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
}

/// An established DID-to-DID channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pairwise {
    pub me: Me,
    pub their: Their,
    #[serde(default)]
    pub metadata: Option<Value>,
}

impl Pairwise {
    /// Create a pairwise from both DIDs and verkeys.
    pub fn new(my_did: &str, my_verkey: &str, their_did: &str, their_verkey: &str) -> Self {
        Self {
            me: Me {
                did: my_did.to_string(),
                verkey: my_verkey.to_string(),
            },
            their: Their {
                did: their_did.to_string(),
                verkey: their_verkey.to_string(),
                label: None,
                endpoint: None,
            },
            metadata: None,
        }
    }

    /// Set the counterparty label.
    pub fn with_label(mut self, label: &str) -> Self {
        self.their.label = Some(label.to_string());
        self
    }

    /// Set the counterparty endpoint.
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.their.endpoint = Some(endpoint.to_string());
        self
    }

    /// The same relationship seen from the other side.
    pub fn reversed(&self) -> Self {
        Self::new(&self.their.did, &self.their.verkey, &self.me.did, &self.me.verkey)
    }
}
