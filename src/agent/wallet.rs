//! Wallet storage.
//!
//! Credential records and pairwise records, plus an in-memory wallet.

use crate::agent::pairwise::Pairwise;
use crate::core::{new_id, Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Credential record storage.
#[async_trait]
pub trait CredentialWallet: Send + Sync {
    /// Credential info for `cred_id`, if stored.
    async fn get_credential(&self, cred_id: &str) -> Result<Option<Value>>;

    /// Remove a credential record. Removing an absent record is not an error.
    async fn delete_credential(&self, cred_id: &str) -> Result<()>;

    /// Store a credential. Fails if a record with the same id exists.
    ///
    /// Returns the id the record was stored under.
    async fn store_credential(
        &self,
        cred_id: Option<&str>,
        metadata: &Value,
        credential: &Value,
        cred_def: &Value,
        rev_reg_def: Option<&Value>,
    ) -> Result<String>;
}

/// Pairwise record storage.
#[async_trait]
pub trait PairwiseStore: Send + Sync {
    async fn is_pairwise_exist(&self, their_did: &str) -> Result<bool>;

    async fn create_pairwise(&self, pairwise: Pairwise) -> Result<()>;

    async fn load_pairwise(&self, their_did: &str) -> Result<Option<Pairwise>>;
}

/// A stored credential.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub referent: String,
    pub schema_id: Option<String>,
    pub cred_def_id: Option<String>,
    pub rev_reg_id: Option<String>,
    /// Raw attribute values
    pub attrs: Map<String, Value>,
    pub credential: Value,
    pub metadata: Value,
}

impl CredentialRecord {
    fn from_parts(referent: &str, credential: &Value, metadata: &Value) -> Self {
        let attrs = credential
            .get("values")
            .and_then(Value::as_object)
            .map(|values| {
                values
                    .iter()
                    .map(|(name, value)| {
                        let raw = value.get("raw").cloned().unwrap_or_else(|| value.clone());
                        (name.clone(), raw)
                    })
                    .collect()
            })
            .unwrap_or_default();
        let text = |key: &str| credential.get(key).and_then(Value::as_str).map(str::to_string);

        Self {
            referent: referent.to_string(),
            schema_id: text("schema_id"),
            cred_def_id: text("cred_def_id"),
            rev_reg_id: text("rev_reg_id"),
            attrs,
            credential: credential.clone(),
            metadata: metadata.clone(),
        }
    }

    /// Indy-style `cred_info`.
    pub fn cred_info(&self) -> Value {
        serde_json::json!({
            "referent": self.referent,
            "attrs": self.attrs,
            "schema_id": self.schema_id,
            "cred_def_id": self.cred_def_id,
            "rev_reg_id": self.rev_reg_id,
            "cred_rev_id": Value::Null,
        })
    }
}

/// In-memory wallet.
#[derive(Default)]
pub struct InMemoryWallet {
    credentials: RwLock<HashMap<String, CredentialRecord>>,
    pairwise: RwLock<HashMap<String, Pairwise>>,
}

impl InMemoryWallet {
    /// Create an empty wallet.
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored credential records.
    pub fn records(&self) -> Vec<CredentialRecord> {
        self.credentials
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    /// Number of stored credentials.
    pub fn credential_count(&self) -> usize {
        self.credentials
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl CredentialWallet for InMemoryWallet {
    async fn get_credential(&self, cred_id: &str) -> Result<Option<Value>> {
        Ok(self
            .credentials
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(cred_id)
            .map(CredentialRecord::cred_info))
    }

    async fn delete_credential(&self, cred_id: &str) -> Result<()> {
        self.credentials
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(cred_id);
        Ok(())
    }

    async fn store_credential(
        &self,
        cred_id: Option<&str>,
        metadata: &Value,
        credential: &Value,
        _cred_def: &Value,
        _rev_reg_def: Option<&Value>,
    ) -> Result<String> {
        let cred_id = cred_id.map(str::to_string).unwrap_or_else(new_id);
        let mut credentials = self.credentials.write().unwrap_or_else(PoisonError::into_inner);
        if credentials.contains_key(&cred_id) {
            return Err(Error::Storage(format!(
                "credential record {} already exists",
                cred_id
            )));
        }
        credentials.insert(
            cred_id.clone(),
            CredentialRecord::from_parts(&cred_id, credential, metadata),
        );
        Ok(cred_id)
    }
}

#[async_trait]
impl PairwiseStore for InMemoryWallet {
    async fn is_pairwise_exist(&self, their_did: &str) -> Result<bool> {
        Ok(self
            .pairwise
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(their_did))
    }

    async fn create_pairwise(&self, pairwise: Pairwise) -> Result<()> {
        let mut records = self.pairwise.write().unwrap_or_else(PoisonError::into_inner);
        if records.contains_key(&pairwise.their.did) {
            return Err(Error::Storage(format!(
                "pairwise {} already exists",
                pairwise.their.did
            )));
        }
        records.insert(pairwise.their.did.clone(), pairwise);
        Ok(())
    }

    async fn load_pairwise(&self, their_did: &str) -> Result<Option<Pairwise>> {
        Ok(self
            .pairwise
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(their_did)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio_test::assert_err;

    fn credential() -> Value {
        json!({
            "schema_id": "s:1",
            "cred_def_id": "cd:1",
            "values": {
                "attr1": {"raw": "Value-1", "encoded": "123"},
                "attr2": {"raw": "456", "encoded": "456"}
            }
        })
    }

    #[tokio::test]
    async fn test_store_and_get() {
        let wallet = InMemoryWallet::new();
        let id = wallet
            .store_credential(Some("cred-1"), &json!({}), &credential(), &json!({}), None)
            .await
            .unwrap();
        assert_eq!(id, "cred-1");

        let info = wallet.get_credential("cred-1").await.unwrap().unwrap();
        assert_eq!(info["referent"], "cred-1");
        assert_eq!(info["attrs"]["attr2"], "456");
        assert_eq!(info["cred_def_id"], "cd:1");
    }

    #[tokio::test]
    async fn test_store_generates_id() {
        let wallet = InMemoryWallet::new();
        let id = wallet
            .store_credential(None, &json!({}), &credential(), &json!({}), None)
            .await
            .unwrap();
        assert!(!id.is_empty());
        assert_eq!(wallet.credential_count(), 1);
    }

    #[tokio::test]
    async fn test_store_duplicate_fails() {
        let wallet = InMemoryWallet::new();
        wallet
            .store_credential(Some("dup"), &json!({}), &credential(), &json!({}), None)
            .await
            .unwrap();
        let err = assert_err!(
            wallet
                .store_credential(Some("dup"), &json!({}), &credential(), &json!({}), None)
                .await
        );
        assert!(matches!(err, Error::Storage(_)));
    }

    #[tokio::test]
    async fn test_delete() {
        let wallet = InMemoryWallet::new();
        wallet
            .store_credential(Some("c"), &json!({}), &credential(), &json!({}), None)
            .await
            .unwrap();
        wallet.delete_credential("c").await.unwrap();
        wallet.delete_credential("c").await.unwrap();
        assert!(wallet.get_credential("c").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_pairwise_records() {
        let wallet = InMemoryWallet::new();
        let pairwise = Pairwise::new("did:me", "vk1", "did:them", "vk2");

        assert!(!wallet.is_pairwise_exist("did:them").await.unwrap());
        wallet.create_pairwise(pairwise.clone()).await.unwrap();
        assert!(wallet.is_pairwise_exist("did:them").await.unwrap());
        assert_eq!(
            wallet.load_pairwise("did:them").await.unwrap(),
            Some(pairwise.clone())
        );
        assert!(wallet.create_pairwise(pairwise).await.is_err());
    }
}
