//! Test agents wired to an in-memory network.
//!
//! The mock AnonCreds keeps credentials as plain JSON and checks predicates
//! against encoded values; it is only good enough to drive the role machines.

use crate::agent::codec::{encode_value, raw_value};
use crate::agent::{
    generate_nonce, AnonCreds, CredentialRequest, InMemoryWallet, IssuedCredential, Ledger,
    Pairwise,
};
use crate::core::{EngineConfig, Error, Result};
use crate::messaging::Envelope;
use crate::transport::{MemoryNetwork, MemoryTransport, Transport};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub(crate) struct MockAnonCreds {
    wallet: Arc<InMemoryWallet>,
}

#[async_trait]
impl AnonCreds for MockAnonCreds {
    async fn issuer_create_credential_offer(&self, cred_def_id: &str) -> Result<Value> {
        Ok(json!({
            "schema_id": "s:1",
            "cred_def_id": cred_def_id,
            "nonce": generate_nonce(),
            "key_correctness_proof": {},
        }))
    }

    async fn issuer_create_credential(
        &self,
        offer: &Value,
        request: &Value,
        values: &Value,
        rev_reg_id: Option<&str>,
    ) -> Result<IssuedCredential> {
        if request["nonce"] != offer["nonce"] {
            return Err(Error::AnonCreds("credential request does not match offer".into()));
        }
        Ok(IssuedCredential {
            credential: json!({
                "schema_id": offer["schema_id"],
                "cred_def_id": offer["cred_def_id"],
                "rev_reg_id": rev_reg_id,
                "values": values,
                "signature": {"prover_did": request["prover_did"]},
            }),
            revoc_id: None,
            revoc_reg_delta: None,
        })
    }

    async fn prover_create_credential_req(
        &self,
        prover_did: &str,
        offer: &Value,
        cred_def: &Value,
        master_secret_id: &str,
    ) -> Result<CredentialRequest> {
        if cred_def["id"] != offer["cred_def_id"] {
            return Err(Error::AnonCreds("offer is for another credential definition".into()));
        }
        Ok(CredentialRequest {
            request: json!({
                "prover_did": prover_did,
                "cred_def_id": offer["cred_def_id"],
                "blinded_ms": {"name": master_secret_id},
                "nonce": offer["nonce"],
            }),
            metadata: json!({"master_secret_name": master_secret_id, "nonce": offer["nonce"]}),
        })
    }

    async fn prover_search_credentials_for_proof_req(
        &self,
        proof_request: &Value,
        limit_referents: usize,
    ) -> Result<Value> {
        let records = self.wallet.records();
        let mut result = Map::new();
        for (group, key) in [("requested_attributes", "attrs"), ("requested_predicates", "predicates")] {
            let mut found = Map::new();
            for (referent, spec) in proof_request[group].as_object().into_iter().flatten() {
                let name = spec["name"].as_str().unwrap_or_default();
                let matches: Vec<Value> = records
                    .iter()
                    .filter(|r| r.attrs.contains_key(name))
                    .take(limit_referents)
                    .map(|r| json!({"cred_info": r.cred_info(), "interval": null}))
                    .collect();
                found.insert(referent.clone(), Value::Array(matches));
            }
            result.insert(key.to_string(), Value::Object(found));
        }
        Ok(Value::Object(result))
    }

    async fn prover_create_proof(
        &self,
        proof_request: &Value,
        requested_credentials: &Value,
        _master_secret_id: &str,
        schemas: &Value,
        cred_defs: &Value,
        _rev_states: &Value,
    ) -> Result<Value> {
        let records: HashMap<String, _> = self
            .wallet
            .records()
            .into_iter()
            .map(|r| (r.referent.clone(), r))
            .collect();
        let attribute = |group: &str, referent: &str, cred_id: &Value| -> Result<(Value, Value)> {
            let record = cred_id
                .as_str()
                .and_then(|id| records.get(id))
                .ok_or_else(|| Error::AnonCreds(format!("no credential for {}", referent)))?;
            let cred_def_id = record.cred_def_id.clone().unwrap_or_default();
            if cred_defs.get(&cred_def_id).is_none() {
                return Err(Error::AnonCreds(format!("cred def {} not supplied", cred_def_id)));
            }
            let name = proof_request[group][referent]["name"].as_str().unwrap_or_default();
            let value = record.attrs.get(name).cloned().unwrap_or(Value::Null);
            let identifier = json!({
                "schema_id": record.schema_id,
                "cred_def_id": record.cred_def_id,
                "rev_reg_id": null,
                "timestamp": null,
            });
            Ok((value, identifier))
        };

        let mut revealed_attrs = Map::new();
        let mut predicates = Map::new();
        let mut predicate_values = Map::new();
        let mut identifiers = Vec::new();
        for (referent, selected) in requested_credentials["requested_attributes"]
            .as_object()
            .into_iter()
            .flatten()
        {
            let (value, identifier) = attribute("requested_attributes", referent.as_str(), &selected["cred_id"])?;
            revealed_attrs.insert(
                referent.clone(),
                json!({"sub_proof_index": identifiers.len(), "raw": raw_value(&value), "encoded": encode_value(&value)}),
            );
            identifiers.push(identifier);
        }
        for (referent, selected) in requested_credentials["requested_predicates"]
            .as_object()
            .into_iter()
            .flatten()
        {
            let (value, identifier) = attribute("requested_predicates", referent.as_str(), &selected["cred_id"])?;
            predicates.insert(referent.clone(), json!({"sub_proof_index": identifiers.len()}));
            predicate_values.insert(referent.clone(), json!(encode_value(&value)));
            identifiers.push(identifier);
        }

        Ok(json!({
            "proof": {"predicate_values": predicate_values, "schemas_seen": schemas.as_object().map(Map::len)},
            "requested_proof": {
                "revealed_attrs": revealed_attrs,
                "self_attested_attrs": {},
                "unrevealed_attrs": {},
                "predicates": predicates,
            },
            "identifiers": identifiers,
        }))
    }

    async fn verifier_verify_proof(
        &self,
        proof_request: &Value,
        proof: &Value,
        _schemas: &Value,
        cred_defs: &Value,
        _rev_reg_defs: &Value,
        _rev_regs: &Value,
    ) -> Result<bool> {
        for identifier in proof["identifiers"].as_array().into_iter().flatten() {
            let cred_def_id = identifier["cred_def_id"].as_str().unwrap_or_default();
            if cred_defs.get(cred_def_id).is_none() {
                return Err(Error::AnonCreds(format!("cred def {} not supplied", cred_def_id)));
            }
        }
        let revealed = &proof["requested_proof"]["revealed_attrs"];
        for referent in proof_request["requested_attributes"].as_object().into_iter().flatten().map(|(k, _)| k) {
            if revealed.get(referent).is_none() {
                return Ok(false);
            }
        }
        for (referent, predicate) in proof_request["requested_predicates"].as_object().into_iter().flatten() {
            let value = proof["proof"]["predicate_values"][referent]
                .as_str()
                .and_then(|v| v.parse::<i64>().ok());
            let bound = predicate["p_value"].as_i64();
            let holds = match (value, bound, predicate["p_type"].as_str()) {
                (Some(v), Some(b), Some(">=")) => v >= b,
                (Some(v), Some(b), Some(">")) => v > b,
                (Some(v), Some(b), Some("<=")) => v <= b,
                (Some(v), Some(b), Some("<")) => v < b,
                _ => false,
            };
            if !holds {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

pub(crate) struct MockLedger;

#[async_trait]
impl Ledger for MockLedger {
    async fn fetch_schema(&self, schema_id: &str) -> Result<Value> {
        Ok(json!({"id": schema_id, "attrNames": ["attr1", "attr2", "attr3"]}))
    }

    async fn fetch_cred_def(&self, cred_def_id: &str) -> Result<Value> {
        Ok(json!({"id": cred_def_id, "type": "CL"}))
    }
}

pub(crate) struct TestAgent {
    pub did: String,
    pub endpoint: MemoryTransport,
    pub wallet: Arc<InMemoryWallet>,
    pub anoncreds: Arc<MockAnonCreds>,
    pub ledger: Arc<MockLedger>,
}

impl TestAgent {
    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::new(self.endpoint.clone())
    }

    /// This agent's view of a relationship with `other`.
    pub fn pairwise_with(&self, other: &TestAgent) -> Pairwise {
        Pairwise::new(
            &self.did,
            &format!("vk:{}", self.did),
            &other.did,
            &format!("vk:{}", other.did),
        )
    }
}

pub(crate) fn agent(network: &MemoryNetwork, did: &str) -> TestAgent {
    let wallet = Arc::new(InMemoryWallet::new());
    TestAgent {
        did: did.to_string(),
        endpoint: network.endpoint(did),
        anoncreds: Arc::new(MockAnonCreds {
            wallet: wallet.clone(),
        }),
        ledger: Arc::new(MockLedger),
        wallet,
    }
}

pub(crate) fn test_config() -> EngineConfig {
    EngineConfig::default().with_time_to_live(Duration::from_secs(5))
}

pub(crate) fn credential_values() -> Map<String, Value> {
    let mut values = Map::new();
    values.insert("attr1".to_string(), json!("Value-1"));
    values.insert("attr2".to_string(), json!("456"));
    values.insert("attr3".to_string(), json!("5.0"));
    values
}

/// Send a hand-built envelope as `agent`.
pub(crate) async fn scripted_reply(agent: &TestAgent, to: &str, envelope: &Envelope) {
    agent
        .endpoint
        .send(to, envelope)
        .await
        .expect("scripted reply delivered");
}
