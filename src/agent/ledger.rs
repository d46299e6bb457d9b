//! Ledger lookups.

use crate::core::Result;
use async_trait::async_trait;
use futures::future::try_join_all;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Read access to schemas and credential definitions.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn fetch_schema(&self, schema_id: &str) -> Result<Value>;

    async fn fetch_cred_def(&self, cred_def_id: &str) -> Result<Value>;
}

/// Schemas and credential definitions keyed by id.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LedgerObjects {
    pub schemas: Value,
    pub cred_defs: Value,
}

/// Fetch every referenced schema and credential definition once.
///
/// Lookups run concurrently; the first failure is returned.
pub async fn fetch_ledger_objects<'a>(
    ledger: &dyn Ledger,
    schema_ids: impl IntoIterator<Item = &'a str>,
    cred_def_ids: impl IntoIterator<Item = &'a str>,
) -> Result<LedgerObjects> {
    let schema_ids: BTreeSet<&str> = schema_ids.into_iter().collect();
    let cred_def_ids: BTreeSet<&str> = cred_def_ids.into_iter().collect();

    let (schemas, cred_defs) = futures::future::try_join(
        try_join_all(schema_ids.iter().map(|id| ledger.fetch_schema(id))),
        try_join_all(cred_def_ids.iter().map(|id| ledger.fetch_cred_def(id))),
    )
    .await?;

    Ok(LedgerObjects {
        schemas: keyed(schema_ids, schemas),
        cred_defs: keyed(cred_def_ids, cred_defs),
    })
}

fn keyed(ids: BTreeSet<&str>, values: Vec<Value>) -> Value {
    Value::Object(
        ids.into_iter()
            .map(str::to_string)
            .zip(values)
            .collect::<Map<String, Value>>(),
    )
}
