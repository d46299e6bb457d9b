//! Agent collaborators
//!
//! Narrow interfaces to the services the protocol machines call into:
//! - Pairwise relationships
//! - Credential/proof computation (AnonCreds)
//! - Wallet storage
//! - Ledger lookups
//! - Credential value encoding

pub mod anoncreds;
pub mod codec;
pub mod ledger;
pub mod pairwise;
pub mod wallet;

pub use anoncreds::{AnonCreds, CredentialRequest, IssuedCredential};
pub use codec::{encode_credential_values, encode_value, generate_nonce};
pub use ledger::{fetch_ledger_objects, Ledger, LedgerObjects};
pub use pairwise::{Me, Pairwise, Their};
pub use wallet::{CredentialRecord, CredentialWallet, InMemoryWallet, PairwiseStore};
