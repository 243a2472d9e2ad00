//! JSON-RPC chain client
//!
//! Thin reqwest-based wrapper around the Solana JSON-RPC surface the
//! settlement service needs. Talking raw JSON-RPC keeps the client mockable
//! with an HTTP test server and keeps the dependency surface small.

use std::str::FromStr;

use base64::Engine;
use serde_json::{json, Value};
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;

use reply_escrow::state::{derive_escrow_address, Escrow, EscrowStatus};

#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The node answered with a JSON-RPC error object.
    #[error("node error {code}: {message}")]
    Node { code: i64, message: String },

    #[error("malformed rpc response: {0}")]
    Malformed(String),
}

/// Raw account data as returned by `getAccountInfo`.
#[derive(Debug, Clone)]
pub struct AccountInfo {
    pub lamports: u64,
    pub owner: Pubkey,
    pub data: Vec<u8>,
}

/// A confirmed signature entry from `getSignaturesForAddress`.
#[derive(Debug, Clone)]
pub struct SignatureEntry {
    pub signature: String,
    pub err: Option<Value>,
}

/// Accounts and logs of a confirmed transaction.
#[derive(Debug, Clone)]
pub struct ConfirmedTransaction {
    pub account_keys: Vec<Pubkey>,
    pub log_messages: Vec<String>,
}

pub struct ChainClient {
    http: reqwest::Client,
    rpc_url: String,
}

impl ChainClient {
    pub fn new(http: reqwest::Client, rpc_url: String) -> Self {
        Self { http, rpc_url }
    }

    async fn rpc_call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let response: Value = self
            .http
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        if let Some(err) = response.get("error") {
            let code = err.get("code").and_then(Value::as_i64).unwrap_or(0);
            let message = err
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string();
            return Err(RpcError::Node { code, message });
        }

        response
            .get("result")
            .cloned()
            .ok_or_else(|| RpcError::Malformed("missing result field".into()))
    }

    /// Fetch an account, or `None` if it does not exist.
    pub async fn get_account(&self, address: &Pubkey) -> Result<Option<AccountInfo>, RpcError> {
        let result = self
            .rpc_call(
                "getAccountInfo",
                json!([address.to_string(), {"encoding": "base64"}]),
            )
            .await?;

        let value = match result.get("value") {
            Some(Value::Null) | None => return Ok(None),
            Some(value) => value,
        };

        let lamports = value
            .get("lamports")
            .and_then(Value::as_u64)
            .ok_or_else(|| RpcError::Malformed("account missing lamports".into()))?;
        let owner = value
            .get("owner")
            .and_then(Value::as_str)
            .and_then(|s| Pubkey::from_str(s).ok())
            .ok_or_else(|| RpcError::Malformed("account missing owner".into()))?;
        let encoded = value
            .get("data")
            .and_then(|d| d.get(0))
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::Malformed("account missing data".into()))?;
        let data = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| RpcError::Malformed(format!("bad account data encoding: {e}")))?;

        Ok(Some(AccountInfo {
            lamports,
            owner,
            data,
        }))
    }

    pub async fn get_balance(&self, address: &Pubkey) -> Result<u64, RpcError> {
        let result = self
            .rpc_call("getBalance", json!([address.to_string()]))
            .await?;
        result
            .get("value")
            .and_then(Value::as_u64)
            .ok_or_else(|| RpcError::Malformed("missing balance value".into()))
    }

    pub async fn get_latest_blockhash(&self) -> Result<Hash, RpcError> {
        let result = self.rpc_call("getLatestBlockhash", json!([])).await?;
        let blockhash = result
            .get("value")
            .and_then(|v| v.get("blockhash"))
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::Malformed("missing blockhash".into()))?;
        Hash::from_str(blockhash).map_err(|e| RpcError::Malformed(format!("bad blockhash: {e}")))
    }

    /// Submit a signed transaction, returning its signature.
    pub async fn send_transaction(&self, tx: &Transaction) -> Result<Signature, RpcError> {
        let serialized = bincode::serialize(tx)
            .map_err(|e| RpcError::Malformed(format!("transaction serialization: {e}")))?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(serialized);
        let result = self
            .rpc_call("sendTransaction", json!([encoded, {"encoding": "base64"}]))
            .await?;
        let signature = result
            .as_str()
            .ok_or_else(|| RpcError::Malformed("signature not a string".into()))?;
        Signature::from_str(signature)
            .map_err(|e| RpcError::Malformed(format!("bad signature: {e}")))
    }

    /// Check whether a submitted transaction has been confirmed.
    ///
    /// Returns `Some(true)` for a confirmed success, `Some(false)` for a
    /// confirmed failure, and `None` while the node has no status yet.
    pub async fn get_signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<bool>, RpcError> {
        let result = self
            .rpc_call("getSignatureStatuses", json!([[signature.to_string()]]))
            .await?;
        let status = result
            .get("value")
            .and_then(|v| v.get(0))
            .ok_or_else(|| RpcError::Malformed("missing status entry".into()))?;
        if status.is_null() {
            return Ok(None);
        }
        let failed = status.get("err").map(|e| !e.is_null()).unwrap_or(false);
        Ok(Some(!failed))
    }

    /// Recent confirmed signatures involving an address, newest first.
    pub async fn get_signatures_for_address(
        &self,
        address: &Pubkey,
        limit: usize,
    ) -> Result<Vec<SignatureEntry>, RpcError> {
        let result = self
            .rpc_call(
                "getSignaturesForAddress",
                json!([address.to_string(), {"limit": limit}]),
            )
            .await?;
        let entries = result
            .as_array()
            .ok_or_else(|| RpcError::Malformed("signatures not an array".into()))?;

        let mut out = Vec::with_capacity(entries.len());
        for entry in entries {
            let signature = entry
                .get("signature")
                .and_then(Value::as_str)
                .ok_or_else(|| RpcError::Malformed("entry missing signature".into()))?
                .to_string();
            let err = entry.get("err").filter(|e| !e.is_null()).cloned();
            out.push(SignatureEntry { signature, err });
        }
        Ok(out)
    }

    pub async fn get_transaction(
        &self,
        signature: &str,
    ) -> Result<Option<ConfirmedTransaction>, RpcError> {
        let result = self
            .rpc_call(
                "getTransaction",
                json!([signature, {"encoding": "json", "maxSupportedTransactionVersion": 0}]),
            )
            .await?;
        if result.is_null() {
            return Ok(None);
        }

        let keys = result
            .get("transaction")
            .and_then(|t| t.get("message"))
            .and_then(|m| m.get("accountKeys"))
            .and_then(Value::as_array)
            .ok_or_else(|| RpcError::Malformed("transaction missing account keys".into()))?;
        let mut account_keys = Vec::with_capacity(keys.len());
        for key in keys {
            let key = key
                .as_str()
                .and_then(|s| Pubkey::from_str(s).ok())
                .ok_or_else(|| RpcError::Malformed("bad account key".into()))?;
            account_keys.push(key);
        }

        let log_messages = result
            .get("meta")
            .and_then(|m| m.get("logMessages"))
            .and_then(Value::as_array)
            .map(|logs| {
                logs.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Some(ConfirmedTransaction {
            account_keys,
            log_messages,
        }))
    }

    /// Fetch and decode the escrow for a (sender, thread) pair.
    ///
    /// Returns `None` when the account is absent, owned by another program,
    /// or not escrow-shaped. A decoded escrow in a terminal status is still
    /// returned so callers can tell "settled" apart from "never existed".
    pub async fn get_escrow(
        &self,
        program_id: &Pubkey,
        sender: &Pubkey,
        thread_id: &[u8; 32],
    ) -> Result<Option<(Pubkey, Escrow)>, RpcError> {
        let (address, _) = derive_escrow_address(sender, thread_id, program_id);
        let Some(account) = self.get_account(&address).await? else {
            return Ok(None);
        };
        if account.owner != *program_id || account.data.len() != Escrow::LEN {
            return Ok(None);
        }
        match borsh::BorshDeserialize::try_from_slice(&account.data) {
            Ok(escrow) => Ok(Some((address, escrow))),
            Err(_) => Ok(None),
        }
    }
}

/// True when a decoded escrow can still be claimed.
pub fn is_pending(escrow: &Escrow) -> bool {
    escrow.status == EscrowStatus::Pending
}
