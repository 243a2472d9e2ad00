//! Counterparty wallet lookup
//!
//! Maps a messaging identity (an email-style address) to the wallet key it
//! registered, via the directory service. Without a wallet for the sender
//! there is no escrow derivation to check.

use std::str::FromStr;

use solana_sdk::pubkey::Pubkey;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("directory request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("directory returned status {0}")]
    Unavailable(u16),

    #[error("directory returned an invalid wallet key: {0}")]
    InvalidKey(String),
}

/// Identity-to-wallet resolution. Generic so tests can use a fixed map.
pub trait WalletDirectory {
    fn lookup(
        &self,
        identity: &str,
    ) -> impl std::future::Future<Output = Result<Option<Pubkey>, LookupError>> + Send;
}

/// Directory backed by an HTTP service: `GET {base}/wallets/{identity}`
/// returns the wallet key as plain text, 404 when unregistered.
pub struct HttpWalletDirectory {
    http: reqwest::Client,
    base_url: String,
}

impl HttpWalletDirectory {
    pub fn new(http: reqwest::Client, base_url: String) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        Self { http, base_url }
    }
}

impl WalletDirectory for HttpWalletDirectory {
    async fn lookup(&self, identity: &str) -> Result<Option<Pubkey>, LookupError> {
        let url = format!("{}/wallets/{}", self.base_url, identity);
        let response = self.http.get(&url).send().await?;

        let status = response.status();
        if status.as_u16() == 404 {
            debug!(identity, "no wallet registered");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(LookupError::Unavailable(status.as_u16()));
        }

        let body = response.text().await?;
        let key = body.trim();
        let wallet =
            Pubkey::from_str(key).map_err(|_| LookupError::InvalidKey(key.to_string()))?;
        Ok(Some(wallet))
    }
}
