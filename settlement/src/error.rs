//! Settlement error types

use solana_sdk::signature::Signature;

use crate::client::RpcError;
use crate::scoring::ScoringError;

/// Errors that can stop a settlement run.
///
/// The orchestrator distinguishes blocking failures (no signer, RPC down)
/// from benign outcomes (nothing to settle), so that callers can retry the
/// former and drop the latter.
#[derive(Debug, thiserror::Error)]
pub enum SettlementError {
    /// No signing key is connected. Checked before any scoring work so a
    /// misconfigured deployment fails fast and cheap.
    #[error("no signer connected; cannot submit claim transactions")]
    SignerUnavailable,

    /// The reply carried no escrow reference and the on-chain scan found no
    /// pending escrow for the sender.
    #[error("no pending escrow found for this reply")]
    NoEscrowFound,

    /// The referenced escrow account no longer exists or is no longer
    /// pending. Someone already claimed or refunded it.
    #[error("escrow already settled")]
    AlreadySettled,

    #[error("scoring failed: {0}")]
    Scoring(#[from] ScoringError),

    #[error("rpc failure: {0}")]
    Rpc(#[from] RpcError),

    #[error("transaction submission failed: {0}")]
    Submission(String),

    /// The claim transaction was submitted but never observed as confirmed
    /// within the polling window. The signature is kept so an operator can
    /// check it by hand.
    #[error("claim transaction {signature} not confirmed in time")]
    ConfirmationTimeout { signature: Signature },

    /// Too many failed attempts for one (sender, thread) pair.
    #[error("retry budget exhausted for this escrow")]
    RetryBudgetExhausted,

    #[error("invalid reply metadata: {0}")]
    InvalidMetadata(String),
}
