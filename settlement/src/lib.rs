//! Settlement service for reply-gated escrows.
//!
//! When a reply is sent, this library discovers the pending escrow for the
//! thread, scores the reply through an external quality scorer, and either
//! submits the claim transaction (releasing the escrowed funds to the
//! replier) or leaves the escrow pending until it expires and becomes
//! refundable to the sender.
//!
//! All collaborators (ledger RPC endpoint, scorer, wallet directory, signing
//! keypair) are injected through [`orchestrator::SettlementContext`]; there is
//! no process-wide mutable state.

pub mod client;
pub mod config;
pub mod decision;
pub mod discovery;
pub mod error;
pub mod lookup;
pub mod orchestrator;
pub mod scoring;

pub use decision::{decide, Verdict, SCORE_THRESHOLD};
pub use error::SettlementError;
pub use orchestrator::{ReplyContext, SettlementContext, SettlementOutcome};
