//! Settlement orchestration
//!
//! Ties discovery, scoring, and the chain client together: given a reply,
//! decide whether the matching escrow is claimed or left to expire, and if
//! claimed, drive the transaction through submission and confirmation.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use borsh::BorshSerialize;
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::transaction::Transaction;
use tracing::{info, warn};

use reply_escrow::instruction::EscrowInstruction;
use reply_escrow::state::derive_escrow_address;

use crate::client::{is_pending, ChainClient};
use crate::config::ConfirmationConfig;
use crate::decision::Verdict;
use crate::discovery::{thread_id_from_message_id, Discovered, EscrowDiscovery};
use crate::error::SettlementError;
use crate::lookup::WalletDirectory;
use crate::scoring::{score_and_decide, Scorer};

const MAX_ATTEMPTS_PER_ESCROW: u32 = 3;

/// Everything known about an incoming reply.
#[derive(Debug, Clone)]
pub struct ReplyContext {
    /// Reply headers, including any embedded escrow reference.
    pub headers: HashMap<String, String>,
    /// Reply body, possibly HTML.
    pub reply_body: String,
    /// The original outbound message the reply answers.
    pub original_body: String,
    /// Messaging identity of the counterparty who funded the escrow.
    pub counterparty_identity: String,
    /// Message id of the original message, used to derive the thread id
    /// when the reply carries no embedded reference.
    pub in_reply_to: String,
}

/// Terminal result of one settlement run.
#[derive(Debug)]
pub enum SettlementOutcome {
    /// Nothing to settle for this reply.
    NoEscrow,
    /// Scored below threshold; escrow left pending.
    Withheld { score: f64 },
    /// Claim confirmed on chain.
    Released { score: f64, signature: Signature },
    /// The referenced escrow was already claimed or refunded.
    AlreadySettled,
}

#[derive(Debug, Default)]
struct AttemptRecord {
    failures: u32,
}

/// Long-lived settlement state. Holds the chain client, the scorer, the
/// wallet directory, and the optional signing key; replies flow through
/// [`settle`](SettlementContext::settle) one at a time per escrow.
pub struct SettlementContext<S: Scorer, W: WalletDirectory> {
    pub client: ChainClient,
    pub scorer: S,
    pub wallets: W,
    /// Receiver keypair. `None` means the service can observe and score but
    /// not claim.
    pub signer: Option<Keypair>,
    pub program_id: Pubkey,
    pub confirmation: ConfirmationConfig,
    pub scan_limit: usize,
    attempts: Mutex<HashMap<(Pubkey, [u8; 32]), AttemptRecord>>,
}

impl<S: Scorer, W: WalletDirectory> SettlementContext<S, W> {
    pub fn new(
        client: ChainClient,
        scorer: S,
        wallets: W,
        signer: Option<Keypair>,
        program_id: Pubkey,
        confirmation: ConfirmationConfig,
        scan_limit: usize,
    ) -> Self {
        Self {
            client,
            scorer,
            wallets,
            signer,
            program_id,
            confirmation,
            scan_limit,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    /// Settle one reply end to end.
    pub async fn settle(&self, reply: &ReplyContext) -> Result<SettlementOutcome, SettlementError> {
        let sender_wallet = self.resolve_sender_wallet(reply).await?;
        let Some(sender_wallet) = sender_wallet else {
            info!(identity = %reply.counterparty_identity, "counterparty has no registered wallet");
            return Ok(SettlementOutcome::NoEscrow);
        };

        let thread_id = thread_id_from_message_id(&reply.in_reply_to);
        let discovery = EscrowDiscovery::new(&self.client, self.program_id, self.scan_limit);
        let discovered = discovery
            .discover(&reply.headers, &sender_wallet, &thread_id)
            .await?;

        let (escrow_address, sender, escrow) = match discovered {
            Discovered::Pending {
                address,
                sender,
                escrow,
            } => (address, sender, escrow),
            Discovered::Settled => return Ok(SettlementOutcome::AlreadySettled),
            Discovered::None => return Ok(SettlementOutcome::NoEscrow),
        };

        let thread = hex::encode(&escrow.thread_id[..8]);
        let expires = chrono::DateTime::from_timestamp(escrow.expires_at, 0)
            .map(|t| t.to_rfc3339())
            .unwrap_or_default();
        info!(sender = %sender, thread = %thread, amount = escrow.amount, %expires, "pending escrow found");

        // A missing signer blocks before any scoring spend.
        let Some(signer) = &self.signer else {
            return Err(SettlementError::SignerUnavailable);
        };

        self.check_attempt_budget(&sender, &escrow.thread_id)?;

        let result = self
            .score_and_claim(reply, signer, &escrow_address, &sender, &escrow.thread_id)
            .await;
        self.record_attempt(&sender, &escrow.thread_id, result.is_ok());
        result
    }

    async fn score_and_claim(
        &self,
        reply: &ReplyContext,
        signer: &Keypair,
        escrow_address: &Pubkey,
        sender: &Pubkey,
        thread_id: &[u8; 32],
    ) -> Result<SettlementOutcome, SettlementError> {
        let (score, verdict) =
            score_and_decide(&self.scorer, &reply.original_body, &reply.reply_body).await?;
        let thread = hex::encode(&thread_id[..8]);

        if verdict == Verdict::Withhold {
            info!(sender = %sender, thread = %thread, score, "withholding escrow");
            return Ok(SettlementOutcome::Withheld { score });
        }

        // Re-check just before submitting; the sender may have refunded, or
        // a concurrent run claimed, while scoring was in flight.
        match self.client.get_escrow(&self.program_id, sender, thread_id).await? {
            Some((_, escrow)) if is_pending(&escrow) => {}
            _ => return Ok(SettlementOutcome::AlreadySettled),
        }

        let instruction = build_claim_instruction(self.program_id, signer.pubkey(), *sender, *thread_id);
        let blockhash = self.client.get_latest_blockhash().await?;
        let tx = Transaction::new_signed_with_payer(
            &[instruction],
            Some(&signer.pubkey()),
            &[signer],
            blockhash,
        );

        let signature = self.client.send_transaction(&tx).await.map_err(|e| {
            warn!(sender = %sender, thread = %thread, error = %e, "claim submission failed");
            SettlementError::Submission(e.to_string())
        })?;
        info!(sender = %sender, thread = %thread, %signature, "claim submitted");

        self.confirm_claim(signature, escrow_address, sender, thread_id)
            .await?;
        info!(sender = %sender, thread = %thread, %signature, score, "escrow released");
        Ok(SettlementOutcome::Released { score, signature })
    }

    /// Poll until the claim lands.
    ///
    /// Two confirmation signals are accepted: the signature reporting
    /// success, or the escrow account disappearing. The second covers nodes
    /// that drop status entries before the poller sees them. A failed poll
    /// counts as a miss; only the bounded attempt budget ends the loop.
    async fn confirm_claim(
        &self,
        signature: Signature,
        escrow_address: &Pubkey,
        sender: &Pubkey,
        thread_id: &[u8; 32],
    ) -> Result<(), SettlementError> {
        let interval = Duration::from_millis(self.confirmation.interval_ms);
        for _ in 0..self.confirmation.max_attempts {
            match self.client.get_signature_status(&signature).await {
                Ok(Some(true)) => return Ok(()),
                Ok(Some(false)) => {
                    return Err(SettlementError::Submission(format!(
                        "claim transaction {signature} failed on chain"
                    )))
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(%signature, error = %err, "status poll failed, retrying");
                }
            }
            match self.escrow_gone(sender, thread_id).await {
                Ok(true) => return Ok(()),
                Ok(false) => {}
                Err(err) => {
                    warn!(escrow = %escrow_address, error = %err, "escrow poll failed, retrying");
                }
            }
            tokio::time::sleep(interval).await;
        }

        // Last look before giving up, in case the account closed between
        // the final status poll and now.
        if self.escrow_gone(sender, thread_id).await.unwrap_or(false) {
            return Ok(());
        }
        warn!(escrow = %escrow_address, %signature, "claim confirmation timed out");
        Err(SettlementError::ConfirmationTimeout { signature })
    }

    async fn escrow_gone(
        &self,
        sender: &Pubkey,
        thread_id: &[u8; 32],
    ) -> Result<bool, SettlementError> {
        let escrow = self
            .client
            .get_escrow(&self.program_id, sender, thread_id)
            .await?;
        Ok(match escrow {
            Some((_, escrow)) => !is_pending(&escrow),
            None => true,
        })
    }

    /// Resolve the counterparty's wallet: the embedded header wins, the
    /// directory is the fallback.
    async fn resolve_sender_wallet(
        &self,
        reply: &ReplyContext,
    ) -> Result<Option<Pubkey>, SettlementError> {
        if let Some((sender, _)) = crate::discovery::parse_embedded_reference(&reply.headers) {
            return Ok(Some(sender));
        }
        if reply.counterparty_identity.is_empty() {
            return Err(SettlementError::InvalidMetadata(
                "reply has neither an escrow reference nor a counterparty identity".into(),
            ));
        }
        self.wallets
            .lookup(&reply.counterparty_identity)
            .await
            .map_err(|e| SettlementError::InvalidMetadata(e.to_string()))
    }

    fn check_attempt_budget(
        &self,
        sender: &Pubkey,
        thread_id: &[u8; 32],
    ) -> Result<(), SettlementError> {
        let attempts = self.attempts.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(record) = attempts.get(&(*sender, *thread_id)) {
            if record.failures >= MAX_ATTEMPTS_PER_ESCROW {
                return Err(SettlementError::RetryBudgetExhausted);
            }
        }
        Ok(())
    }

    fn record_attempt(&self, sender: &Pubkey, thread_id: &[u8; 32], succeeded: bool) {
        let mut attempts = self.attempts.lock().unwrap_or_else(|e| e.into_inner());
        if succeeded {
            attempts.remove(&(*sender, *thread_id));
        } else {
            attempts
                .entry((*sender, *thread_id))
                .or_default()
                .failures += 1;
        }
    }
}

/// Build the claim instruction with the account order the program expects:
/// escrow PDA, receiver (signer), then the sender account that takes back
/// the rent remainder.
pub fn build_claim_instruction(
    program_id: Pubkey,
    receiver: Pubkey,
    sender: Pubkey,
    thread_id: [u8; 32],
) -> Instruction {
    let (escrow_pda, _) = derive_escrow_address(&sender, &thread_id, &program_id);
    let data = EscrowInstruction::RegisterAndClaim { sender, thread_id }
        .try_to_vec()
        .expect("instruction serialization is infallible");
    Instruction {
        program_id,
        accounts: vec![
            AccountMeta::new(escrow_pda, false),
            AccountMeta::new(receiver, true),
            AccountMeta::new(sender, false),
        ],
        data,
    }
}
