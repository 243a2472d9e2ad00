//! Escrow discovery
//!
//! Finds the escrow a reply settles against. The fast path reads the
//! reference headers the sender embedded in the outbound message; the slow
//! path scans the sender wallet's recent transactions for a pending escrow.

use std::collections::HashMap;
use std::str::FromStr;

use sha2::{Digest, Sha256};
use solana_sdk::pubkey::Pubkey;
use tracing::{debug, warn};

use reply_escrow::state::Escrow;

use crate::client::{is_pending, ChainClient, RpcError};

/// Header carrying the hex thread id on outbound mail.
pub const THREAD_ID_HEADER: &str = "X-Escrow-Thread-Id";
/// Header carrying the sender wallet key on outbound mail.
pub const SENDER_HEADER: &str = "X-Escrow-Sender";

/// Derive a thread id from an RFC 5322 message id.
///
/// Hashing gives a fixed 32 bytes from an arbitrary-length id and avoids
/// leaking the raw message id on chain.
pub fn thread_id_from_message_id(message_id: &str) -> [u8; 32] {
    let digest = Sha256::digest(message_id.as_bytes());
    digest.into()
}

/// Add the reference headers to an outbound message's header map.
pub fn embed_escrow_headers(
    headers: &mut HashMap<String, String>,
    sender: &Pubkey,
    thread_id: &[u8; 32],
) {
    headers.insert(THREAD_ID_HEADER.to_string(), hex::encode(thread_id));
    headers.insert(SENDER_HEADER.to_string(), sender.to_string());
}

/// Read an embedded escrow reference back out of a reply's headers.
///
/// Header names match case-insensitively since mail agents rewrite casing
/// in transit. Returns `None` when either header is missing or malformed;
/// a garbled reference falls through to the scan path rather than erroring.
pub fn parse_embedded_reference(headers: &HashMap<String, String>) -> Option<(Pubkey, [u8; 32])> {
    let mut sender = None;
    let mut thread_hex = None;
    for (name, value) in headers {
        if name.eq_ignore_ascii_case(SENDER_HEADER) {
            sender = Some(value.as_str());
        } else if name.eq_ignore_ascii_case(THREAD_ID_HEADER) {
            thread_hex = Some(value.as_str());
        }
    }

    let sender = Pubkey::from_str(sender?.trim()).ok()?;
    let bytes = hex::decode(thread_hex?.trim()).ok()?;
    let thread_id: [u8; 32] = bytes.try_into().ok()?;
    Some((sender, thread_id))
}

/// Outcome of a discovery pass.
#[derive(Debug)]
pub enum Discovered {
    /// A pending escrow exists at this address.
    Pending {
        address: Pubkey,
        sender: Pubkey,
        escrow: Escrow,
    },
    /// The reply referenced an escrow that no longer exists or is no longer
    /// pending. Distinguished from `None` so the caller reports "already
    /// settled" instead of "nothing found".
    Settled,
    /// No reference and the scan found nothing.
    None,
}

pub struct EscrowDiscovery<'a> {
    client: &'a ChainClient,
    program_id: Pubkey,
    scan_limit: usize,
}

impl<'a> EscrowDiscovery<'a> {
    pub fn new(client: &'a ChainClient, program_id: Pubkey, scan_limit: usize) -> Self {
        Self {
            client,
            program_id,
            scan_limit,
        }
    }

    /// Find the escrow for a reply.
    ///
    /// The embedded reference, when present, is authoritative for which
    /// (sender, thread) pair is meant; the scan only runs when no usable
    /// reference exists.
    pub async fn discover(
        &self,
        headers: &HashMap<String, String>,
        sender_wallet: &Pubkey,
        thread_id: &[u8; 32],
    ) -> Result<Discovered, RpcError> {
        if let Some((ref_sender, ref_thread)) = parse_embedded_reference(headers) {
            debug!(sender = %ref_sender, thread = %hex::encode(&ref_thread[..8]), "reply carries escrow reference");
            return match self
                .client
                .get_escrow(&self.program_id, &ref_sender, &ref_thread)
                .await?
            {
                Some((address, escrow)) if is_pending(&escrow) => Ok(Discovered::Pending {
                    address,
                    sender: ref_sender,
                    escrow,
                }),
                _ => Ok(Discovered::Settled),
            };
        }

        // No reference. Try the thread id derived from the message id first,
        // then fall back to scanning the sender's recent activity.
        if let Some((address, escrow)) = self
            .client
            .get_escrow(&self.program_id, sender_wallet, thread_id)
            .await?
        {
            if is_pending(&escrow) {
                return Ok(Discovered::Pending {
                    address,
                    sender: *sender_wallet,
                    escrow,
                });
            }
            return Ok(Discovered::Settled);
        }

        self.scan_for_pending(sender_wallet).await
    }

    /// Scan the sender wallet's recent transactions for a pending escrow it
    /// funded. Bounded by the configured scan limit; a miss is a miss.
    async fn scan_for_pending(&self, sender_wallet: &Pubkey) -> Result<Discovered, RpcError> {
        let entries = self
            .client
            .get_signatures_for_address(sender_wallet, self.scan_limit)
            .await?;
        debug!(sender = %sender_wallet, count = entries.len(), "scanning recent transactions");

        for entry in entries {
            if entry.err.is_some() {
                continue;
            }
            let Some(tx) = self.client.get_transaction(&entry.signature).await? else {
                continue;
            };
            if !tx.account_keys.contains(&self.program_id) {
                continue;
            }

            // One of the transaction's accounts may be the escrow PDA.
            for key in &tx.account_keys {
                if key == sender_wallet || *key == self.program_id {
                    continue;
                }
                let Some(account) = self.client.get_account(key).await? else {
                    continue;
                };
                if account.owner != self.program_id || account.data.len() != Escrow::LEN {
                    continue;
                }
                let escrow: Escrow = match borsh::BorshDeserialize::try_from_slice(&account.data) {
                    Ok(escrow) => escrow,
                    Err(_) => continue,
                };
                if escrow.sender == *sender_wallet && is_pending(&escrow) {
                    return Ok(Discovered::Pending {
                        address: *key,
                        sender: *sender_wallet,
                        escrow,
                    });
                }
            }
        }

        warn!(sender = %sender_wallet, "no pending escrow found in scan window");
        Ok(Discovered::None)
    }
}
