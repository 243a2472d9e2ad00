//! Account state

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::pubkey::Pubkey;

/// PDA seed constants
pub mod seeds {
    /// Escrow account seed, combined with the sender key and thread id
    pub const ESCROW_SEED: &[u8] = b"escrow";
}

/// Escrow lifecycle status.
///
/// Monotonic: once `Completed` or `Refunded` the account is closed and the
/// tag is terminal.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscrowStatus {
    Pending,
    Completed,
    Refunded,
}

/// One escrow per (sender, thread) pair while pending.
///
/// The byte layout is load-bearing: off-chain readers parse raw account data
/// through this exact borsh schema (122 bytes, no discriminator). Do not
/// reorder or resize fields.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone)]
pub struct Escrow {
    /// Funding party. Immutable after creation.
    pub sender: Pubkey,
    /// Claiming party. Default at creation, set exactly once at claim time.
    pub receiver: Pubkey,
    /// 32-byte deterministic thread identifier, part of the derivation input.
    pub thread_id: [u8; 32],
    /// Payable lamports held by the account, net of rent.
    pub amount: u64,
    /// Creation timestamp (unix seconds).
    pub created_at: i64,
    /// `created_at + EXPIRY_WINDOW`.
    pub expires_at: i64,
    /// Lifecycle status.
    pub status: EscrowStatus,
    /// PDA bump, stored so later operations can rebuild the authority
    /// without re-searching.
    pub bump: u8,
}

impl Escrow {
    pub const LEN: usize = 32 + // sender
        32 +                    // receiver
        32 +                    // thread_id
        8 +                     // amount (u64 LE)
        8 +                     // created_at (i64 LE)
        8 +                     // expires_at (i64 LE)
        1 +                     // status
        1;                      // bump

    pub fn new(
        sender: Pubkey,
        thread_id: [u8; 32],
        amount: u64,
        created_at: i64,
        expires_at: i64,
        bump: u8,
    ) -> Self {
        Self {
            sender,
            receiver: Pubkey::default(),
            thread_id,
            amount,
            created_at,
            expires_at,
            status: EscrowStatus::Pending,
            bump,
        }
    }

    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}

/// Derive the escrow PDA for a (sender, thread) pair.
///
/// Deterministic and stateless: sender, recipient, or any observer can
/// recompute the address from the two inputs alone.
pub fn derive_escrow_address(
    sender: &Pubkey,
    thread_id: &[u8; 32],
    program_id: &Pubkey,
) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[seeds::ESCROW_SEED, sender.as_ref(), thread_id],
        program_id,
    )
}
