//! Instruction definitions

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::pubkey::Pubkey;

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone)]
pub enum EscrowInstruction {
    /// Create a new escrow and lock funds atomically.
    ///
    /// The escrow account is created at the PDA derived from
    /// `(sender, thread_id)` and funded with the rent-exempt minimum plus
    /// `amount`, all paid by the sender. Funds leave the sender's spendable
    /// balance immediately.
    ///
    /// Accounts expected:
    /// 0. `[writable]` Escrow account (PDA)
    /// 1. `[writable, signer]` Sender
    /// 2. `[]` System program
    Initialize { thread_id: [u8; 32], amount: u64 },

    /// Return escrowed funds to the sender after the expiry window.
    ///
    /// Sender-only. Closes the escrow account; the sender reclaims both the
    /// escrowed amount and the account rent.
    ///
    /// Accounts expected:
    /// 0. `[writable]` Escrow account (PDA)
    /// 1. `[writable, signer]` Sender
    Refund { thread_id: [u8; 32] },

    /// Record the caller as receiver and transfer the escrowed funds.
    ///
    /// The PDA is re-derived from the supplied `sender` and `thread_id`, so
    /// the receiver needs no stored state beyond those two values. Whoever
    /// can produce a valid claim transaction for the derivation may claim;
    /// the receiver identity is recorded at claim time, not required in
    /// advance. Closes the escrow account; rent returns to the sender.
    ///
    /// Accounts expected:
    /// 0. `[writable]` Escrow account (PDA)
    /// 1. `[writable, signer]` Receiver
    /// 2. `[writable]` Sender account (receives the rent remainder)
    RegisterAndClaim { sender: Pubkey, thread_id: [u8; 32] },
}
