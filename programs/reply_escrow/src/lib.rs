//! Reply Escrow Program
//!
//! Holds lamports in escrow against a (sender, thread) pair. A reply from the
//! designated correspondent claims the funds; an unanswered escrow becomes
//! refundable to the sender once the expiry window has elapsed.
//!
//! Each escrow lives at a PDA derived from the sender key and a 32-byte
//! thread identifier, so any party can re-derive the address from those two
//! inputs alone.

pub mod error;
pub mod instruction;
pub mod processor;
pub mod state;

#[cfg(not(feature = "no-entrypoint"))]
mod entrypoint;

use solana_program::declare_id;

declare_id!("Rep1yEscrow11111111111111111111111111111111");

/// Escrow expiry window: 15 days in seconds.
pub const EXPIRY_WINDOW: i64 = 15 * 24 * 60 * 60;
