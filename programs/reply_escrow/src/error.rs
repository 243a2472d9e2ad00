//! Error types

use solana_program::program_error::ProgramError;
use thiserror::Error;

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum EscrowError {
    #[error("Escrow is not in Pending status")]
    InvalidStatus,

    #[error("Escrow has not expired yet")]
    NotExpired,

    #[error("Caller is not the escrow sender")]
    SenderMismatch,

    #[error("Thread id does not match the escrow")]
    ThreadIdMismatch,

    #[error("Escrow amount must be greater than zero")]
    InvalidAmount,

    #[error("Escrow already exists for this sender and thread")]
    EscrowAlreadyExists,

    #[error("Escrow account does not exist")]
    EscrowDoesNotExist,

    #[error("Derived address does not match the escrow account")]
    InvalidDerivation,

    #[error("Invalid instruction data")]
    InvalidInstructionData,
}

impl From<EscrowError> for ProgramError {
    fn from(e: EscrowError) -> Self {
        ProgramError::Custom(e as u32)
    }
}
