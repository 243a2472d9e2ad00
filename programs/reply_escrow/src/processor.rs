//! Instruction processing

#![allow(deprecated)] // system_instruction deprecation - will migrate when solana_system_interface is stable

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    clock::Clock,
    entrypoint::ProgramResult,
    msg,
    program::invoke_signed,
    program_error::ProgramError,
    pubkey::Pubkey,
    rent::Rent,
    system_instruction,
    sysvar::Sysvar,
};

use crate::{
    error::EscrowError,
    instruction::EscrowInstruction,
    state::{derive_escrow_address, seeds, Escrow, EscrowStatus},
    EXPIRY_WINDOW,
};

pub struct Processor;

impl Processor {
    pub fn process(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        instruction_data: &[u8],
    ) -> ProgramResult {
        let instruction = EscrowInstruction::try_from_slice(instruction_data)
            .map_err(|_| EscrowError::InvalidInstructionData)?;

        match instruction {
            EscrowInstruction::Initialize { thread_id, amount } => {
                msg!("Instruction: Initialize - thread_id={:?}", &thread_id[..8]);
                Self::process_initialize(program_id, accounts, thread_id, amount)
            }
            EscrowInstruction::Refund { thread_id } => {
                msg!("Instruction: Refund - thread_id={:?}", &thread_id[..8]);
                Self::process_refund(program_id, accounts, thread_id)
            }
            EscrowInstruction::RegisterAndClaim { sender, thread_id } => {
                msg!(
                    "Instruction: RegisterAndClaim - thread_id={:?}",
                    &thread_id[..8]
                );
                Self::process_register_and_claim(program_id, accounts, sender, thread_id)
            }
        }
    }

    fn process_initialize(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        thread_id: [u8; 32],
        amount: u64,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let escrow_account = next_account_info(account_info_iter)?;
        let sender = next_account_info(account_info_iter)?;
        let system_program = next_account_info(account_info_iter)?;

        if amount == 0 {
            return Err(EscrowError::InvalidAmount.into());
        }
        if !sender.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }

        // Derive escrow PDA from the (sender, thread) pair
        let (escrow_pda, escrow_bump) =
            derive_escrow_address(sender.key, &thread_id, program_id);
        if escrow_pda != *escrow_account.key {
            return Err(EscrowError::InvalidDerivation.into());
        }

        // A second initialize for the same pair is a collision, not a new record
        if escrow_account.data_len() > 0 {
            return Err(EscrowError::EscrowAlreadyExists.into());
        }

        let clock = Clock::get()?;
        let created_at = clock.unix_timestamp;
        let expires_at = created_at + EXPIRY_WINDOW;

        // Fund the account with rent plus the escrowed amount in one step;
        // the amount leaves the sender's spendable balance immediately
        let rent = Rent::get()?;
        let lamports = rent
            .minimum_balance(Escrow::LEN)
            .checked_add(amount)
            .ok_or(ProgramError::ArithmeticOverflow)?;

        invoke_signed(
            &system_instruction::create_account(
                sender.key,
                escrow_account.key,
                lamports,
                Escrow::LEN as u64,
                program_id,
            ),
            &[sender.clone(), escrow_account.clone(), system_program.clone()],
            &[&[
                seeds::ESCROW_SEED,
                sender.key.as_ref(),
                &thread_id,
                &[escrow_bump],
            ]],
        )?;

        let escrow = Escrow::new(
            *sender.key,
            thread_id,
            amount,
            created_at,
            expires_at,
            escrow_bump,
        );
        escrow.serialize(&mut &mut escrow_account.data.borrow_mut()[..])?;

        msg!(
            "Escrow created: thread_id={:?}, amount={}, expires_at={}",
            &thread_id[..8],
            amount,
            expires_at
        );
        Ok(())
    }

    fn process_refund(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        thread_id: [u8; 32],
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let escrow_account = next_account_info(account_info_iter)?;
        let sender = next_account_info(account_info_iter)?;

        if !sender.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }
        if escrow_account.owner != program_id || escrow_account.data_len() != Escrow::LEN {
            return Err(EscrowError::EscrowDoesNotExist.into());
        }

        let (escrow_pda, _) = derive_escrow_address(sender.key, &thread_id, program_id);
        if escrow_pda != *escrow_account.key {
            return Err(EscrowError::InvalidDerivation.into());
        }

        let mut escrow = Escrow::try_from_slice(&escrow_account.data.borrow())?;

        if escrow.status != EscrowStatus::Pending {
            return Err(EscrowError::InvalidStatus.into());
        }
        if escrow.sender != *sender.key {
            return Err(EscrowError::SenderMismatch.into());
        }

        let clock = Clock::get()?;
        if !escrow.is_expired(clock.unix_timestamp) {
            return Err(EscrowError::NotExpired.into());
        }

        let amount = escrow.amount;
        escrow.status = EscrowStatus::Refunded;
        escrow.amount = 0;
        escrow.serialize(&mut &mut escrow_account.data.borrow_mut()[..])?;

        // Drain every lamport back to the sender: the escrowed amount plus
        // the account rent. A zero-lamport account is removed by the runtime,
        // closing the escrow.
        let total = escrow_account.lamports();
        **escrow_account.try_borrow_mut_lamports()? -= total;
        **sender.try_borrow_mut_lamports()? += total;

        msg!(
            "Escrow refunded: thread_id={:?}, amount={}",
            &thread_id[..8],
            amount
        );
        Ok(())
    }

    fn process_register_and_claim(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        sender: Pubkey,
        thread_id: [u8; 32],
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let escrow_account = next_account_info(account_info_iter)?;
        let receiver = next_account_info(account_info_iter)?;
        let sender_account = next_account_info(account_info_iter)?;

        if !receiver.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }
        if escrow_account.owner != program_id || escrow_account.data_len() != Escrow::LEN {
            return Err(EscrowError::EscrowDoesNotExist.into());
        }

        // Re-derive from the supplied inputs; the receiver recovers them from
        // message metadata or a transaction scan, never from stored state
        let (escrow_pda, _) = derive_escrow_address(&sender, &thread_id, program_id);
        if escrow_pda != *escrow_account.key {
            return Err(EscrowError::InvalidDerivation.into());
        }

        let mut escrow = Escrow::try_from_slice(&escrow_account.data.borrow())?;

        if escrow.sender != sender || *sender_account.key != escrow.sender {
            return Err(EscrowError::SenderMismatch.into());
        }
        if escrow.thread_id != thread_id {
            return Err(EscrowError::ThreadIdMismatch.into());
        }
        if escrow.status != EscrowStatus::Pending {
            return Err(EscrowError::InvalidStatus.into());
        }

        let amount = escrow.amount;
        escrow.receiver = *receiver.key;
        escrow.status = EscrowStatus::Completed;
        escrow.amount = 0;
        escrow.serialize(&mut &mut escrow_account.data.borrow_mut()[..])?;

        // Amount to the receiver, rent remainder back to the sender. The
        // account ends at zero lamports and is removed by the runtime.
        let total = escrow_account.lamports();
        let rent_remainder = total
            .checked_sub(amount)
            .ok_or(ProgramError::InsufficientFunds)?;
        **escrow_account.try_borrow_mut_lamports()? -= total;
        **receiver.try_borrow_mut_lamports()? += amount;
        **sender_account.try_borrow_mut_lamports()? += rent_remainder;

        msg!(
            "Escrow claimed: thread_id={:?}, amount={}, receiver={}",
            &thread_id[..8],
            amount,
            receiver.key
        );
        Ok(())
    }
}
