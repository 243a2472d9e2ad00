//! Shared helpers for reply_escrow program tests

#![allow(dead_code)]

use borsh::{BorshDeserialize, BorshSerialize};
use reply_escrow::{
    instruction::EscrowInstruction,
    processor::Processor,
    state::{derive_escrow_address, Escrow},
    EXPIRY_WINDOW,
};
use solana_program_test::{processor, BanksClientError, ProgramTest, ProgramTestContext};
use solana_sdk::{
    clock::Clock,
    instruction::{AccountMeta, Instruction, InstructionError},
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    system_instruction,
    transaction::{Transaction, TransactionError},
};

pub struct TestEnv {
    pub program_id: Pubkey,
    pub sender: Keypair,
    pub receiver: Keypair,
}

pub fn program_test() -> ProgramTest {
    ProgramTest::new(
        "reply_escrow",
        reply_escrow::id(),
        processor!(Processor::process),
    )
}

/// Fund a sender and a receiver keypair from the test payer.
pub async fn setup_env(context: &mut ProgramTestContext) -> TestEnv {
    let sender = Keypair::new();
    let receiver = Keypair::new();

    let blockhash = context.banks_client.get_latest_blockhash().await.unwrap();
    let tx = Transaction::new_signed_with_payer(
        &[
            system_instruction::transfer(
                &context.payer.pubkey(),
                &sender.pubkey(),
                10_000_000_000,
            ),
            system_instruction::transfer(
                &context.payer.pubkey(),
                &receiver.pubkey(),
                1_000_000_000,
            ),
        ],
        Some(&context.payer.pubkey()),
        &[&context.payer],
        blockhash,
    );
    context.banks_client.process_transaction(tx).await.unwrap();

    TestEnv {
        program_id: reply_escrow::id(),
        sender,
        receiver,
    }
}

// ============================================================================
// INSTRUCTION BUILDERS
// ============================================================================

pub fn initialize_ix(
    program_id: Pubkey,
    sender: Pubkey,
    thread_id: [u8; 32],
    amount: u64,
) -> Instruction {
    let (escrow_pda, _) = derive_escrow_address(&sender, &thread_id, &program_id);
    Instruction {
        program_id,
        accounts: vec![
            AccountMeta::new(escrow_pda, false),
            AccountMeta::new(sender, true),
            AccountMeta::new_readonly(solana_sdk::system_program::id(), false),
        ],
        data: EscrowInstruction::Initialize { thread_id, amount }
            .try_to_vec()
            .unwrap(),
    }
}

pub fn refund_ix(program_id: Pubkey, sender: Pubkey, thread_id: [u8; 32]) -> Instruction {
    let (escrow_pda, _) = derive_escrow_address(&sender, &thread_id, &program_id);
    Instruction {
        program_id,
        accounts: vec![
            AccountMeta::new(escrow_pda, false),
            AccountMeta::new(sender, true),
        ],
        data: EscrowInstruction::Refund { thread_id }.try_to_vec().unwrap(),
    }
}

pub fn register_and_claim_ix(
    program_id: Pubkey,
    receiver: Pubkey,
    sender: Pubkey,
    thread_id: [u8; 32],
) -> Instruction {
    let (escrow_pda, _) = derive_escrow_address(&sender, &thread_id, &program_id);
    Instruction {
        program_id,
        accounts: vec![
            AccountMeta::new(escrow_pda, false),
            AccountMeta::new(receiver, true),
            AccountMeta::new(sender, false),
        ],
        data: EscrowInstruction::RegisterAndClaim { sender, thread_id }
            .try_to_vec()
            .unwrap(),
    }
}

// ============================================================================
// TRANSACTION HELPERS
// ============================================================================

/// Send a transaction paid by the context payer, co-signed by `signers`.
///
/// Always fetches a fresh blockhash so re-sending the same instruction is a
/// new transaction rather than a status-cache hit.
pub async fn send_tx(
    context: &mut ProgramTestContext,
    instructions: &[Instruction],
    signers: &[&Keypair],
) -> Result<(), BanksClientError> {
    let blockhash = context.get_new_latest_blockhash().await.unwrap();
    let payer = context.payer.insecure_clone();
    let mut all_signers: Vec<&Keypair> = vec![&payer];
    all_signers.extend_from_slice(signers);
    let tx = Transaction::new_signed_with_payer(
        instructions,
        Some(&payer.pubkey()),
        &all_signers,
        blockhash,
    );
    context.banks_client.process_transaction(tx).await
}

/// Create a pending escrow and return its PDA.
pub async fn create_escrow(
    context: &mut ProgramTestContext,
    env: &TestEnv,
    thread_id: [u8; 32],
    amount: u64,
) -> Pubkey {
    let ix = initialize_ix(env.program_id, env.sender.pubkey(), thread_id, amount);
    send_tx(context, &[ix], &[&env.sender]).await.unwrap();
    let (escrow_pda, _) = derive_escrow_address(&env.sender.pubkey(), &thread_id, &env.program_id);
    escrow_pda
}

// ============================================================================
// STATE HELPERS
// ============================================================================

pub async fn read_escrow(context: &mut ProgramTestContext, escrow_pda: Pubkey) -> Escrow {
    let account = context
        .banks_client
        .get_account(escrow_pda)
        .await
        .unwrap()
        .expect("escrow account should exist");
    Escrow::try_from_slice(&account.data).unwrap()
}

pub async fn balance(context: &mut ProgramTestContext, key: Pubkey) -> u64 {
    context.banks_client.get_balance(key).await.unwrap()
}

pub async fn rent_minimum(context: &mut ProgramTestContext) -> u64 {
    let rent = context.banks_client.get_rent().await.unwrap();
    rent.minimum_balance(Escrow::LEN)
}

/// Advance the bank clock past the escrow expiry window.
pub async fn warp_past_expiry(context: &mut ProgramTestContext) {
    let mut clock: Clock = context.banks_client.get_sysvar().await.unwrap();
    clock.unix_timestamp += EXPIRY_WINDOW + 1;
    context.set_sysvar(&clock);
}

/// Assert that a transaction failed with the given custom program error code.
pub fn assert_custom_error(result: Result<(), BanksClientError>, expected: u32) {
    match result {
        Err(BanksClientError::TransactionError(TransactionError::InstructionError(
            _,
            InstructionError::Custom(code),
        ))) => assert_eq!(code, expected, "unexpected custom error code"),
        Err(BanksClientError::SimulationError {
            err: TransactionError::InstructionError(_, InstructionError::Custom(code)),
            ..
        }) => assert_eq!(code, expected, "unexpected custom error code"),
        other => panic!("expected custom error {expected}, got {other:?}"),
    }
}
