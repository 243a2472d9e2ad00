use borsh::{BorshDeserialize, BorshSerialize};
use reply_escrow::{
    instruction::EscrowInstruction,
    state::{derive_escrow_address, Escrow},
};
use reply_escrow_cli::{parse_options, parse_pubkey, parse_thread_id, parse_u64, required_option};
use solana_client::rpc_client::RpcClient;
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    signature::{read_keypair_file, Keypair, Signer},
    transaction::Transaction,
};
use std::{collections::HashMap, env, error::Error};

// ============================================================================
// CLI ENTRYPOINT
// ============================================================================

fn main() {
    if let Err(error) = run() {
        eprintln!("[reply_escrow_cli] Error: {error}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        print_usage();
        return Ok(());
    }

    let command = args[0].as_str();
    let options = parse_options(&args[1..])?;

    let rpc_url = options
        .get("rpc")
        .cloned()
        .unwrap_or_else(|| "http://localhost:8899".to_string());
    let client = RpcClient::new(rpc_url);

    let program_id = match options.get("program-id") {
        Some(value) => parse_pubkey(value)?,
        None => reply_escrow::id(),
    };

    match command {
        "initialize" => handle_initialize(&client, &options, program_id),
        "refund" => handle_refund(&client, &options, program_id),
        "register-and-claim" => handle_register_and_claim(&client, &options, program_id),
        "get-escrow" => handle_get_escrow(&client, &options, program_id),
        "derive" => handle_derive(&options, program_id),
        _ => {
            print_usage();
            Ok(())
        }
    }
}

// ============================================================================
// COMMAND HANDLERS
// ============================================================================

fn handle_initialize(
    client: &RpcClient,
    options: &HashMap<String, String>,
    program_id: Pubkey,
) -> Result<(), Box<dyn Error>> {
    let sender = read_keypair(options, "sender")?;
    let thread_id = parse_thread_id(required_option(options, "thread-id")?)?;
    let amount = parse_u64(required_option(options, "amount")?)?;

    let ix = build_initialize_ix(program_id, sender.pubkey(), thread_id, amount);
    let signature = send_tx(client, &[ix], &sender, &[])?;
    let (escrow_pda, _) = derive_escrow_address(&sender.pubkey(), &thread_id, &program_id);

    println!("Initialize signature: {signature}");
    println!("Escrow PDA: {escrow_pda}");
    Ok(())
}

fn handle_refund(
    client: &RpcClient,
    options: &HashMap<String, String>,
    program_id: Pubkey,
) -> Result<(), Box<dyn Error>> {
    let sender = read_keypair(options, "sender")?;
    let thread_id = parse_thread_id(required_option(options, "thread-id")?)?;

    let ix = build_refund_ix(program_id, sender.pubkey(), thread_id);
    let signature = send_tx(client, &[ix], &sender, &[])?;
    println!("Refund signature: {signature}");
    Ok(())
}

fn handle_register_and_claim(
    client: &RpcClient,
    options: &HashMap<String, String>,
    program_id: Pubkey,
) -> Result<(), Box<dyn Error>> {
    let receiver = read_keypair(options, "receiver")?;
    let sender = parse_pubkey(required_option(options, "sender-pubkey")?)?;
    let thread_id = parse_thread_id(required_option(options, "thread-id")?)?;

    let ix = build_register_and_claim_ix(program_id, receiver.pubkey(), sender, thread_id);
    let signature = send_tx(client, &[ix], &receiver, &[])?;
    println!("RegisterAndClaim signature: {signature}");
    Ok(())
}

fn handle_get_escrow(
    client: &RpcClient,
    options: &HashMap<String, String>,
    program_id: Pubkey,
) -> Result<(), Box<dyn Error>> {
    let sender = parse_pubkey(required_option(options, "sender-pubkey")?)?;
    let thread_id = parse_thread_id(required_option(options, "thread-id")?)?;

    let (escrow_pda, _) = derive_escrow_address(&sender, &thread_id, &program_id);
    let account = client.get_account(&escrow_pda)?;
    let escrow = Escrow::try_from_slice(&account.data)?;

    println!("Escrow PDA: {escrow_pda}");
    println!("Sender: {}", escrow.sender);
    println!("Receiver: {}", escrow.receiver);
    println!("Thread id: 0x{}", hex::encode(escrow.thread_id));
    println!("Amount: {}", escrow.amount);
    println!("Created at: {}", escrow.created_at);
    println!("Expires at: {}", escrow.expires_at);
    println!("Status: {:?}", escrow.status);
    Ok(())
}

fn handle_derive(
    options: &HashMap<String, String>,
    program_id: Pubkey,
) -> Result<(), Box<dyn Error>> {
    let sender = parse_pubkey(required_option(options, "sender-pubkey")?)?;
    let thread_id = parse_thread_id(required_option(options, "thread-id")?)?;

    let (escrow_pda, bump) = derive_escrow_address(&sender, &thread_id, &program_id);
    println!("Escrow PDA: {escrow_pda}");
    println!("Bump: {bump}");
    Ok(())
}

// ============================================================================
// INSTRUCTION BUILDERS
// ============================================================================

fn build_initialize_ix(
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
            .expect("instruction serialization is infallible"),
    }
}

fn build_refund_ix(program_id: Pubkey, sender: Pubkey, thread_id: [u8; 32]) -> Instruction {
    let (escrow_pda, _) = derive_escrow_address(&sender, &thread_id, &program_id);
    Instruction {
        program_id,
        accounts: vec![
            AccountMeta::new(escrow_pda, false),
            AccountMeta::new(sender, true),
        ],
        data: EscrowInstruction::Refund { thread_id }
            .try_to_vec()
            .expect("instruction serialization is infallible"),
    }
}

fn build_register_and_claim_ix(
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
            .expect("instruction serialization is infallible"),
    }
}

// ============================================================================
// TRANSACTION HELPERS
// ============================================================================

fn send_tx(
    client: &RpcClient,
    instructions: &[Instruction],
    payer: &Keypair,
    signers: &[&Keypair],
) -> Result<solana_sdk::signature::Signature, Box<dyn Error>> {
    let blockhash = client.get_latest_blockhash()?;
    let mut all_signers = Vec::with_capacity(signers.len() + 1);
    all_signers.push(payer);
    for signer in signers {
        if signer.pubkey() != payer.pubkey() {
            all_signers.push(*signer);
        }
    }

    let tx = Transaction::new_signed_with_payer(
        instructions,
        Some(&payer.pubkey()),
        &all_signers,
        blockhash,
    );
    let signature = client.send_and_confirm_transaction(&tx)?;
    Ok(signature)
}

// ============================================================================
// LOCAL HELPERS
// ============================================================================

fn read_keypair(
    options: &HashMap<String, String>,
    key: &str,
) -> Result<Keypair, Box<dyn Error>> {
    let path = required_option(options, key)?;
    Ok(read_keypair_file(path)?)
}

// ============================================================================
// USAGE
// ============================================================================

fn print_usage() {
    eprintln!(
        r#"Reply Escrow CLI

Usage:
  reply_escrow_cli <command> [--option value]...

Commands:
  initialize          --sender <keypair> --thread-id <hex> --amount <u64>
                      [--program-id <pubkey>] [--rpc <url>]
  refund              --sender <keypair> --thread-id <hex>
                      [--program-id <pubkey>] [--rpc <url>]
  register-and-claim  --receiver <keypair> --sender-pubkey <pubkey> --thread-id <hex>
                      [--program-id <pubkey>] [--rpc <url>]
  get-escrow          --sender-pubkey <pubkey> --thread-id <hex>
                      [--program-id <pubkey>] [--rpc <url>]
  derive              --sender-pubkey <pubkey> --thread-id <hex>
                      [--program-id <pubkey>]
        "#
    );
}
