//! One-shot settlement runner
//!
//! Reads a reply (body + headers) from disk, runs a single settlement pass
//! against the configured cluster, and prints the outcome. Intended for
//! operators and for wiring into a mail pipeline as a delivery hook.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use solana_sdk::signature::read_keypair_file;
use tracing::info;

use settlement::client::ChainClient;
use settlement::config::SettlementConfig;
use settlement::lookup::HttpWalletDirectory;
use settlement::scoring::HttpScorer;
use settlement::{ReplyContext, SettlementContext, SettlementError, SettlementOutcome};

#[derive(Parser, Debug)]
#[command(name = "settle", about = "Settle an escrow against an incoming reply")]
struct Args {
    /// Path to the settlement config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// File containing the reply body.
    #[arg(long)]
    reply: PathBuf,

    /// File containing the original outbound message body.
    #[arg(long)]
    original: PathBuf,

    /// Reply header as `Name: value`. Repeatable.
    #[arg(long = "header")]
    headers: Vec<String>,

    /// Messaging identity of the counterparty who funded the escrow.
    #[arg(long)]
    counterparty: String,

    /// Message id of the original message being replied to.
    #[arg(long)]
    in_reply_to: String,

    /// Receiver keypair file. Omit to run in observe-only mode.
    #[arg(long)]
    keypair: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let config = SettlementConfig::load(args.config.as_deref())?;
    let program_id = config.program_id()?;

    let headers = parse_headers(&args.headers)?;
    let reply_body = std::fs::read_to_string(&args.reply)
        .with_context(|| format!("reading reply file {}", args.reply.display()))?;
    let original_body = std::fs::read_to_string(&args.original)
        .with_context(|| format!("reading original file {}", args.original.display()))?;

    let signer = match &args.keypair {
        Some(path) => Some(
            read_keypair_file(path)
                .map_err(|e| anyhow::anyhow!("reading keypair {}: {e}", path.display()))?,
        ),
        None => None,
    };

    let http = reqwest::Client::builder()
        .timeout(std::time::Duration::from_millis(config.scorer.timeout_ms))
        .build()?;
    let context = SettlementContext::new(
        ChainClient::new(http.clone(), config.chain.rpc_url.clone()),
        HttpScorer::new(
            http.clone(),
            config.scorer.url.clone(),
            config.scorer.fallback_url.clone(),
        ),
        HttpWalletDirectory::new(http, config.wallets.url.clone()),
        signer,
        program_id,
        config.confirmation.clone(),
        config.discovery.scan_limit,
    );

    let reply = ReplyContext {
        headers,
        reply_body,
        original_body,
        counterparty_identity: args.counterparty,
        in_reply_to: args.in_reply_to,
    };

    match context.settle(&reply).await {
        Ok(SettlementOutcome::Released { score, signature }) => {
            info!(score, %signature, "escrow released to receiver");
            println!("released (score {score}): {signature}");
        }
        Ok(SettlementOutcome::Withheld { score }) => {
            info!(score, "escrow withheld");
            println!("withheld (score {score}); funds refundable after expiry");
        }
        Ok(SettlementOutcome::AlreadySettled) => {
            println!("escrow already settled");
        }
        Ok(SettlementOutcome::NoEscrow) => {
            println!("no escrow found for this reply");
        }
        Err(SettlementError::SignerUnavailable) => {
            bail!("no signer connected; pass --keypair to enable claiming");
        }
        Err(err) => return Err(err.into()),
    }

    Ok(())
}

fn parse_headers(raw: &[String]) -> anyhow::Result<HashMap<String, String>> {
    let mut headers = HashMap::new();
    for entry in raw {
        let Some((name, value)) = entry.split_once(':') else {
            bail!("malformed header {entry:?}, expected `Name: value`");
        };
        headers.insert(name.trim().to_string(), value.trim().to_string());
    }
    Ok(headers)
}
