//! sigil — Command-line front end for building and signing transactions.
//!
//! Reads coins and funding transactions from JSON files, builds unsigned
//! transactions into signing requests, signs them with a key chain derived
//! from a prompted seed phrase, and computes or checks signature digests.
//! Secrets are only ever read through a no-echo prompt.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::info;

use sigil_core::address::{Address, Network};
use sigil_core::digest::tx_sighash;
use sigil_core::sighash::SigHash;
use sigil_core::types::Transaction;
use sigil_core::verify::verify_transaction;
use sigil_wallet::signer::resolve_prev_outputs;
use sigil_wallet::{
    Recipient, Seed, SigningInfo, TxSignData, Wallet, WalletCoin, WalletConfig,
    mnemonic_to_seed,
};

/// Sigil transaction construction and signing.
#[derive(Parser)]
#[command(name = "sigil")]
#[command(version, about = "Build, sign and verify Bitcoin-style transactions.")]
struct Cli {
    /// Config file (default: ~/.sigil/config.toml).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Network override (bitcoin, testnet, bitcoincash, bitcoincash-testnet).
    #[arg(short, long, global = true)]
    network: Option<Network>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Select coins and write a signing request.
    Build(BuildArgs),
    /// Sign the wallet-owned inputs of a signing request.
    Sign(SignArgs),
    /// Compute the signature digest of one input.
    Sighash(SighashArgs),
    /// Verify every input of a signed transaction.
    Verify(VerifyArgs),
}

#[derive(Args)]
struct BuildArgs {
    /// JSON file holding the spendable coins.
    #[arg(long)]
    coins: PathBuf,

    /// JSON file holding the funding transactions (hex strings).
    #[arg(long)]
    funding: PathBuf,

    /// Recipient as ADDRESS:AMOUNT in base units. Repeatable.
    #[arg(long = "to", required = true)]
    to: Vec<String>,

    /// Internal index receiving change.
    #[arg(long, default_value_t = 0)]
    change_index: u32,

    /// Where to write the request (default: stdout).
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Prompt for a BIP-39 passphrase.
    #[arg(long)]
    passphrase: bool,
}

#[derive(Args)]
struct SignArgs {
    /// JSON signing request produced by `build`.
    #[arg(long)]
    request: PathBuf,

    /// Where to write the result (default: stdout).
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Prompt for a BIP-39 passphrase.
    #[arg(long)]
    passphrase: bool,
}

#[derive(Args)]
struct SighashArgs {
    /// Hex-encoded transaction.
    #[arg(long)]
    tx: String,

    /// Hex-encoded locking script of the spent output.
    #[arg(long)]
    script: String,

    /// Input index.
    #[arg(long)]
    index: usize,

    /// SigHash byte, decimal or 0x-prefixed hex (default: network default).
    #[arg(long)]
    sighash: Option<String>,
}

#[derive(Args)]
struct VerifyArgs {
    /// Hex-encoded signed transaction.
    #[arg(long)]
    tx: String,

    /// JSON file holding the funding transactions (hex strings).
    #[arg(long)]
    funding: PathBuf,
}

/// Result of `sign`.
#[derive(Serialize)]
struct SignOutput {
    info: SigningInfo,
    tx: Transaction,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config, cli.network)?;

    match cli.command {
        Commands::Build(args) => cmd_build(args, config),
        Commands::Sign(args) => cmd_sign(args, config),
        Commands::Sighash(args) => cmd_sighash(args, &config),
        Commands::Verify(args) => cmd_verify(args),
    }
}

/// Build an unsigned transaction and emit the signing request.
fn cmd_build(args: BuildArgs, config: WalletConfig) -> Result<()> {
    let network = config.network;
    let recipients = args
        .to
        .iter()
        .map(|spec| parse_recipient(spec, network))
        .collect::<Result<Vec<_>>>()?;
    let coins: Vec<WalletCoin> = read_json(&args.coins)?;
    let funding: Vec<Transaction> = read_json(&args.funding)?;

    let wallet = open_wallet(config, args.passphrase)?;
    let built = wallet
        .build(&recipients, &coins, args.change_index)
        .context("Failed to build transaction")?;
    let request = wallet
        .sign_data(&built, funding.as_slice())
        .context("Failed to assemble signing request")?;

    eprintln!(
        "Built {} input(s), {} output(s), fee {}",
        built.tx.inputs.len(),
        built.tx.outputs.len(),
        built.selection.fee
    );
    write_json(args.out.as_deref(), &request)
}

/// Sign a request and emit the summary with the signed transaction.
fn cmd_sign(args: SignArgs, config: WalletConfig) -> Result<()> {
    let request: TxSignData = read_json(&args.request)?;
    let wallet = open_wallet(config, args.passphrase)?;
    let (info, tx) = wallet.sign(&request).context("Failed to sign transaction")?;
    info!(txid = %tx.txid(), complete = info.is_signed, "signed request");

    if !info.is_signed {
        eprintln!("Partially signed: other inputs still need signatures");
    }
    write_json(args.out.as_deref(), &SignOutput { info, tx })
}

/// Print the signature digest of one input as hex.
fn cmd_sighash(args: SighashArgs, config: &WalletConfig) -> Result<()> {
    let tx = Transaction::from_hex(args.tx.trim()).context("Invalid transaction hex")?;
    let script = hex::decode(args.script.trim()).context("Invalid script hex")?;
    if args.index >= tx.inputs.len() {
        bail!(
            "Input index {} out of range ({} inputs)",
            args.index,
            tx.inputs.len()
        );
    }
    let sighash = match args.sighash.as_deref() {
        Some(s) => SigHash::from_byte(parse_byte(s)?),
        None => config.network.default_sighash(),
    };

    let digest = tx_sighash(&tx, &script, args.index, sighash);
    println!("{}", hex::encode(digest.as_bytes()));
    Ok(())
}

/// Verify all inputs against the funding transactions.
fn cmd_verify(args: VerifyArgs) -> Result<()> {
    let tx = Transaction::from_hex(args.tx.trim()).context("Invalid transaction hex")?;
    let funding: Vec<Transaction> = read_json(&args.funding)?;
    let prev_outputs = resolve_prev_outputs(&tx, funding.as_slice())?;
    verify_transaction(&tx, &prev_outputs).context("Verification failed")?;
    info!(txid = %tx.txid(), inputs = tx.inputs.len(), "all inputs verified");
    println!("OK {} ({} inputs)", tx.txid(), tx.inputs.len());
    Ok(())
}

/// Load configuration, applying the network override.
fn load_config(path: Option<PathBuf>, network: Option<Network>) -> Result<WalletConfig> {
    let path = match path {
        Some(p) => Some(p),
        None => dirs::home_dir().map(|home| home.join(".sigil").join("config.toml")),
    };
    let mut config = WalletConfig::load(path.as_deref()).context("Failed to load config")?;
    if let Some(network) = network {
        config.network = network;
    }
    Ok(config)
}

/// Prompt for the seed and open the wallet.
fn open_wallet(config: WalletConfig, ask_passphrase: bool) -> Result<Wallet> {
    let input = prompt_secret("Enter seed (mnemonic or hex)")?;
    let passphrase = if ask_passphrase {
        prompt_secret("Enter passphrase")?
    } else {
        String::new()
    };
    let seed = parse_seed_input(&input, &passphrase)?;
    Wallet::from_seed(&seed, config).context("Failed to open wallet")
}

/// Parse seed input as either a BIP-39 mnemonic (multi-word) or hex string.
fn parse_seed_input(input: &str, passphrase: &str) -> Result<Seed> {
    let trimmed = input.trim();
    if trimmed.split_whitespace().count() > 1 {
        return mnemonic_to_seed(trimmed, passphrase).context("Invalid mnemonic");
    }
    if !passphrase.is_empty() {
        bail!("A passphrase only applies to mnemonic input");
    }
    let bytes = hex::decode(trimmed).context("Invalid hex seed")?;
    Seed::from_bytes(&bytes).context("Invalid seed length")
}

/// Parse `ADDRESS:AMOUNT`.
fn parse_recipient(spec: &str, network: Network) -> Result<Recipient> {
    let (addr, amount) = spec
        .split_once(':')
        .with_context(|| format!("Recipient must be ADDRESS:AMOUNT, got {spec}"))?;
    let address = Address::decode(addr, network)
        .with_context(|| format!("Invalid {network} address: {addr}"))?;
    let amount = amount
        .parse::<u64>()
        .with_context(|| format!("Invalid amount: {amount}"))?;
    Ok(Recipient { address, amount })
}

fn parse_byte(s: &str) -> Result<u8> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse::<u8>(),
    };
    parsed.with_context(|| format!("Invalid sighash byte: {s}"))
}

/// Prompt for a secret securely (no echo).
fn prompt_secret(prompt: &str) -> Result<String> {
    rpassword::prompt_password(format!("{prompt}: ")).context("Failed to read input")
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn write_json<T: Serialize>(path: Option<&Path>, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    match path {
        Some(p) => {
            fs::write(p, json + "\n").with_context(|| format!("Failed to write {}", p.display()))
        }
        None => {
            println!("{json}");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipient_parsing() {
        let r = parse_recipient("1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH:2500", Network::Bitcoin).unwrap();
        assert_eq!(r.amount, 2500);
        assert!(parse_recipient("1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH", Network::Bitcoin).is_err());
        assert!(parse_recipient("1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH:x", Network::Bitcoin).is_err());
        assert!(parse_recipient("1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH:5", Network::Testnet).is_err());
    }

    #[test]
    fn sighash_byte_parsing() {
        assert_eq!(parse_byte("65").unwrap(), 0x41);
        assert_eq!(parse_byte("0xc3").unwrap(), 0xc3);
        assert!(parse_byte("256").is_err());
    }

    #[test]
    fn seed_input_forms() {
        let phrase = "abandon abandon abandon abandon abandon abandon \
                      abandon abandon abandon abandon abandon about";
        assert_eq!(parse_seed_input(phrase, "").unwrap().as_bytes().len(), 64);
        assert_eq!(parse_seed_input(&"ab".repeat(32), "").unwrap().as_bytes().len(), 32);
        assert!(parse_seed_input(&"ab".repeat(32), "pass").is_err());
        assert!(parse_seed_input("zz", "").is_err());
    }
}
