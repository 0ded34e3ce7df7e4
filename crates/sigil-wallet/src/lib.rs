//! # sigil-wallet — HD key chain, transaction building and signing.
//!
//! Derives BIP-44 keys from a seed or BIP-39 phrase, selects coins and builds
//! unsigned transactions, then signs the inputs the wallet owns and reports
//! what the transaction does to the wallet.
//!
//! # Modules
//!
//! - [`error`] — `WalletError` enum
//! - [`keys`] — Seed, BIP-32 extended keys, BIP-44 `KeyChain`, derivation paths
//! - [`mnemonic`] — BIP-39 phrase to seed
//! - [`coin_selection`] — Largest-first selection with size-based fees
//! - [`builder`] — Unsigned transaction builder
//! - [`info`] — `SigningInfo` summary
//! - [`signer`] — Wallet signer and co-signer merge
//! - [`config`] — File and environment configuration
//! - [`wallet`] — High-level wallet composition

pub mod builder;
pub mod coin_selection;
pub mod config;
pub mod error;
pub mod info;
pub mod keys;
pub mod mnemonic;
pub mod signer;
pub mod wallet;

// Re-exports for convenient access
pub use builder::{BuiltTransaction, Recipient, TransactionBuilder};
pub use coin_selection::{CoinSelection, CoinSelector, SizeModel, WalletCoin};
pub use config::WalletConfig;
pub use error::WalletError;
pub use info::{PathValue, SigningInfo};
pub use keys::{Branch, DerivedKey, KeyChain, KeyDerivationPath, KeyDeriver, Seed};
pub use mnemonic::mnemonic_to_seed;
pub use signer::{FundingSource, TxSignData, merge_signatures, resolve_prev_outputs, sign_wallet_tx};
pub use wallet::Wallet;
