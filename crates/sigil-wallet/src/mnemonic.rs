//! BIP-39 mnemonic phrases to BIP-32 seeds.
//!
//! Only consumption is supported; phrase generation happens elsewhere.

use bip39::{Language, Mnemonic};

use crate::error::WalletError;
use crate::keys::Seed;

/// Collapse runs of whitespace and lowercase the phrase.
fn normalize(phrase: &str) -> String {
    phrase
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Parse and checksum-validate an English BIP-39 phrase.
pub fn parse_mnemonic(phrase: &str) -> Result<Mnemonic, WalletError> {
    Mnemonic::parse_in(Language::English, normalize(phrase))
        .map_err(|e| WalletError::InvalidMnemonic(e.to_string()))
}

/// Stretch a mnemonic and optional passphrase into a 64-byte seed.
pub fn mnemonic_to_seed(phrase: &str, passphrase: &str) -> Result<Seed, WalletError> {
    let mnemonic = parse_mnemonic(phrase)?;
    let mut bytes = mnemonic.to_seed(passphrase);
    let seed = Seed::from_bytes(&bytes);
    zeroize::Zeroize::zeroize(&mut bytes);
    seed
}
