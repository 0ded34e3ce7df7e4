//! Wallet error types.

use sigil_core::error::{AddressError, CryptoError, DecodeError};
use thiserror::Error;

/// Errors that can occur in wallet operations.
///
/// All classification and validation failures are reported before any input
/// is signed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    /// An input spends an outpoint not found among the funding transactions.
    #[error("Referenced input transactions are missing")]
    ReferencedInputsMissing,

    /// None of the inputs belong to the supplied key paths.
    #[error("Tx is missing inputs from private keys")]
    NoOwnedInputs,

    /// Change paths were supplied but no output pays to any of them.
    #[error("Tx is missing change outputs")]
    MissingChangeOutputs,

    /// Insufficient funds to cover the recipients plus fees.
    #[error("insufficient funds: have {have}, need {need}")]
    InsufficientFunds {
        /// Value of all available coins in base units.
        have: u64,
        /// Required amount in base units.
        need: u64,
    },

    /// Outputs spend more than the inputs provide.
    #[error("negative fee: inputs {inputs} < outputs {outputs}")]
    NegativeFee { inputs: u64, outputs: u64 },

    /// Invalid monetary amount.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Transaction build error.
    #[error("build error: {0}")]
    BuildError(String),

    /// Key derivation failure.
    #[error("key derivation: {0}")]
    KeyDerivation(String),

    /// Invalid BIP-39 mnemonic phrase.
    #[error("invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    /// Two signed copies of a transaction could not be combined.
    #[error("cannot merge: {0}")]
    MergeMismatch(String),

    /// Configuration could not be loaded or failed validation.
    #[error("config: {0}")]
    Config(String),

    /// Cryptographic error from sigil-core.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Address parsing error from sigil-core.
    #[error(transparent)]
    Address(#[from] AddressError),

    /// Wire decoding error from sigil-core.
    #[error(transparent)]
    Decode(#[from] DecodeError),
}
