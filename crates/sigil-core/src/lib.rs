//! # sigil-core
//! Wire types, hashing, scripts and the signature-hash machinery for Sigil.

pub mod address;
pub mod constants;
pub mod crypto;
pub mod digest;
pub mod encode;
pub mod error;
pub mod script;
pub mod sighash;
pub mod signature;
pub mod types;
pub mod verify;

pub use address::{Address, AddressKind, Network};
pub use crypto::{KeyPair, PublicKey};
pub use digest::tx_sighash;
pub use sighash::{SigHash, SigHashType};
pub use signature::{TxSignature, decode_canonical_sig, decode_sig, encode_sig};
pub use types::{Hash256, OutPoint, Transaction, TxInput, TxOutput};
