//! Error types for the Sigil core.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unexpected end of data: needed {needed} bytes at offset {offset}")] UnexpectedEof { needed: usize, offset: usize },
    #[error("trailing bytes after transaction: {0}")] TrailingBytes(usize),
    #[error("length prefix too large: {0}")] LengthTooLarge(u64),
    #[error("invalid hex: {0}")] InvalidHex(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("empty signature")] Empty,
    #[error("malformed signature: {0}")] Malformed(String),
    #[error("Non-canonical signature: {reason}")] NonCanonical { reason: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid base58check encoding: {0}")] InvalidEncoding(String),
    #[error("invalid payload length: {0}")] InvalidLength(usize),
    #[error("unknown version byte {version:#04x} for network {network}")] UnknownVersion { version: u8, network: String },
    #[error("unknown network: {0}")] UnknownNetwork(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid secret key bytes")] InvalidSecretKey,
    #[error("invalid public key bytes")] InvalidPublicKey,
    #[error("signature verification failed")] VerificationFailed,
    #[error("input index out of bounds: {index} >= {len}")] InputIndexOutOfBounds { index: usize, len: usize },
    #[error("unlocking script on input {0} is not pay-to-pubkey-hash")] UnsupportedUnlockingScript(usize),
    #[error("public key on input {0} does not match the spent output")] PubkeyHashMismatch(usize),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SigilError {
    #[error(transparent)] Decode(#[from] DecodeError),
    #[error(transparent)] Signature(#[from] SignatureError),
    #[error(transparent)] Address(#[from] AddressError),
    #[error(transparent)] Crypto(#[from] CryptoError),
}
