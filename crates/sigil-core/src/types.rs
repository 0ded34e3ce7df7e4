//! Core protocol types: transactions, inputs, outputs, outpoints.
//!
//! All monetary values are in base units (1 coin = 10^8 units). Every type
//! here round-trips byte-exact through the Bitcoin wire format; the order of
//! inputs and outputs is part of the encoding and is never changed.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::constants::SEQUENCE_FINAL;
use crate::crypto::sha256d;
use crate::encode::{Reader, Writer, varint_len};
use crate::error::DecodeError;

/// A 32-byte hash value in internal (wire) byte order.
///
/// `Display` and `FromStr` use the conventional byte-reversed hex form in
/// which transaction ids are shown by block explorers and node RPCs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0.iter().rev() {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl FromStr for Hash256 {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes: [u8; 32] = hex::decode(s)
            .map_err(|e| DecodeError::InvalidHex(e.to_string()))?
            .try_into()
            .map_err(|v: Vec<u8>| DecodeError::InvalidHex(format!("expected 32 bytes, got {}", v.len())))?;
        bytes.reverse();
        Ok(Self(bytes))
    }
}

impl From<[u8; 32]> for Hash256 {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Hash256 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for Hash256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Hash256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Reference to a specific output of a previous transaction.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutPoint {
    /// Id of the transaction containing the referenced output.
    pub txid: Hash256,
    /// Index of the output within that transaction.
    pub index: u32,
}

impl OutPoint {
    pub const SIZE: usize = 36;

    pub fn new(txid: Hash256, index: u32) -> Self {
        Self { txid, index }
    }

    fn write_to(&self, w: &mut Writer) {
        w.write_bytes(self.txid.as_bytes());
        w.write_u32_le(self.index);
    }

    fn read_from(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            txid: Hash256(r.read_array()?),
            index: r.read_u32_le()?,
        })
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.index)
    }
}

/// A transaction input spending a previous output.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TxInput {
    pub previous_output: OutPoint,
    /// Unlocking script. Empty until the input is signed.
    #[serde(with = "hex_bytes")]
    pub script_sig: Vec<u8>,
    pub sequence: u32,
}

impl TxInput {
    /// An unsigned input with a final sequence number.
    pub fn unsigned(previous_output: OutPoint) -> Self {
        Self {
            previous_output,
            script_sig: Vec::new(),
            sequence: SEQUENCE_FINAL,
        }
    }

    pub fn size(&self) -> usize {
        OutPoint::SIZE + varint_len(self.script_sig.len() as u64) + self.script_sig.len() + 4
    }

    fn write_to(&self, w: &mut Writer) {
        self.previous_output.write_to(w);
        w.write_var_bytes(&self.script_sig);
        w.write_u32_le(self.sequence);
    }

    fn read_from(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            previous_output: OutPoint::read_from(r)?,
            script_sig: r.read_var_bytes()?,
            sequence: r.read_u32_le()?,
        })
    }
}

/// A transaction output locking a value to a script.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TxOutput {
    /// Value in base units.
    pub value: u64,
    /// Locking script.
    #[serde(with = "hex_bytes")]
    pub script_pubkey: Vec<u8>,
}

impl TxOutput {
    pub fn new(value: u64, script_pubkey: Vec<u8>) -> Self {
        Self {
            value,
            script_pubkey,
        }
    }

    pub fn size(&self) -> usize {
        8 + varint_len(self.script_pubkey.len() as u64) + self.script_pubkey.len()
    }

    fn write_to(&self, w: &mut Writer) {
        w.write_u64_le(self.value);
        w.write_var_bytes(&self.script_pubkey);
    }

    fn read_from(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            value: r.read_u64_le()?,
            script_pubkey: r.read_var_bytes()?,
        })
    }
}

/// A transaction transferring value between scripts.
///
/// Serialized with `serde` as the hex of its wire encoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub lock_time: u32,
}

impl Transaction {
    /// Wire encoding.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = Writer::with_capacity(self.size());
        self.write_to(&mut w);
        w.into_bytes()
    }

    pub fn write_to(&self, w: &mut Writer) {
        w.write_u32_le(self.version);
        w.write_varint(self.inputs.len() as u64);
        for input in &self.inputs {
            input.write_to(w);
        }
        w.write_varint(self.outputs.len() as u64);
        for output in &self.outputs {
            output.write_to(w);
        }
        w.write_u32_le(self.lock_time);
    }

    /// Decode a transaction, rejecting trailing bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut r = Reader::new(bytes);
        let version = r.read_u32_le()?;
        let n_in = r.read_length()?;
        let mut inputs = Vec::with_capacity(n_in.min(1024));
        for _ in 0..n_in {
            inputs.push(TxInput::read_from(&mut r)?);
        }
        let n_out = r.read_length()?;
        let mut outputs = Vec::with_capacity(n_out.min(1024));
        for _ in 0..n_out {
            outputs.push(TxOutput::read_from(&mut r)?);
        }
        let lock_time = r.read_u32_le()?;
        if r.remaining() != 0 {
            return Err(DecodeError::TrailingBytes(r.remaining()));
        }
        Ok(Self {
            version,
            inputs,
            outputs,
            lock_time,
        })
    }

    pub fn from_hex(s: &str) -> Result<Self, DecodeError> {
        let bytes = hex::decode(s.trim()).map_err(|e| DecodeError::InvalidHex(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Transaction id: double SHA-256 of the wire encoding.
    pub fn txid(&self) -> Hash256 {
        sha256d(&self.to_bytes())
    }

    /// Serialized size in bytes.
    pub fn size(&self) -> usize {
        8 + varint_len(self.inputs.len() as u64)
            + self.inputs.iter().map(TxInput::size).sum::<usize>()
            + varint_len(self.outputs.len() as u64)
            + self.outputs.iter().map(TxOutput::size).sum::<usize>()
    }

    /// Sum of all output values. Returns None on overflow.
    pub fn total_output_value(&self) -> Option<u64> {
        self.outputs
            .iter()
            .try_fold(0u64, |acc, out| acc.checked_add(out.value))
    }

    /// Look up an output of this transaction by index.
    pub fn output(&self, index: u32) -> Option<&TxOutput> {
        self.outputs.get(index as usize)
    }
}

impl Serialize for Transaction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Transaction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter encoding byte vectors as hex strings.
pub mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::COIN;

    fn sample_tx() -> Transaction {
        Transaction {
            version: 1,
            inputs: vec![
                TxInput {
                    previous_output: OutPoint::new(Hash256([0x11; 32]), 0),
                    script_sig: vec![0xaa; 107],
                    sequence: SEQUENCE_FINAL,
                },
                TxInput::unsigned(OutPoint::new(Hash256([0x22; 32]), 3)),
            ],
            outputs: vec![
                TxOutput::new(50 * COIN, vec![0x76, 0xa9, 0x14]),
                TxOutput::new(1, vec![]),
            ],
            lock_time: 500_000,
        }
    }

    // --- Hash256 ---

    #[test]
    fn hash256_zero_is_zero() {
        assert!(Hash256::ZERO.is_zero());
        assert_eq!(Hash256::ZERO, Hash256::default());
        assert!(!Hash256([1; 32]).is_zero());
    }

    #[test]
    fn hash256_display_is_byte_reversed() {
        let mut bytes = [0u8; 32];
        bytes[0] = 0x01;
        bytes[31] = 0xff;
        let s = Hash256(bytes).to_string();
        assert!(s.starts_with("ff"));
        assert!(s.ends_with("01"));
        assert_eq!(s.parse::<Hash256>().unwrap(), Hash256(bytes));
    }

    #[test]
    fn hash256_parse_rejects_short() {
        assert!(matches!("abcd".parse::<Hash256>(), Err(DecodeError::InvalidHex(_))));
    }

    // --- Transaction wire format ---

    #[test]
    fn size_matches_encoding() {
        let tx = sample_tx();
        assert_eq!(tx.size(), tx.to_bytes().len());
    }

    #[test]
    fn decode_inverts_encode() {
        let tx = sample_tx();
        assert_eq!(Transaction::from_bytes(&tx.to_bytes()).unwrap(), tx);
        assert_eq!(Transaction::from_hex(&tx.to_hex()).unwrap(), tx);
    }

    #[test]
    fn decode_rejects_trailing_bytes() {
        let mut bytes = sample_tx().to_bytes();
        bytes.push(0);
        assert_eq!(Transaction::from_bytes(&bytes), Err(DecodeError::TrailingBytes(1)));
    }

    #[test]
    fn decode_rejects_truncation() {
        let bytes = sample_tx().to_bytes();
        assert!(matches!(
            Transaction::from_bytes(&bytes[..bytes.len() - 1]),
            Err(DecodeError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn known_layout() {
        let tx = Transaction {
            version: 2,
            inputs: vec![TxInput::unsigned(OutPoint::new(Hash256([0xab; 32]), 1))],
            outputs: vec![TxOutput::new(0x0102, vec![0x51])],
            lock_time: 7,
        };
        let mut expected = vec![2, 0, 0, 0, 1];
        expected.extend_from_slice(&[0xab; 32]);
        expected.extend_from_slice(&[1, 0, 0, 0]);
        expected.push(0);
        expected.extend_from_slice(&[0xff; 4]);
        expected.push(1);
        expected.extend_from_slice(&[0x02, 0x01, 0, 0, 0, 0, 0, 0]);
        expected.extend_from_slice(&[1, 0x51]);
        expected.extend_from_slice(&[7, 0, 0, 0]);
        assert_eq!(tx.to_bytes(), expected);
    }

    #[test]
    fn txid_changes_with_order() {
        let tx = sample_tx();
        let mut swapped = tx.clone();
        swapped.outputs.swap(0, 1);
        assert_ne!(tx.txid(), swapped.txid());
    }

    #[test]
    fn total_output_value_overflow() {
        let mut tx = sample_tx();
        assert_eq!(tx.total_output_value(), Some(50 * COIN + 1));
        tx.outputs.push(TxOutput::new(u64::MAX, vec![]));
        assert_eq!(tx.total_output_value(), None);
    }

    #[test]
    fn transaction_serde_as_hex() {
        let tx = sample_tx();
        let json = serde_json::to_string(&tx).unwrap();
        assert_eq!(json, format!("\"{}\"", tx.to_hex()));
        let back: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tx);
    }

    #[test]
    fn outpoint_display() {
        let op = OutPoint::new(Hash256::ZERO, 4);
        assert_eq!(op.to_string(), format!("{}:4", "0".repeat(64)));
    }
}
