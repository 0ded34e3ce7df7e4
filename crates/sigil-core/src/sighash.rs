//! The one-byte signature-hash descriptor.
//!
//! The low six bits carry the type code, bit 6 the fork-id flag and bit 7
//! the anyone-can-pay flag. Unknown type codes are preserved so that every
//! byte value survives a decode/encode round trip.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::constants::SIGHASH_FORK_VALUE;

pub const SIGHASH_ALL: u8 = 0x01;
pub const SIGHASH_NONE: u8 = 0x02;
pub const SIGHASH_SINGLE: u8 = 0x03;
pub const SIGHASH_FORKID: u8 = 0x40;
pub const SIGHASH_ANYONECANPAY: u8 = 0x80;

const FLAG_MASK: u8 = SIGHASH_FORKID | SIGHASH_ANYONECANPAY;

/// Which outputs a signature commits to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SigHashType {
    All,
    None,
    Single,
    /// Any other code, kept verbatim.
    Unknown(u8),
}

impl SigHashType {
    pub fn from_code(code: u8) -> Self {
        match code & !FLAG_MASK {
            SIGHASH_ALL => Self::All,
            SIGHASH_NONE => Self::None,
            SIGHASH_SINGLE => Self::Single,
            other => Self::Unknown(other),
        }
    }

    /// Numeric code with the flag bits cleared.
    pub fn code(&self) -> u8 {
        match self {
            Self::All => SIGHASH_ALL,
            Self::None => SIGHASH_NONE,
            Self::Single => SIGHASH_SINGLE,
            Self::Unknown(code) => code & !FLAG_MASK,
        }
    }
}

/// Signature-hash descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SigHash {
    pub ty: SigHashType,
    pub anyone_can_pay: bool,
    pub fork_id: bool,
}

impl SigHash {
    pub fn new(ty: SigHashType, anyone_can_pay: bool, fork_id: bool) -> Self {
        Self {
            ty,
            anyone_can_pay,
            fork_id,
        }
    }

    pub fn all() -> Self {
        Self::new(SigHashType::All, false, false)
    }

    pub fn with_fork_id(mut self, fork_id: bool) -> Self {
        self.fork_id = fork_id;
        self
    }

    pub fn with_anyone_can_pay(mut self, anyone_can_pay: bool) -> Self {
        self.anyone_can_pay = anyone_can_pay;
        self
    }

    pub fn to_byte(&self) -> u8 {
        let mut byte = self.ty.code();
        if self.fork_id {
            byte |= SIGHASH_FORKID;
        }
        if self.anyone_can_pay {
            byte |= SIGHASH_ANYONECANPAY;
        }
        byte
    }

    pub fn from_byte(byte: u8) -> Self {
        Self {
            ty: SigHashType::from_code(byte),
            anyone_can_pay: byte & SIGHASH_ANYONECANPAY != 0,
            fork_id: byte & SIGHASH_FORKID != 0,
        }
    }

    /// 32-bit value appended (little-endian) to the digest preimage.
    ///
    /// Always emitted, whether or not the fork-id flag is set.
    pub fn fork_id_value(&self) -> u32 {
        (SIGHASH_FORK_VALUE << 8) | u32::from(self.to_byte())
    }
}

impl Default for SigHash {
    fn default() -> Self {
        Self::all()
    }
}

impl From<u8> for SigHash {
    fn from(byte: u8) -> Self {
        Self::from_byte(byte)
    }
}

impl From<SigHash> for u8 {
    fn from(sighash: SigHash) -> Self {
        sighash.to_byte()
    }
}

impl fmt::Display for SigHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ty {
            SigHashType::All => f.write_str("ALL")?,
            SigHashType::None => f.write_str("NONE")?,
            SigHashType::Single => f.write_str("SINGLE")?,
            SigHashType::Unknown(code) => write!(f, "UNKNOWN({code:#04x})")?,
        }
        if self.fork_id {
            f.write_str("|FORKID")?;
        }
        if self.anyone_can_pay {
            f.write_str("|ANYONECANPAY")?;
        }
        Ok(())
    }
}

impl Serialize for SigHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.to_byte())
    }
}

impl<'de> Deserialize<'de> for SigHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u8::deserialize(deserializer).map(Self::from_byte)
    }
}

/// Encode the fork-augmented preimage suffix for `sighash`.
pub fn encode_sighash_fork_id(sighash: &SigHash) -> [u8; 4] {
    sighash.fork_id_value().to_le_bytes()
}
