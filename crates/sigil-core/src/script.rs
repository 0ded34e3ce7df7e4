//! Standard script templates.
//!
//! Only the two pay-to-address forms are recognised; every other locking
//! script is reported as [`ScriptOutput::NonStandard`].

use crate::crypto::PublicKey;

pub const OP_DUP: u8 = 0x76;
pub const OP_HASH160: u8 = 0xa9;
pub const OP_EQUAL: u8 = 0x87;
pub const OP_EQUALVERIFY: u8 = 0x88;
pub const OP_CHECKSIG: u8 = 0xac;
pub const OP_PUSHDATA1: u8 = 0x4c;

/// Classification of a locking script.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScriptOutput {
    /// `OP_DUP OP_HASH160 <20> OP_EQUALVERIFY OP_CHECKSIG`
    PayPkHash([u8; 20]),
    /// `OP_HASH160 <20> OP_EQUAL`
    PayScriptHash([u8; 20]),
    NonStandard,
}

impl ScriptOutput {
    pub fn classify(script: &[u8]) -> Self {
        match script {
            [OP_DUP, OP_HASH160, 0x14, hash @ .., OP_EQUALVERIFY, OP_CHECKSIG] if hash.len() == 20 => {
                Self::PayPkHash(to_hash20(hash))
            }
            [OP_HASH160, 0x14, hash @ .., OP_EQUAL] if hash.len() == 20 => {
                Self::PayScriptHash(to_hash20(hash))
            }
            _ => Self::NonStandard,
        }
    }

    /// Locking script bytes. Empty for non-standard scripts.
    pub fn to_script(&self) -> Vec<u8> {
        match self {
            Self::PayPkHash(hash) => p2pkh_script(hash),
            Self::PayScriptHash(hash) => p2sh_script(hash),
            Self::NonStandard => Vec::new(),
        }
    }
}

fn to_hash20(bytes: &[u8]) -> [u8; 20] {
    let mut out = [0u8; 20];
    out.copy_from_slice(bytes);
    out
}

pub fn p2pkh_script(pubkey_hash: &[u8; 20]) -> Vec<u8> {
    let mut script = Vec::with_capacity(25);
    script.extend_from_slice(&[OP_DUP, OP_HASH160, 0x14]);
    script.extend_from_slice(pubkey_hash);
    script.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);
    script
}

pub fn p2sh_script(script_hash: &[u8; 20]) -> Vec<u8> {
    let mut script = Vec::with_capacity(23);
    script.extend_from_slice(&[OP_HASH160, 0x14]);
    script.extend_from_slice(script_hash);
    script.push(OP_EQUAL);
    script
}

/// Append a minimal data push. Handles the sizes that occur in P2PKH
/// unlocking scripts (signatures and public keys, always < 256 bytes).
fn push_data(script: &mut Vec<u8>, data: &[u8]) {
    if data.len() < OP_PUSHDATA1 as usize {
        script.push(data.len() as u8);
    } else {
        script.push(OP_PUSHDATA1);
        script.push(data.len() as u8);
    }
    script.extend_from_slice(data);
}

/// `<signature||sighash> <pubkey>`
pub fn p2pkh_unlocking_script(encoded_sig: &[u8], public_key: &PublicKey) -> Vec<u8> {
    let mut script = Vec::with_capacity(encoded_sig.len() + 35);
    push_data(&mut script, encoded_sig);
    push_data(&mut script, &public_key.to_bytes());
    script
}

fn read_push<'a>(script: &'a [u8], pos: &mut usize) -> Option<&'a [u8]> {
    let op = *script.get(*pos)?;
    *pos += 1;
    let len = match op {
        1..=0x4b => op as usize,
        OP_PUSHDATA1 => {
            let n = *script.get(*pos)? as usize;
            *pos += 1;
            n
        }
        _ => return None,
    };
    let data = script.get(*pos..*pos + len)?;
    *pos += len;
    Some(data)
}

/// Split a P2PKH unlocking script into its signature blob and public key bytes.
pub fn parse_p2pkh_unlocking_script(script: &[u8]) -> Option<(&[u8], &[u8])> {
    let mut pos = 0;
    let sig = read_push(script, &mut pos)?;
    let key = read_push(script, &mut pos)?;
    (pos == script.len()).then_some((sig, key))
}
