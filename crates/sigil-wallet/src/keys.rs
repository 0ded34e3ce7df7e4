//! Seed management and hierarchical deterministic key derivation.
//!
//! Implements BIP-32 private derivation over secp256k1 and the BIP-44 account
//! layout `m/44'/coin'/account'`. Wallet paths are relative to the account:
//! a branch (0 for receiving, 1 for change) followed by one or more indices.

use hmac::{Hmac, Mac};
use secp256k1::{SECP256K1, Scalar, SecretKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::Sha512;
use std::fmt;
use std::str::FromStr;
use zeroize::{Zeroize, ZeroizeOnDrop};

use sigil_core::address::{Address, Network};
use sigil_core::crypto::KeyPair;

use crate::error::WalletError;

type HmacSha512 = Hmac<Sha512>;

/// Offset marking a hardened child index.
pub const HARDENED: u32 = 0x8000_0000;

/// BIP-44 purpose field.
pub const BIP44_PURPOSE: u32 = 44;

const MASTER_HMAC_KEY: &[u8] = b"Bitcoin seed";

/// A BIP-32 master seed (16 to 64 bytes).
///
/// Secret material is zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Seed {
    bytes: Vec<u8>,
}

impl Seed {
    /// Create a seed from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WalletError> {
        if !(16..=64).contains(&bytes.len()) {
            return Err(WalletError::KeyDerivation(format!(
                "seed must be 16 to 64 bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self {
            bytes: bytes.to_vec(),
        })
    }

    /// Get the raw seed bytes. Handle with care.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl Clone for Seed {
    fn clone(&self) -> Self {
        Self {
            bytes: self.bytes.clone(),
        }
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Seed")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// A BIP-32 extended private key.
#[derive(Clone)]
pub struct ExtendedPrivateKey {
    secret: SecretKey,
    chain_code: [u8; 32],
    depth: u8,
}

impl ExtendedPrivateKey {
    /// Master key from a seed.
    pub fn master(seed: &Seed) -> Result<Self, WalletError> {
        let (il, ir) = hmac_sha512(MASTER_HMAC_KEY, &[seed.as_bytes()])?;
        let secret = SecretKey::from_slice(&il)
            .map_err(|_| WalletError::KeyDerivation("seed yields an invalid master key".into()))?;
        Ok(Self {
            secret,
            chain_code: ir,
            depth: 0,
        })
    }

    /// Derive the child at `index`. Indices at or above [`HARDENED`] use
    /// hardened derivation.
    ///
    /// When IL is not below the curve order or the child key is zero, BIP-32
    /// says to move on to the next index. Paths here name exact indices, so
    /// such a child is reported as [`WalletError::KeyDerivation`] and the
    /// caller picks another index.
    pub fn derive_child(&self, index: u32) -> Result<Self, WalletError> {
        let index_bytes = index.to_be_bytes();
        let (il, ir) = if index >= HARDENED {
            let secret = self.secret.secret_bytes();
            hmac_sha512(&self.chain_code, &[&[0u8][..], &secret[..], &index_bytes[..]])?
        } else {
            let public = secp256k1::PublicKey::from_secret_key(SECP256K1, &self.secret).serialize();
            hmac_sha512(&self.chain_code, &[&public[..], &index_bytes[..]])?
        };

        Ok(Self {
            secret: self.child_secret(il, index)?,
            chain_code: ir,
            depth: self.depth.saturating_add(1),
        })
    }

    /// Parent key plus IL, rejecting the invalid cases.
    fn child_secret(&self, il: [u8; 32], index: u32) -> Result<SecretKey, WalletError> {
        let tweak = Scalar::from_be_bytes(il)
            .map_err(|_| WalletError::KeyDerivation(format!("child {index} out of range")))?;
        self.secret
            .add_tweak(&tweak)
            .map_err(|_| WalletError::KeyDerivation(format!("child {index} is invalid")))
    }

    /// Derive along a sequence of child indices.
    pub fn derive_path(&self, path: &[u32]) -> Result<Self, WalletError> {
        let mut key = self.clone();
        for &index in path {
            key = key.derive_child(index)?;
        }
        Ok(key)
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn chain_code(&self) -> &[u8; 32] {
        &self.chain_code
    }

    pub fn key_pair(&self) -> Result<KeyPair, WalletError> {
        Ok(KeyPair::from_secret_bytes(&self.secret.secret_bytes())?)
    }
}

impl Drop for ExtendedPrivateKey {
    fn drop(&mut self) {
        self.chain_code.zeroize();
        self.secret.non_secure_erase();
    }
}

impl fmt::Debug for ExtendedPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtendedPrivateKey")
            .field("depth", &self.depth)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

fn hmac_sha512(key: &[u8], parts: &[&[u8]]) -> Result<([u8; 32], [u8; 32]), WalletError> {
    let mut mac = HmacSha512::new_from_slice(key)
        .map_err(|e| WalletError::KeyDerivation(e.to_string()))?;
    for part in parts {
        mac.update(part);
    }
    let out = mac.finalize().into_bytes();
    let mut il = [0u8; 32];
    let mut ir = [0u8; 32];
    il.copy_from_slice(&out[..32]);
    ir.copy_from_slice(&out[32..]);
    Ok((il, ir))
}

/// Account-level branch of a derivation path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Branch {
    /// Receiving addresses.
    External,
    /// Change addresses.
    Internal,
}

impl Branch {
    pub fn index(&self) -> u32 {
        match self {
            Branch::External => 0,
            Branch::Internal => 1,
        }
    }

    pub fn from_index(index: u32) -> Option<Self> {
        match index {
            0 => Some(Branch::External),
            1 => Some(Branch::Internal),
            _ => None,
        }
    }
}

/// A path relative to the wallet account, e.g. `/1/4`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyDerivationPath {
    pub branch: Branch,
    pub index: Vec<u32>,
}

impl KeyDerivationPath {
    pub fn new(branch: Branch, index: Vec<u32>) -> Self {
        Self { branch, index }
    }

    pub fn external(index: u32) -> Self {
        Self::new(Branch::External, vec![index])
    }

    pub fn internal(index: u32) -> Self {
        Self::new(Branch::Internal, vec![index])
    }

    /// Child indices below the account key.
    pub fn to_relative(&self) -> Vec<u32> {
        let mut path = Vec::with_capacity(self.index.len() + 1);
        path.push(self.branch.index());
        path.extend_from_slice(&self.index);
        path
    }
}

impl fmt::Display for KeyDerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.branch.index())?;
        for i in &self.index {
            if *i >= HARDENED {
                write!(f, "/{}'", i - HARDENED)?;
            } else {
                write!(f, "/{i}")?;
            }
        }
        Ok(())
    }
}

impl FromStr for KeyDerivationPath {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || WalletError::KeyDerivation(format!("invalid path: {s}"));
        let mut parts = s.strip_prefix('/').ok_or_else(invalid)?.split('/');
        let branch = parts
            .next()
            .and_then(|b| b.parse::<u32>().ok())
            .and_then(Branch::from_index)
            .ok_or_else(invalid)?;
        let index = parts
            .map(|p| match p.strip_suffix('\'') {
                Some(h) => h
                    .parse::<u32>()
                    .ok()
                    .filter(|i| *i < HARDENED)
                    .map(|i| i + HARDENED),
                None => p.parse::<u32>().ok().filter(|i| *i < HARDENED),
            })
            .collect::<Option<Vec<u32>>>()
            .ok_or_else(invalid)?;
        if index.is_empty() {
            return Err(invalid());
        }
        Ok(Self { branch, index })
    }
}

impl Serialize for KeyDerivationPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for KeyDerivationPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A signing key together with the address it controls.
#[derive(Clone, Debug)]
pub struct DerivedKey {
    pub key_pair: KeyPair,
    pub address: Address,
}

/// Maps a relative path to its key and address. Deterministic and pure.
pub trait KeyDeriver {
    fn network(&self) -> Network;

    fn derive(&self, path: &KeyDerivationPath) -> Result<DerivedKey, WalletError>;

    fn address(&self, path: &KeyDerivationPath) -> Result<Address, WalletError> {
        Ok(self.derive(path)?.address)
    }
}

/// BIP-44 account key chain.
#[derive(Clone)]
pub struct KeyChain {
    account_key: ExtendedPrivateKey,
    network: Network,
    account: u32,
}

impl KeyChain {
    /// Derive the account key `m/44'/coin'/account'` from a seed.
    pub fn from_seed(seed: &Seed, network: Network, account: u32) -> Result<Self, WalletError> {
        if account >= HARDENED {
            return Err(WalletError::KeyDerivation(format!("account {account} out of range")));
        }
        let account_key = ExtendedPrivateKey::master(seed)?.derive_path(&[
            BIP44_PURPOSE + HARDENED,
            network.coin_type() + HARDENED,
            account + HARDENED,
        ])?;
        Ok(Self {
            account_key,
            network,
            account,
        })
    }

    pub fn account(&self) -> u32 {
        self.account
    }

    /// Absolute path of the account key, e.g. `m/44'/0'/0'`.
    pub fn account_path(&self) -> String {
        format!(
            "m/{BIP44_PURPOSE}'/{}'/{}'",
            self.network.coin_type(),
            self.account
        )
    }

    /// The first `count` single-index paths on `branch` with their addresses.
    pub fn addresses(
        &self,
        branch: Branch,
        count: u32,
    ) -> Result<Vec<(Address, KeyDerivationPath)>, WalletError> {
        (0..count)
            .map(|i| {
                let path = KeyDerivationPath::new(branch, vec![i]);
                Ok((self.address(&path)?, path))
            })
            .collect()
    }
}

impl KeyDeriver for KeyChain {
    fn network(&self) -> Network {
        self.network
    }

    fn derive(&self, path: &KeyDerivationPath) -> Result<DerivedKey, WalletError> {
        let key_pair = self.account_key.derive_path(&path.to_relative())?.key_pair()?;
        let address = Address::from_public_key(&key_pair.public_key(), self.network);
        Ok(DerivedKey { key_pair, address })
    }
}

impl fmt::Debug for KeyChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyChain")
            .field("network", &self.network)
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}
