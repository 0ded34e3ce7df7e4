//! Base58Check addresses and the networks they belong to.
//!
//! An address is a version byte followed by a 20-byte hash, encoded with
//! Base58Check. The version byte identifies both the network and whether the
//! hash commits to a public key (P2PKH) or a script (P2SH).

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::crypto::PublicKey;
use crate::error::AddressError;
use crate::script::ScriptOutput;
use crate::sighash::SigHash;

/// Chain parameters relevant to addresses and signing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Network {
    #[default]
    Bitcoin,
    Testnet,
    #[serde(rename = "bitcoincash")]
    BitcoinCash,
    #[serde(rename = "bitcoincash-testnet")]
    BitcoinCashTestnet,
}

impl Network {
    pub fn name(&self) -> &'static str {
        match self {
            Network::Bitcoin => "bitcoin",
            Network::Testnet => "testnet",
            Network::BitcoinCash => "bitcoincash",
            Network::BitcoinCashTestnet => "bitcoincash-testnet",
        }
    }

    pub fn p2pkh_prefix(&self) -> u8 {
        match self {
            Network::Bitcoin | Network::BitcoinCash => 0x00,
            Network::Testnet | Network::BitcoinCashTestnet => 0x6f,
        }
    }

    pub fn p2sh_prefix(&self) -> u8 {
        match self {
            Network::Bitcoin | Network::BitcoinCash => 0x05,
            Network::Testnet | Network::BitcoinCashTestnet => 0xc4,
        }
    }

    /// BIP44 coin type.
    pub fn coin_type(&self) -> u32 {
        match self {
            Network::Bitcoin => 0,
            Network::Testnet | Network::BitcoinCashTestnet => 1,
            Network::BitcoinCash => 145,
        }
    }

    /// Whether signatures on this network carry the fork-id flag.
    pub fn uses_fork_id(&self) -> bool {
        matches!(self, Network::BitcoinCash | Network::BitcoinCashTestnet)
    }

    /// SigHash used when the wallet signs its own inputs.
    pub fn default_sighash(&self) -> SigHash {
        SigHash::all().with_fork_id(self.uses_fork_id())
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Network {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bitcoin" | "mainnet" => Ok(Network::Bitcoin),
            "testnet" => Ok(Network::Testnet),
            "bitcoincash" => Ok(Network::BitcoinCash),
            "bitcoincash-testnet" => Ok(Network::BitcoinCashTestnet),
            _ => Err(AddressError::UnknownNetwork(s.to_string())),
        }
    }
}

/// Kind of hash an address commits to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AddressKind {
    PubkeyHash,
    ScriptHash,
}

/// A pay-to-address destination on a specific network.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Address {
    network: Network,
    kind: AddressKind,
    hash: [u8; 20],
}

impl Address {
    pub fn p2pkh(pubkey_hash: [u8; 20], network: Network) -> Self {
        Self {
            network,
            kind: AddressKind::PubkeyHash,
            hash: pubkey_hash,
        }
    }

    pub fn p2sh(script_hash: [u8; 20], network: Network) -> Self {
        Self {
            network,
            kind: AddressKind::ScriptHash,
            hash: script_hash,
        }
    }

    pub fn from_public_key(public_key: &PublicKey, network: Network) -> Self {
        Self::p2pkh(public_key.pubkey_hash(), network)
    }

    /// Recognise a locking script as a pay-to-address form.
    pub fn from_script(script: &[u8], network: Network) -> Option<Self> {
        match ScriptOutput::classify(script) {
            ScriptOutput::PayPkHash(hash) => Some(Self::p2pkh(hash, network)),
            ScriptOutput::PayScriptHash(hash) => Some(Self::p2sh(hash, network)),
            ScriptOutput::NonStandard => None,
        }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn kind(&self) -> AddressKind {
        self.kind
    }

    pub fn hash(&self) -> &[u8; 20] {
        &self.hash
    }

    /// Locking script paying to this address.
    pub fn script_pubkey(&self) -> Vec<u8> {
        match self.kind {
            AddressKind::PubkeyHash => ScriptOutput::PayPkHash(self.hash).to_script(),
            AddressKind::ScriptHash => ScriptOutput::PayScriptHash(self.hash).to_script(),
        }
    }

    fn version(&self) -> u8 {
        match self.kind {
            AddressKind::PubkeyHash => self.network.p2pkh_prefix(),
            AddressKind::ScriptHash => self.network.p2sh_prefix(),
        }
    }

    pub fn encode(&self) -> String {
        let mut payload = Vec::with_capacity(21);
        payload.push(self.version());
        payload.extend_from_slice(&self.hash);
        bs58::encode(payload).with_check().into_string()
    }

    /// Decode a Base58Check address for the given network.
    pub fn decode(s: &str, network: Network) -> Result<Self, AddressError> {
        let payload = bs58::decode(s.trim())
            .with_check(None)
            .into_vec()
            .map_err(|e| AddressError::InvalidEncoding(e.to_string()))?;
        if payload.len() != 21 {
            return Err(AddressError::InvalidLength(payload.len()));
        }
        let mut hash = [0u8; 20];
        hash.copy_from_slice(&payload[1..]);
        match payload[0] {
            v if v == network.p2pkh_prefix() => Ok(Self::p2pkh(hash, network)),
            v if v == network.p2sh_prefix() => Ok(Self::p2sh(hash, network)),
            version => Err(AddressError::UnknownVersion {
                version,
                network: network.to_string(),
            }),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Serialized form: the Base58Check string, prefixed with `network:` when
/// the version bytes alone do not identify the network. Bitcoin Cash shares
/// its version bytes with Bitcoin, so `bitcoincash:1...` keeps the network
/// across a round trip while Bitcoin and Testnet stay plain strings.
impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.network.uses_fork_id() {
            serializer.serialize_str(&format!("{}:{}", self.network, self.encode()))
        } else {
            serializer.serialize_str(&self.encode())
        }
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let parsed = match s.split_once(':') {
            Some((network, encoded)) => network
                .parse::<Network>()
                .and_then(|net| Address::decode(encoded, net))
                .ok(),
            None => [Network::Bitcoin, Network::Testnet]
                .into_iter()
                .find_map(|net| Address::decode(&s, net).ok()),
        };
        parsed.ok_or_else(|| serde::de::Error::custom(format!("invalid address: {s}")))
    }
}
