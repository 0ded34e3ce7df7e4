//! Shared test helpers for E2E and property tests.

use sigil_core::address::{Address, Network};
use sigil_core::types::{Hash256, OutPoint, Transaction, TxInput, TxOutput};
use sigil_wallet::keys::{KeyChain, KeyDerivationPath, KeyDeriver, Seed};

/// Key chain on `network` from a seed filled with `fill`.
pub fn keychain(fill: u8, network: Network) -> KeyChain {
    let seed = Seed::from_bytes(&[fill; 64]).expect("valid seed length");
    KeyChain::from_seed(&seed, network, 0).expect("derivable account")
}

/// Address of `path` in `kc`.
pub fn address_at(kc: &KeyChain, path: &KeyDerivationPath) -> Address {
    kc.address(path).expect("derivable path")
}

/// A transaction with one dummy input paying `outputs`.
///
/// `tag` makes the dummy outpoint, and so the txid, unique.
pub fn make_funding(outputs: Vec<(u64, Vec<u8>)>, tag: u8) -> Transaction {
    Transaction {
        version: 1,
        inputs: vec![TxInput::unsigned(OutPoint::new(Hash256([tag; 32]), 0))],
        outputs: outputs
            .into_iter()
            .map(|(value, script)| TxOutput::new(value, script))
            .collect(),
        lock_time: 0,
    }
}

/// An unsigned transaction spending `prevouts`.
pub fn make_spend(prevouts: &[OutPoint], outputs: Vec<(u64, Vec<u8>)>) -> Transaction {
    Transaction {
        version: 1,
        inputs: prevouts.iter().copied().map(TxInput::unsigned).collect(),
        outputs: outputs
            .into_iter()
            .map(|(value, script)| TxOutput::new(value, script))
            .collect(),
        lock_time: 0,
    }
}
