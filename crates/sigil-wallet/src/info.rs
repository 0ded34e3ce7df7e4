//! Auditable summary of a signing attempt.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use sigil_core::address::Address;

use crate::error::WalletError;
use crate::keys::KeyDerivationPath;

/// A value held at a wallet-controlled path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathValue {
    pub value: u64,
    pub path: KeyDerivationPath,
}

/// What a transaction does to the wallet.
///
/// Entries are aggregated by address and keep the order in which each
/// address was first seen. Each controlled address maps to exactly one path,
/// so change and coin entries are also unique per (address, path).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningInfo {
    /// Outputs paying addresses outside the change set.
    pub recipients: IndexMap<Address, u64>,
    /// Outputs returning value to change paths.
    pub change: IndexMap<Address, PathValue>,
    /// Outputs whose script is not a pay-to-address form.
    pub non_standard_outputs: usize,
    /// Inputs spending wallet-controlled outputs.
    pub my_coins: IndexMap<Address, PathValue>,
    /// Net value leaving the wallet: owned inputs minus change.
    pub amount: i64,
    /// All input value minus all output value.
    pub fee: u64,
    /// Fee per byte of the signed transaction, truncated.
    pub fee_rate: u64,
    /// Every input is wallet-owned and signed.
    pub is_signed: bool,
}

impl SigningInfo {
    pub fn add_recipient(&mut self, address: Address, value: u64) {
        let entry = self.recipients.entry(address).or_insert(0);
        *entry = entry.saturating_add(value);
    }

    pub fn add_change(&mut self, address: Address, path: &KeyDerivationPath, value: u64) {
        merge_path_value(&mut self.change, address, path, value);
    }

    pub fn add_my_coin(&mut self, address: Address, path: &KeyDerivationPath, value: u64) {
        merge_path_value(&mut self.my_coins, address, path, value);
    }

    pub fn total_recipients(&self) -> u64 {
        self.recipients.values().fold(0, |acc, v| acc.saturating_add(*v))
    }

    pub fn total_change(&self) -> u64 {
        sum_values(&self.change)
    }

    pub fn total_my_coins(&self) -> u64 {
        sum_values(&self.my_coins)
    }

    /// Recompute `amount` from the owned coins and change.
    pub(crate) fn settle_amount(&mut self) -> Result<(), WalletError> {
        let net = i128::from(self.total_my_coins()) - i128::from(self.total_change());
        self.amount = i64::try_from(net)
            .map_err(|_| WalletError::InvalidAmount(format!("net amount {net} out of range")))?;
        Ok(())
    }
}

fn merge_path_value(
    map: &mut IndexMap<Address, PathValue>,
    address: Address,
    path: &KeyDerivationPath,
    value: u64,
) {
    map.entry(address)
        .and_modify(|pv| pv.value = pv.value.saturating_add(value))
        .or_insert_with(|| PathValue {
            value,
            path: path.clone(),
        });
}

fn sum_values(map: &IndexMap<Address, PathValue>) -> u64 {
    map.values().fold(0, |acc, pv| acc.saturating_add(pv.value))
}
