//! Transaction builder.
//!
//! Provides a builder pattern for constructing unsigned transactions:
//! 1. Add recipients (address + amount)
//! 2. Configure fee rate, dust threshold and fee policy
//! 3. Build against the wallet's coins and a change destination
//!
//! The result carries what the signer needs: the ids of the funding
//! transactions and the derivation paths of the spent coins and the change.

use indexmap::IndexSet;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use sigil_core::address::Address;
use sigil_core::constants::{DEFAULT_DUST_THRESHOLD, DEFAULT_FEE_RATE, TX_VERSION};
use sigil_core::types::{Hash256, Transaction, TxInput, TxOutput};

use crate::coin_selection::{CoinSelection, CoinSelector, SizeModel, WalletCoin};
use crate::error::WalletError;
use crate::keys::KeyDerivationPath;

/// A transaction recipient: address and amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    /// Destination address.
    pub address: Address,
    /// Amount in base units.
    pub amount: u64,
}

/// An unsigned transaction and the bookkeeping needed to sign it.
#[derive(Debug, Clone)]
pub struct BuiltTransaction {
    /// The transaction with empty unlocking scripts.
    pub tx: Transaction,
    /// Ids of the transactions whose outputs are spent, first-seen order.
    pub funding_txids: Vec<Hash256>,
    /// Derivation path of each input, in input order.
    pub input_paths: Vec<KeyDerivationPath>,
    /// Paths receiving change. Empty when no change output was created.
    pub change_paths: Vec<KeyDerivationPath>,
    /// The coin selection result used to build this transaction.
    pub selection: CoinSelection,
}

/// Builder for unsigned transactions.
///
/// # Example
/// ```ignore
/// let built = TransactionBuilder::new()
///     .add_recipient(address, 5 * COIN)
///     .set_fee_rate(2)
///     .build(&controlled, &coins, &change)?;
/// ```
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    recipients: Vec<Recipient>,
    fee_rate: u64,
    dust_threshold: u64,
    size_model: SizeModel,
    recipients_pay_fee: bool,
    lock_time: u32,
}

impl TransactionBuilder {
    /// Create a new transaction builder with default fee settings.
    pub fn new() -> Self {
        Self {
            recipients: Vec::new(),
            fee_rate: DEFAULT_FEE_RATE,
            dust_threshold: DEFAULT_DUST_THRESHOLD,
            size_model: SizeModel::default(),
            recipients_pay_fee: false,
            lock_time: 0,
        }
    }

    /// Add a recipient. Outputs appear in the order recipients are added.
    pub fn add_recipient(&mut self, address: Address, amount: u64) -> &mut Self {
        self.recipients.push(Recipient { address, amount });
        self
    }

    /// Fee rate in base units per byte (default: [`DEFAULT_FEE_RATE`]).
    pub fn set_fee_rate(&mut self, fee_rate: u64) -> &mut Self {
        self.fee_rate = fee_rate;
        self
    }

    /// Override the dust threshold (default: [`DEFAULT_DUST_THRESHOLD`]).
    pub fn set_dust_threshold(&mut self, dust_threshold: u64) -> &mut Self {
        self.dust_threshold = dust_threshold;
        self
    }

    pub fn set_size_model(&mut self, size_model: SizeModel) -> &mut Self {
        self.size_model = size_model;
        self
    }

    /// Deduct the fee from the recipients instead of adding it on top.
    pub fn set_recipients_pay_fee(&mut self, enabled: bool) -> &mut Self {
        self.recipients_pay_fee = enabled;
        self
    }

    pub fn set_lock_time(&mut self, lock_time: u32) -> &mut Self {
        self.lock_time = lock_time;
        self
    }

    pub fn recipients(&self) -> &[Recipient] {
        &self.recipients
    }

    fn selector(&self) -> CoinSelector {
        CoinSelector {
            fee_rate: self.fee_rate,
            dust_threshold: self.dust_threshold,
            size_model: self.size_model,
            subtract_fee_from_recipients: self.recipients_pay_fee,
        }
    }

    /// Build an unsigned transaction.
    ///
    /// # Arguments
    /// - `controlled` — every (address, path) pair the wallet controls
    /// - `coins` — spendable coins; coins paying to uncontrolled addresses are skipped
    /// - `change` — change destination
    pub fn build(
        &self,
        controlled: &[(Address, KeyDerivationPath)],
        coins: &[WalletCoin],
        change: &(Address, KeyDerivationPath),
    ) -> Result<BuiltTransaction, WalletError> {
        if self.recipients.is_empty() {
            return Err(WalletError::BuildError("no recipients".into()));
        }

        let mut total_send: u64 = 0;
        for r in &self.recipients {
            if r.amount == 0 {
                return Err(WalletError::InvalidAmount("recipient amount is zero".into()));
            }
            total_send = total_send
                .checked_add(r.amount)
                .ok_or_else(|| WalletError::InvalidAmount("total amount overflow".into()))?;
        }

        let paths: HashMap<Address, &KeyDerivationPath> =
            controlled.iter().map(|(a, p)| (*a, p)).collect();
        let mut spendable = Vec::with_capacity(coins.len());
        for coin in coins {
            let owned = Address::from_script(&coin.script_pubkey, change.0.network())
                .is_some_and(|addr| paths.contains_key(&addr));
            if owned {
                spendable.push(coin.clone());
            } else {
                warn!(outpoint = %coin.outpoint, "skipping coin not controlled by the wallet");
            }
        }

        let selection = self
            .selector()
            .select(&spendable, total_send, self.recipients.len())?;

        let mut inputs = Vec::with_capacity(selection.selected.len());
        let mut input_paths = Vec::with_capacity(selection.selected.len());
        let mut funding_txids = IndexSet::new();
        for coin in &selection.selected {
            let path = Address::from_script(&coin.script_pubkey, change.0.network())
                .and_then(|addr| paths.get(&addr).copied())
                .ok_or_else(|| WalletError::BuildError(format!("no path for {}", coin.outpoint)))?;
            inputs.push(TxInput::unsigned(coin.outpoint));
            input_paths.push(path.clone());
            funding_txids.insert(coin.outpoint.txid);
        }

        let amounts = self.recipient_amounts(selection.deducted)?;
        let mut outputs = Vec::with_capacity(self.recipients.len() + 1);
        for (r, amount) in self.recipients.iter().zip(amounts) {
            outputs.push(TxOutput::new(amount, r.address.script_pubkey()));
        }

        let mut change_paths = Vec::new();
        if selection.has_change() {
            outputs.push(TxOutput::new(selection.change, change.0.script_pubkey()));
            change_paths.push(change.1.clone());
        }

        let tx = Transaction {
            version: TX_VERSION,
            inputs,
            outputs,
            lock_time: self.lock_time,
        };

        info!(
            inputs = tx.inputs.len(),
            outputs = tx.outputs.len(),
            fee = selection.fee,
            change = selection.change,
            "built unsigned transaction"
        );

        Ok(BuiltTransaction {
            tx,
            funding_txids: funding_txids.into_iter().collect(),
            input_paths,
            change_paths,
            selection,
        })
    }

    /// Recipient output values after splitting `deducted` across them.
    ///
    /// Shares are equal; the remainder is taken from the first recipient.
    fn recipient_amounts(&self, deducted: u64) -> Result<Vec<u64>, WalletError> {
        if deducted == 0 {
            return Ok(self.recipients.iter().map(|r| r.amount).collect());
        }
        let n = self.recipients.len() as u64;
        let share = deducted / n;
        let remainder = deducted % n;
        debug!(deducted, share, remainder, "deducting fee from recipients");

        self.recipients
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let cut = if i == 0 { share + remainder } else { share };
                match r.amount.checked_sub(cut) {
                    Some(v) if v > self.dust_threshold => Ok(v),
                    _ => Err(WalletError::InvalidAmount(format!(
                        "recipient {} cannot pay its fee share of {cut}",
                        r.address
                    ))),
                }
            })
            .collect()
    }
}

impl Default for TransactionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigil_core::address::Network;
    use sigil_core::constants::COIN;
    use sigil_core::types::OutPoint;

    fn controlled() -> Vec<(Address, KeyDerivationPath)> {
        (0..3u8)
            .map(|i| {
                (
                    Address::p2pkh([i + 1; 20], Network::Testnet),
                    KeyDerivationPath::external(i as u32),
                )
            })
            .chain(std::iter::once((
                Address::p2pkh([0xcc; 20], Network::Testnet),
                KeyDerivationPath::internal(0),
            )))
            .collect()
    }

    fn change() -> (Address, KeyDerivationPath) {
        controlled().pop().unwrap()
    }

    fn coins(values: &[u64]) -> Vec<WalletCoin> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| WalletCoin {
                outpoint: OutPoint::new(Hash256([i as u8 + 1; 32]), 0),
                script_pubkey: controlled()[i % 3].0.script_pubkey(),
                value: *v,
            })
            .collect()
    }

    fn recipient() -> Address {
        Address::p2pkh([0xaa; 20], Network::Testnet)
    }

    #[test]
    fn build_single_recipient() {
        let mut builder = TransactionBuilder::new();
        builder.add_recipient(recipient(), 5 * COIN);
        let built = builder
            .build(&controlled(), &coins(&[10 * COIN, 10 * COIN]), &change())
            .unwrap();

        assert_eq!(built.tx.inputs.len(), 1);
        assert_eq!(built.tx.outputs[0].value, 5 * COIN);
        assert_eq!(built.tx.outputs[0].script_pubkey, recipient().script_pubkey());
        assert!(built.tx.inputs.iter().all(|i| i.script_sig.is_empty()));
        assert_eq!(built.input_paths, vec![KeyDerivationPath::external(0)]);
        assert_eq!(built.funding_txids, vec![Hash256([1; 32])]);
    }

    #[test]
    fn build_multi_recipient_preserves_order() {
        let addr2 = Address::p2pkh([0xbb; 20], Network::Testnet);
        let mut builder = TransactionBuilder::new();
        builder.add_recipient(recipient(), 3 * COIN);
        builder.add_recipient(addr2, 2 * COIN);
        let built = builder
            .build(&controlled(), &coins(&[10 * COIN]), &change())
            .unwrap();
        assert_eq!(built.tx.outputs[0].value, 3 * COIN);
        assert_eq!(built.tx.outputs[1].value, 2 * COIN);
        assert_eq!(built.tx.outputs[1].script_pubkey, addr2.script_pubkey());
    }

    #[test]
    fn build_with_change() {
        let mut builder = TransactionBuilder::new();
        builder.add_recipient(recipient(), COIN);
        let built = builder
            .build(&controlled(), &coins(&[10 * COIN]), &change())
            .unwrap();

        assert_eq!(built.tx.outputs.len(), 2);
        let change_output = built.tx.outputs.last().unwrap();
        assert_eq!(change_output.script_pubkey, change().0.script_pubkey());
        assert_eq!(change_output.value, built.selection.change);
        assert_eq!(built.change_paths, vec![KeyDerivationPath::internal(0)]);

        let out_total = built.tx.total_output_value().unwrap();
        assert_eq!(10 * COIN - out_total, built.selection.fee);
    }

    #[test]
    fn exact_funds_no_change() {
        let mut builder = TransactionBuilder::new();
        builder.set_fee_rate(2);
        builder.add_recipient(recipient(), 50_000);
        let fee = 2 * SizeModel::default().estimate(1, 1);
        let built = builder
            .build(&controlled(), &coins(&[50_000 + fee]), &change())
            .unwrap();
        assert_eq!(built.tx.outputs.len(), 1);
        assert!(built.change_paths.is_empty());
        assert_eq!(built.selection.fee, fee);
    }

    #[test]
    fn funding_txids_deduplicated() {
        let mut cs = coins(&[COIN, COIN]);
        cs[1].outpoint = OutPoint::new(cs[0].outpoint.txid, 1);
        let mut builder = TransactionBuilder::new();
        builder.add_recipient(recipient(), COIN + COIN / 2);
        let built = builder.build(&controlled(), &cs, &change()).unwrap();
        assert_eq!(built.tx.inputs.len(), 2);
        assert_eq!(built.funding_txids.len(), 1);
        assert_eq!(built.input_paths.len(), 2);
    }

    #[test]
    fn uncontrolled_coins_skipped() {
        let mut cs = coins(&[COIN]);
        cs.push(WalletCoin {
            outpoint: OutPoint::new(Hash256([0xee; 32]), 0),
            script_pubkey: Address::p2pkh([0xee; 20], Network::Testnet).script_pubkey(),
            value: 100 * COIN,
        });
        let mut builder = TransactionBuilder::new();
        builder.add_recipient(recipient(), COIN / 2);
        let built = builder.build(&controlled(), &cs, &change()).unwrap();
        assert_eq!(built.tx.inputs[0].previous_output, cs[0].outpoint);
    }

    #[test]
    fn build_no_recipients_fails() {
        let builder = TransactionBuilder::new();
        let err = builder
            .build(&controlled(), &coins(&[COIN]), &change())
            .unwrap_err();
        assert!(matches!(err, WalletError::BuildError(_)));
    }

    #[test]
    fn build_zero_amount_fails() {
        let mut builder = TransactionBuilder::new();
        builder.add_recipient(recipient(), 0);
        let err = builder
            .build(&controlled(), &coins(&[COIN]), &change())
            .unwrap_err();
        assert!(matches!(err, WalletError::InvalidAmount(_)));
    }

    #[test]
    fn build_insufficient_funds() {
        let mut builder = TransactionBuilder::new();
        builder.add_recipient(recipient(), 100 * COIN);
        let err = builder
            .build(&controlled(), &coins(&[COIN, COIN]), &change())
            .unwrap_err();
        assert!(matches!(err, WalletError::InsufficientFunds { have, .. } if have == 2 * COIN));
    }

    #[test]
    fn recipients_pay_fee_split() {
        let addr2 = Address::p2pkh([0xbb; 20], Network::Testnet);
        let mut builder = TransactionBuilder::new();
        builder.set_recipients_pay_fee(true).set_fee_rate(1);
        builder.add_recipient(recipient(), 30_000);
        builder.add_recipient(addr2, 20_000);
        let built = builder
            .build(&controlled(), &coins(&[50_000]), &change())
            .unwrap();

        // 8 + 1 + 148 + 1 + 2 * 34 = 226: 113 each
        assert_eq!(built.selection.deducted, 226);
        assert_eq!(built.tx.outputs.len(), 2);
        assert_eq!(built.tx.outputs[0].value, 30_000 - 113);
        assert_eq!(built.tx.outputs[1].value, 20_000 - 113);
        assert_eq!(50_000 - built.tx.total_output_value().unwrap(), 226);
    }

    #[test]
    fn recipients_pay_fee_remainder_on_first() {
        let addr2 = Address::p2pkh([0xbb; 20], Network::Testnet);
        let addr3 = Address::p2pkh([0xdd; 20], Network::Testnet);
        let mut builder = TransactionBuilder::new();
        builder.set_recipients_pay_fee(true);
        builder.add_recipient(recipient(), 10_000);
        builder.add_recipient(addr2, 10_000);
        builder.add_recipient(addr3, 10_000);
        let built = builder
            .build(&controlled(), &coins(&[30_000]), &change())
            .unwrap();

        // 8 + 1 + 148 + 1 + 3 * 34 = 260 = 86 * 3 + 2
        assert_eq!(built.tx.outputs[0].value, 10_000 - 88);
        assert_eq!(built.tx.outputs[1].value, 10_000 - 86);
        assert_eq!(built.tx.outputs[2].value, 10_000 - 86);
    }

    #[test]
    fn recipients_pay_fee_dust_rejected() {
        let mut builder = TransactionBuilder::new();
        builder.set_recipients_pay_fee(true);
        builder.add_recipient(recipient(), 700);
        let err = builder
            .build(&controlled(), &coins(&[700]), &change())
            .unwrap_err();
        assert!(matches!(err, WalletError::InvalidAmount(_)));
    }
}
