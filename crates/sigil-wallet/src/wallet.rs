//! Wallet composition: key chain, configuration, building and signing.
//!
//! The [`Wallet`] ties a BIP-44 [`KeyChain`] to a [`WalletConfig`]. It
//! derives the controlled address set, builds unsigned transactions with the
//! configured fee policy, assembles signing requests from funding
//! transactions and signs them.

use tracing::debug;

use sigil_core::address::{Address, Network};
use sigil_core::types::Transaction;

use crate::builder::{BuiltTransaction, Recipient, TransactionBuilder};
use crate::coin_selection::WalletCoin;
use crate::config::WalletConfig;
use crate::error::WalletError;
use crate::info::SigningInfo;
use crate::keys::{Branch, KeyChain, KeyDerivationPath, KeyDeriver, Seed};
use crate::mnemonic::mnemonic_to_seed;
use crate::signer::{FundingSource, TxSignData, sign_wallet_tx};

/// HD wallet bound to one network and account.
#[derive(Debug, Clone)]
pub struct Wallet {
    keychain: KeyChain,
    config: WalletConfig,
}

impl Wallet {
    /// Create a wallet from a seed (deterministic recovery).
    pub fn from_seed(seed: &Seed, config: WalletConfig) -> Result<Self, WalletError> {
        config.validate()?;
        let keychain = KeyChain::from_seed(seed, config.network, config.account)?;
        debug!(account_path = %keychain.account_path(), "wallet opened");
        Ok(Self { keychain, config })
    }

    /// Create a wallet from a BIP-39 phrase and optional passphrase.
    pub fn from_mnemonic(
        phrase: &str,
        passphrase: &str,
        config: WalletConfig,
    ) -> Result<Self, WalletError> {
        let seed = mnemonic_to_seed(phrase, passphrase)?;
        Self::from_seed(&seed, config)
    }

    pub fn network(&self) -> Network {
        self.config.network
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    pub fn keychain(&self) -> &KeyChain {
        &self.keychain
    }

    /// External then internal addresses, `address_gap` per branch.
    pub fn controlled_addresses(&self) -> Result<Vec<(Address, KeyDerivationPath)>, WalletError> {
        let mut all = self
            .keychain
            .addresses(Branch::External, self.config.address_gap)?;
        all.extend(
            self.keychain
                .addresses(Branch::Internal, self.config.address_gap)?,
        );
        Ok(all)
    }

    pub fn receive_address(&self, index: u32) -> Result<Address, WalletError> {
        self.keychain.address(&KeyDerivationPath::external(index))
    }

    pub fn change_address(&self, index: u32) -> Result<(Address, KeyDerivationPath), WalletError> {
        let path = KeyDerivationPath::internal(index);
        Ok((self.keychain.address(&path)?, path))
    }

    /// A builder preloaded with the configured fee policy.
    pub fn builder(&self) -> TransactionBuilder {
        let mut builder = TransactionBuilder::new();
        builder
            .set_fee_rate(self.config.fee_rate)
            .set_dust_threshold(self.config.dust_threshold)
            .set_size_model(self.config.size_model)
            .set_recipients_pay_fee(self.config.recipients_pay_fee);
        builder
    }

    /// Build an unsigned transaction paying `recipients` from `coins`, with
    /// change to internal index `change_index`.
    pub fn build(
        &self,
        recipients: &[Recipient],
        coins: &[WalletCoin],
        change_index: u32,
    ) -> Result<BuiltTransaction, WalletError> {
        let mut builder = self.builder();
        for r in recipients {
            builder.add_recipient(r.address, r.amount);
        }
        let controlled = self.controlled_addresses()?;
        let change = self.change_address(change_index)?;
        builder.build(&controlled, coins, &change)
    }

    /// Assemble a signing request for `built`.
    pub fn sign_data<F>(&self, built: &BuiltTransaction, funding: &F) -> Result<TxSignData, WalletError>
    where
        F: FundingSource + ?Sized,
    {
        let funding_txs = built
            .funding_txids
            .iter()
            .map(|txid| {
                funding
                    .transaction(txid)
                    .cloned()
                    .ok_or(WalletError::ReferencedInputsMissing)
            })
            .collect::<Result<Vec<Transaction>, _>>()?;
        Ok(TxSignData {
            unsigned_tx: built.tx.clone(),
            funding_txs,
            external_paths: built.input_paths.iter().cloned().collect(),
            internal_paths: built.change_paths.iter().cloned().collect(),
        })
    }

    /// Sign the inputs this wallet owns.
    pub fn sign(&self, data: &TxSignData) -> Result<(SigningInfo, Transaction), WalletError> {
        sign_wallet_tx(data, &self.keychain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigil_core::constants::COIN;
    use sigil_core::script::p2pkh_script;
    use sigil_core::types::{Hash256, OutPoint, TxInput, TxOutput};
    use sigil_core::verify::verify_transaction;
    use std::collections::HashMap;

    const ABANDON: &str = "abandon abandon abandon abandon abandon abandon \
                           abandon abandon abandon abandon abandon about";

    fn wallet(config: WalletConfig) -> Wallet {
        Wallet::from_mnemonic(ABANDON, "", config).unwrap()
    }

    fn fund(to: &Address, value: u64, tag: u8) -> Transaction {
        Transaction {
            version: 1,
            inputs: vec![TxInput::unsigned(OutPoint::new(Hash256([tag; 32]), 0))],
            outputs: vec![TxOutput::new(value, to.script_pubkey())],
            lock_time: 0,
        }
    }

    fn coin_of(tx: &Transaction) -> WalletCoin {
        WalletCoin {
            outpoint: OutPoint::new(tx.txid(), 0),
            script_pubkey: tx.outputs[0].script_pubkey.clone(),
            value: tx.outputs[0].value,
        }
    }

    #[test]
    fn bip44_first_receive_address() {
        let w = wallet(WalletConfig::default());
        assert_eq!(
            w.receive_address(0).unwrap().to_string(),
            "1LqBGSKuX5yYUonjxT5qGfpUsXKYYWeabA"
        );
        assert_eq!(w.keychain().account_path(), "m/44'/0'/0'");
    }

    #[test]
    fn controlled_set_covers_both_branches() {
        let w = wallet(WalletConfig {
            address_gap: 3,
            ..WalletConfig::default()
        });
        let set = w.controlled_addresses().unwrap();
        assert_eq!(set.len(), 6);
        assert_eq!(set[0].1, KeyDerivationPath::external(0));
        assert_eq!(set[3].1, KeyDerivationPath::internal(0));
        assert_eq!(set[3].0, w.change_address(0).unwrap().0);
    }

    #[test]
    fn build_and_sign_round() {
        let w = wallet(WalletConfig {
            fee_rate: 2,
            ..WalletConfig::default()
        });
        let a = fund(&w.receive_address(0).unwrap(), COIN, 1);
        let b = fund(&w.receive_address(4).unwrap(), COIN / 2, 2);
        let recipient = Address::p2pkh([0x42; 20], Network::Bitcoin);

        let built = w
            .build(
                &[Recipient {
                    address: recipient,
                    amount: COIN + COIN / 4,
                }],
                &[coin_of(&a), coin_of(&b)],
                1,
            )
            .unwrap();
        assert_eq!(built.tx.inputs.len(), 2);
        assert_eq!(built.change_paths, vec![KeyDerivationPath::internal(1)]);

        let funding: HashMap<Hash256, Transaction> =
            [(a.txid(), a.clone()), (b.txid(), b.clone())].into();
        let data = w.sign_data(&built, &funding).unwrap();
        let (info, signed) = w.sign(&data).unwrap();

        assert!(info.is_signed);
        assert_eq!(info.fee, built.selection.fee);
        assert_eq!(info.recipients[&recipient], COIN + COIN / 4);
        assert_eq!(info.amount, (COIN + COIN / 4 + info.fee) as i64);
        verify_transaction(&signed, &[a.outputs[0].clone(), b.outputs[0].clone()]).unwrap();
    }

    #[test]
    fn sign_data_needs_funding() {
        let w = wallet(WalletConfig::default());
        let a = fund(&w.receive_address(0).unwrap(), COIN, 3);
        let built = w
            .build(
                &[Recipient {
                    address: Address::p2pkh([1; 20], Network::Bitcoin),
                    amount: 1_000,
                }],
                &[coin_of(&a)],
                0,
            )
            .unwrap();
        let empty: &[Transaction] = &[];
        assert_eq!(
            w.sign_data(&built, empty).unwrap_err(),
            WalletError::ReferencedInputsMissing
        );
    }

    #[test]
    fn foreign_coins_not_spent() {
        let w = wallet(WalletConfig::default());
        let foreign = Transaction {
            version: 1,
            inputs: vec![],
            outputs: vec![TxOutput::new(COIN, p2pkh_script(&[9; 20]))],
            lock_time: 0,
        };
        let err = w
            .build(
                &[Recipient {
                    address: Address::p2pkh([1; 20], Network::Bitcoin),
                    amount: 1_000,
                }],
                &[coin_of(&foreign)],
                0,
            )
            .unwrap_err();
        assert!(matches!(err, WalletError::InsufficientFunds { have: 0, .. }));
    }

    #[test]
    fn invalid_config_rejected() {
        let seed = Seed::from_bytes(&[1; 32]).unwrap();
        let cfg = WalletConfig {
            address_gap: 0,
            ..WalletConfig::default()
        };
        assert!(matches!(Wallet::from_seed(&seed, cfg), Err(WalletError::Config(_))));
    }
}
