//! Wallet signer.
//!
//! Classifies the inputs and outputs of a transaction against the wallet's
//! derivation paths, summarizes the money movement in a [`SigningInfo`] and
//! signs every input the wallet owns. All validation happens before the first
//! signature is produced, and inputs the wallet does not own are never
//! touched, so independent co-signers can sign the same request and merge.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::HashMap;
use tracing::{debug, info};

use sigil_core::address::Address;
use sigil_core::crypto::KeyPair;
use sigil_core::digest::tx_sighash;
use sigil_core::script::p2pkh_unlocking_script;
use sigil_core::signature::{TxSignature, encode_sig};
use sigil_core::types::{Hash256, OutPoint, Transaction, TxOutput};

use crate::error::WalletError;
use crate::info::SigningInfo;
use crate::keys::{KeyDerivationPath, KeyDeriver};

/// Supplies the transactions whose outputs are being spent.
pub trait FundingSource {
    fn transaction(&self, txid: &Hash256) -> Option<&Transaction>;

    fn output(&self, outpoint: &OutPoint) -> Option<&TxOutput> {
        self.transaction(&outpoint.txid)?.output(outpoint.index)
    }
}

impl<T: Borrow<Transaction>> FundingSource for HashMap<Hash256, T> {
    fn transaction(&self, txid: &Hash256) -> Option<&Transaction> {
        self.get(txid).map(Borrow::borrow)
    }
}

impl FundingSource for [Transaction] {
    fn transaction(&self, txid: &Hash256) -> Option<&Transaction> {
        self.iter().find(|tx| tx.txid() == *txid)
    }
}

/// A signing request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxSignData {
    pub unsigned_tx: Transaction,
    /// Transactions containing the outputs spent by `unsigned_tx`.
    pub funding_txs: Vec<Transaction>,
    /// Paths whose keys may sign inputs.
    pub external_paths: IndexSet<KeyDerivationPath>,
    /// Paths designated as change destinations.
    pub internal_paths: IndexSet<KeyDerivationPath>,
}

/// Previous output of every input of `tx`, in input order.
pub fn resolve_prev_outputs<F>(tx: &Transaction, funding: &F) -> Result<Vec<TxOutput>, WalletError>
where
    F: FundingSource + ?Sized,
{
    tx.inputs
        .iter()
        .map(|input| {
            funding
                .output(&input.previous_output)
                .cloned()
                .ok_or(WalletError::ReferencedInputsMissing)
        })
        .collect()
}

struct OwnedKey<'a> {
    path: &'a KeyDerivationPath,
    key_pair: KeyPair,
    change: bool,
}

/// Address to path lookup, derived once per signing session.
fn build_path_index<'a, D: KeyDeriver + ?Sized>(
    data: &'a TxSignData,
    deriver: &D,
) -> Result<HashMap<Address, OwnedKey<'a>>, WalletError> {
    let mut index = HashMap::with_capacity(data.external_paths.len() + data.internal_paths.len());
    for path in data.external_paths.iter().chain(data.internal_paths.iter()) {
        let derived = deriver.derive(path)?;
        let change = data.internal_paths.contains(path);
        index.entry(derived.address).or_insert(OwnedKey {
            path,
            key_pair: derived.key_pair,
            change,
        });
    }
    Ok(index)
}

/// Sign the wallet-owned inputs of `data.unsigned_tx`.
///
/// Returns the summary and the (possibly partially) signed transaction.
pub fn sign_wallet_tx<D: KeyDeriver + ?Sized>(
    data: &TxSignData,
    deriver: &D,
) -> Result<(SigningInfo, Transaction), WalletError> {
    let tx = &data.unsigned_tx;
    let network = deriver.network();

    let funding: HashMap<Hash256, &Transaction> =
        data.funding_txs.iter().map(|t| (t.txid(), t)).collect();
    let prev_outputs = resolve_prev_outputs(tx, &funding)?;

    let index = build_path_index(data, deriver)?;
    let mut summary = SigningInfo::default();

    let mut owned_inputs = Vec::new();
    for (i, prev) in prev_outputs.iter().enumerate() {
        let Some(address) = Address::from_script(&prev.script_pubkey, network) else {
            continue;
        };
        if let Some(owned) = index.get(&address) {
            summary.add_my_coin(address, owned.path, prev.value);
            owned_inputs.push((i, &owned.key_pair));
        }
    }
    if owned_inputs.is_empty() {
        return Err(WalletError::NoOwnedInputs);
    }

    for output in &tx.outputs {
        match Address::from_script(&output.script_pubkey, network) {
            None => summary.non_standard_outputs += 1,
            Some(address) => match index.get(&address) {
                Some(owned) if owned.change => {
                    summary.add_change(address, owned.path, output.value)
                }
                _ => summary.add_recipient(address, output.value),
            },
        }
    }
    if !data.internal_paths.is_empty() && summary.change.is_empty() {
        return Err(WalletError::MissingChangeOutputs);
    }

    let inputs_total = prev_outputs
        .iter()
        .try_fold(0u64, |acc, o| acc.checked_add(o.value))
        .ok_or_else(|| WalletError::InvalidAmount("input value overflow".into()))?;
    let outputs_total = tx
        .total_output_value()
        .ok_or_else(|| WalletError::InvalidAmount("output value overflow".into()))?;
    summary.fee = inputs_total
        .checked_sub(outputs_total)
        .ok_or(WalletError::NegativeFee {
            inputs: inputs_total,
            outputs: outputs_total,
        })?;
    summary.settle_amount()?;

    debug!(
        owned = owned_inputs.len(),
        inputs = tx.inputs.len(),
        recipients = summary.recipients.len(),
        change = summary.change.len(),
        non_standard = summary.non_standard_outputs,
        "classified transaction"
    );

    let sighash = network.default_sighash();
    let mut signed = tx.clone();
    for (i, key_pair) in &owned_inputs {
        let prev_script = &prev_outputs[*i].script_pubkey;
        let digest = tx_sighash(tx, prev_script, *i, sighash);
        let sig = TxSignature::new(key_pair.sign_digest(&digest), sighash);
        signed.inputs[*i].script_sig =
            p2pkh_unlocking_script(&encode_sig(&sig), &key_pair.public_key());
    }

    summary.fee_rate = summary.fee / signed.size() as u64;
    summary.is_signed = owned_inputs.len() == tx.inputs.len();

    info!(
        signed_inputs = owned_inputs.len(),
        amount = summary.amount,
        fee = summary.fee,
        fee_rate = summary.fee_rate,
        complete = summary.is_signed,
        "signed transaction"
    );

    Ok((summary, signed))
}

/// Combine the unlocking scripts of independently signed copies of one
/// transaction.
pub fn merge_signatures(base: &Transaction, other: &Transaction) -> Result<Transaction, WalletError> {
    let same_shape = base.version == other.version
        && base.lock_time == other.lock_time
        && base.outputs == other.outputs
        && base.inputs.len() == other.inputs.len()
        && base
            .inputs
            .iter()
            .zip(&other.inputs)
            .all(|(a, b)| a.previous_output == b.previous_output && a.sequence == b.sequence);
    if !same_shape {
        return Err(WalletError::MergeMismatch("transactions differ".into()));
    }

    let mut merged = base.clone();
    for (i, (mine, theirs)) in merged.inputs.iter_mut().zip(&other.inputs).enumerate() {
        if theirs.script_sig.is_empty() || mine.script_sig == theirs.script_sig {
            continue;
        }
        if !mine.script_sig.is_empty() {
            return Err(WalletError::MergeMismatch(format!(
                "input {i} carries two different unlocking scripts"
            )));
        }
        mine.script_sig = theirs.script_sig.clone();
    }
    Ok(merged)
}
