//! Largest-first coin selection with a size-based fee estimate.
//!
//! Coins are sorted by value descending and taken greedily. After each coin
//! the fee is re-estimated from the size of the transaction the selection
//! would produce, so adding an input raises the amount the next check needs
//! to cover.

use serde::{Deserialize, Serialize};
use tracing::debug;

use sigil_core::constants::{P2PKH_INPUT_SIZE, P2PKH_OUTPUT_SIZE, TX_OVERHEAD_SIZE};
use sigil_core::encode::varint_len;
use sigil_core::types::OutPoint;

use crate::error::WalletError;

/// An unspent output the wallet can spend.
///
/// Which path owns it is tracked separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletCoin {
    pub outpoint: OutPoint,
    /// Locking script of the output.
    #[serde(with = "sigil_core::types::hex_bytes")]
    pub script_pubkey: Vec<u8>,
    /// Value in base units.
    pub value: u64,
}

/// Serialized-size model used for fee estimation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizeModel {
    /// Bytes per signed input.
    pub input_size: u64,
    /// Bytes per output.
    pub output_size: u64,
    /// Version plus lock time.
    pub overhead: u64,
}

impl SizeModel {
    /// Estimated size of a signed transaction with the given shape.
    pub fn estimate(&self, inputs: usize, outputs: usize) -> u64 {
        self.overhead
            + varint_len(inputs as u64) as u64
            + self.input_size.saturating_mul(inputs as u64)
            + varint_len(outputs as u64) as u64
            + self.output_size.saturating_mul(outputs as u64)
    }
}

impl Default for SizeModel {
    fn default() -> Self {
        Self {
            input_size: P2PKH_INPUT_SIZE,
            output_size: P2PKH_OUTPUT_SIZE,
            overhead: TX_OVERHEAD_SIZE,
        }
    }
}

/// Result of coin selection.
///
/// `total_value == (target - deducted) + change + fee` always holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinSelection {
    /// Selected coins in spending order.
    pub selected: Vec<WalletCoin>,
    /// Total value of the selected coins.
    pub total_value: u64,
    /// Fee paid by the transaction, including any leftover too small for change.
    pub fee: u64,
    /// Change value; zero when no change output is needed.
    pub change: u64,
    /// Amount taken out of recipient outputs to pay the fee.
    pub deducted: u64,
}

impl CoinSelection {
    pub fn has_change(&self) -> bool {
        self.change > 0
    }
}

/// Largest-first coin selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoinSelector {
    /// Fee rate in base units per byte.
    pub fee_rate: u64,
    /// Leftovers at or below this value are not worth a change output.
    pub dust_threshold: u64,
    pub size_model: SizeModel,
    /// Take the fee out of the recipients instead of adding it on top.
    pub subtract_fee_from_recipients: bool,
}

impl CoinSelector {
    pub fn new(fee_rate: u64, dust_threshold: u64) -> Self {
        Self {
            fee_rate,
            dust_threshold,
            size_model: SizeModel::default(),
            subtract_fee_from_recipients: false,
        }
    }

    fn fee_for(&self, inputs: usize, outputs: usize) -> u64 {
        self.fee_rate
            .saturating_mul(self.size_model.estimate(inputs, outputs))
    }

    /// Select coins paying `target` to `recipients` outputs.
    pub fn select(
        &self,
        coins: &[WalletCoin],
        target: u64,
        recipients: usize,
    ) -> Result<CoinSelection, WalletError> {
        if target == 0 {
            return Err(WalletError::InvalidAmount("target must be non-zero".into()));
        }
        if recipients == 0 {
            return Err(WalletError::BuildError("no recipients".into()));
        }

        let mut sorted = coins.to_vec();
        sorted.sort_by(|a, b| b.value.cmp(&a.value));

        let mut selected = Vec::new();
        let mut total: u64 = 0;

        for coin in sorted {
            total = total.saturating_add(coin.value);
            selected.push(coin);
            let n = selected.len();

            let fee_no_change = self.fee_for(n, recipients);
            let fee_change = self.fee_for(n, recipients + 1);

            let outcome = if self.subtract_fee_from_recipients {
                self.settle_deducting(total, target, fee_no_change, fee_change)
            } else {
                self.settle_adding(total, target, fee_no_change, fee_change)
            };

            if let Some((fee, change, deducted)) = outcome {
                debug!(
                    inputs = n,
                    total,
                    fee,
                    change,
                    deducted,
                    "coin selection complete"
                );
                return Ok(CoinSelection {
                    selected,
                    total_value: total,
                    fee,
                    change,
                    deducted,
                });
            }
        }

        let have = total;
        let need = if self.subtract_fee_from_recipients {
            target
        } else {
            target.saturating_add(self.fee_for(selected.len().max(1), recipients))
        };
        Err(WalletError::InsufficientFunds { have, need })
    }

    /// Fee on top of the recipients. Returns (fee, change, deducted).
    fn settle_adding(
        &self,
        total: u64,
        target: u64,
        fee_no_change: u64,
        fee_change: u64,
    ) -> Option<(u64, u64, u64)> {
        let leftover = total.checked_sub(target)?.checked_sub(fee_no_change)?;
        let with_change = total
            .saturating_sub(target)
            .saturating_sub(fee_change);
        if with_change > self.dust_threshold {
            Some((fee_change, with_change, 0))
        } else {
            Some((fee_no_change + leftover, 0, 0))
        }
    }

    /// Fee taken out of the recipients. Returns (fee, change, deducted).
    fn settle_deducting(
        &self,
        total: u64,
        target: u64,
        fee_no_change: u64,
        fee_change: u64,
    ) -> Option<(u64, u64, u64)> {
        let leftover = total.checked_sub(target)?;
        if leftover > self.dust_threshold {
            Some((fee_change, leftover, fee_change))
        } else {
            Some((fee_no_change + leftover, 0, fee_no_change))
        }
    }
}
