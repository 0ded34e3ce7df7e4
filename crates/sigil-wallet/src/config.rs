//! Wallet configuration.
//!
//! Values come from an optional file (format chosen by extension) overlaid
//! with `SIGIL_`-prefixed environment variables. Nested size-model fields use
//! a double underscore: `SIGIL_SIZE_MODEL__INPUT_SIZE=150`.

use std::collections::HashMap;
use std::path::Path;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::info;

use sigil_core::address::Network;
use sigil_core::constants::{DEFAULT_DUST_THRESHOLD, DEFAULT_FEE_RATE};

use crate::coin_selection::SizeModel;
use crate::error::WalletError;
use crate::keys::HARDENED;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "SIGIL";

/// Default number of addresses scanned per branch.
pub const DEFAULT_ADDRESS_GAP: u32 = 20;

/// Upper bound on the address gap.
pub const MAX_ADDRESS_GAP: u32 = 10_000;

/// Wallet settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    pub network: Network,
    /// Fee rate in base units per byte.
    pub fee_rate: u64,
    /// Change at or below this value is folded into the fee.
    pub dust_threshold: u64,
    /// Deduct the fee from recipient outputs.
    pub recipients_pay_fee: bool,
    /// BIP-44 account index.
    pub account: u32,
    /// Addresses derived per branch when assembling the controlled set.
    pub address_gap: u32,
    pub size_model: SizeModel,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            network: Network::Bitcoin,
            fee_rate: DEFAULT_FEE_RATE,
            dust_threshold: DEFAULT_DUST_THRESHOLD,
            recipients_pay_fee: false,
            account: 0,
            address_gap: DEFAULT_ADDRESS_GAP,
            size_model: SizeModel::default(),
        }
    }
}

impl WalletConfig {
    /// Load from `path` (if given) and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, WalletError> {
        Self::load_with_env(path, None)
    }

    /// Like [`WalletConfig::load`], reading variables from `env` instead of
    /// the process environment when supplied.
    pub fn load_with_env(
        path: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, WalletError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(false));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        let cfg: Self = builder
            .build()
            .and_then(Config::try_deserialize)
            .map_err(|e| WalletError::Config(e.to_string()))?;
        cfg.validate()?;

        info!(
            network = %cfg.network,
            fee_rate = cfg.fee_rate,
            dust_threshold = cfg.dust_threshold,
            account = cfg.account,
            address_gap = cfg.address_gap,
            "wallet config loaded"
        );
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), WalletError> {
        if self.address_gap == 0 {
            return Err(WalletError::Config("address_gap must be non-zero".into()));
        }
        if self.address_gap > MAX_ADDRESS_GAP {
            return Err(WalletError::Config(format!(
                "address_gap {} exceeds {MAX_ADDRESS_GAP}",
                self.address_gap
            )));
        }
        if self.account >= HARDENED {
            return Err(WalletError::Config(format!(
                "account {} out of range",
                self.account
            )));
        }
        Ok(())
    }
}
